//! Respite - A Minimal Redis-Compatible Server
//!
//! This is the main entry point for the server. It reads the command line,
//! restores the snapshot, binds the TCP listener and serves until Ctrl+C.

use respite::server::{listener, Context, Invocation, ReplicationInfo, ServerConfig, ServerInfo};
use respite::storage::{self, StorageEngine};
use respite::ConnectionStats;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn print_help() {
    println!(
        r#"
Respite - A Minimal Redis-Compatible Server

USAGE:
    respite [OPTIONS]

OPTIONS:
    -h, --host <HOST>                Host to bind to (default: 127.0.0.1)
    -p, --port <PORT>                Port to listen on (default: 6379)
        --dir <DIR>                  Snapshot directory (default: .)
        --dbfilename <FILE>          Snapshot file name (default: dump.rdb)
        --replicaof "<HOST> <PORT>"  Run as a follower of the given leader
    -v, --version                    Print version information
        --help                       Print this help message

EXAMPLES:
    respite                                    # Start on 127.0.0.1:6379
    respite --port 6380                        # Start on port 6380
    respite --dir /tmp/redis-files --dbfilename dump.rdb

LOGGING:
    Set RUST_LOG to change verbosity, e.g. RUST_LOG=respite=debug
"#
    );
}

fn print_banner(config: &ServerConfig) {
    println!(
        r#"
Respite v{} - Minimal Redis-Compatible Server
──────────────────────────────────────────────
Server started on {}
Snapshot: {}/{}

Use Ctrl+C to shutdown gracefully.
"#,
        respite::VERSION,
        config.bind_address(),
        config.dir,
        config.dbfilename
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let config = match ServerConfig::from_args(std::env::args().skip(1)) {
        Ok(Invocation::Serve(config)) => config,
        Ok(Invocation::Help) => {
            print_help();
            return Ok(());
        }
        Ok(Invocation::Version) => {
            println!("Respite version {}", respite::VERSION);
            return Ok(());
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            print_help();
            std::process::exit(1);
        }
    };

    // Set up logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    print_banner(&config);

    // Create the storage engine (shared across all connections)
    let store = Arc::new(StorageEngine::with_config(config.store_config()));
    let restored = storage::restore(&store)?;
    info!(keys = restored, "Storage engine initialized with 64 shards");

    let replication = ReplicationInfo::from_replicaof(config.replicaof.as_deref())?;
    info!(role = replication.role.as_str(), "Replication configured");

    let ctx = Arc::new(Context::new(
        store,
        ServerInfo::new(config.port),
        replication,
        Arc::new(ConnectionStats::new()),
    ));

    // Bind the TCP listener
    let tcp = TcpListener::bind(config.bind_address()).await?;
    info!("Listening on {}", config.bind_address());

    // Set up graceful shutdown
    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    listener::run(tcp, ctx, shutdown).await;

    info!("Server shutdown complete");
    Ok(())
}
