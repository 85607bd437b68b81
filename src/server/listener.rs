//! Accept Loop
//!
//! Accepts clients until the shutdown future resolves. Each client gets its
//! own task; a failed accept is logged and the loop keeps going.

use crate::connection::handle_connection;
use crate::server::Context;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Runs the accept loop on `listener` until `shutdown` completes.
///
/// Connections already being served are not interrupted; they finish on
/// their own tasks.
pub async fn run(listener: TcpListener, ctx: Arc<Context>, shutdown: impl Future) {
    tokio::pin!(shutdown);

    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "Ready to accept connections");
    }

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    let ctx = Arc::clone(&ctx);
                    tokio::spawn(async move {
                        handle_connection(stream, addr, ctx).await;
                    });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            },
            _ = &mut shutdown => {
                info!("Shutdown signal received, stopping server...");
                break;
            }
        }
    }
}
