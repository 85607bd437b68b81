//! # Respite - A Minimal Redis-Compatible Server
//!
//! Respite speaks a subset of the Redis Serialization Protocol (RESP) over
//! TCP, keeps string values with optional expiry in memory, and can seed its
//! store from an RDB snapshot at startup.
//!
//! ## Features
//!
//! - **Redis-Compatible**: `redis-cli` and common clients can talk to it
//! - **Sharded Storage**: 64 RwLock shards for concurrent access
//! - **TTL Support**: `SET ... PX` with lazy expiry on read
//! - **Snapshot Restore**: loads `dir/dbfilename` in RDB format on startup
//! - **Async I/O**: Built on Tokio, one decode worker and one executor per client
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              Respite                                    │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐  mpsc  ┌─────────────┐              │
//! │  │ TCP Server  │───>│ Decode      │───────>│  Executor   │              │
//! │  │ (listener)  │    │ Worker      │  (10)  │  Command    │              │
//! │  └─────────────┘    └─────────────┘        └──────┬──────┘              │
//! │                                                   │                     │
//! │                                                   ▼                     │
//! │  ┌─────────────┐    ┌──────────────────────────────────────────────┐   │
//! │  │  Snapshot   │───>│              StorageEngine                   │   │
//! │  │  (startup)  │    │  ┌────────┐ ┌────────┐ ┌────────┐ ┌────────┐ │   │
//! │  │             │    │  │Shard 0 │ │Shard 1 │ │Shard 2 │ │...64   │ │   │
//! │  └─────────────┘    │  │RwLock  │ │RwLock  │ │RwLock  │ │shards  │ │   │
//! │                     │  └────────┘ └────────┘ └────────┘ └────────┘ │   │
//! │                     └──────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use respite::server::{listener, Context};
//! use respite::storage::{self, StorageEngine};
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(StorageEngine::new());
//!     storage::restore(&store)?;
//!
//!     let ctx = Arc::new(Context::with_store(store));
//!     let tcp = TcpListener::bind("127.0.0.1:6379").await?;
//!     listener::run(tcp, ctx, async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await;
//!     Ok(())
//! }
//! ```
//!
//! ## Supported Commands
//!
//! - `PING`
//! - `ECHO message`
//! - `SET key value [PX milliseconds]`
//! - `GET key`
//! - `CONFIG GET name [name ...]` (`dir`, `dbfilename`)
//! - `KEYS *`
//! - `INFO [server|clients|stats|replication]`
//!
//! ## Module Overview
//!
//! - [`protocol`]: RESP request decoder and reply types
//! - [`commands`]: The command model and its error kinds
//! - [`storage`]: Thread-safe storage engine and snapshot loader
//! - [`connection`]: Per-client decode/execute pipeline
//! - [`server`]: Shared context, INFO sections, configuration, accept loop
//!
//! ## Design Highlights
//!
//! ### Errors Are Replies
//!
//! Malformed input and bad arguments never close a connection. The decoder
//! turns them into a `Command::Error` that answers with one simple error, and
//! the stream resumes at the next frame.
//!
//! ### Lazy Expiry
//!
//! Keys with a TTL are checked when read and hidden once expired. Nothing
//! sweeps them in the background.

pub mod commands;
pub mod connection;
pub mod protocol;
pub mod server;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::{Command, CommandError};
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{FrameDecoder, RespValue};
pub use server::Context;
pub use storage::StorageEngine;

/// The default port Respite listens on (same as Redis)
pub const DEFAULT_PORT: u16 = 6379;

/// The default host Respite binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of Respite
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
