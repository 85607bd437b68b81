//! Connection Handler Module
//!
//! This module manages individual client connections. Each accepted
//! connection runs as its own async task, split into a decoding half and an
//! executing half.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     TCP Listener                            │
//! │                 (server::listener)                          │
//! └──────────────────────┬──────────────────────────────────────┘
//!                        │
//!                        │ accept()
//!                        ▼
//!           ┌────────────────────────┐
//!           │   For each client...   │
//!           └────────────┬───────────┘
//!                        │
//!                        │ spawn task
//!                        ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 handle_connection                           │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │ Read bytes  │───>│ Decode RESP │───>│  Queue(10)  │     │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘     │
//! │                                               │             │
//! │                                               ▼             │
//! │                     ┌─────────────┐    ┌─────────────┐     │
//! │                     │ Send reply  │<───│ Execute cmd │     │
//! │                     └─────────────┘    └─────────────┘     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Async I/O**: Uses Tokio for non-blocking network operations
//! - **Pipelining**: Supports multiple commands in a single TCP packet
//! - **Backpressure**: A full queue stops the reader
//! - **Statistics**: Tracks connection and command metrics
//!
//! ## Example
//!
//! ```no_run
//! use respite::connection::handle_connection;
//! use respite::server::Context;
//! use respite::storage::StorageEngine;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! # async fn serve() -> std::io::Result<()> {
//! let ctx = Arc::new(Context::with_store(Arc::new(StorageEngine::new())));
//! let listener = TcpListener::bind("127.0.0.1:6379").await?;
//!
//! // For each accepted connection...
//! let (stream, addr) = listener.accept().await?;
//! tokio::spawn(handle_connection(stream, addr, Arc::clone(&ctx)));
//! # Ok(())
//! # }
//! ```

pub mod handler;

// Re-export commonly used types
pub use handler::{handle_connection, ConnectionError, ConnectionStats, COMMAND_QUEUE_CAPACITY};
