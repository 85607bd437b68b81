//! Server Module
//!
//! Process-level pieces: the shared [`Context`] commands execute against,
//! the INFO sections rendered from it, command-line configuration, and the
//! accept loop.

pub mod config;
pub mod context;
pub mod info;
pub mod listener;

pub use config::{ConfigError, Invocation, ServerConfig};
pub use context::{Context, ReplicationInfo, Role, ServerInfo};
