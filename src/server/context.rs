//! Shared Server Context
//!
//! Everything a command may look at while executing: the store, static
//! metadata about this server process, its replication identity and the
//! live connection counters.

use crate::commands::CommandError;
use crate::connection::ConnectionStats;
use crate::storage::StorageEngine;
use std::collections::hash_map::RandomState;
use std::hash::BuildHasher;
use std::sync::Arc;
use std::time::Instant;

/// Static facts about the running server.
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub port: u16,
    pub started_at: Instant,
}

impl ServerInfo {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// Replication role of this server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Leader,
    Follower { host: String, port: u16 },
}

impl Role {
    /// The role name reported by `INFO replication`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Leader => "master",
            Role::Follower { .. } => "slave",
        }
    }
}

/// Replication identity, fixed at startup.
#[derive(Debug, Clone)]
pub struct ReplicationInfo {
    pub role: Role,
    pub master_replid: String,
    pub master_repl_offset: u64,
}

impl ReplicationInfo {
    /// A standalone leader with a fresh replication id.
    pub fn leader() -> Self {
        Self {
            role: Role::Leader,
            master_replid: generate_replid(),
            master_repl_offset: 0,
        }
    }

    /// Builds the replication identity from a `--replicaof "<host> <port>"`
    /// value. `None` means this server is a leader.
    pub fn from_replicaof(replicaof: Option<&str>) -> Result<Self, CommandError> {
        let Some(leader) = replicaof else {
            return Ok(Self::leader());
        };

        let mut parts = leader.split_whitespace();
        let (Some(host), Some(port), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(CommandError::NoLeaderAvailable);
        };
        let port = port.parse().map_err(|_| CommandError::NoLeaderAvailable)?;

        Ok(Self {
            role: Role::Follower {
                host: host.to_string(),
                port,
            },
            ..Self::leader()
        })
    }
}

/// 40 hex characters, like a Redis replication id.
fn generate_replid() -> String {
    let state = RandomState::new();
    let hi = state.hash_one(0u8);
    let mid = state.hash_one(1u8);
    let lo = state.hash_one(2u8) as u32;
    format!("{:016x}{:016x}{:08x}", hi, mid, lo)
}

/// The shared state handed to every command execution.
#[derive(Debug)]
pub struct Context {
    store: Arc<StorageEngine>,
    server: ServerInfo,
    replication: ReplicationInfo,
    stats: Arc<ConnectionStats>,
}

impl Context {
    pub fn new(
        store: Arc<StorageEngine>,
        server: ServerInfo,
        replication: ReplicationInfo,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        Self {
            store,
            server,
            replication,
            stats,
        }
    }

    /// A leader on the default port around an existing store.
    pub fn with_store(store: Arc<StorageEngine>) -> Self {
        Self::new(
            store,
            ServerInfo::new(crate::DEFAULT_PORT),
            ReplicationInfo::leader(),
            Arc::new(ConnectionStats::new()),
        )
    }

    pub fn store(&self) -> &StorageEngine {
        &self.store
    }

    pub fn server(&self) -> &ServerInfo {
        &self.server
    }

    pub fn replication(&self) -> &ReplicationInfo {
        &self.replication
    }

    pub fn stats(&self) -> &ConnectionStats {
        &self.stats
    }
}
