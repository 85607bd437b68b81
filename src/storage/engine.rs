//! Thread-Safe Storage Engine with Lazy Expiry
//!
//! This module implements the key-value store shared by every connection.
//! Values are immutable once created; a key is only ever replaced wholesale.
//!
//! ## Design Decisions
//!
//! 1. **Sharded Locks**: Instead of one big lock, keys are spread over 64 shards.
//! 2. **Lazy, Non-Reclaiming Expiry**: The store keeps expired values. Readers
//!    check [`Value::is_expired`] and treat such keys as absent.
//! 3. **Absolute Expiry**: Expiry is a wall-clock timestamp so that values
//!    restored from a snapshot keep their original deadline.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     StorageEngine                           │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │ Shard N │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ RwLock  │           │
//! │  │ HashMap │ │ HashMap │ │ HashMap │ │ HashMap │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every operation touches a single shard (or each shard in turn for
//! [`StorageEngine::keys`]), so there is no cross-key atomicity.

use crate::commands::CommandError;
use bytes::Bytes;
use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, SystemTime};

/// Number of shards for the storage engine.
const NUM_SHARDS: usize = 64;

/// The data held by a [`Value`].
///
/// Only plain strings exist today; new data types get their own variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    String(Bytes),
}

/// A stored value with an optional absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Value {
    payload: Payload,
    expires_at: Option<SystemTime>,
}

impl Value {
    /// Creates a string value that never expires.
    pub fn string(data: impl Into<Bytes>) -> Self {
        Self {
            payload: Payload::String(data.into()),
            expires_at: None,
        }
    }

    /// Creates a string value that expires at the given instant.
    pub fn string_expiring_at(data: impl Into<Bytes>, expires_at: SystemTime) -> Self {
        Self {
            payload: Payload::String(data.into()),
            expires_at: Some(expires_at),
        }
    }

    /// Creates a string value that expires `ttl` from now.
    pub fn string_with_ttl(data: impl Into<Bytes>, ttl: Duration) -> Self {
        Self::string_expiring_at(data, SystemTime::now() + ttl)
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Returns the string payload.
    pub fn as_bytes(&self) -> &Bytes {
        match &self.payload {
            Payload::String(data) => data,
        }
    }

    pub fn expires_at(&self) -> Option<SystemTime> {
        self.expires_at
    }

    /// Checks if this value has expired.
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(SystemTime::now())
    }

    /// Checks expiry against an explicit clock reading.
    #[inline]
    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        self.expires_at.is_some_and(|exp| now > exp)
    }
}

/// Static configuration fixed when the store is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Directory holding the snapshot file
    pub dir: String,
    /// Snapshot file name inside `dir`
    pub dbfilename: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: ".".to_string(),
            dbfilename: "dump.rdb".to_string(),
        }
    }
}

/// A single shard containing a portion of the key-value pairs.
#[derive(Debug, Default)]
struct Shard {
    data: RwLock<HashMap<Bytes, Value>>,
}

impl Shard {
    fn read(&self) -> RwLockReadGuard<'_, HashMap<Bytes, Value>> {
        // Writers never panic while holding the lock, so a poisoned map is intact.
        self.data.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Bytes, Value>> {
        self.data.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Operation counters, surfaced through `INFO`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageStats {
    pub keys: u64,
    pub get_ops: u64,
    pub set_ops: u64,
}

/// The key-value store.
///
/// This struct is designed to be wrapped in an `Arc` and shared across all
/// connection tasks. All operations are thread-safe.
///
/// # Example
///
/// ```
/// use respite::storage::{StorageEngine, Value};
/// use bytes::Bytes;
///
/// let engine = StorageEngine::new();
/// engine.set(Bytes::from("name"), Value::string("Ariz"));
///
/// let value = engine.get(&Bytes::from("name")).unwrap();
/// assert_eq!(value.as_bytes(), &Bytes::from("Ariz"));
/// assert_eq!(engine.config("dbfilename").unwrap(), "dump.rdb");
/// ```
pub struct StorageEngine {
    shards: Vec<Shard>,
    config: StoreConfig,
    key_count: AtomicU64,
    get_count: AtomicU64,
    set_count: AtomicU64,
}

impl std::fmt::Debug for StorageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageEngine")
            .field("shards", &self.shards.len())
            .field("config", &self.config)
            .field("key_count", &self.key_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for StorageEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageEngine {
    /// Creates a store with the default configuration.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Creates a store with the given static configuration.
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            shards: (0..NUM_SHARDS).map(|_| Shard::default()).collect(),
            config,
            key_count: AtomicU64::new(0),
            get_count: AtomicU64::new(0),
            set_count: AtomicU64::new(0),
        }
    }

    #[inline]
    fn shard(&self, key: &[u8]) -> &Shard {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % NUM_SHARDS]
    }

    /// Gets the value stored under `key`, expired or not.
    ///
    /// Callers decide what an expired value means; nothing is removed here.
    pub fn get(&self, key: &[u8]) -> Option<Value> {
        self.get_count.fetch_add(1, Ordering::Relaxed);
        self.shard(key).read().get(key).cloned()
    }

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// Returns `true` if the key was not present before.
    pub fn set(&self, key: Bytes, value: Value) -> bool {
        self.set_count.fetch_add(1, Ordering::Relaxed);

        let is_new = self.shard(&key).write().insert(key, value).is_none();
        if is_new {
            self.key_count.fetch_add(1, Ordering::Relaxed);
        }
        is_new
    }

    /// Returns a point-in-time list of every stored key.
    ///
    /// Shards are visited one after another, so a concurrent `set` may or may
    /// not be observed. No key appears twice.
    pub fn keys(&self) -> Vec<Bytes> {
        let mut result = Vec::with_capacity(self.len() as usize);
        for shard in &self.shards {
            result.extend(shard.read().keys().cloned());
        }
        result
    }

    /// Like [`keys`](Self::keys), but leaves out keys whose value has expired.
    ///
    /// Does not count as a read in [`StorageStats`].
    pub fn live_keys(&self) -> Vec<Bytes> {
        let now = SystemTime::now();
        let mut result = Vec::new();
        for shard in &self.shards {
            result.extend(
                shard
                    .read()
                    .iter()
                    .filter(|(_, value)| !value.is_expired_at(now))
                    .map(|(key, _)| key.clone()),
            );
        }
        result
    }

    /// Looks up a static configuration entry by name (case-insensitive).
    pub fn config(&self, name: &str) -> Result<&str, CommandError> {
        if name.eq_ignore_ascii_case("dir") {
            Ok(&self.config.dir)
        } else if name.eq_ignore_ascii_case("dbfilename") {
            Ok(&self.config.dbfilename)
        } else {
            Err(CommandError::InvalidServerConfig(name.to_string()))
        }
    }

    /// Returns the number of stored keys, including expired ones.
    pub fn len(&self) -> u64 {
        self.key_count.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns operation counters.
    pub fn stats(&self) -> StorageStats {
        StorageStats {
            keys: self.key_count.load(Ordering::Relaxed),
            get_ops: self.get_count.load(Ordering::Relaxed),
            set_ops: self.set_count.load(Ordering::Relaxed),
        }
    }
}
