//! Storage Module
//!
//! This module provides the in-memory key-value store and the loader that
//! seeds it from an RDB snapshot at startup.
//!
//! ## Architecture
//!
//! ```text
//!   dump.rdb ──> snapshot::load ──> HashMap<Bytes, Value> ──┐
//!                 (pure, startup only)                       │ set()
//!                                                            ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     StorageEngine                           │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │...64    │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ shards  │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Sharded Storage**: 64 independent shards reduce lock contention
//! - **Immutable Values**: a key's value is replaced, never mutated
//! - **Lazy Expiry**: expired values are hidden by readers, not reclaimed
//! - **Static Config**: `dir` and `dbfilename` are fixed at construction
//!
//! ## Example
//!
//! ```
//! use respite::storage::{StorageEngine, Value};
//! use bytes::Bytes;
//! use std::time::Duration;
//!
//! let engine = StorageEngine::new();
//!
//! engine.set(Bytes::from("session"), Value::string_with_ttl("token123", Duration::from_secs(3600)));
//! let value = engine.get(b"session").unwrap();
//! assert!(!value.is_expired());
//! ```

pub mod engine;
pub mod snapshot;

pub use engine::{Payload, StorageEngine, StorageStats, StoreConfig, Value};
pub use snapshot::{restore, SnapshotError};
