//! Data store abstraction and backends.
//!
//! The store owns the physical representation of both entry kinds: the
//! TTL'd **primary** cache and the non-expiring **backup** tier. Callers
//! supply `(namespace, key)` pairs; key layout, TTL mechanics and backup
//! structure are backend decisions that never leak past this module.
//!
//! Two network backends are provided with deliberately different capability
//! models (see [`KvStore`] and [`HashStore`]), plus an in-process
//! [`MemoryStore`] for tests and local development.

mod hash;
mod kv;
mod lock;
mod memory;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use thiserror::Error;

pub use hash::HashStore;
pub use kv::KvStore;
pub use memory::MemoryStore;

/// Store-layer failures.
///
/// `Unavailable` is transient and deliberately distinct from "not found":
/// reads that fail this way degrade to a cache miss, writes are logged and
/// swallowed so they never mask a good upstream response.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {message}")]
    Unavailable { message: String },
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        Self::unavailable(err.to_string())
    }
}

/// Capability set required of a cache store.
///
/// All operations may block on network I/O and must be safe for concurrent
/// use from multiple requests. "Not found" is `Ok(None)` / `Ok(false)`;
/// `Err` always means the store itself misbehaved.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Whether a live primary entry exists.
    async fn primary_exists(&self, namespace: &str, key: &str) -> Result<bool, StoreError>;

    /// Read the primary entry body.
    async fn primary_get(&self, namespace: &str, key: &str) -> Result<Option<Bytes>, StoreError>;

    /// Write a primary entry. The entry must become unreadable once `ttl`
    /// elapses (best-effort, backend-dependent precision).
    async fn primary_put(
        &self,
        namespace: &str,
        key: &str,
        body: Bytes,
        ttl: Duration,
    ) -> Result<(), StoreError>;

    /// Whether a backup entry exists.
    async fn backup_exists(&self, namespace: &str, key: &str) -> Result<bool, StoreError>;

    /// Read the backup entry body.
    async fn backup_get(&self, namespace: &str, key: &str) -> Result<Option<Bytes>, StoreError>;

    /// Write a backup entry. No TTL; overwrites unconditionally.
    async fn backup_put(&self, namespace: &str, key: &str, body: Bytes) -> Result<(), StoreError>;
}

/// Backend selection, resolved once at configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Flat keyspace with a separate expire call ([`KvStore`]).
    Kv,
    /// Hash-structured backups with single-call TTL puts ([`HashStore`]).
    Hash,
    /// In-process map, no persistence ([`MemoryStore`]).
    Memory,
}

/// Connect the configured backend and return it behind the trait.
pub async fn connect(
    settings: &crate::config::StoreSettings,
) -> Result<Arc<dyn DataStore>, StoreError> {
    match settings.backend {
        BackendKind::Kv => Ok(Arc::new(KvStore::connect(&settings.url).await?)),
        BackendKind::Hash => Ok(Arc::new(HashStore::connect(&settings.url).await?)),
        BackendKind::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}

async fn open_connection(url: &str) -> Result<redis::aio::ConnectionManager, StoreError> {
    let client = redis::Client::open(url)?;
    let manager = client.get_connection_manager().await?;
    Ok(manager)
}
