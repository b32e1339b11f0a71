//! In-process store.
//!
//! Backs tests and local development with the same trait contract as the
//! network backends: TTL'd primary entries, non-expiring backups. Expiry is
//! checked lazily on read; nothing sweeps dead entries.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;

use super::lock::{rw_read, rw_write};
use super::{DataStore, StoreError};

const SOURCE: &str = "store::memory";

struct PrimaryEntry {
    body: Bytes,
    expires_at: Instant,
}

impl PrimaryEntry {
    fn is_live(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Data store held entirely in process memory.
#[derive(Default)]
pub struct MemoryStore {
    primary: RwLock<HashMap<(String, String), PrimaryEntry>>,
    backup: RwLock<HashMap<(String, String), Bytes>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn entry_key(namespace: &str, key: &str) -> (String, String) {
        (namespace.to_string(), key.to_string())
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn primary_exists(&self, namespace: &str, key: &str) -> Result<bool, StoreError> {
        let primary = rw_read(&self.primary, SOURCE, "primary_exists");
        Ok(primary
            .get(&Self::entry_key(namespace, key))
            .is_some_and(PrimaryEntry::is_live))
    }

    async fn primary_get(&self, namespace: &str, key: &str) -> Result<Option<Bytes>, StoreError> {
        let primary = rw_read(&self.primary, SOURCE, "primary_get");
        Ok(primary
            .get(&Self::entry_key(namespace, key))
            .filter(|entry| entry.is_live())
            .map(|entry| entry.body.clone()))
    }

    async fn primary_put(
        &self,
        namespace: &str,
        key: &str,
        body: Bytes,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let mut primary = rw_write(&self.primary, SOURCE, "primary_put");
        primary.insert(
            Self::entry_key(namespace, key),
            PrimaryEntry {
                body,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn backup_exists(&self, namespace: &str, key: &str) -> Result<bool, StoreError> {
        let backup = rw_read(&self.backup, SOURCE, "backup_exists");
        Ok(backup.contains_key(&Self::entry_key(namespace, key)))
    }

    async fn backup_get(&self, namespace: &str, key: &str) -> Result<Option<Bytes>, StoreError> {
        let backup = rw_read(&self.backup, SOURCE, "backup_get");
        Ok(backup.get(&Self::entry_key(namespace, key)).cloned())
    }

    async fn backup_put(&self, namespace: &str, key: &str, body: Bytes) -> Result<(), StoreError> {
        let mut backup = rw_write(&self.backup, SOURCE, "backup_put");
        backup.insert(Self::entry_key(namespace, key), body);
        Ok(())
    }
}
