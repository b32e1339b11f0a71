//! Hash-structured backend.
//!
//! Primary entries are top-level keys written with a combined set-and-expire
//! in a single call, so there is no window where an entry exists without its
//! TTL. Backups for one namespace live in a single hash keyed by the
//! namespace, with the cache key as the hash field, so all of an API's
//! backups can be enumerated as one structure.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use super::{DataStore, StoreError, open_connection};

/// Data store using a hash structure per namespace for backups.
#[derive(Clone)]
pub struct HashStore {
    conn: ConnectionManager,
}

impl HashStore {
    /// Connect to the store at `url`.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        Ok(Self {
            conn: open_connection(url).await?,
        })
    }

    fn primary_key(namespace: &str, key: &str) -> String {
        format!("{namespace}:{key}")
    }
}

#[async_trait]
impl DataStore for HashStore {
    async fn primary_exists(&self, namespace: &str, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let exists: bool = conn.exists(Self::primary_key(namespace, key)).await?;
        Ok(exists)
    }

    async fn primary_get(&self, namespace: &str, key: &str) -> Result<Option<Bytes>, StoreError> {
        let mut conn = self.conn.clone();
        let body: Option<Vec<u8>> = conn.get(Self::primary_key(namespace, key)).await?;
        Ok(body.map(Bytes::from))
    }

    async fn primary_put(
        &self,
        namespace: &str,
        key: &str,
        body: Bytes,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let () = conn
            .set_ex(
                Self::primary_key(namespace, key),
                body.as_ref(),
                ttl.as_secs(),
            )
            .await?;
        Ok(())
    }

    async fn backup_exists(&self, namespace: &str, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();

        // Absence of the namespace hash short-circuits to false; probing a
        // field inside a missing hash would be a wasted round trip.
        let hash_exists: bool = conn.exists(namespace).await?;
        if !hash_exists {
            return Ok(false);
        }

        let field_exists: bool = conn.hexists(namespace, key).await?;
        Ok(field_exists)
    }

    async fn backup_get(&self, namespace: &str, key: &str) -> Result<Option<Bytes>, StoreError> {
        let mut conn = self.conn.clone();
        let body: Option<Vec<u8>> = conn.hget(namespace, key).await?;
        Ok(body.map(Bytes::from))
    }

    async fn backup_put(&self, namespace: &str, key: &str, body: Bytes) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let () = conn.hset(namespace, key, body.as_ref()).await?;
        Ok(())
    }
}
