//! Flat-keyspace backend.
//!
//! Every entry is a top-level key. Primary puts take two round trips: a
//! `SET` followed by a dedicated `EXPIRE`. The pair is not atomic; a crash
//! between the two leaves a non-expiring primary entry behind. Backups get
//! one physical key per cache key under a `backup:` prefix; nothing groups
//! a namespace's backups beyond the key string itself.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use super::{DataStore, StoreError, open_connection};

/// Data store over a flat key/value keyspace.
#[derive(Clone)]
pub struct KvStore {
    conn: ConnectionManager,
}

impl KvStore {
    /// Connect to the store at `url`.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        Ok(Self {
            conn: open_connection(url).await?,
        })
    }

    fn primary_key(namespace: &str, key: &str) -> String {
        format!("{namespace}:{key}")
    }

    fn backup_key(namespace: &str, key: &str) -> String {
        format!("backup:{namespace}:{key}")
    }
}

#[async_trait]
impl DataStore for KvStore {
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
        let primary_key = Self::primary_key(namespace, key);

        let () = conn.set(&primary_key, body.as_ref()).await?;

        // A failure past this point leaves a non-expiring entry behind that
        // the caller cannot repair, so name the residue in the error.
        conn.expire::<_, ()>(&primary_key, ttl.as_secs() as i64)
            .await
            .map_err(expire_failure)?;
        Ok(())
    }

    async fn backup_exists(&self, namespace: &str, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let exists: bool = conn.exists(Self::backup_key(namespace, key)).await?;
        Ok(exists)
    }

    async fn backup_get(&self, namespace: &str, key: &str) -> Result<Option<Bytes>, StoreError> {
        let mut conn = self.conn.clone();
        let body: Option<Vec<u8>> = conn.get(Self::backup_key(namespace, key)).await?;
        Ok(body.map(Bytes::from))
    }

    async fn backup_put(&self, namespace: &str, key: &str, body: Bytes) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let () = conn.set(Self::backup_key(namespace, key), body.as_ref()).await?;
        Ok(())
    }
}

fn expire_failure(err: redis::RedisError) -> StoreError {
    StoreError::unavailable(format!(
        "expire failed after set, primary entry will not expire: {err}"
    ))
}
