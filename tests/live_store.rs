//! Live store backend tests against a running Redis instance.
//!
//! - Exercises the physical behavior the in-memory store cannot: real TTL
//!   expiry, the kv backend's set-then-expire sequence, and the hash
//!   backend's two-step backup existence check.
//! - Marked `#[ignore]` so the suite only runs with infrastructure up:
//!   `cargo test --test live_store -- --ignored`.
//! - Reads the connection URL from `RISERVA_REDIS_URL`, defaulting to
//!   `redis://127.0.0.1:6379`.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use redis::AsyncCommands;

use riserva::{DataStore, HashStore, KvStore};

type TestResult<T> = Result<T, Box<dyn std::error::Error>>;

// ============================================================================
// Primary cache: put round-trip and real expiry
// ============================================================================

/// The kv backend's primary put is a SET followed by a separate EXPIRE; the
/// entry must be readable in between and gone once the TTL elapses.
#[tokio::test]
#[ignore]
async fn live_kv_primary_roundtrip_and_expiry() -> TestResult<()> {
    let store = KvStore::connect(&redis_url()).await?;
    let ns = unique_namespace("kvp");

    store
        .primary_put(&ns, "k1", Bytes::from("body"), Duration::from_secs(1))
        .await?;

    assert!(store.primary_exists(&ns, "k1").await?);
    assert_eq!(
        store.primary_get(&ns, "k1").await?,
        Some(Bytes::from("body"))
    );

    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert!(
        !store.primary_exists(&ns, "k1").await?,
        "entry should be gone after the TTL; EXPIRE was not applied"
    );
    assert_eq!(store.primary_get(&ns, "k1").await?, None);

    Ok(())
}

/// The hash backend sets the TTL in the same call as the value; same
/// observable contract as the kv backend.
#[tokio::test]
#[ignore]
async fn live_hash_primary_roundtrip_and_expiry() -> TestResult<()> {
    let store = HashStore::connect(&redis_url()).await?;
    let ns = unique_namespace("hsp");

    store
        .primary_put(&ns, "k1", Bytes::from("body"), Duration::from_secs(1))
        .await?;

    assert!(store.primary_exists(&ns, "k1").await?);
    assert_eq!(
        store.primary_get(&ns, "k1").await?,
        Some(Bytes::from("body"))
    );

    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert!(!store.primary_exists(&ns, "k1").await?);
    assert_eq!(store.primary_get(&ns, "k1").await?, None);

    Ok(())
}

// ============================================================================
// Backup tier
// ============================================================================

/// A namespace whose backup hash was never created must short-circuit to
/// `Ok(false)`, not error on the inner field check.
#[tokio::test]
#[ignore]
async fn live_hash_backup_exists_short_circuits_on_missing_namespace() -> TestResult<()> {
    let store = HashStore::connect(&redis_url()).await?;
    let ns = unique_namespace("hsm");

    assert!(!store.backup_exists(&ns, "never-written").await?);
    assert_eq!(store.backup_get(&ns, "never-written").await?, None);

    Ok(())
}

#[tokio::test]
#[ignore]
async fn live_kv_backup_roundtrip_and_overwrite() -> TestResult<()> {
    let store = KvStore::connect(&redis_url()).await?;
    let ns = unique_namespace("kvb");

    assert!(!store.backup_exists(&ns, "k1").await?);

    store.backup_put(&ns, "k1", Bytes::from("old")).await?;
    store.backup_put(&ns, "k1", Bytes::from("new")).await?;

    assert!(store.backup_exists(&ns, "k1").await?);
    assert_eq!(store.backup_get(&ns, "k1").await?, Some(Bytes::from("new")));

    del_keys(&[format!("backup:{ns}:k1")]).await?;
    Ok(())
}

#[tokio::test]
#[ignore]
async fn live_hash_backup_roundtrip_and_overwrite() -> TestResult<()> {
    let store = HashStore::connect(&redis_url()).await?;
    let ns = unique_namespace("hsb");

    assert!(!store.backup_exists(&ns, "k1").await?);

    store.backup_put(&ns, "k1", Bytes::from("old")).await?;
    store.backup_put(&ns, "k1", Bytes::from("new")).await?;

    assert!(store.backup_exists(&ns, "k1").await?);
    assert_eq!(store.backup_get(&ns, "k1").await?, Some(Bytes::from("new")));

    del_keys(&[ns]).await?;
    Ok(())
}

/// The two backends use disjoint physical layouts for backups: a kv backup
/// is a flat `backup:` key, a hash backup is a field inside the namespace
/// hash. An entry written through one must be invisible to the other.
#[tokio::test]
#[ignore]
async fn live_backup_layouts_are_isolated() -> TestResult<()> {
    let url = redis_url();
    let kv = KvStore::connect(&url).await?;
    let hash = HashStore::connect(&url).await?;
    let ns = unique_namespace("iso");

    kv.backup_put(&ns, "k1", Bytes::from("flat")).await?;
    assert!(!hash.backup_exists(&ns, "k1").await?);

    hash.backup_put(&ns, "k2", Bytes::from("hashed")).await?;
    assert!(!kv.backup_exists(&ns, "k2").await?);

    assert_eq!(kv.backup_get(&ns, "k1").await?, Some(Bytes::from("flat")));
    assert_eq!(
        hash.backup_get(&ns, "k2").await?,
        Some(Bytes::from("hashed"))
    );

    del_keys(&[format!("backup:{ns}:k1"), ns]).await?;
    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

fn redis_url() -> String {
    std::env::var("RISERVA_REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}

/// Per-run namespace so concurrent or aborted runs never collide.
fn unique_namespace(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("riserva-test:{prefix}:{nanos}")
}

async fn del_keys(keys: &[String]) -> TestResult<()> {
    let client = redis::Client::open(redis_url().as_str())?;
    let mut conn = client.get_multiplexed_async_connection().await?;
    for key in keys {
        let () = conn.del(key).await?;
    }
    Ok(())
}
