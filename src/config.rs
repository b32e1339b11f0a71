//! Runtime configuration.
//!
//! Controls the caching switch, the upstream timeout, the stale-backup TTL
//! applied when a backup body is re-seeded into the primary cache, and the
//! store backend selection. Per-API policy lives in [`crate::registry`].

use std::time::Duration;

use serde::Deserialize;

use crate::store::BackendKind;

// Default values for cache settings
const DEFAULT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_STALE_BACKUP_TTL_SECS: u64 = 300;
const DEFAULT_STORE_URL: &str = "redis://127.0.0.1:6379";

/// Top-level settings for a [`crate::CacheManager`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Master switch. When false every request is a pure passthrough.
    pub enabled: bool,
    /// Upstream request timeout in seconds.
    pub timeout_secs: u64,
    /// TTL in seconds for primary entries re-seeded from backup.
    ///
    /// Deliberately short compared to normal policy TTLs so a recovering
    /// upstream is retried soon after an outage.
    pub stale_backup_ttl_secs: u64,
    /// Data store backend selection.
    pub store: StoreSettings,
    /// Logging configuration, consumed by [`crate::telemetry::init`].
    pub logging: LoggingSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            stale_backup_ttl_secs: DEFAULT_STALE_BACKUP_TTL_SECS,
            store: StoreSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl Settings {
    /// Upstream timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Stale-backup TTL as a [`Duration`].
    pub fn stale_backup_ttl(&self) -> Duration {
        Duration::from_secs(self.stale_backup_ttl_secs)
    }
}

/// Data store connection settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Which backend layout to use.
    pub backend: BackendKind,
    /// Connection URL for the backing store.
    pub url: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: BackendKind::Hash,
            url: DEFAULT_STORE_URL.to_string(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level directive (e.g. "info", "riserva=debug").
    pub level: Option<String>,
    /// Output format.
    pub format: LogFormat,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Compact,
}
