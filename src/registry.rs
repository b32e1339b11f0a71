//! Per-host caching policy registry.
//!
//! Hosts are registered once at startup; lookups happen on every request.
//! Registration validates its input up front and reports every problem in
//! one error rather than stopping at the first.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::Deserialize;
use thiserror::Error;

/// Registration-time failures. Fatal: a process with a bad policy should not
/// start serving.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid cache policy for host `{host}`: {problems}")]
    InvalidPolicy { host: String, problems: String },
}

impl ConfigError {
    fn invalid_policy(host: &str, problems: Vec<&'static str>) -> Self {
        Self::InvalidPolicy {
            host: host.to_string(),
            problems: problems.join(", "),
        }
    }
}

/// Registration input for one upstream API.
///
/// Unknown fields are rejected so a typo'd option fails loudly at startup
/// instead of silently falling back to a default.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyOptions {
    /// Prefix isolating this API's entries from other APIs'.
    pub key_namespace: String,
    /// TTL in seconds for primary cache entries.
    pub primary_ttl_secs: u64,
    /// Optional per-host override of the global stale-backup TTL.
    #[serde(default)]
    pub stale_backup_ttl_secs: Option<u64>,
}

/// Immutable caching policy for one registered host.
#[derive(Debug, Clone)]
pub struct ApiPolicy {
    pub host: String,
    pub key_namespace: String,
    pub primary_ttl: Duration,
    pub stale_backup_ttl: Option<Duration>,
}

/// Host → policy map. Concurrent registration is safe; lookups are O(1).
#[derive(Default)]
pub struct PolicyRegistry {
    policies: DashMap<String, Arc<ApiPolicy>>,
}

impl PolicyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `host` with the given options.
    ///
    /// Re-registering a host replaces its policy; policies handed out by
    /// [`lookup`](Self::lookup) before that are unaffected.
    pub fn register(&self, host: &str, options: PolicyOptions) -> Result<(), ConfigError> {
        let mut problems = Vec::new();
        if host.trim().is_empty() {
            problems.push("host must not be empty");
        }
        if options.key_namespace.trim().is_empty() {
            problems.push("key_namespace must not be empty");
        }
        if options.primary_ttl_secs == 0 {
            problems.push("primary_ttl_secs must be positive");
        }
        if !problems.is_empty() {
            return Err(ConfigError::invalid_policy(host, problems));
        }

        let policy = ApiPolicy {
            host: host.to_string(),
            key_namespace: options.key_namespace,
            primary_ttl: Duration::from_secs(options.primary_ttl_secs),
            stale_backup_ttl: options.stale_backup_ttl_secs.map(Duration::from_secs),
        };
        self.policies.insert(host.to_string(), Arc::new(policy));
        Ok(())
    }

    /// Policy for `host`, if registered.
    pub fn lookup(&self, host: &str) -> Option<Arc<ApiPolicy>> {
        self.policies.get(host).map(|entry| entry.value().clone())
    }

    /// Number of registered hosts.
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Whether no host is registered.
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}
