//! Request orchestration.
//!
//! One [`CacheManager`] per process owns the policy registry, the enable
//! switch, the data store handle and the transport. Every outbound request
//! goes through [`CacheManager::execute`], which walks the decision
//! sequence: eligibility gate → primary cache → upstream under timeout →
//! backup tier → retained bad response → hard failure.
//!
//! Known race, accepted by design: there is no single-flight coalescing.
//! N concurrent requests for the same uncached key all miss, all call
//! upstream, and all write the result. Entries are idempotent bodies, so
//! last-write-wins is harmless.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::Bytes;
use http::{Method, StatusCode};
use metrics::counter;
use tracing::{debug, info, instrument, warn};

use crate::config::Settings;
use crate::error::RequestError;
use crate::keys::DerivedKey;
use crate::registry::{ApiPolicy, ConfigError, PolicyOptions, PolicyRegistry};
use crate::store::DataStore;
use crate::transport::{ApiRequest, Transport, TransportError, UpstreamResponse};

/// Where a response body came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    /// The real upstream answered (fresh, or a retained non-success).
    Upstream,
    /// Served from the primary cache; the transport was never invoked.
    Cache,
    /// Served from the backup tier after an upstream failure.
    Backup,
    /// Forwarded without any cache involvement.
    Passthrough,
}

/// Response handed back to the caller.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub source: ResponseSource,
}

impl ApiResponse {
    /// Synthetic success wrapping a stored body. Cache and backup entries
    /// keep body bytes only, so no headers are reconstructed.
    fn synthetic(body: Bytes, source: ResponseSource) -> Self {
        Self {
            status: StatusCode::OK,
            headers: Vec::new(),
            body,
            source,
        }
    }

    fn from_upstream(response: UpstreamResponse, source: ResponseSource) -> Self {
        Self {
            status: response.status,
            headers: response.headers,
            body: response.body,
            source,
        }
    }
}

/// Observability callback invoked on the upstream-exception path with
/// `(error, key_namespace, normalized_uri)`. Its return value is ignored
/// and a panic inside it never aborts the fallback sequence.
pub type FailureHook = Arc<dyn Fn(&TransportError, &str, &str) + Send + Sync>;

/// Orchestrates cache-aside request handling for registered APIs.
pub struct CacheManager {
    settings: Settings,
    enabled: AtomicBool,
    registry: PolicyRegistry,
    store: Arc<dyn DataStore>,
    transport: Arc<dyn Transport>,
    failure_hook: Option<FailureHook>,
}

impl CacheManager {
    /// Create a manager over the given store and transport.
    pub fn new(settings: Settings, store: Arc<dyn DataStore>, transport: Arc<dyn Transport>) -> Self {
        let enabled = AtomicBool::new(settings.enabled);
        Self {
            settings,
            enabled,
            registry: PolicyRegistry::new(),
            store,
            transport,
            failure_hook: None,
        }
    }

    /// Attach the failure hook.
    pub fn with_failure_hook(mut self, hook: FailureHook) -> Self {
        self.failure_hook = Some(hook);
        self
    }

    /// Register an upstream API host for caching.
    pub fn register_api(&self, host: &str, options: PolicyOptions) -> Result<(), ConfigError> {
        self.registry.register(host, options)
    }

    /// The policy registry.
    pub fn registry(&self) -> &PolicyRegistry {
        &self.registry
    }

    /// Whether caching is currently enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Flip the master switch. When disabled, every request passes through.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Execute a request, serving it from cache, upstream or backup.
    ///
    /// Non-GET requests and requests to unregistered hosts are forwarded
    /// untouched and never reach the store.
    #[instrument(skip_all, fields(method = %request.method, url = %request.url))]
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, RequestError> {
        let Some(policy) = self.eligible_policy(&request) else {
            return self.passthrough(&request).await;
        };

        let derived = DerivedKey::from_url(&request.url);
        let namespace = policy.key_namespace.as_str();

        if let Some(body) = self.primary_lookup(namespace, &derived).await {
            info!(
                namespace,
                key = %derived.key,
                uri = %derived.normalized_uri,
                outcome = "hit",
                "serving response from cache"
            );
            counter!("riserva_cache_hit_total").increment(1);
            return Ok(ApiResponse::synthetic(body, ResponseSource::Cache));
        }

        debug!(
            namespace,
            key = %derived.key,
            outcome = "miss",
            "cache miss, calling upstream"
        );
        counter!("riserva_cache_miss_total").increment(1);

        match self.call_upstream(&request).await {
            Ok(response) if response.is_success() => {
                self.store_success(&policy, &derived, &response.body).await;
                Ok(ApiResponse::from_upstream(response, ResponseSource::Upstream))
            }
            Ok(response) => {
                warn!(
                    namespace,
                    status = response.status.as_u16(),
                    uri = %derived.normalized_uri,
                    "upstream returned non-success status"
                );
                counter!("riserva_upstream_failure_total").increment(1);
                self.fallback(&policy, &derived, Some(response)).await
            }
            Err(err) => {
                warn!(
                    namespace,
                    error = %err,
                    uri = %derived.normalized_uri,
                    "upstream call failed"
                );
                counter!("riserva_upstream_failure_total").increment(1);
                self.invoke_failure_hook(&err, namespace, &derived.normalized_uri);
                self.fallback(&policy, &derived, None).await
            }
        }
    }

    /// The policy to apply, or `None` when the request must pass through.
    fn eligible_policy(&self, request: &ApiRequest) -> Option<Arc<ApiPolicy>> {
        if !self.is_enabled() || request.method != Method::GET {
            return None;
        }
        self.registry.lookup(request.url.host_str()?)
    }

    async fn passthrough(&self, request: &ApiRequest) -> Result<ApiResponse, RequestError> {
        debug!("caching not applicable, forwarding request");
        counter!("riserva_passthrough_total").increment(1);
        let response = self.transport.perform(request).await?;
        Ok(ApiResponse::from_upstream(response, ResponseSource::Passthrough))
    }

    /// Primary read path. Store errors and the exists/get race both degrade
    /// to a miss.
    async fn primary_lookup(&self, namespace: &str, derived: &DerivedKey) -> Option<Bytes> {
        match self.store.primary_exists(namespace, &derived.key).await {
            Ok(true) => {}
            Ok(false) => return None,
            Err(err) => {
                self.record_store_error("primary_exists", namespace, derived, &err);
                return None;
            }
        }
        match self.store.primary_get(namespace, &derived.key).await {
            Ok(found) => found,
            Err(err) => {
                self.record_store_error("primary_get", namespace, derived, &err);
                None
            }
        }
    }

    async fn call_upstream(&self, request: &ApiRequest) -> Result<UpstreamResponse, TransportError> {
        match tokio::time::timeout(self.settings.timeout(), self.transport.perform(request)).await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(TransportError::Timeout),
        }
    }

    /// Record a good upstream body in both tiers. Best-effort: a store
    /// failure here must never fail the request that produced the body.
    async fn store_success(&self, policy: &ApiPolicy, derived: &DerivedKey, body: &Bytes) {
        let namespace = policy.key_namespace.as_str();
        debug!(
            namespace,
            key = %derived.key,
            ttl_secs = policy.primary_ttl.as_secs(),
            "storing good response in cache and backup"
        );

        if let Err(err) = self
            .store
            .primary_put(namespace, &derived.key, body.clone(), policy.primary_ttl)
            .await
        {
            self.record_store_error("primary_put", namespace, derived, &err);
        }
        if let Err(err) = self
            .store
            .backup_put(namespace, &derived.key, body.clone())
            .await
        {
            self.record_store_error("backup_put", namespace, derived, &err);
        }
    }

    /// Upstream failed: serve backup if present, else the retained bad
    /// response, else fail hard.
    async fn fallback(
        &self,
        policy: &ApiPolicy,
        derived: &DerivedKey,
        retained: Option<UpstreamResponse>,
    ) -> Result<ApiResponse, RequestError> {
        let namespace = policy.key_namespace.as_str();

        if let Some(body) = self.backup_lookup(namespace, derived).await {
            let stale_ttl = self.stale_backup_ttl(policy);
            info!(
                namespace,
                key = %derived.key,
                stale_ttl_secs = stale_ttl.as_secs(),
                "serving backup and re-seeding primary cache"
            );
            counter!("riserva_backup_hit_total").increment(1);

            // Short TTL on purpose: the next expiry retries the upstream.
            if let Err(err) = self
                .store
                .primary_put(namespace, &derived.key, body.clone(), stale_ttl)
                .await
            {
                self.record_store_error("primary_put", namespace, derived, &err);
            }
            return Ok(ApiResponse::synthetic(body, ResponseSource::Backup));
        }

        if let Some(response) = retained {
            info!(
                namespace,
                status = response.status.as_u16(),
                "no backup entry, returning upstream response as-is"
            );
            return Ok(ApiResponse::from_upstream(response, ResponseSource::Upstream));
        }

        warn!(
            namespace,
            uri = %derived.normalized_uri,
            "no backup entry and no upstream response"
        );
        Err(RequestError::no_response(derived.normalized_uri.clone()))
    }

    async fn backup_lookup(&self, namespace: &str, derived: &DerivedKey) -> Option<Bytes> {
        match self.store.backup_exists(namespace, &derived.key).await {
            Ok(true) => {}
            Ok(false) => return None,
            Err(err) => {
                self.record_store_error("backup_exists", namespace, derived, &err);
                return None;
            }
        }
        match self.store.backup_get(namespace, &derived.key).await {
            Ok(found) => found,
            Err(err) => {
                self.record_store_error("backup_get", namespace, derived, &err);
                None
            }
        }
    }

    fn stale_backup_ttl(&self, policy: &ApiPolicy) -> Duration {
        policy
            .stale_backup_ttl
            .unwrap_or_else(|| self.settings.stale_backup_ttl())
    }

    fn invoke_failure_hook(&self, err: &TransportError, namespace: &str, normalized_uri: &str) {
        let Some(hook) = &self.failure_hook else {
            return;
        };
        if catch_unwind(AssertUnwindSafe(|| hook(err, namespace, normalized_uri))).is_err() {
            warn!(namespace, "failure hook panicked; continuing fallback");
        }
    }

    fn record_store_error(
        &self,
        op: &'static str,
        namespace: &str,
        derived: &DerivedKey,
        err: &crate::store::StoreError,
    ) {
        warn!(
            op,
            namespace,
            key = %derived.key,
            error = %err,
            "store operation failed; degrading"
        );
        counter!("riserva_store_error_total").increment(1);
    }
}
