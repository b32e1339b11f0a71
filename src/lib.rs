//! Riserva
//!
//! Cache-aside layer for outbound HTTP GET calls to registered upstream
//! APIs, with a durable last-known-good backup tier:
//!
//! - **Primary cache**: TTL'd response bodies, served instead of re-fetching
//! - **Backup tier**: non-expiring last-known-good bodies, served when the
//!   upstream times out, errors, or returns a non-success status
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use riserva::{
//!     ApiRequest, CacheManager, PolicyOptions, ReqwestTransport, Settings, store,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::default();
//! let data_store = store::connect(&settings.store).await?;
//! let transport = Arc::new(ReqwestTransport::default());
//!
//! let manager = CacheManager::new(settings, data_store, transport);
//! manager.register_api(
//!     "api.example.com",
//!     PolicyOptions {
//!         key_namespace: "ex".to_string(),
//!         primary_ttl_secs: 3600,
//!         stale_backup_ttl_secs: None,
//!     },
//! )?;
//!
//! let url = url::Url::parse("https://api.example.com/items?a=1&b=2")?;
//! let response = manager.execute(ApiRequest::get(url)).await?;
//! println!("{:?}: {} bytes", response.source, response.body.len());
//! # Ok(())
//! # }
//! ```
//!
//! There is no request coalescing: concurrent identical misses each call
//! the upstream and each write the result (last write wins).

pub mod config;
pub mod error;
pub mod keys;
pub mod manager;
pub mod registry;
pub mod store;
pub mod telemetry;
pub mod transport;

pub use config::{LogFormat, LoggingSettings, Settings, StoreSettings};
pub use error::RequestError;
pub use keys::{DerivedKey, derive_key, normalize_uri};
pub use manager::{ApiResponse, CacheManager, FailureHook, ResponseSource};
pub use registry::{ApiPolicy, ConfigError, PolicyOptions, PolicyRegistry};
pub use store::{BackendKind, DataStore, HashStore, KvStore, MemoryStore, StoreError};
pub use transport::{ApiRequest, ReqwestTransport, Transport, TransportError, UpstreamResponse};
