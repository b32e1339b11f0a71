use thiserror::Error;

use crate::transport::TransportError;

/// Failures surfaced to the caller of [`crate::CacheManager::execute`].
#[derive(Debug, Error)]
pub enum RequestError {
    /// Upstream produced no response at all and no backup entry exists.
    /// The one case where the caller gets an error instead of a response.
    #[error("no response available for `{normalized_uri}`: upstream failed and no backup entry exists")]
    NoResponseAvailable { normalized_uri: String },

    /// Transport failure on the passthrough path, where no cache or backup
    /// ever applies.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl RequestError {
    pub fn no_response(normalized_uri: impl Into<String>) -> Self {
        Self::NoResponseAvailable {
            normalized_uri: normalized_uri.into(),
        }
    }
}
