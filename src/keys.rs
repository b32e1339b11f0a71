//! Cache key derivation.
//!
//! A request URI is normalized into a canonical string, then hashed into a
//! fixed-width hex key. Two requests that differ only in query-parameter
//! order, a single trailing slash, or scheme/host case map to the same key.

use md5::{Digest, Md5};
use url::Url;

/// Normalized URI plus its derived cache key.
///
/// Computed once per request by the orchestrator and threaded through the
/// rest of the pipeline, so normalization and hashing never run twice for
/// the same request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedKey {
    /// Canonical form of the request URI.
    pub normalized_uri: String,
    /// 128-bit hex digest of the canonical form.
    pub key: String,
}

impl DerivedKey {
    /// Normalize `url` and derive its cache key.
    pub fn from_url(url: &Url) -> Self {
        let normalized_uri = normalize_uri(url);
        let key = derive_key(&normalized_uri);
        Self {
            normalized_uri,
            key,
        }
    }
}

/// Produce the canonical string form of a request URI.
///
/// - query parameters are sorted lexicographically as raw `&`-delimited
///   tokens; an empty query yields no `?` component
/// - exactly one trailing `/` is stripped from the path; the bare root path
///   is preserved
/// - scheme and host are lower-cased by `Url` parsing; path case is kept
pub fn normalize_uri(url: &Url) -> String {
    let mut normalized = url.clone();

    normalized.set_query(sort_query_params(url.query()).as_deref());
    normalized.set_fragment(None);

    let path = normalized.path();
    if path.len() > 1 && path.ends_with('/') {
        let stripped = path[..path.len() - 1].to_string();
        normalized.set_path(&stripped);
    }

    normalized.to_string()
}

/// Hash a canonical URI string into a 32-character hex cache key.
///
/// Collisions are an accepted, undetected risk: a colliding URI would be
/// served the other URI's cached body.
pub fn derive_key(normalized_uri: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(normalized_uri.as_bytes());
    hex::encode(hasher.finalize())
}

/// Sort raw query tokens lexicographically; `None` for an empty/absent query.
fn sort_query_params(query: Option<&str>) -> Option<String> {
    let query = query?;
    if query.is_empty() {
        return None;
    }
    let mut params: Vec<&str> = query.split('&').collect();
    params.sort_unstable();
    Some(params.join("&"))
}
