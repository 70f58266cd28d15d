//! Gateway abstraction for fetching bundles and key-sets.
//!
//! The exporter only ever reads from the gateway. Implementations may use
//! HTTP ([`crate::http::HttpGateway`]) or an in-memory table for tests
//! ([`memory::MemoryGateway`]).

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::Url;

use opp_exporter_core::KeySet;

use crate::error::{FetchError, Result};

/// Response header carrying the bundle content id.
pub const HEADER_RESPONSE_CID: &str = "x-odin-response-cid";
/// Older header carrying the bundle content id.
pub const HEADER_BUNDLE_CID: &str = "x-odin-bundle-cid";
/// Response header carrying the detached signature.
pub const HEADER_SIGNATURE: &str = "x-odin-signature";
/// Response header carrying the signing key id.
pub const HEADER_KID: &str = "x-odin-kid";

/// Verification headers sent alongside a bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleHeaders {
    /// Advertised bundle content id.
    pub cid: Option<String>,
    /// Base64url detached signature.
    pub signature: Option<String>,
    /// Signing key id.
    pub kid: Option<String>,
}

impl BundleHeaders {
    /// Extract verification headers. Lookup is case-insensitive; the
    /// response cid header wins over the bundle cid header.
    pub fn from_header_map(headers: &HeaderMap) -> Self {
        let get = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Self {
            cid: get(HEADER_RESPONSE_CID).or_else(|| get(HEADER_BUNDLE_CID)),
            signature: get(HEADER_SIGNATURE),
            kid: get(HEADER_KID),
        }
    }
}

/// A fetched bundle body and its verification headers.
#[derive(Debug, Clone)]
pub struct BundleResponse {
    /// Raw JSON body.
    pub body: Bytes,
    pub headers: BundleHeaders,
}

/// Read-only access to a receipt gateway.
///
/// Implementations must be thread-safe (Send + Sync). Each call is one
/// request with no caching and no retry.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// `GET {base}/v1/receipts/export/{trace_id}`
    async fn fetch_bundle(&self, base_url: &str, trace_id: &str) -> Result<BundleResponse>;

    /// `GET {base}/.well-known/jwks.json`
    async fn fetch_key_set(&self, base_url: &str) -> Result<KeySet>;
}

/// Bundle export endpoint for a trace.
pub fn bundle_url(base_url: &str, trace_id: &str) -> Result<Url> {
    endpoint(base_url, &["v1", "receipts", "export", trace_id])
}

/// Key-set endpoint of a gateway.
pub fn key_set_url(base_url: &str) -> Result<Url> {
    endpoint(base_url, &[".well-known", "jwks.json"])
}

/// Append path segments to a base URL, percent-encoding each segment.
fn endpoint(base_url: &str, segments: &[&str]) -> Result<Url> {
    let invalid = |reason: &str| FetchError::InvalidUrl {
        url: base_url.to_string(),
        reason: reason.to_string(),
    };

    let mut url = Url::parse(base_url).map_err(|e| invalid(&e.to_string()))?;
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| invalid("url cannot be a base"))?;
        path.pop_if_empty().extend(segments);
    }
    Ok(url)
}

/// An in-memory gateway for testing.
///
/// Bundles are keyed by trace id regardless of base URL. Anything not
/// published answers like a gateway 404.
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    /// A request seen by the memory gateway.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct RecordedRequest {
        pub base_url: String,
        pub path: String,
    }

    /// In-memory gateway implementation.
    #[derive(Default)]
    pub struct MemoryGateway {
        bundles: RwLock<HashMap<String, BundleResponse>>,
        key_set: RwLock<Option<KeySet>>,
        requests: RwLock<Vec<RecordedRequest>>,
    }

    impl MemoryGateway {
        /// Create an empty gateway.
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// Publish a bundle document under a trace id.
        pub async fn put_bundle(
            &self,
            trace_id: &str,
            document: &serde_json::Value,
            headers: BundleHeaders,
        ) {
            let body = Bytes::from(document.to_string());
            self.put_raw_bundle(trace_id, body, headers).await;
        }

        /// Publish a raw bundle body, which need not be valid JSON.
        pub async fn put_raw_bundle(&self, trace_id: &str, body: Bytes, headers: BundleHeaders) {
            self.bundles
                .write()
                .await
                .insert(trace_id.to_string(), BundleResponse { body, headers });
        }

        /// Publish the key-set.
        pub async fn put_key_set(&self, key_set: KeySet) {
            *self.key_set.write().await = Some(key_set);
        }

        /// Withdraw the key-set so fetching it fails.
        pub async fn remove_key_set(&self) {
            *self.key_set.write().await = None;
        }

        /// Requests served so far, in arrival order.
        pub async fn requests(&self) -> Vec<RecordedRequest> {
            self.requests.read().await.clone()
        }

        async fn record(&self, base_url: &str, path: String) {
            self.requests.write().await.push(RecordedRequest {
                base_url: base_url.to_string(),
                path,
            });
        }
    }

    #[async_trait]
    impl Gateway for MemoryGateway {
        async fn fetch_bundle(&self, base_url: &str, trace_id: &str) -> Result<BundleResponse> {
            let url = bundle_url(base_url, trace_id)?;
            self.record(base_url, url.path().to_string()).await;

            self.bundles
                .read()
                .await
                .get(trace_id)
                .cloned()
                .ok_or_else(|| FetchError::Status {
                    url: url.to_string(),
                    status: 404,
                })
        }

        async fn fetch_key_set(&self, base_url: &str) -> Result<KeySet> {
            let url = key_set_url(base_url)?;
            self.record(base_url, url.path().to_string()).await;

            self.key_set
                .read()
                .await
                .clone()
                .ok_or_else(|| FetchError::Status {
                    url: url.to_string(),
                    status: 404,
                })
        }
    }
}
