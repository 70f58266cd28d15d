//! HTTP gateway backed by reqwest.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use tracing::{debug, warn};

use opp_exporter_core::KeySet;

use crate::error::{FetchError, Result};
use crate::gateway::{bundle_url, key_set_url, BundleHeaders, BundleResponse, Gateway};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Fetches bundles and key-sets over HTTP.
///
/// Cloning is cheap; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
}

impl HttpGateway {
    /// Create a gateway client with a per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport {
                url: String::new(),
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }

    async fn get(&self, url: Url) -> Result<Response> {
        debug!(%url, "fetching from gateway");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "gateway returned error status");
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

fn transport_error(url: &Url, err: reqwest::Error) -> FetchError {
    let url = url.to_string();
    if err.is_timeout() {
        warn!(%url, "gateway request timed out");
        FetchError::Timeout { url }
    } else {
        warn!(%url, error = %err, "gateway request failed");
        FetchError::Transport {
            url,
            message: err.to_string(),
        }
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn fetch_bundle(&self, base_url: &str, trace_id: &str) -> Result<BundleResponse> {
        let url = bundle_url(base_url, trace_id)?;
        let response = self.get(url.clone()).await?;
        let headers = BundleHeaders::from_header_map(response.headers());

        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(&url, e))?;

        debug!(
            %url,
            bytes = body.len(),
            signed = headers.signature.is_some(),
            "fetched bundle"
        );
        Ok(BundleResponse { body, headers })
    }

    async fn fetch_key_set(&self, base_url: &str) -> Result<KeySet> {
        let url = key_set_url(base_url)?;
        let response = self.get(url.clone()).await?;

        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(&url, e))?;

        let key_set: KeySet = serde_json::from_slice(&body).map_err(|e| {
            warn!(%url, error = %e, "could not decode key-set");
            FetchError::Decode {
                url: url.to_string(),
                message: e.to_string(),
            }
        })?;

        debug!(%url, keys = key_set.keys.len(), "fetched key-set");
        Ok(key_set)
    }
}
