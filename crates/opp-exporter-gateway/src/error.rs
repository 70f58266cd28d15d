//! Error types for gateway fetches.

use thiserror::Error;

/// Errors that can occur while fetching from the receipt gateway.
///
/// Every variant is a "fetch failed" condition: the caller could not obtain
/// the data needed to validate. None of them is retried internally.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The gateway base URL could not be turned into an endpoint URL.
    #[error("invalid gateway url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The request did not complete within the configured timeout.
    #[error("timed out fetching {url}")]
    Timeout { url: String },

    /// The gateway answered with a non-success status.
    #[error("gateway returned {status} for {url}")]
    Status { url: String, status: u16 },

    /// Connection or protocol failure.
    #[error("transport error fetching {url}: {message}")]
    Transport { url: String, message: String },

    /// The key-set document could not be decoded.
    #[error("could not decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl FetchError {
    /// HTTP status, when the gateway sent one.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, FetchError>;
