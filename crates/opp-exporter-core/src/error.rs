//! Error types for the exporter core.

use thiserror::Error;

/// Core errors that can occur while decoding or verifying bundle data.
///
/// Verification mismatches (a broken link, a differing content id, a
/// signature that does not verify against any candidate) are not errors;
/// they are reported as verdict booleans.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("malformed content id: {0}")]
    MalformedContentId(String),

    #[error("malformed bundle: {0}")]
    MalformedBundle(String),

    #[error("encoding error: {0}")]
    Encoding(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
