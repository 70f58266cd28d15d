//! Error types for the exporter service.

use opp_exporter_core::CoreError;
use opp_exporter_gateway::FetchError;
use thiserror::Error;

/// Errors that can occur while answering a query.
///
/// These are all "could not validate" conditions. A bundle that was fetched
/// and parsed but fails a check is not an error; it is a report with a
/// `false` verdict.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The bundle or key-set could not be fetched.
    #[error("gateway fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// The fetched bundle is not a JSON object of the expected shape.
    #[error("malformed bundle: {0}")]
    MalformedBundle(#[from] CoreError),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for exporter operations.
pub type Result<T> = std::result::Result<T, ExportError>;
