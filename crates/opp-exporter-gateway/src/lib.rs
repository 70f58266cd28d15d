//! # OPP Exporter Gateway
//!
//! Read-only access to a receipt gateway: exported bundles with their
//! verification headers, and the published key-set.
//!
//! ```text
//! GET {base}/v1/receipts/export/{trace_id}   -> bundle JSON + X-ODIN-* headers
//! GET {base}/.well-known/jwks.json           -> { "keys": [ { "kid", "x" } ] }
//! ```
//!
//! [`HttpGateway`] talks to a real gateway; [`MemoryGateway`] serves
//! published fixtures for tests.

pub mod error;
pub mod gateway;
pub mod http;

pub use error::{FetchError, Result};
pub use gateway::{
    bundle_url, key_set_url, memory::MemoryGateway, memory::RecordedRequest, BundleHeaders,
    BundleResponse, Gateway, HEADER_BUNDLE_CID, HEADER_KID, HEADER_RESPONSE_CID, HEADER_SIGNATURE,
};
pub use http::{HttpGateway, DEFAULT_TIMEOUT};
