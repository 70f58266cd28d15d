//! # OPP Exporter Core
//!
//! Pure verification and aggregation over exported receipt bundles.
//!
//! This crate contains no I/O, no storage, no networking. Every function is a
//! synchronous computation over an already-fetched bundle, so it is safe to
//! call from any number of request handlers at once.
//!
//! ## Key Types
//!
//! - [`ExportedBundle`] - A fetched bundle: the raw JSON document plus its typed view
//! - [`Receipt`] - One recorded pipeline step, linked to its predecessor by hash
//! - [`ContentId`] - `sha256:<hex>` content address of a canonical value
//! - [`ChainCheck`] / [`SignatureVerdict`] - Independent verification verdicts
//! - [`Graph`], [`Passport`], [`PolicyReport`] - Derived summaries
//!
//! ## Canonicalization
//!
//! Content ids are computed over sorted-key, whitespace-free JSON. See the
//! [`canonical`] module.

pub mod bundle;
pub mod canonical;
pub mod chain;
pub mod crypto;
pub mod error;
pub mod graph;
pub mod merkle;
pub mod passport;
pub mod policy;
pub mod receipt;
pub mod signature;
pub mod types;

pub use bundle::{Bundle, ExportedBundle};
pub use canonical::{canonical_value_bytes, content_id};
pub use chain::{check_chain, first_broken_link, ChainCheck};
pub use crypto::{b64u_decode, b64u_encode, Ed25519PublicKey, Ed25519Signature, Sha256Hash};
pub use error::{CoreError, Result};
pub use graph::{build_graph, Edge, Graph, Node};
pub use merkle::{merkle_root, EMPTY_MERKLE_ROOT};
pub use passport::{to_passport, Passport};
pub use policy::{extract_policy, is_breach, PolicyReport, ALLOW_OUTCOMES};
pub use receipt::{ChunkRef, DatasetRef, Decision, Member, Normalized, PolicyBlock, Receipt};
pub use signature::{
    verify_detached, KeySet, MessageVariant, PublicJwk, SignatureRequest, SignatureVerdict,
};
pub use types::ContentId;
