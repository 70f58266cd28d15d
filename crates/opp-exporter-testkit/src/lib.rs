//! # OPP Exporter Testkit
//!
//! Testing utilities for the OPP exporter.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Content ids, merkle roots, and signatures pinned bit for bit
//! - **Generators**: Proptest strategies for JSON values and linked chains
//! - **Fixtures**: Chain builders, a test signer, and gateway publishing helpers
//!
//! ## Golden Vectors
//!
//! ```rust
//! use opp_exporter_testkit::vectors::verify_all_vectors;
//!
//! for (name, matches, actual) in verify_all_vectors() {
//!     assert!(matches, "{name}: {actual}");
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use opp_exporter_core::MessageVariant;
//! use opp_exporter_testkit::fixtures::{lineage_chain, TestSigner};
//!
//! let signer = TestSigner::from_seed("k1", [1; 32]);
//! let fixture = lineage_chain("t1");
//! let headers = fixture.signed_headers(&signer, MessageVariant::CidTraceTs);
//! assert!(headers.signature.is_some());
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{key_set, lineage_chain, two_step_chain, ChainFixture, TestSigner, TRACE_ID};
pub use generators::{chain_from_params, ChainParams};
pub use vectors::{
    cid_vectors, merkle_vectors, signature_vectors, verify_all_vectors, CidVector, MerkleVector,
    SignatureVector, TWO_STEP_CHAIN_CID,
};
