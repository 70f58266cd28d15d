//! # OPP Exporter
//!
//! Read-only query service over receipt bundles served by an OPP gateway.
//!
//! ## Overview
//!
//! Each query fetches a trace's bundle from the gateway and derives one view:
//!
//! - **Graph**: nodes and edges of the receipt chain
//! - **Validate**: chain integrity, content id match, detached signature
//! - **Passport**: dataset merkle roots, safety flags, metrics
//! - **Policy**: policy engines, decisions, breaches
//!
//! A fetch failure is an error. A failed check is not: it is a report with a
//! `false` verdict, so callers can tell "could not validate" from
//! "validated and failed".
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use opp_exporter::{Exporter, ExporterConfig};
//! use opp_exporter::gateway::HttpGateway;
//!
//! async fn example() {
//!     let config = ExporterConfig::default();
//!     let gateway = HttpGateway::new(config.fetch_timeout).unwrap();
//!     let exporter = Exporter::new(Arc::new(gateway), config);
//!
//!     let report = exporter.validate("t1", None, None).await.unwrap();
//!     println!("ok={} chain_ok={}", report.ok, report.chain_ok);
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `opp_exporter::core` - Verification and aggregation primitives
//! - `opp_exporter::gateway` - Gateway clients

pub mod error;
pub mod exporter;
pub mod http;

pub use opp_exporter_core as core;
pub use opp_exporter_gateway as gateway;

pub use error::{ExportError, Result};
pub use exporter::{
    Exporter, ExporterConfig, GraphView, Health, ValidationReport, ENV_EXPORTER_ADDR,
    ENV_FETCH_TIMEOUT_SECS, ENV_GATEWAY_URL,
};
pub use http::{router, TraceQuery};
