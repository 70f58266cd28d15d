//! Lineage passport: dataset roots, safety flags, and metrics for a trace.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::bundle::Bundle;
use crate::types::ContentId;

/// Aggregated lineage summary of one bundle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Passport {
    pub trace_id: Option<String>,
    /// One merkle root per dataset object, in receipt-then-object order.
    pub dataset_roots: Vec<ContentId>,
    /// Each flag OR-ed across every receipt that names it.
    pub safety_flags: BTreeMap<String, bool>,
    /// Shallow merge of per-receipt metrics; later receipts win.
    pub metrics: Map<String, Value>,
}

/// Aggregate a bundle into a passport.
///
/// `trace_id` is the requested trace; when `None` the bundle's own id is used.
pub fn to_passport(bundle: &Bundle, trace_id: Option<&str>) -> Passport {
    let mut passport = Passport {
        trace_id: trace_id
            .map(str::to_string)
            .or_else(|| bundle.trace_id.clone()),
        ..Passport::default()
    };

    for receipt in &bundle.chain {
        passport
            .dataset_roots
            .extend(receipt.dataset_objects().map(|ds| ds.merkle_root()));

        for (flag, value) in &receipt.normalized.safety {
            *passport.safety_flags.entry(flag.clone()).or_insert(false) |= *value;
        }

        for (name, value) in &receipt.normalized.metrics {
            passport.metrics.insert(name.clone(), value.clone());
        }
    }

    passport
}
