//! Policy decisions embedded in receipts, flattened and classified.

use serde::{Deserialize, Serialize};

use crate::bundle::Bundle;
use crate::receipt::{Decision, Member, PolicyBlock};

/// Outcomes that do not count as a breach.
pub const ALLOW_OUTCOMES: [&str; 3] = ["allow", "pass", "ok"];

/// Policy summary of one bundle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyReport {
    pub trace_id: Option<String>,
    /// Engine names, de-duplicated, in first-seen order.
    pub engines: Vec<String>,
    /// Every decision across the chain, in chain order.
    pub decisions: Vec<Decision>,
    /// Decisions whose outcome is present and not an allow-synonym.
    pub breaches: Vec<Decision>,
    pub breach_count: usize,
}

/// Whether a decision is a breach.
pub fn is_breach(decision: &Decision) -> bool {
    decision
        .outcome()
        .is_some_and(|outcome| !ALLOW_OUTCOMES.contains(&outcome.as_str()))
}

/// Extract the policy report of a bundle.
///
/// `trace_id` is the requested trace; when `None` the bundle's own id is used.
pub fn extract_policy(bundle: &Bundle, trace_id: Option<&str>) -> PolicyReport {
    let mut report = PolicyReport {
        trace_id: trace_id
            .map(str::to_string)
            .or_else(|| bundle.trace_id.clone()),
        ..PolicyReport::default()
    };

    for receipt in &bundle.chain {
        let normalized = &receipt.normalized;
        let empty = PolicyBlock::default();
        let policy = match &normalized.policy {
            Member::Read(block) => block,
            Member::Empty => &empty,
            // A policy member of any other shape contributes nothing.
            Member::Other(_) => continue,
        };

        if let Some(engine) = policy.engine_name() {
            if !report.engines.iter().any(|known| known == engine) {
                report.engines.push(engine.to_string());
            }
        }

        // Only an empty `decisions` falls through to the sibling field.
        let decisions = match &policy.decisions {
            Member::Empty => normalized.policy_decisions.read(),
            other => other.read(),
        };

        for decision in decisions.into_iter().flatten() {
            if is_breach(decision) {
                report.breaches.push(decision.clone());
            }
            report.decisions.push(decision.clone());
        }
    }

    report.breach_count = report.breaches.len();
    report
}
