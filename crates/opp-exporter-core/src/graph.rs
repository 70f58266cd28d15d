//! Provenance graph: one node per receipt, one edge per consecutive pair.
//!
//! Edges follow chain order, not verified hash links. When `chain_ok` is
//! false an edge may join two receipts that do not actually link; callers
//! that need causal edges must check the chain first.

use serde::{Deserialize, Serialize};

use crate::receipt::Receipt;

/// A receipt in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: Option<String>,
    pub ts: Option<String>,
    pub step: Option<String>,
}

/// A consecutive pair in chain order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Node/edge view of a chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Graph {
    /// Number of nodes.
    pub fn count(&self) -> usize {
        self.nodes.len()
    }
}

/// Build the graph of a chain.
pub fn build_graph(chain: &[Receipt]) -> Graph {
    let nodes = chain
        .iter()
        .map(|r| Node {
            id: r.receipt_hash.clone(),
            ts: r.ts.clone(),
            step: r.normalized.step.clone(),
        })
        .collect();

    let edges = chain
        .windows(2)
        .map(|pair| Edge {
            from: pair[0].receipt_hash.clone(),
            to: pair[1].receipt_hash.clone(),
        })
        .collect();

    Graph { nodes, edges }
}
