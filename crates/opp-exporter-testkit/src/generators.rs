//! Proptest generators for property-based testing.

use proptest::prelude::*;
use serde_json::{Map, Number, Value};

use crate::fixtures::ChainFixture;

/// Generate a JSON object key.
pub fn key() -> impl Strategy<Value = String> {
    "[a-z_][a-z0-9_]{0,7}".prop_map(String::from)
}

/// Generate an arbitrary JSON value, nested a few levels deep.
///
/// Numbers are integers; float formatting has its own unit tests.
pub fn json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| Value::Number(Number::from(n))),
        "\\PC{0,12}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map(key(), inner, 0..6)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

/// Generate a JSON object.
pub fn json_object() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map(key(), json_value(), 0..8).prop_map(|m| m.into_iter().collect())
}

/// Generate a chunk cid list.
pub fn chunk_cids(max_len: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("c[0-9a-f]{1,8}", 0..=max_len)
}

/// Generate an RFC 3339 timestamp in 2024.
pub fn timestamp() -> impl Strategy<Value = String> {
    (1u32..=12, 1u32..=28, 0u32..24, 0u32..60, 0u32..60)
        .prop_map(|(mo, d, h, mi, s)| format!("2024-{mo:02}-{d:02}T{h:02}:{mi:02}:{s:02}Z"))
}

/// Generate a `normalized` payload.
pub fn normalized() -> impl Strategy<Value = Value> {
    (
        "[a-z]{3,8}\\.v[0-9]",
        prop::option::of(chunk_cids(4)),
        prop::collection::btree_map("[a-z]{2,6}", any::<bool>(), 0..3),
        prop::collection::btree_map("[a-z]{2,6}", any::<i32>(), 0..3),
    )
        .prop_map(|(step, chunks, safety, metrics)| {
            let mut normalized = serde_json::json!({
                "step": step,
                "safety": safety,
                "metrics": metrics,
            });
            if let Some(chunks) = chunks {
                let chunks: Vec<Value> = chunks
                    .into_iter()
                    .map(|cid| serde_json::json!({ "cid": cid, "size": 1 }))
                    .collect();
                normalized["dataset"] = serde_json::json!({ "chunks": chunks });
            }
            normalized
        })
}

/// Parameters for generating a linked chain.
#[derive(Debug, Clone)]
pub struct ChainParams {
    pub trace_id: String,
    pub steps: Vec<(String, Value)>,
}

impl Arbitrary for ChainParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            "[a-z0-9-]{1,16}",
            prop::collection::vec((timestamp(), normalized()), 0..8),
        )
            .prop_map(|(trace_id, steps)| ChainParams { trace_id, steps })
            .boxed()
    }
}

/// Build a linked chain fixture from parameters.
pub fn chain_from_params(params: &ChainParams) -> ChainFixture {
    params
        .steps
        .iter()
        .fold(ChainFixture::new(&params.trace_id), |fixture, (ts, normalized)| {
            fixture.receipt(ts, normalized.clone())
        })
}
