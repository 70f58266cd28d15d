//! Receipts: one recorded pipeline step, linked to its predecessor by hash.
//!
//! The `normalized` payload is open-ended. Fields the engine reads are typed;
//! everything else lands in an `extra` passthrough map and is never examined.
//! Known fields with an unexpected shape decode as absent instead of failing
//! the whole bundle.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::merkle::merkle_root;
use crate::types::ContentId;

/// One receipt in an exported chain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    /// Content id of this receipt.
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub receipt_hash: Option<String>,

    /// Hash of the previous receipt. Absent only at the head of a chain.
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub prev_receipt_hash: Option<String>,

    /// ISO-8601 timestamp.
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub ts: Option<String>,

    #[serde(default, deserialize_with = "lenient_or_default")]
    pub normalized: Normalized,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Receipt {
    /// Whether this receipt's back-link names `prev`.
    ///
    /// Both hashes must be present; two missing hashes do not link.
    pub fn links_to(&self, prev: &Receipt) -> bool {
        match (&self.prev_receipt_hash, &prev.receipt_hash) {
            (Some(link), Some(hash)) => link == hash,
            _ => false,
        }
    }

    /// Every dataset object on this receipt: `dataset` first, then `datasets`.
    pub fn dataset_objects(&self) -> impl Iterator<Item = &DatasetRef> {
        self.normalized
            .dataset
            .iter()
            .chain(self.normalized.datasets.iter().flatten())
    }
}

/// The structured payload of a receipt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Normalized {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub dataset: Option<DatasetRef>,

    #[serde(default, deserialize_with = "lenient_seq", skip_serializing_if = "Option::is_none")]
    pub datasets: Option<Vec<DatasetRef>>,

    /// Safety flag name to value. Non-boolean entries are dropped.
    #[serde(default, deserialize_with = "bool_flags", skip_serializing_if = "BTreeMap::is_empty")]
    pub safety: BTreeMap<String, bool>,

    #[serde(default, deserialize_with = "lenient_or_default", skip_serializing_if = "Map::is_empty")]
    pub metrics: Map<String, Value>,

    #[serde(default, deserialize_with = "member", skip_serializing_if = "Member::is_empty")]
    pub policy: Member<PolicyBlock>,

    /// Decisions recorded beside, rather than inside, the policy block.
    #[serde(default, deserialize_with = "member_seq", skip_serializing_if = "Member::is_empty")]
    pub policy_decisions: Member<Vec<Decision>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A dataset touched by a step, described by its content chunks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetRef {
    #[serde(default, deserialize_with = "lenient_seq", skip_serializing_if = "Option::is_none")]
    pub chunks: Option<Vec<ChunkRef>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DatasetRef {
    /// Chunk cids in list order. Chunks without a cid are skipped.
    pub fn chunk_cids(&self) -> impl Iterator<Item = &str> {
        self.chunks
            .iter()
            .flatten()
            .filter_map(|chunk| chunk.cid.as_deref())
    }

    /// Merkle root over the chunk cids as UTF-8 bytes.
    pub fn merkle_root(&self) -> ContentId {
        merkle_root(self.chunk_cids())
    }
}

/// One content chunk of a dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkRef {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub cid: Option<String>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The policy block of a receipt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyBlock {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,

    /// Older name for `engine`.
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub policy_engine: Option<String>,

    #[serde(default, deserialize_with = "member_seq", skip_serializing_if = "Member::is_empty")]
    pub decisions: Member<Vec<Decision>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PolicyBlock {
    /// `engine`, falling back to `policy_engine`. Empty names count as absent.
    pub fn engine_name(&self) -> Option<&str> {
        self.engine
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.policy_engine.as_deref().filter(|s| !s.is_empty()))
    }
}

/// A single policy decision, kept verbatim so reports echo every field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Decision(pub Map<String, Value>);

impl Decision {
    /// The lower-cased outcome: `outcome`, then `result`, then `decision`.
    ///
    /// Empty and non-string values fall through to the next field.
    pub fn outcome(&self) -> Option<String> {
        ["outcome", "result", "decision"]
            .iter()
            .filter_map(|key| self.0.get(*key).and_then(Value::as_str))
            .find(|s| !s.is_empty())
            .map(str::to_lowercase)
    }
}

/// A payload member whose emptiness and shape both matter to the reader.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Member<T> {
    /// Absent, or a value that reads as empty: `null`, `false`, zero, `""`,
    /// `[]` or `{}`.
    #[default]
    Empty,
    /// Present with the expected shape.
    Read(T),
    /// Present and non-empty, with some other shape.
    Other(Value),
}

impl<T> Member<T> {
    pub fn is_empty(&self) -> bool {
        matches!(self, Member::Empty)
    }

    /// The decoded value, if the member had the expected shape.
    pub fn read(&self) -> Option<&T> {
        match self {
            Member::Read(value) => Some(value),
            _ => None,
        }
    }
}

impl<T: Serialize> Serialize for Member<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Member::Empty => serializer.serialize_none(),
            Member::Read(value) => value.serialize(serializer),
            Member::Other(value) => value.serialize(serializer),
        }
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

fn member<'de, D, T>(deserializer: D) -> Result<Member<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if is_empty_value(&value) {
        return Ok(Member::Empty);
    }
    Ok(match serde_json::from_value(value.clone()) {
        Ok(decoded) => Member::Read(decoded),
        Err(_) => Member::Other(value),
    })
}

/// Like [`member`] for arrays, dropping elements that do not decode as `T`.
fn member_seq<'de, D, T>(deserializer: D) -> Result<Member<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if is_empty_value(&value) {
        return Ok(Member::Empty);
    }
    Ok(match value {
        Value::Array(items) => Member::Read(
            items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
        ),
        other => Member::Other(other),
    })
}

/// Decode a value as `T`, or `None` if it is absent or has the wrong shape.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

fn lenient_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(lenient(deserializer)?.unwrap_or_default())
}

/// Decode an array, dropping elements that do not decode as `T`.
pub(crate) fn lenient_seq<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Value::deserialize(deserializer)? {
        Value::Array(items) => Ok(Some(
            items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
        )),
        _ => Ok(None),
    }
}

fn bool_flags<'de, D>(deserializer: D) -> Result<BTreeMap<String, bool>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Object(map) => Ok(map
            .into_iter()
            .filter_map(|(name, value)| value.as_bool().map(|flag| (name, flag)))
            .collect()),
        _ => Ok(BTreeMap::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn receipt(value: Value) -> Receipt {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_known_fields_decode() {
        let r = receipt(json!({
            "receipt_hash": "r2",
            "prev_receipt_hash": "r1",
            "ts": "2024-01-01T00:00:10Z",
            "normalized": {
                "step": "train.v1",
                "dataset": {"chunks": [{"cid": "c1", "size": 10}]},
                "safety": {"nsfw": true},
                "metrics": {"loss": 0.12},
                "policy": {"engine": "opa", "decisions": [{"outcome": "deny"}]}
            }
        }));
        assert_eq!(r.receipt_hash.as_deref(), Some("r2"));
        assert_eq!(r.normalized.step.as_deref(), Some("train.v1"));
        assert_eq!(r.normalized.safety.get("nsfw"), Some(&true));
        assert_eq!(r.normalized.metrics.get("loss"), Some(&json!(0.12)));
        assert_eq!(r.dataset_objects().count(), 1);
        assert_eq!(r.normalized.policy.read().unwrap().engine_name(), Some("opa"));
    }

    #[test]
    fn test_unknown_fields_pass_through() {
        let r = receipt(json!({
            "receipt_hash": "r1",
            "trace_id": "t1",
            "normalized": {"step": "s", "phase": "end", "attrs": {"k": 1}}
        }));
        assert_eq!(r.extra.get("trace_id"), Some(&json!("t1")));
        assert_eq!(r.normalized.extra.get("phase"), Some(&json!("end")));
        assert_eq!(r.normalized.extra.get("attrs"), Some(&json!({"k": 1})));
    }

    #[test]
    fn test_malformed_optional_structures_degrade() {
        let r = receipt(json!({
            "receipt_hash": 42,
            "normalized": {
                "dataset": "not an object",
                "datasets": [{"chunks": [{"cid": "c1"}]}, 7],
                "safety": {"nsfw": "yes", "malware": false},
                "metrics": [1, 2],
                "policy": "opa"
            }
        }));
        assert_eq!(r.receipt_hash, None);
        assert!(r.normalized.dataset.is_none());
        assert_eq!(r.normalized.datasets.as_ref().map(Vec::len), Some(1));
        assert_eq!(r.normalized.safety.len(), 1);
        assert!(r.normalized.metrics.is_empty());
        assert_eq!(r.normalized.policy, Member::Other(json!("opa")));
    }

    #[test]
    fn test_member_emptiness() {
        for empty in [json!(null), json!(false), json!(0), json!(""), json!([]), json!({})] {
            let n: Normalized = serde_json::from_value(json!({"policy": empty.clone()})).unwrap();
            assert!(n.policy.is_empty(), "{empty}");
        }

        let n: Normalized = serde_json::from_value(json!({
            "policy": {"decisions": {"outcome": "deny"}},
            "policy_decisions": ["deny", {"outcome": "deny"}]
        }))
        .unwrap();
        let block = n.policy.read().unwrap();
        assert_eq!(block.decisions, Member::Other(json!({"outcome": "deny"})));
        assert_eq!(n.policy_decisions.read().map(Vec::len), Some(1));
    }

    #[test]
    fn test_missing_normalized_is_empty() {
        let r = receipt(json!({"receipt_hash": "r1"}));
        assert_eq!(r.normalized, Normalized::default());
        assert_eq!(r.dataset_objects().count(), 0);
    }

    #[test]
    fn test_links_to_requires_both_hashes() {
        let r1 = receipt(json!({"receipt_hash": "r1"}));
        let r2 = receipt(json!({"receipt_hash": "r2", "prev_receipt_hash": "r1"}));
        let orphan = receipt(json!({}));
        assert!(r2.links_to(&r1));
        assert!(!r1.links_to(&r2));
        assert!(!orphan.links_to(&orphan));
    }

    #[test]
    fn test_chunks_without_cid_are_skipped() {
        let ds: DatasetRef =
            serde_json::from_value(json!({"chunks": [{"cid": "a"}, {"size": 3}, {"cid": "b"}]}))
                .unwrap();
        assert_eq!(ds.chunk_cids().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(ds.merkle_root(), merkle_root(["a", "b"]));
    }

    #[test]
    fn test_decision_outcome_fallbacks() {
        let d = |v: Value| Decision(v.as_object().unwrap().clone());
        assert_eq!(d(json!({"outcome": "DENY"})).outcome().as_deref(), Some("deny"));
        assert_eq!(d(json!({"result": "Pass"})).outcome().as_deref(), Some("pass"));
        assert_eq!(d(json!({"outcome": "", "decision": "block"})).outcome().as_deref(), Some("block"));
        assert_eq!(d(json!({"outcome": true})).outcome(), None);
        assert_eq!(d(json!({"rule": "r"})).outcome(), None);
    }

    #[test]
    fn test_engine_name_fallback() {
        let p: PolicyBlock =
            serde_json::from_value(json!({"engine": "", "policy_engine": "cedar"})).unwrap();
        assert_eq!(p.engine_name(), Some("cedar"));
        assert_eq!(PolicyBlock::default().engine_name(), None);
    }
}
