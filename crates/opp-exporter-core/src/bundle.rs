//! Exported bundles: a trace id plus its ordered receipt chain.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::canonical::content_id;
use crate::error::{CoreError, Result};
use crate::receipt::Receipt;
use crate::types::ContentId;

/// Typed view of a bundle document.
///
/// `hops` is the legacy name of `chain`; it is used when `chain` is absent
/// or empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawBundle")]
pub struct Bundle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,

    /// Bundle-level timestamp, if the gateway sets one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ts: Option<String>,

    pub chain: Vec<Receipt>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Deserialize)]
struct RawBundle {
    #[serde(default)]
    trace_id: Option<Value>,
    #[serde(default)]
    ts: Option<Value>,
    #[serde(default)]
    chain: Option<Vec<Receipt>>,
    #[serde(default)]
    hops: Option<Vec<Receipt>>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<RawBundle> for Bundle {
    fn from(raw: RawBundle) -> Self {
        let chain = raw
            .chain
            .filter(|chain| !chain.is_empty())
            .or(raw.hops)
            .unwrap_or_default();
        let text = |v: Option<Value>| match v {
            Some(Value::String(s)) => Some(s),
            _ => None,
        };
        Self {
            trace_id: text(raw.trace_id),
            ts: text(raw.ts),
            chain,
            extra: raw.extra,
        }
    }
}

impl Bundle {
    /// The timestamp bound into signed messages: the last receipt's `ts`,
    /// falling back to the bundle-level `ts` when the chain has none.
    pub fn representative_ts(&self) -> Option<&str> {
        let present = |ts: &&str| !ts.is_empty();
        self.chain
            .last()
            .and_then(|r| r.ts.as_deref())
            .filter(present)
            .or_else(|| self.ts.as_deref().filter(present))
    }
}

/// A bundle as fetched: the exact JSON document plus its typed view.
///
/// The content id is always computed over `document`, the whole value the
/// gateway returned, never over a re-serialization of the typed view.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedBundle {
    document: Value,
    bundle: Bundle,
}

impl ExportedBundle {
    /// Decode a bundle document.
    pub fn from_value(document: Value) -> Result<Self> {
        if !document.is_object() {
            return Err(CoreError::MalformedBundle("expected a JSON object".into()));
        }
        let bundle = Bundle::deserialize(&document)
            .map_err(|e| CoreError::MalformedBundle(e.to_string()))?;
        Ok(Self { document, bundle })
    }

    /// Decode a bundle from raw response bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let document: Value =
            serde_json::from_slice(bytes).map_err(|e| CoreError::MalformedBundle(e.to_string()))?;
        Self::from_value(document)
    }

    /// The raw document.
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// The typed view.
    pub fn bundle(&self) -> &Bundle {
        &self.bundle
    }

    /// The ordered receipt chain.
    pub fn chain(&self) -> &[Receipt] {
        &self.bundle.chain
    }

    /// Content id over the entire document.
    pub fn content_id(&self) -> ContentId {
        content_id(&self.document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chain_field() {
        let b = ExportedBundle::from_value(json!({
            "trace_id": "t1",
            "chain": [{"receipt_hash": "r1"}, {"receipt_hash": "r2", "prev_receipt_hash": "r1"}]
        }))
        .unwrap();
        assert_eq!(b.bundle().trace_id.as_deref(), Some("t1"));
        assert_eq!(b.chain().len(), 2);
    }

    #[test]
    fn test_hops_alias() {
        let b = ExportedBundle::from_value(json!({
            "trace_id": "t1",
            "hops": [{"receipt_hash": "r1"}]
        }))
        .unwrap();
        assert_eq!(b.chain().len(), 1);

        let b = ExportedBundle::from_value(json!({
            "chain": [],
            "hops": [{"receipt_hash": "r1"}]
        }))
        .unwrap();
        assert_eq!(b.chain().len(), 1);
    }

    #[test]
    fn test_missing_chain_is_empty() {
        let b = ExportedBundle::from_value(json!({"trace_id": "t1"})).unwrap();
        assert!(b.chain().is_empty());
    }

    #[test]
    fn test_malformed_documents_rejected() {
        assert!(ExportedBundle::from_value(json!([1, 2])).is_err());
        assert!(ExportedBundle::from_value(json!({"chain": [1, 2]})).is_err());
        assert!(ExportedBundle::from_slice(b"not json").is_err());
    }

    #[test]
    fn test_content_id_covers_whole_document() {
        let doc = json!({"trace_id": "t1", "chain": []});
        let b = ExportedBundle::from_value(doc).unwrap();
        assert_eq!(
            b.content_id().to_string(),
            "sha256:de844f5e505c0bd87c722652505c1397e0475e6078d8ceb27dcf77a9f8132da9"
        );

        let with_extra =
            ExportedBundle::from_value(json!({"trace_id": "t1", "chain": [], "note": "x"})).unwrap();
        assert_ne!(b.content_id(), with_extra.content_id());
    }

    #[test]
    fn test_representative_ts() {
        let b = ExportedBundle::from_value(json!({
            "ts": "bundle-ts",
            "chain": [{"ts": "a"}, {"ts": "b"}]
        }))
        .unwrap();
        assert_eq!(b.bundle().representative_ts(), Some("b"));

        let empty = ExportedBundle::from_value(json!({"ts": "bundle-ts", "chain": []})).unwrap();
        assert_eq!(empty.bundle().representative_ts(), Some("bundle-ts"));

        let none = ExportedBundle::from_value(json!({"chain": []})).unwrap();
        assert_eq!(none.bundle().representative_ts(), None);
    }
}
