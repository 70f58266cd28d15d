//! Test fixtures and helpers.
//!
//! Builders for receipt chains and bundles, plus a signer standing in for
//! the gateway's signing key.

use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;
use serde_json::{json, Map, Value};

use opp_exporter_core::{
    b64u_encode, content_id, ContentId, ExportedBundle, KeySet, MessageVariant, PublicJwk,
};
use opp_exporter_gateway::{BundleHeaders, MemoryGateway};

/// Trace id of [`two_step_chain`].
pub const TRACE_ID: &str = "t1";

/// A gateway signing key. Only test code ever signs.
pub struct TestSigner {
    pub kid: String,
    signing_key: SigningKey,
}

impl TestSigner {
    /// Create a signer with a random key.
    pub fn generate(kid: &str) -> Self {
        Self {
            kid: kid.to_string(),
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Create a signer with a deterministic key from seed.
    pub fn from_seed(kid: &str, seed: [u8; 32]) -> Self {
        Self {
            kid: kid.to_string(),
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    /// Base64url of the raw public key.
    pub fn public_x(&self) -> String {
        b64u_encode(self.signing_key.verifying_key().as_bytes())
    }

    /// Key-set entry for this signer.
    pub fn jwk(&self) -> PublicJwk {
        let mut extra = Map::new();
        extra.insert("kty".into(), json!("OKP"));
        extra.insert("crv".into(), json!("Ed25519"));
        PublicJwk {
            kid: Some(self.kid.clone()),
            x: Some(self.public_x()),
            extra,
        }
    }

    /// Base64url detached signature over `message`.
    pub fn sign(&self, message: &[u8]) -> String {
        b64u_encode(&self.signing_key.sign(message).to_bytes())
    }

    /// Sign a bundle content id under one message convention.
    ///
    /// Returns `None` when the convention needs a timestamp and there is none.
    pub fn sign_bundle(
        &self,
        cid: &ContentId,
        trace_id: &str,
        ts: Option<&str>,
        variant: MessageVariant,
    ) -> Option<String> {
        variant
            .message(cid, trace_id, ts)
            .map(|message| self.sign(&message))
    }
}

/// A key-set publishing the given signers in order.
pub fn key_set(signers: &[&TestSigner]) -> KeySet {
    KeySet {
        keys: signers.iter().map(|s| s.jwk()).collect(),
    }
}

/// Builder for a bundle whose receipts are hash-linked.
///
/// Each receipt's `receipt_hash` is the content id of its own body, and its
/// `prev_receipt_hash` is the previous receipt's hash.
#[derive(Debug, Clone)]
pub struct ChainFixture {
    trace_id: String,
    ts: Option<String>,
    receipts: Vec<Value>,
}

impl ChainFixture {
    /// Start an empty chain.
    pub fn new(trace_id: &str) -> Self {
        Self {
            trace_id: trace_id.to_string(),
            ts: None,
            receipts: Vec::new(),
        }
    }

    /// Set the bundle-level timestamp.
    pub fn with_bundle_ts(mut self, ts: &str) -> Self {
        self.ts = Some(ts.to_string());
        self
    }

    /// Append a receipt linked to the current tail.
    pub fn receipt(mut self, ts: &str, normalized: Value) -> Self {
        let mut receipt = json!({ "ts": ts, "normalized": normalized });
        if let Some(prev) = self.last_hash() {
            receipt["prev_receipt_hash"] = Value::String(prev);
        }
        let hash = content_id(&receipt).to_string();
        receipt["receipt_hash"] = Value::String(hash);
        self.receipts.push(receipt);
        self
    }

    /// Append a receipt as given, without linking.
    pub fn raw_receipt(mut self, receipt: Value) -> Self {
        self.receipts.push(receipt);
        self
    }

    /// Overwrite the `prev_receipt_hash` of the receipt at `index`.
    pub fn relink(mut self, index: usize, prev: &str) -> Self {
        if let Some(receipt) = self.receipts.get_mut(index) {
            receipt["prev_receipt_hash"] = Value::String(prev.to_string());
        }
        self
    }

    /// The trace id.
    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// `receipt_hash` of each receipt, in chain order.
    pub fn hashes(&self) -> Vec<String> {
        self.receipts
            .iter()
            .filter_map(|r| r["receipt_hash"].as_str().map(str::to_string))
            .collect()
    }

    fn last_hash(&self) -> Option<String> {
        self.receipts
            .last()
            .and_then(|r| r["receipt_hash"].as_str())
            .map(str::to_string)
    }

    /// The bundle document as the gateway would serve it.
    pub fn document(&self) -> Value {
        let mut document = json!({
            "trace_id": self.trace_id,
            "chain": self.receipts,
        });
        if let Some(ts) = &self.ts {
            document["ts"] = Value::String(ts.clone());
        }
        document
    }

    /// Content id of the whole document.
    pub fn bundle_cid(&self) -> ContentId {
        content_id(&self.document())
    }

    /// The timestamp a signer binds into the `cid|trace|ts` message.
    pub fn signing_ts(&self) -> Option<String> {
        ExportedBundle::from_value(self.document())
            .ok()
            .and_then(|b| b.bundle().representative_ts().map(str::to_string))
    }

    /// Headers advertising the content id, unsigned.
    pub fn unsigned_headers(&self) -> BundleHeaders {
        BundleHeaders {
            cid: Some(self.bundle_cid().to_string()),
            signature: None,
            kid: None,
        }
    }

    /// Headers advertising the content id, signed under `variant`.
    pub fn signed_headers(&self, signer: &TestSigner, variant: MessageVariant) -> BundleHeaders {
        let cid = self.bundle_cid();
        let ts = self.signing_ts();
        BundleHeaders {
            cid: Some(cid.to_string()),
            signature: signer.sign_bundle(&cid, &self.trace_id, ts.as_deref(), variant),
            kid: Some(signer.kid.clone()),
        }
    }

    /// Publish this bundle on a memory gateway.
    pub async fn publish(&self, gateway: &MemoryGateway, headers: BundleHeaders) {
        gateway
            .put_bundle(&self.trace_id, &self.document(), headers)
            .await;
    }
}

/// The two-step `ingest.v1` then `train.v1` chain with literal hashes.
pub fn two_step_chain() -> Value {
    json!({
        "trace_id": TRACE_ID,
        "chain": [
            {
                "receipt_hash": "r1",
                "ts": "2024-01-01T00:00:00Z",
                "normalized": {"step": "ingest.v1"}
            },
            {
                "receipt_hash": "r2",
                "prev_receipt_hash": "r1",
                "ts": "2024-01-01T00:00:10Z",
                "normalized": {"step": "train.v1"}
            }
        ]
    })
}

/// A chain exercising datasets, safety flags, metrics, and policy.
pub fn lineage_chain(trace_id: &str) -> ChainFixture {
    ChainFixture::new(trace_id)
        .receipt(
            "2024-01-01T00:00:00Z",
            json!({
                "step": "ingest.v1",
                "dataset": {"chunks": [{"cid": "c1", "size": 10}, {"cid": "c2", "size": 20}]},
                "safety": {"nsfw": false, "pii": false},
                "metrics": {"rows": 100, "loss": 0.9},
                "policy": {
                    "engine": "opa",
                    "decisions": [{"rule": "deny", "outcome": "deny"}]
                }
            }),
        )
        .receipt(
            "2024-01-01T00:00:10Z",
            json!({
                "step": "train.v1",
                "datasets": [{"chunks": [{"cid": "c3", "size": 5}, {"cid": "c4", "size": 5}]}],
                "safety": {"nsfw": true},
                "metrics": {"loss": 0.1}
            }),
        )
        .receipt(
            "2024-01-01T00:00:20Z",
            json!({
                "step": "eval.v1",
                "policy_decisions": [{"rule": "license", "result": "PASS"}]
            }),
        )
}
