//! Golden test vectors for deterministic verification.
//!
//! These pin the content id, merkle, and signature conventions bit for bit.
//! Any exporter reading the same gateway must reproduce them exactly.

use serde_json::Value;

use opp_exporter_core::{
    content_id, merkle_root, ContentId, Ed25519PublicKey, Ed25519Signature, MessageVariant,
};

use crate::fixtures::{two_step_chain, TestSigner, TRACE_ID};

/// A merkle root vector.
#[derive(Debug, Clone)]
pub struct MerkleVector {
    pub name: &'static str,
    pub chunks: &'static [&'static str],
    pub expected_root: &'static str,
}

/// A content id vector.
#[derive(Debug, Clone)]
pub struct CidVector {
    pub name: &'static str,
    /// JSON text of the value.
    pub json: &'static str,
    pub expected_cid: &'static str,
}

/// A detached signature vector over [`two_step_chain`].
#[derive(Debug, Clone)]
pub struct SignatureVector {
    pub name: &'static str,
    /// Ed25519 seed (hex).
    pub seed_hex: &'static str,
    pub variant: MessageVariant,
    pub expected_public_x: &'static str,
    pub expected_signature: &'static str,
}

/// Content id of [`two_step_chain`].
pub const TWO_STEP_CHAIN_CID: &str =
    "sha256:c8017ce5a0e2f1d9d5a012a738fb7e6981e0d57ef3ce78c70ea363e307d90e85";

/// Get all merkle vectors.
pub fn merkle_vectors() -> Vec<MerkleVector> {
    vec![
        MerkleVector {
            name: "empty",
            chunks: &[],
            expected_root: "sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
        },
        MerkleVector {
            name: "single leaf",
            chunks: &["a"],
            expected_root: "sha256:ca978112ca1bbdcafac231b39a23dc4da786eff8147c4e72b9807785afee48bb",
        },
        MerkleVector {
            name: "pair",
            chunks: &["a", "b"],
            expected_root: "sha256:e5a01fee14e0ed5c48714f22180f25ad8365b53f9779f79dc4a3d7e93963f94a",
        },
        MerkleVector {
            name: "odd layer duplicates tail",
            chunks: &["a", "b", "c"],
            expected_root: "sha256:d31a37ef6ac14a2db1470c4316beb5592e6afd4465022339adafda76a18ffabe",
        },
        MerkleVector {
            name: "chunk cids",
            chunks: &["c1", "c2"],
            expected_root: "sha256:82155538158a8e329752cd7f8a25d5d790f723ac1cca86612386deab4420369f",
        },
    ]
}

/// Get all content id vectors.
pub fn cid_vectors() -> Vec<CidVector> {
    vec![
        CidVector {
            name: "keys sorted",
            json: r#"{"b":2,"a":1}"#,
            expected_cid: "sha256:43258cff783fe7036d8a43033f830adfc60ec037382473548ac742b888292777",
        },
        CidVector {
            name: "nested with non-ascii",
            json: r#"{"z":{"y":[1,"é",null,true]},"a":"x"}"#,
            expected_cid: "sha256:b5e4fa410600ca8ee98251ff2d2f497ed01a5582dd2106cbb3462c56efff0713",
        },
        CidVector {
            name: "empty chain bundle",
            json: r#"{"trace_id":"t1","chain":[]}"#,
            expected_cid: "sha256:de844f5e505c0bd87c722652505c1397e0475e6078d8ceb27dcf77a9f8132da9",
        },
        CidVector {
            name: "17 significant digit float",
            json: r#"{"loss":0.00021659939713061338}"#,
            expected_cid: "sha256:72b665f6eb014d67378e7abb0bfb2f5ccbcb437248e6f6c6228444742a42df04",
        },
        CidVector {
            name: "small float in exponent form",
            json: r#"{"loss":9.014274576114836e-30}"#,
            expected_cid: "sha256:f4aae2ad3bb536d4c02200d9cb0e596c0bdda319225bd38dcbdf6d643df48fed",
        },
        CidVector {
            name: "float on a decimal tie",
            json: r#"{"loss":779539845543410.25}"#,
            expected_cid: "sha256:8ee7578ce7cb23826db37fdcc6d1601af87cfbac9cacdda5391682a85b34edc9",
        },
        CidVector {
            name: "integer above u64",
            json: r#"{"n":100000000000000000000}"#,
            expected_cid: "sha256:58d2d5b8dd4228ab5775ce84f996718fa19ed49872271e9649b70cebaca26a09",
        },
        CidVector {
            name: "negative big integer and exponent float",
            json: r#"{"n":-123456789012345678901234567890,"x":1E5}"#,
            expected_cid: "sha256:425211e715aa70a4e929039d58821ee6ff5a55d98b4c96555f7d6411b8eeefde",
        },
        CidVector {
            name: "float extremes",
            json: r#"{"loss":1.7976931348623157e308,"tiny":5e-324}"#,
            expected_cid: "sha256:388c443c529d51d073a01e0484a20d8a3d5a04c8e04ea429ebe2c38e03938f1b",
        },
    ]
}

/// Get all signature vectors.
pub fn signature_vectors() -> Vec<SignatureVector> {
    vec![
        SignatureVector {
            name: "cid|trace|ts",
            seed_hex: "4242424242424242424242424242424242424242424242424242424242424242",
            variant: MessageVariant::CidTraceTs,
            expected_public_x: "IVL40Zt5HSRFMkLhXy6rbLfP-ntqXtMAl5YOBpiB2xI",
            expected_signature: "-t1md0iOQ_gLFsnCTVse_dkkVxvLjszljk_t29QwAxNDORwOhaAxH3gsS4MaD4GwuyJOSLOuxduVUkiSwE_SDw",
        },
        SignatureVector {
            name: "cid",
            seed_hex: "4242424242424242424242424242424242424242424242424242424242424242",
            variant: MessageVariant::Cid,
            expected_public_x: "IVL40Zt5HSRFMkLhXy6rbLfP-ntqXtMAl5YOBpiB2xI",
            expected_signature: "-uoCW_zwfo-gV3Kmme6Es_-IOCQz8_0PfudHztIlJAb2gicTNXvsHX1BzqG7EMw6l92WAxBy_WftEB8wyR2WDg",
        },
    ]
}

impl SignatureVector {
    /// Signer for this vector's seed, or `None` if the seed is not 32 hex bytes.
    pub fn signer(&self) -> Option<TestSigner> {
        let seed: [u8; 32] = hex::decode(self.seed_hex).ok()?.try_into().ok()?;
        Some(TestSigner::from_seed("golden", seed))
    }

    /// The signed message for this vector.
    pub fn message(&self) -> Option<Vec<u8>> {
        let cid = ContentId::parse(TWO_STEP_CHAIN_CID).ok()?;
        self.variant
            .message(&cid, TRACE_ID, Some("2024-01-01T00:00:10Z"))
    }
}

/// Check every vector, reporting `(name, matches, actual)`.
///
/// Call this to verify your implementation matches the reference.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    let mut results = Vec::new();

    for v in merkle_vectors() {
        let root = merkle_root(v.chunks).to_string();
        results.push((format!("merkle: {}", v.name), root == v.expected_root, root));
    }

    for v in cid_vectors() {
        let actual = serde_json::from_str::<Value>(v.json)
            .map(|value| content_id(&value).to_string())
            .unwrap_or_else(|e| format!("invalid json: {e}"));
        results.push((format!("cid: {}", v.name), actual == v.expected_cid, actual));
    }

    let chain_cid = content_id(&two_step_chain()).to_string();
    results.push((
        "cid: two-step chain".to_string(),
        chain_cid == TWO_STEP_CHAIN_CID,
        chain_cid,
    ));

    for v in signature_vectors() {
        let verified = verify_signature_vector(&v);
        results.push((
            format!("signature: {}", v.name),
            verified,
            v.expected_signature.to_string(),
        ));
    }

    results
}

fn verify_signature_vector(v: &SignatureVector) -> bool {
    let Some(message) = v.message() else {
        return false;
    };
    let key = Ed25519PublicKey::from_b64u(v.expected_public_x).ok();
    let signature = Ed25519Signature::from_b64u(v.expected_signature).ok();

    match (key, signature) {
        (Some(key), Some(signature)) => key.verify(&message, &signature).is_ok(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_vectors_match() {
        for (name, matches, actual) in verify_all_vectors() {
            assert!(matches, "vector '{name}' mismatched: got {actual}");
        }
    }

    #[test]
    fn test_signing_is_deterministic() {
        for v in signature_vectors() {
            let signer = v.signer().unwrap();
            assert_eq!(signer.public_x(), v.expected_public_x);

            let message = v.message().unwrap();
            assert_eq!(signer.sign(&message), v.expected_signature, "{}", v.name);
        }
    }
}
