//! Detached signature verification over bundle content ids.
//!
//! The gateway has signed bundles under two conventions over time:
//!
//! 1. `"{cid}|{trace_id}|{ts}"` (current)
//! 2. `"{cid}"` (legacy)
//!
//! Verification builds an explicit, ordered list of (key, message) candidates
//! and stops at the first one that verifies. A key or signature that fails to
//! decode is a non-match for that candidate, never an error.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::crypto::{Ed25519PublicKey, Ed25519Signature};
use crate::receipt::{lenient, lenient_seq};
use crate::types::ContentId;

/// A published key-set document (`/.well-known/jwks.json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeySet {
    /// Keys in publication order. Entries that are not objects are dropped.
    #[serde(default, deserialize_with = "lenient_keys")]
    pub keys: Vec<PublicJwk>,
}

fn lenient_keys<'de, D>(deserializer: D) -> Result<Vec<PublicJwk>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(lenient_seq(deserializer)?.unwrap_or_default())
}

/// One public key entry of a key-set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublicJwk {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Base64url raw public key bytes.
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PublicJwk {
    /// Decode the `x` member.
    pub fn public_key(&self) -> Option<Ed25519PublicKey> {
        self.x
            .as_deref()
            .and_then(|x| Ed25519PublicKey::from_b64u(x).ok())
    }
}

impl KeySet {
    /// Candidate keys in order: all keys, or only those whose `kid` matches.
    pub fn candidates<'a>(&'a self, kid: Option<&'a str>) -> impl Iterator<Item = &'a PublicJwk> {
        self.keys
            .iter()
            .filter(move |jwk| kid.map_or(true, |kid| jwk.kid.as_deref() == Some(kid)))
    }
}

/// Which signed-message convention verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageVariant {
    /// `"{cid}|{trace_id}|{ts}"`
    #[serde(rename = "cid|trace|ts")]
    CidTraceTs,
    /// `"{cid}"`
    #[serde(rename = "cid")]
    Cid,
}

impl MessageVariant {
    /// Variants in the order they are tried.
    pub const PRIORITY: [MessageVariant; 2] = [MessageVariant::CidTraceTs, MessageVariant::Cid];

    /// Wire name of the variant.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MessageVariant::CidTraceTs => "cid|trace|ts",
            MessageVariant::Cid => "cid",
        }
    }

    /// Build the signed message, or `None` if the variant needs a timestamp
    /// and none is available.
    pub fn message(&self, cid: &ContentId, trace_id: &str, ts: Option<&str>) -> Option<Vec<u8>> {
        match self {
            MessageVariant::CidTraceTs => {
                ts.map(|ts| format!("{cid}|{trace_id}|{ts}").into_bytes())
            }
            MessageVariant::Cid => Some(cid.to_string().into_bytes()),
        }
    }
}

/// Inputs to a detached signature check.
#[derive(Debug, Clone, Copy)]
pub struct SignatureRequest<'a> {
    /// Base64url detached signature, if the gateway sent one.
    pub signature: Option<&'a str>,
    /// Locally recomputed bundle content id.
    pub bundle_cid: &'a ContentId,
    pub trace_id: &'a str,
    /// Last receipt's timestamp, or the bundle-level one.
    pub timestamp: Option<&'a str>,
    /// Restrict candidates to this key id.
    pub kid: Option<&'a str>,
}

/// Outcome of a detached signature check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SignatureVerdict {
    pub verified: bool,
    /// The message convention that verified.
    pub variant: Option<MessageVariant>,
    /// The key id that verified.
    pub kid: Option<String>,
}

/// A single (key, message) attempt.
struct Candidate<'a> {
    jwk: &'a PublicJwk,
    variant: MessageVariant,
    message: &'a [u8],
}

/// Verify a detached signature against a key-set.
pub fn verify_detached(request: &SignatureRequest<'_>, keys: &KeySet) -> SignatureVerdict {
    let Some(signature) = request
        .signature
        .and_then(|s| Ed25519Signature::from_b64u(s).ok())
    else {
        return SignatureVerdict::default();
    };

    let messages: Vec<(MessageVariant, Vec<u8>)> = MessageVariant::PRIORITY
        .iter()
        .filter_map(|variant| {
            variant
                .message(request.bundle_cid, request.trace_id, request.timestamp)
                .map(|message| (*variant, message))
        })
        .collect();

    let candidates = keys.candidates(request.kid).flat_map(|jwk| {
        messages.iter().map(move |(variant, message)| Candidate {
            jwk,
            variant: *variant,
            message,
        })
    });

    for candidate in candidates {
        let Some(public_key) = candidate.jwk.public_key() else {
            continue;
        };
        if public_key.verify(candidate.message, &signature).is_ok() {
            return SignatureVerdict {
                verified: true,
                variant: Some(candidate.variant),
                kid: candidate.jwk.kid.clone(),
            };
        }
    }

    SignatureVerdict::default()
}
