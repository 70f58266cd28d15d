//! Strong type definitions for the exporter core.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::crypto::Sha256Hash;
use crate::error::CoreError;

/// A content identifier: `"sha256:"` followed by 64 lowercase hex characters.
///
/// Both canonical-value ids and merkle roots use this form, so a root can be
/// compared against an advertised id as a plain string.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentId(Sha256Hash);

impl ContentId {
    /// The textual prefix of every content id.
    pub const PREFIX: &'static str = "sha256:";

    /// Wrap a digest.
    pub const fn from_digest(digest: Sha256Hash) -> Self {
        Self(digest)
    }

    /// The underlying digest.
    pub const fn digest(&self) -> &Sha256Hash {
        &self.0
    }

    /// Parse a `sha256:<hex>` string.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let hex = s
            .strip_prefix(Self::PREFIX)
            .ok_or_else(|| CoreError::MalformedContentId(s.to_string()))?;
        if hex.len() != 64 || hex.bytes().any(|b| b.is_ascii_uppercase()) {
            return Err(CoreError::MalformedContentId(s.to_string()));
        }
        Sha256Hash::from_hex(hex)
            .map(Self)
            .map_err(|_| CoreError::MalformedContentId(s.to_string()))
    }

    /// Whether this id equals an advertised id string, compared textually.
    pub fn matches(&self, advertised: &str) -> bool {
        self.to_string() == advertised
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::PREFIX, self.0.to_hex())
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({}...)", &self.0.to_hex()[..16])
    }
}

impl FromStr for ContentId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ContentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ContentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
