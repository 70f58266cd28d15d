//! Merkle roots over ordered chunk sequences.
//!
//! The scheme is fixed for interoperability with existing passports:
//!
//! ```text
//! layer0[i]   = SHA-256(chunk[i])
//! layer(n+1)  = SHA-256(left || right) for adjacent pairs, left to right
//!               an odd trailing digest is paired with itself
//! root        = "sha256:" + hex(final digest)
//! ```
//!
//! Concatenation is over raw 32-byte digests, not their hex text. An empty
//! sequence has the fixed root [`EMPTY_MERKLE_ROOT`].

use crate::crypto::Sha256Hash;
use crate::types::ContentId;

/// Root of an empty chunk sequence: the SHA-256 of the empty byte string.
pub const EMPTY_MERKLE_ROOT: &str =
    "sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Digest behind [`EMPTY_MERKLE_ROOT`].
const EMPTY_DIGEST: [u8; 32] = [
    0xe3, 0xb0, 0xc4, 0x42, 0x98, 0xfc, 0x1c, 0x14, 0x9a, 0xfb, 0xf4, 0xc8, 0x99, 0x6f, 0xb9,
    0x24, 0x27, 0xae, 0x41, 0xe4, 0x64, 0x9b, 0x93, 0x4c, 0xa4, 0x95, 0x99, 0x1b, 0x78, 0x52,
    0xb8, 0x55,
];

/// Compute the merkle root of an ordered chunk sequence.
pub fn merkle_root<I, C>(chunks: I) -> ContentId
where
    I: IntoIterator<Item = C>,
    C: AsRef<[u8]>,
{
    let mut layer: Vec<Sha256Hash> = chunks
        .into_iter()
        .map(|chunk| Sha256Hash::hash(chunk.as_ref()))
        .collect();

    if layer.is_empty() {
        return ContentId::from_digest(Sha256Hash::from_bytes(EMPTY_DIGEST));
    }

    while layer.len() > 1 {
        layer = layer
            .chunks(2)
            .map(|pair| {
                let left = &pair[0];
                let right = pair.get(1).unwrap_or(left);
                Sha256Hash::hash_pair(left, right)
            })
            .collect();
    }

    ContentId::from_digest(layer[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_root_is_pinned_sentinel() {
        let root = merkle_root(Vec::<Vec<u8>>::new());
        assert_eq!(root.to_string(), EMPTY_MERKLE_ROOT);
        assert_eq!(*root.digest(), Sha256Hash::hash(b""));
    }

    #[test]
    fn test_single_chunk_is_leaf_digest() {
        assert_eq!(
            merkle_root(["a"]).to_string(),
            "sha256:ca978112ca1bbdcafac231b39a23dc4da786eff8147c4e72b9807785afee48bb"
        );
    }

    #[test]
    fn test_known_roots() {
        assert_eq!(
            merkle_root(["a", "b"]).to_string(),
            "sha256:e5a01fee14e0ed5c48714f22180f25ad8365b53f9779f79dc4a3d7e93963f94a"
        );
        // Odd layer: "c" pairs with itself.
        assert_eq!(
            merkle_root(["a", "b", "c"]).to_string(),
            "sha256:d31a37ef6ac14a2db1470c4316beb5592e6afd4465022339adafda76a18ffabe"
        );
    }

    #[test]
    fn test_deterministic_and_well_formed() {
        let r1 = merkle_root(["a", "b", "c"]).to_string();
        let r2 = merkle_root(["a", "b", "c"]).to_string();
        assert_eq!(r1, r2);
        assert_eq!(r1.len(), 71);
        assert!(r1.starts_with("sha256:"));
    }

    #[test]
    fn test_order_sensitive() {
        assert_ne!(merkle_root(["x", "y"]), merkle_root(["y", "x"]));
    }

    #[test]
    fn test_odd_duplication_matches_explicit_pair() {
        let a = Sha256Hash::hash(b"a");
        let b = Sha256Hash::hash(b"b");
        let c = Sha256Hash::hash(b"c");
        let expected = Sha256Hash::hash_pair(
            &Sha256Hash::hash_pair(&a, &b),
            &Sha256Hash::hash_pair(&c, &c),
        );
        assert_eq!(*merkle_root(["a", "b", "c"]).digest(), expected);
    }

    mod props {
        use super::super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn root_is_well_formed(chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..16), 0..20)) {
                let root = merkle_root(&chunks).to_string();
                prop_assert_eq!(root.len(), 71);
                prop_assert!(root.starts_with("sha256:"));
            }

            #[test]
            fn swapping_distinct_chunks_changes_root(
                x in prop::collection::vec(any::<u8>(), 1..16),
                y in prop::collection::vec(any::<u8>(), 1..16),
            ) {
                prop_assume!(x != y);
                prop_assert_ne!(merkle_root([&x, &y]), merkle_root([&y, &x]));
            }
        }
    }
}
