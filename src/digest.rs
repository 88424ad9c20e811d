//! Block digests.
//!
//! A [`Digest`] is the fixed-width fingerprint of one block. The function that
//! produces it is pluggable through [`HashPrimitive`]; [`Blake3`] is the one
//! the CLI uses. [`BlockHasher`] binds a primitive to the seed every block of
//! a run is hashed with.

use std::fmt::{Debug, Formatter, Result};

use crate::config::HASH_SEED;

/// Width of a digest in bytes.
pub const DIGEST_SIZE: usize = blake3::OUT_LEN;

/// Key material mixed into every block digest.
pub type Seed = [u8; blake3::KEY_LEN];

/// Fingerprint of a single block.
///
/// Stored in signature files as its raw bytes, so the layout is exactly
/// `DIGEST_SIZE` bytes with no padding.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Digest([u8; DIGEST_SIZE]);

impl Digest {
    #[inline]
    #[must_use]
    pub const fn from_bytes(bytes: [u8; DIGEST_SIZE]) -> Self {
        Self(bytes)
    }

    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; DIGEST_SIZE] {
        &self.0
    }
}

impl Debug for Digest {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.write_str("Digest(")?;
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        f.write_str(")")
    }
}

/// A seeded content hash over an arbitrary byte span.
///
/// Implementations must be pure: the same seed and bytes always give the same
/// digest, whichever thread asks.
pub trait HashPrimitive: Send + Sync {
    fn hash(&self, seed: &Seed, data: &[u8]) -> Digest;
}

/// Keyed BLAKE3.
#[derive(Clone, Copy, Debug, Default)]
pub struct Blake3;

impl HashPrimitive for Blake3 {
    #[inline]
    fn hash(&self, seed: &Seed, data: &[u8]) -> Digest {
        Digest(*blake3::keyed_hash(seed, data).as_bytes())
    }
}

/// Hashes blocks with a fixed seed.
///
/// Shared by reference between every thread of a run.
pub struct BlockHasher {
    seed: Seed,
    primitive: Box<dyn HashPrimitive>,
}

impl BlockHasher {
    pub fn new(primitive: impl HashPrimitive + 'static) -> Self {
        Self::with_seed(primitive, HASH_SEED)
    }

    pub fn with_seed(primitive: impl HashPrimitive + 'static, seed: Seed) -> Self {
        Self { seed, primitive: Box::new(primitive) }
    }

    /// Digest of exactly `block`; the caller is responsible for passing the
    /// block's true length, not a padded slot.
    #[inline]
    pub fn digest(&self, block: &[u8]) -> Digest {
        self.primitive.hash(&self.seed, block)
    }
}

impl Default for BlockHasher {
    fn default() -> Self {
        Self::new(Blake3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_deterministic() {
        let hasher = BlockHasher::default();
        assert_eq!(hasher.digest(b"same block"), hasher.digest(b"same block"));
    }

    #[test]
    fn test_digest_matches_keyed_blake3() {
        let hasher = BlockHasher::default();
        let expected = *blake3::keyed_hash(&HASH_SEED, b"block").as_bytes();
        assert_eq!(hasher.digest(b"block").as_bytes(), &expected);
    }

    #[test]
    fn test_seed_changes_digest() {
        let default = BlockHasher::default();
        let other = BlockHasher::with_seed(Blake3, [7u8; 32]);
        assert_ne!(default.digest(b"block"), other.digest(b"block"));
    }

    #[test]
    fn test_length_is_significant() {
        let hasher = BlockHasher::default();
        let padded = [b'a', b'b', 0, 0];
        assert_ne!(hasher.digest(b"ab"), hasher.digest(&padded));
    }

    #[test]
    fn test_custom_primitive() {
        struct FirstByte;

        impl HashPrimitive for FirstByte {
            fn hash(&self, _seed: &Seed, data: &[u8]) -> Digest {
                Digest::from_bytes([data.first().copied().unwrap_or(0); DIGEST_SIZE])
            }
        }

        let hasher = BlockHasher::new(FirstByte);
        assert_eq!(hasher.digest(b"z").as_bytes(), &[b'z'; DIGEST_SIZE]);
    }

    #[test]
    fn test_debug_is_hex() {
        let digest = Digest::from_bytes([0xab; DIGEST_SIZE]);
        assert_eq!(format!("{digest:?}"), format!("Digest({})", "ab".repeat(DIGEST_SIZE)));
    }
}
