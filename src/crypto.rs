//! Hashing utilities for mining
//!
//! SHA-256 over the assembled payload, plus an exact 256-bit target check used
//! by the reference search.

use crate::types::{Difficulty, DIGEST_SIZE};
use num_bigint::BigUint;
use sha2::{Digest, Sha256};

/// Reusable SHA-256 hasher for the mining loop
pub struct Sha256Hasher {
    hasher: Sha256,
}

impl Sha256Hasher {
    /// Create a new hasher
    pub fn new() -> Self {
        Self {
            hasher: Sha256::new(),
        }
    }

    /// Hash data and reset internal state for the next call
    #[inline]
    pub fn hash(&mut self, data: &[u8]) -> [u8; DIGEST_SIZE] {
        self.hasher.update(data);
        self.hasher.finalize_reset().into()
    }
}

impl Default for Sha256Hasher {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot SHA-256
pub fn sha256(data: &[u8]) -> [u8; DIGEST_SIZE] {
    Sha256::digest(data).into()
}

/// Full 256-bit target `2^(256 - difficulty)`
pub fn exact_target(difficulty: Difficulty) -> BigUint {
    BigUint::from(1u8) << (256 - u32::from(difficulty.bits()))
}

/// Compare the whole digest, read as a big-endian integer, against `target`
pub fn meets_exact_target(digest: &[u8], target: &BigUint) -> bool {
    BigUint::from_bytes_be(digest) < *target
}
