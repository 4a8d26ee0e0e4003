//! Core types for proof-of-work mining
//!
//! Difficulty, threshold, payload template and search results, with hex
//! encoding for display and serde support for block inputs.

use crate::codec::{encode_i64, encode_i64_into, reverse_bytes, INT_SIZE};
use crate::{Error, Result};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Difficulty used by the chain, in leading zero bits
pub const TARGET_BITS: u16 = 16;

/// Largest supported difficulty (the full digest width)
pub const MAX_DIFFICULTY_BITS: u16 = 256;

/// Size of a SHA-256 digest in bytes
pub const DIGEST_SIZE: usize = 32;

/// Proof-of-work nonce
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Nonce(pub i64);

impl Nonce {
    /// Create a new nonce
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Get the nonce value
    pub const fn value(self) -> i64 {
        self.0
    }

    /// Convert to big-endian bytes, the layout used in the payload
    pub fn to_be_bytes(self) -> [u8; INT_SIZE] {
        encode_i64(self.0)
    }
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Nonce {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Nonce> for i64 {
    fn from(nonce: Nonce) -> Self {
        nonce.0
    }
}

/// Number of leading bits of the 256-bit threshold that are zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Difficulty(u16);

impl Difficulty {
    /// Validate and wrap a difficulty in bits
    pub fn new(bits: i64) -> Result<Self> {
        if bits <= 0 || bits > i64::from(MAX_DIFFICULTY_BITS) {
            return Err(Error::invalid_difficulty(bits));
        }
        Ok(Self(bits as u16))
    }

    /// Difficulty in bits
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Difficulty as it is encoded into the payload
    pub fn as_i64(self) -> i64 {
        i64::from(self.0)
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Self(TARGET_BITS)
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for Difficulty {
    type Error = Error;

    fn try_from(bits: i64) -> Result<Self> {
        Self::new(bits)
    }
}

impl From<Difficulty> for i64 {
    fn from(difficulty: Difficulty) -> Self {
        difficulty.as_i64()
    }
}

/// Leading bytes of the 256-bit value `2^(256 - difficulty)`
///
/// Only the bytes up to and including the single set bit are kept. A digest
/// meets the threshold when its first `len()` bytes compare strictly below
/// these bytes as unsigned big-endian numbers. A digest whose prefix equals the
/// threshold is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Threshold {
    bytes: Vec<u8>,
}

impl Threshold {
    /// Build the threshold for a difficulty
    pub fn new(difficulty: Difficulty) -> Self {
        let bits = usize::from(difficulty.bits());
        let mut bytes = vec![0u8; (bits - 1) / 8 + 1];
        let last = bytes.len() - 1;
        bytes[last] = 128 >> ((bits - 1) % 8);
        Self { bytes }
    }

    /// Build the threshold from a raw difficulty in bits
    pub fn from_bits(bits: i64) -> Result<Self> {
        Ok(Self::new(Difficulty::new(bits)?))
    }

    /// Threshold bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of digest bytes taking part in the comparison
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false; a threshold holds at least one byte
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Check whether a digest's leading bytes fall strictly below the threshold
    #[inline]
    pub fn is_met_by(&self, digest: &[u8]) -> bool {
        match digest.get(..self.bytes.len()) {
            Some(prefix) => prefix < self.bytes.as_slice(),
            None => false,
        }
    }

    /// Convert to hexadecimal string
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Inputs of a block that take part in the proof of work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockFields {
    /// Digest of the previous block, treated as opaque bytes
    #[serde(with = "hex_bytes")]
    pub prev_digest: Vec<u8>,
    /// Aggregate digest of the block's transactions
    #[serde(with = "hex_bytes")]
    pub tx_digest: Vec<u8>,
    /// Seconds since the Unix epoch
    pub timestamp: i64,
    /// Nonce stored in the block (zero before mining)
    #[serde(default)]
    pub nonce: Nonce,
}

impl BlockFields {
    /// Create block fields with a zero nonce
    pub fn new(prev_digest: impl Into<Vec<u8>>, tx_digest: impl Into<Vec<u8>>, timestamp: i64) -> Self {
        Self {
            prev_digest: prev_digest.into(),
            tx_digest: tx_digest.into(),
            timestamp,
            nonce: Nonce::default(),
        }
    }

    /// Return a copy carrying the given nonce
    pub fn with_nonce(mut self, nonce: Nonce) -> Self {
        self.nonce = nonce;
        self
    }
}

/// Hashable payload: `prev || tx || ts || difficulty || nonce`
///
/// The nonce always occupies the trailing 8 bytes so it can be swapped without
/// re-serializing the prefix.
#[derive(Clone, PartialEq, Eq)]
pub struct Payload {
    bytes: Vec<u8>,
}

impl Payload {
    /// Assemble a payload from its parts
    pub fn new(
        prev_digest: &[u8],
        tx_digest: &[u8],
        timestamp: i64,
        difficulty: i64,
        nonce: Nonce,
    ) -> Self {
        let mut bytes =
            Vec::with_capacity(prev_digest.len() + tx_digest.len() + 3 * INT_SIZE);
        bytes.extend_from_slice(prev_digest);
        bytes.extend_from_slice(tx_digest);
        bytes.extend_from_slice(&encode_i64(timestamp));
        bytes.extend_from_slice(&encode_i64(difficulty));
        bytes.extend_from_slice(&nonce.to_be_bytes());
        Self { bytes }
    }

    /// Assemble the payload for a block at a given difficulty
    pub fn for_block(block: &BlockFields, difficulty: Difficulty) -> Self {
        Self::new(
            &block.prev_digest,
            &block.tx_digest,
            block.timestamp,
            difficulty.as_i64(),
            block.nonce,
        )
    }

    /// Offset of the nonce bytes
    pub fn nonce_offset(&self) -> usize {
        self.bytes.len() - INT_SIZE
    }

    /// Overwrite the trailing nonce bytes
    #[inline]
    pub fn set_nonce(&mut self, nonce: Nonce) {
        let offset = self.nonce_offset();
        encode_i64_into(&mut self.bytes[offset..], nonce.value());
    }

    /// Read back the nonce
    pub fn nonce(&self) -> Nonce {
        let mut buf = [0u8; INT_SIZE];
        buf.copy_from_slice(&self.bytes[self.nonce_offset()..]);
        Nonce(i64::from_be_bytes(buf))
    }

    /// Payload bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false; a payload holds at least the encoded integers
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Convert to hexadecimal string
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payload")
            .field("hex", &self.to_hex())
            .field("nonce", &self.nonce())
            .finish()
    }
}

/// Winning nonce and the full digest it produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchResult {
    pub nonce: Nonce,
    pub digest: [u8; DIGEST_SIZE],
}

impl SearchResult {
    /// Digest as hex
    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest)
    }

    /// Digest hex in little-endian byte order, as block explorers show it
    pub fn digest_le_hex(&self) -> String {
        let mut digest = self.digest;
        reverse_bytes(&mut digest);
        hex::encode(digest)
    }
}

impl fmt::Display for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "nonce={} digest={}", self.nonce, self.digest_hex())
    }
}

impl Serialize for SearchResult {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("SearchResult", 2)?;
        state.serialize_field("nonce", &self.nonce)?;
        state.serialize_field("digest", &self.digest_hex())?;
        state.end()
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}
