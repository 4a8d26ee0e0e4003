//! Proof-of-work over block fields
//!
//! Ties the payload layout, threshold and CPU search together. Mining and
//! validation share the same payload encoding and the same truncated-prefix
//! comparison, so any nonce the search accepts also validates.

use crate::crypto::sha256;
use crate::types::{BlockFields, Difficulty, Nonce, Payload, SearchResult, Threshold};
use crate::worker::{CpuWorker, SearchConfig, StopSignal};
use crate::Result;
use tracing::debug;

/// Proof-of-work for one block: its threshold and payload template
#[derive(Debug, Clone)]
pub struct ProofOfWork {
    threshold: Threshold,
    payload: Payload,
    nonce: Nonce,
}

impl ProofOfWork {
    /// Build the proof-of-work for `block` at `difficulty`
    pub fn new(block: &BlockFields, difficulty: Difficulty) -> Self {
        Self {
            threshold: Threshold::new(difficulty),
            payload: Payload::for_block(block, difficulty),
            nonce: block.nonce,
        }
    }

    /// Threshold the digest must fall below
    pub fn threshold(&self) -> &Threshold {
        &self.threshold
    }

    /// Payload template (carrying the block's own nonce)
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Search for a qualifying nonce using all configured workers
    pub fn run(&self, config: &SearchConfig) -> Result<SearchResult> {
        CpuWorker::new(*config).search(&self.payload, &self.threshold)
    }

    /// Like [`ProofOfWork::run`], but abortable through `stop`
    pub fn run_with_signal(&self, config: &SearchConfig, stop: &StopSignal) -> Result<SearchResult> {
        CpuWorker::new(*config).search_with_signal(&self.payload, &self.threshold, stop)
    }

    /// Validate the nonce stored in the block
    pub fn validate(&self) -> bool {
        self.validate_nonce(self.nonce)
    }

    /// Validate an arbitrary nonce against this block
    pub fn validate_nonce(&self, nonce: Nonce) -> bool {
        let mut payload = self.payload.clone();
        payload.set_nonce(nonce);
        let digest = sha256(payload.as_bytes());
        let valid = self.threshold.is_met_by(&digest);
        debug!(
            nonce = %nonce,
            digest = %hex::encode(digest),
            valid,
            "Validated proof-of-work"
        );
        valid
    }
}

/// Search `payload` for a nonce whose digest falls below `threshold`
///
/// `workers == 0` uses every available core.
pub fn search(payload: &Payload, threshold: &Threshold, workers: usize) -> Result<SearchResult> {
    CpuWorker::new(SearchConfig::new(workers)).search(payload, threshold)
}

/// Recompute the digest for a claimed nonce and check it against the threshold
///
/// Fails only for a difficulty outside `1..=256`.
pub fn validate(
    prev_digest: &[u8],
    tx_digest: &[u8],
    timestamp: i64,
    difficulty_bits: i64,
    nonce: Nonce,
) -> Result<bool> {
    let difficulty = Difficulty::new(difficulty_bits)?;
    let block = BlockFields::new(prev_digest, tx_digest, timestamp).with_nonce(nonce);
    Ok(ProofOfWork::new(&block, difficulty).validate())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use assert_matches::assert_matches;

    fn zero_block() -> BlockFields {
        BlockFields::new([0u8; 32], [0u8; 32], 0)
    }

    #[test]
    fn test_mined_nonce_validates() {
        let difficulty = Difficulty::new(12).unwrap();
        let block = zero_block();
        let pow = ProofOfWork::new(&block, difficulty);

        let result = pow.run(&SearchConfig::new(4)).unwrap();
        assert!(pow.validate_nonce(result.nonce));

        let mined = block.clone().with_nonce(result.nonce);
        assert!(ProofOfWork::new(&mined, difficulty).validate());
        assert!(validate(&mined.prev_digest, &mined.tx_digest, 0, 12, result.nonce).unwrap());
    }

    #[test]
    fn test_validate_rejects_invalid_difficulty() {
        assert_matches!(
            validate(&[], &[], 0, 0, Nonce::default()),
            Err(Error::InvalidDifficulty { bits: 0 })
        );
        assert_matches!(
            validate(&[], &[], 0, 257, Nonce::default()),
            Err(Error::InvalidDifficulty { bits: 257 })
        );
    }

    #[test]
    fn test_validate_uses_payload_difficulty() {
        // The difficulty is hashed too: a nonce mined at 8 bits is checked
        // against a different payload at 9 bits
        let block = zero_block();
        let result = ProofOfWork::new(&block, Difficulty::new(8).unwrap())
            .run(&SearchConfig::new(1))
            .unwrap();
        let at_nine = ProofOfWork::new(&block, Difficulty::new(9).unwrap());
        let mut payload = at_nine.payload().clone();
        payload.set_nonce(result.nonce);
        assert_eq!(
            at_nine.validate_nonce(result.nonce),
            at_nine.threshold().is_met_by(&sha256(payload.as_bytes()))
        );
    }

    #[test]
    fn test_search_free_function() {
        let block = zero_block();
        let difficulty = Difficulty::new(8).unwrap();
        let payload = Payload::for_block(&block, difficulty);
        let threshold = Threshold::new(difficulty);

        let result = search(&payload, &threshold, 2).unwrap();
        assert!(threshold.is_met_by(&result.digest));
        assert!(validate(&[0u8; 32], &[0u8; 32], 0, 8, result.nonce).unwrap());
    }

    #[test]
    fn test_run_with_stopped_signal() {
        let pow = ProofOfWork::new(&zero_block(), Difficulty::new(256).unwrap());
        let stop = StopSignal::new();
        stop.stop();
        assert_matches!(
            pow.run_with_signal(&SearchConfig::new(2), &stop),
            Err(Error::Cancelled { .. })
        );
    }
}
