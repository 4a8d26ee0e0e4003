//! Single-threaded reference search
//!
//! Scans nonces `0, 1, 2, ...` in order and compares the whole digest against
//! the exact 256-bit target `2^(256 - difficulty)`. Slow, but it returns the
//! smallest qualifying nonce and serves as a cross-check for the parallel
//! search and as a benchmark baseline.

use super::{threshold_difficulty, MiningStats, MiningWorker, StopSignal, MAX_NONCE};
use crate::crypto::{exact_target, meets_exact_target, sha256};
use crate::types::{Nonce, Payload, SearchResult, Threshold};
use crate::{Error, Result};
use async_trait::async_trait;
use std::time::Instant;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Sequential worker with exact big-integer target comparison
#[derive(Debug, Clone)]
pub struct SequentialWorker {
    max_nonce: i64,
    stats: MiningStats,
}

impl SequentialWorker {
    /// Create a worker scanning the full nonce space
    pub fn new() -> Self {
        Self::with_max_nonce(MAX_NONCE)
    }

    /// Create a worker scanning `[0, max_nonce)`
    pub fn with_max_nonce(max_nonce: i64) -> Self {
        Self {
            max_nonce,
            stats: MiningStats::default(),
        }
    }

    /// Search from nonce 0 upwards
    pub fn search(&mut self, payload: &Payload, threshold: &Threshold) -> Result<SearchResult> {
        self.search_with_signal(payload, threshold, &StopSignal::new())
    }

    /// Search from nonce 0 upwards, stopping early when `stop` is set
    pub fn search_with_signal(
        &mut self,
        payload: &Payload,
        threshold: &Threshold,
        stop: &StopSignal,
    ) -> Result<SearchResult> {
        let difficulty = threshold_difficulty(threshold)
            .ok_or_else(|| Error::worker("threshold does not encode a difficulty"))?;
        let target = exact_target(difficulty);

        debug!("Starting reference search at difficulty {}", difficulty);

        let started = Instant::now();
        let mut payload = payload.clone();
        let mut hashes = 0u64;
        let mut found = None;

        for value in 0..self.max_nonce.max(0) {
            if stop.is_stopped() {
                break;
            }

            let nonce = Nonce::new(value);
            payload.set_nonce(nonce);
            let digest = sha256(payload.as_bytes());
            hashes += 1;

            if meets_exact_target(&digest, &target) {
                found = Some(SearchResult { nonce, digest });
                break;
            }
        }

        self.stats = MiningStats::new(hashes, started.elapsed());

        match found {
            Some(result) => {
                info!("Reference search found nonce {} after {} hashes", result.nonce, hashes);
                Ok(result)
            }
            None if stop.is_stopped() => Err(Error::cancelled("reference search")),
            None => Err(Error::exhausted(self.max_nonce, 1)),
        }
    }
}

impl Default for SequentialWorker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MiningWorker for SequentialWorker {
    fn worker_type(&self) -> &'static str {
        "reference"
    }

    async fn mine(
        &mut self,
        payload: Payload,
        threshold: Threshold,
        cancellation: CancellationToken,
    ) -> Result<SearchResult> {
        if cancellation.is_cancelled() {
            return Err(Error::cancelled("reference search"));
        }

        let stop = StopSignal::new();
        let task_stop = stop.clone();
        let mut worker = self.clone();

        let mut handle = task::spawn_blocking(move || {
            let result = worker.search_with_signal(&payload, &threshold, &task_stop);
            (worker, result)
        });

        let joined = tokio::select! {
            joined = &mut handle => joined,
            _ = cancellation.cancelled() => {
                stop.stop();
                handle.await
            }
        };

        let (worker, result) =
            joined.map_err(|e| Error::worker(format!("search task failed: {}", e)))?;
        self.stats = worker.stats;
        result
    }

    fn stats(&self) -> MiningStats {
        self.stats.clone()
    }
}
