//! Mining worker implementations
//!
//! Provides the parallel CPU search used for mining and a single-threaded
//! reference search, plus the shared pieces they are built from: nonce
//! partitioning, the stop signal and statistics.

use crate::types::{Difficulty, Payload, SearchResult, Threshold};
use crate::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::Span;

pub mod cpu;
pub mod reference;

pub use cpu::CpuWorker;
pub use reference::SequentialWorker;

/// Upper bound (exclusive) of the nonce space
pub const MAX_NONCE: i64 = i64::MAX;

/// Parameters of a single search invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchConfig {
    /// Number of worker threads (0 = all available cores)
    pub workers: usize,
    /// Nonces are drawn from `[0, max_nonce)`
    pub max_nonce: i64,
}

impl SearchConfig {
    /// Create a configuration with the given worker count over the full nonce space
    pub fn new(workers: usize) -> Self {
        Self {
            workers,
            max_nonce: MAX_NONCE,
        }
    }

    /// Limit the nonce space
    pub fn with_max_nonce(mut self, max_nonce: i64) -> Self {
        self.max_nonce = max_nonce;
        self
    }

    /// Worker count with 0 resolved to the number of CPUs
    pub fn effective_workers(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get()
        } else {
            self.workers
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Shared stop flag polled by every worker on each iteration
///
/// Set at most once, either by the winning worker or by the caller. Clones
/// share the same flag.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
}

impl StopSignal {
    /// Create a signal in the running state
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask all workers to stop
    pub fn stop(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Check whether a stop was requested
    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Claim the win; only the first caller across all clones gets `true`
    ///
    /// Fails once the signal is stopped, whether by another winner or by the
    /// caller.
    #[inline]
    pub(crate) fn try_claim(&self) -> bool {
        self.flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Nonces visited by one worker: `worker, worker + workers, ...` below `max_nonce`
///
/// The strides of workers `0..workers` partition `[0, max_nonce)` with no gaps
/// and no overlaps.
#[derive(Debug, Clone)]
pub struct NonceStride {
    next: Option<i64>,
    step: i64,
    max_nonce: i64,
}

impl NonceStride {
    /// Create the stride for worker `worker` out of `workers`
    pub fn new(worker: usize, workers: usize, max_nonce: i64) -> Self {
        let start = i64::try_from(worker).ok();
        let step = i64::try_from(workers.max(1)).unwrap_or(i64::MAX);
        Self {
            next: start,
            step,
            max_nonce,
        }
    }
}

impl Iterator for NonceStride {
    type Item = i64;

    #[inline]
    fn next(&mut self) -> Option<i64> {
        let current = self.next.filter(|&n| n < self.max_nonce)?;
        self.next = current.checked_add(self.step);
        Some(current)
    }
}

/// Mining statistics for a worker
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MiningStats {
    /// Total hashes computed
    pub total_hashes: u64,
    /// Time spent in the last search
    pub elapsed: Duration,
    /// Average hash rate over the last search (hashes per second)
    pub hash_rate: f64,
}

impl MiningStats {
    /// Build statistics from a hash count and elapsed time
    pub fn new(total_hashes: u64, elapsed: Duration) -> Self {
        Self {
            total_hashes,
            elapsed,
            hash_rate: compute_hash_rate(total_hashes, elapsed),
        }
    }
}

/// Mining worker trait
///
/// Both search strategies expose the same async entry point so callers can
/// run a search from a tokio runtime and abort it through a cancellation token.
#[async_trait]
pub trait MiningWorker: Send + Sync {
    /// Get the worker type name for logging
    fn worker_type(&self) -> &'static str;

    /// Search the nonce space of `payload` for a digest below `threshold`
    ///
    /// Returns `Error::Cancelled` if `cancellation` fires before a solution is
    /// found.
    async fn mine(
        &mut self,
        payload: Payload,
        threshold: Threshold,
        cancellation: CancellationToken,
    ) -> Result<SearchResult>;

    /// Get statistics of the last search
    fn stats(&self) -> MiningStats {
        MiningStats::default()
    }
}

/// Utility function to compute hash rate over a time period
pub fn compute_hash_rate(hashes: u64, elapsed: Duration) -> f64 {
    if elapsed.as_secs_f64() > 0.0 {
        hashes as f64 / elapsed.as_secs_f64()
    } else {
        0.0
    }
}

/// Create a tracing span for mining operations
pub fn mining_span(worker_type: &str, threshold: &Threshold, workers: usize) -> Span {
    tracing::info_span!(
        "mining",
        worker_type = worker_type,
        threshold = %threshold,
        workers = workers,
    )
}

/// Recover the difficulty a threshold was built from
pub(crate) fn threshold_difficulty(threshold: &Threshold) -> Option<Difficulty> {
    let last = *threshold.as_bytes().last()?;
    if last == 0 || !last.is_power_of_two() {
        return None;
    }
    let bits = (threshold.len() as i64 - 1) * 8 + i64::from(last.leading_zeros()) + 1;
    Difficulty::new(bits).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_stride_visits_progression() {
        let nonces: Vec<i64> = NonceStride::new(1, 4, 20).collect();
        assert_eq!(nonces, vec![1, 5, 9, 13, 17]);

        let nonces: Vec<i64> = NonceStride::new(0, 1, 5).collect();
        assert_eq!(nonces, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_strides_partition_space() {
        for workers in 1..=9 {
            for max_nonce in [0i64, 1, 7, 64, 101] {
                let mut seen = HashSet::new();
                for worker in 0..workers {
                    for nonce in NonceStride::new(worker, workers, max_nonce) {
                        assert!(seen.insert(nonce), "nonce {} visited twice", nonce);
                    }
                }
                let expected: HashSet<i64> = (0..max_nonce).collect();
                assert_eq!(seen, expected, "workers={} max={}", workers, max_nonce);
            }
        }
    }

    #[test]
    fn test_stride_stops_at_overflow() {
        let mut stride = NonceStride::new(3, 4, i64::MAX);
        stride.next = Some(i64::MAX - 1);
        assert_eq!(stride.next(), Some(i64::MAX - 1));
        assert_eq!(stride.next(), None);
    }

    #[test]
    fn test_stride_worker_beyond_space() {
        assert_eq!(NonceStride::new(5, 8, 3).count(), 0);
        assert_eq!(NonceStride::new(0, 2, -1).count(), 0);
    }

    #[test]
    fn test_stop_signal_shared() {
        let signal = StopSignal::new();
        let clone = signal.clone();
        assert!(!clone.is_stopped());
        signal.stop();
        assert!(clone.is_stopped());
    }

    #[test]
    fn test_search_config() {
        let config = SearchConfig::default();
        assert_eq!(config.max_nonce, MAX_NONCE);
        assert!(config.effective_workers() >= 1);

        let config = SearchConfig::new(3).with_max_nonce(10);
        assert_eq!(config.effective_workers(), 3);
        assert_eq!(config.max_nonce, 10);
    }

    #[test]
    fn test_compute_hash_rate() {
        assert_eq!(compute_hash_rate(1000, Duration::from_secs(10)), 100.0);
        assert_eq!(compute_hash_rate(0, Duration::from_secs(10)), 0.0);
        assert_eq!(compute_hash_rate(1000, Duration::from_secs(0)), 0.0);

        let stats = MiningStats::new(500, Duration::from_secs(5));
        assert_eq!(stats.hash_rate, 100.0);
    }

    #[test]
    fn test_threshold_difficulty_roundtrip() {
        for bits in 1..=256 {
            let threshold = Threshold::from_bits(bits).unwrap();
            assert_eq!(threshold_difficulty(&threshold).map(|d| d.as_i64()), Some(bits));
        }
    }
}
