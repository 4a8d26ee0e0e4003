//! CPU mining worker implementation
//!
//! Parallel SHA-256 search over the nonce space. Each thread walks its own
//! arithmetic progression of nonces on a private copy of the payload, and the
//! first thread to win the claim on the shared stop flag delivers its result.

use super::{
    mining_span, MiningStats, MiningWorker, NonceStride, SearchConfig, StopSignal,
};
use crate::crypto::Sha256Hasher;
use crate::types::{Nonce, Payload, SearchResult, Threshold};
use crate::{Error, Result};
use async_trait::async_trait;
use crossbeam::channel::{self, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Span};

/// CPU mining worker using one OS thread per core
#[derive(Clone)]
pub struct CpuWorker {
    workers: usize,
    max_nonce: i64,
    stats: Arc<CpuMiningStats>,
}

/// Thread-safe mining statistics for CPU worker
#[derive(Debug, Default)]
struct CpuMiningStats {
    total_hashes: AtomicU64,
    elapsed: Mutex<Duration>,
}

impl CpuMiningStats {
    fn reset(&self) {
        self.total_hashes.store(0, Ordering::Relaxed);
        *self.elapsed.lock() = Duration::ZERO;
    }

    fn to_mining_stats(&self) -> MiningStats {
        MiningStats::new(self.total_hashes.load(Ordering::Relaxed), *self.elapsed.lock())
    }
}

impl CpuWorker {
    /// Create a new CPU worker
    pub fn new(config: SearchConfig) -> Self {
        let workers = config.effective_workers();

        debug!("Creating CPU worker with {} threads", workers);

        Self {
            workers,
            max_nonce: config.max_nonce,
            stats: Arc::new(CpuMiningStats::default()),
        }
    }

    /// Number of search threads
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run a search to completion on the calling thread
    pub fn search(&self, payload: &Payload, threshold: &Threshold) -> Result<SearchResult> {
        self.search_with_signal(payload, threshold, &StopSignal::new())
    }

    /// Run a search that can also be stopped through `stop`
    ///
    /// Blocks until a worker delivers a result or every worker has exited.
    /// A search stopped before any worker won returns `Error::Cancelled`.
    pub fn search_with_signal(
        &self,
        payload: &Payload,
        threshold: &Threshold,
        stop: &StopSignal,
    ) -> Result<SearchResult> {
        let span = mining_span(self.worker_type(), threshold, self.workers);
        let _enter = span.enter();

        info!(
            "Starting CPU search with {} threads (payload {} bytes)",
            self.workers,
            payload.len()
        );

        self.stats.reset();
        let started = Instant::now();

        // Channel for the single winning result
        let (result_tx, result_rx) = channel::bounded(1);

        let outcome = thread::scope(|scope| -> Result<Option<SearchResult>> {
            for id in 0..self.workers {
                let result_tx = result_tx.clone();
                let span = span.clone();
                let spawned = thread::Builder::new()
                    .name(format!("pow-worker-{}", id))
                    .spawn_scoped(scope, move || {
                        let _enter = span.enter();
                        self.mine_thread(id, payload, threshold, stop, result_tx)
                    });

                if let Err(e) = spawned {
                    stop.stop();
                    return Err(Error::worker(format!("failed to spawn thread {}: {}", id, e)));
                }
            }

            // Only the threads hold senders now; the channel closes once they all exit
            drop(result_tx);

            Ok(result_rx.recv().ok())
        });

        let elapsed = started.elapsed();
        *self.stats.elapsed.lock() = elapsed;
        let stats = self.stats.to_mining_stats();

        match outcome? {
            Some(result) => {
                info!(
                    nonce = %result.nonce,
                    digest = %result.digest_hex(),
                    "CPU search found solution after {} hashes in {:?} ({})",
                    stats.total_hashes,
                    elapsed,
                    crate::utils::format_hash_rate(stats.hash_rate)
                );
                Ok(result)
            }
            None if stop.is_stopped() => {
                info!("CPU search cancelled after {} hashes", stats.total_hashes);
                Err(Error::cancelled("CPU search"))
            }
            None => {
                warn!("All search threads exhausted the nonce space without a solution");
                Err(Error::exhausted(self.max_nonce, self.workers))
            }
        }
    }

    /// Scan one progression of the nonce space
    fn mine_thread(
        &self,
        id: usize,
        template: &Payload,
        threshold: &Threshold,
        stop: &StopSignal,
        result_tx: Sender<SearchResult>,
    ) {
        debug!("Starting search thread {}", id);

        // Private copy; only the trailing nonce bytes change per attempt
        let mut payload = template.clone();
        let mut hasher = Sha256Hasher::new();
        let mut hashes = 0u64;

        for value in NonceStride::new(id, self.workers, self.max_nonce) {
            if stop.is_stopped() {
                break;
            }

            let nonce = Nonce::new(value);
            payload.set_nonce(nonce);
            let digest = hasher.hash(payload.as_bytes());
            hashes += 1;

            if threshold.is_met_by(&digest) {
                if stop.try_claim() {
                    debug!("Thread {} won with nonce {}", id, nonce);
                    // Capacity 1 and a single winner: never blocks
                    let _ = result_tx.send(SearchResult { nonce, digest });
                } else {
                    debug!("Thread {} found nonce {} after the race was decided", id, nonce);
                }
                break;
            }
        }

        self.stats.total_hashes.fetch_add(hashes, Ordering::Relaxed);
        debug!("Thread {} exited after {} hashes", id, hashes);
    }
}

#[async_trait]
impl MiningWorker for CpuWorker {
    fn worker_type(&self) -> &'static str {
        "cpu"
    }

    async fn mine(
        &mut self,
        payload: Payload,
        threshold: Threshold,
        cancellation: CancellationToken,
    ) -> Result<SearchResult> {
        if cancellation.is_cancelled() {
            return Err(Error::cancelled("CPU search"));
        }

        let stop = StopSignal::new();
        let worker = self.clone();
        let task_stop = stop.clone();
        let parent = Span::current();

        let mut handle = task::spawn_blocking(move || {
            let _enter = parent.enter();
            worker.search_with_signal(&payload, &threshold, &task_stop)
        });

        // Bridge caller cancellation onto the workers' stop flag
        let joined = tokio::select! {
            joined = &mut handle => joined,
            _ = cancellation.cancelled() => {
                stop.stop();
                handle.await
            }
        };

        joined.map_err(|e| Error::worker(format!("search task failed: {}", e)))?
    }

    fn stats(&self) -> MiningStats {
        self.stats.to_mining_stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::sha256;
    use crate::types::Difficulty;
    use assert_matches::assert_matches;

    fn zero_payload(difficulty: i64) -> Payload {
        Payload::new(&[0u8; 32], &[0u8; 32], 0, difficulty, Nonce::default())
    }

    #[test]
    fn test_cpu_worker_creation() {
        let worker = CpuWorker::new(SearchConfig::new(2));
        assert_eq!(worker.workers(), 2);
        assert_eq!(worker.worker_type(), "cpu");

        let worker = CpuWorker::new(SearchConfig::default());
        assert_eq!(worker.workers(), num_cpus::get());
    }

    #[test]
    fn test_cpu_worker_easy_search() {
        let threshold = Threshold::new(Difficulty::new(8).unwrap());
        let payload = zero_payload(8);
        let worker = CpuWorker::new(SearchConfig::new(4));

        let result = worker.search(&payload, &threshold).unwrap();

        assert!(threshold.is_met_by(&result.digest));
        let mut check = payload.clone();
        check.set_nonce(result.nonce);
        assert_eq!(sha256(check.as_bytes()), result.digest);
        assert!(worker.stats().total_hashes >= 1);
    }

    #[test]
    fn test_single_thread_is_deterministic() {
        let threshold = Threshold::from_bits(10).unwrap();
        let payload = zero_payload(10);
        let worker = CpuWorker::new(SearchConfig::new(1));

        let first = worker.search(&payload, &threshold).unwrap();
        for _ in 0..3 {
            assert_eq!(worker.search(&payload, &threshold).unwrap(), first);
        }
        // Single thread scans 0, 1, 2, ... so it has hashed exactly nonce + 1 inputs
        assert_eq!(worker.stats().total_hashes, first.nonce.value() as u64 + 1);
    }

    #[test]
    fn test_exhaustion_is_reported() {
        let threshold = Threshold::from_bits(256).unwrap();
        let payload = zero_payload(256);
        let worker = CpuWorker::new(SearchConfig::new(3).with_max_nonce(200));

        let result = worker.search(&payload, &threshold);
        assert_matches!(
            result,
            Err(Error::NonceSpaceExhausted { max_nonce: 200, workers: 3 })
        );
        assert_eq!(worker.stats().total_hashes, 200);
    }

    #[test]
    fn test_empty_nonce_space() {
        let threshold = Threshold::from_bits(1).unwrap();
        let worker = CpuWorker::new(SearchConfig::new(2).with_max_nonce(0));
        assert_matches!(
            worker.search(&zero_payload(1), &threshold),
            Err(Error::NonceSpaceExhausted { .. })
        );
    }

    #[test]
    fn test_pre_stopped_signal_cancels() {
        let threshold = Threshold::from_bits(256).unwrap();
        let worker = CpuWorker::new(SearchConfig::new(2));
        let stop = StopSignal::new();
        stop.stop();

        let result = worker.search_with_signal(&zero_payload(256), &threshold, &stop);
        assert_matches!(result, Err(Error::Cancelled { .. }));
        assert_eq!(worker.stats().total_hashes, 0);
    }

    #[test]
    fn test_try_claim_once() {
        let stop = StopSignal::new();
        assert!(stop.try_claim());
        assert!(!stop.try_claim());
        assert!(stop.is_stopped());

        let stopped = StopSignal::new();
        stopped.stop();
        assert!(!stopped.try_claim());
    }

    #[tokio::test]
    async fn test_async_mine() {
        let mut worker = CpuWorker::new(SearchConfig::new(2));
        let threshold = Threshold::from_bits(8).unwrap();

        let result = worker
            .mine(zero_payload(8), threshold.clone(), CancellationToken::new())
            .await
            .unwrap();

        assert!(threshold.is_met_by(&result.digest));
    }

    #[tokio::test]
    async fn test_cpu_worker_cancellation() {
        let mut worker = CpuWorker::new(SearchConfig::new(1));
        let cancellation = CancellationToken::new();

        // Cancel immediately
        cancellation.cancel();

        let result = worker
            .mine(zero_payload(256), Threshold::from_bits(256).unwrap(), cancellation)
            .await;

        assert_matches!(result, Err(Error::Cancelled { .. }));
    }

    #[tokio::test]
    async fn test_cpu_worker_cancellation_in_flight() {
        let mut worker = CpuWorker::new(SearchConfig::new(2));
        let cancellation = CancellationToken::new();
        let trigger = cancellation.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(10),
            worker.mine(zero_payload(256), Threshold::from_bits(256).unwrap(), cancellation),
        )
        .await
        .expect("cancelled search should return promptly");

        assert_matches!(result, Err(Error::Cancelled { .. }));
        assert!(worker.stats().total_hashes > 0);
    }
}
