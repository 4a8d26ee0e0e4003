//! Parallel proof-of-work miner
//!
//! Finds a nonce such that the SHA-256 digest of a block payload falls below a
//! difficulty threshold, using every available core:
//! - Fixed-width big-endian payload encoding shared by miner and validator
//! - Interleaved nonce partitioning across OS threads
//! - Single-winner delivery through an atomic claim on the stop flag
//! - Caller cancellation through the same flag or a tokio `CancellationToken`

pub mod codec;
pub mod config;
pub mod crypto;
pub mod error;
pub mod logging;
pub mod pow;
pub mod types;
pub mod utils;
pub mod worker;

pub use config::Config;
pub use error::{Error, Result};
pub use pow::{search, validate, ProofOfWork};
pub use types::*;
pub use worker::{CpuWorker, MiningWorker, SearchConfig, SequentialWorker, StopSignal};

/// Application information
pub const APP_NAME: &str = "pow-miner";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
