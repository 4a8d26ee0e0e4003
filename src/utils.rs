//! Utility functions and helpers

use crate::{Error, Result};
use chrono::Utc;

/// Get current timestamp in seconds since Unix epoch
pub fn current_timestamp_secs() -> i64 {
    Utc::now().timestamp()
}

/// Format a hash rate with SI prefixes, e.g. `1.50 MH/s`
pub fn format_hash_rate(hashes_per_sec: f64) -> String {
    const PREFIXES: [&str; 6] = ["", "K", "M", "G", "T", "P"];

    let (scaled, prefix) = PREFIXES[1..]
        .iter()
        .fold((hashes_per_sec, PREFIXES[0]), |(value, prefix), next| {
            if value >= 1000.0 {
                (value / 1000.0, *next)
            } else {
                (value, prefix)
            }
        });

    format!("{:.2} {}H/s", scaled, prefix)
}

/// Convert a hex string (optionally `0x`-prefixed) to bytes
pub fn hex_to_bytes(hex: &str) -> Result<Vec<u8>> {
    let trimmed = hex.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if digits.len() % 2 != 0 {
        return Err(Error::config(format!(
            "hex string has odd length {}",
            digits.len()
        )));
    }
    Ok(hex::decode(digits)?)
}
