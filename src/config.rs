//! Configuration management for the miner
//!
//! Supports command line arguments, environment variables and configuration
//! files (YAML/JSON), with command line values taking precedence.

use crate::types::{BlockFields, Difficulty, Nonce, TARGET_BITS};
use crate::utils::{current_timestamp_secs, hex_to_bytes};
use crate::worker::{SearchConfig, MAX_NONCE};
use crate::{Error, Result};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Directive string understood by `EnvFilter`
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// Log output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Plain,
    Pretty,
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Plain => write!(f, "plain"),
            LogFormat::Pretty => write!(f, "pretty"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

/// Complete configuration for the miner
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(
    name = "pow-miner",
    version = env!("CARGO_PKG_VERSION"),
    about = "Parallel proof-of-work miner",
    long_about = "Searches for a nonce whose SHA-256 digest of the block payload falls below the difficulty threshold, or validates a claimed nonce"
)]
pub struct Config {
    /// Print the parsed configuration and exit
    #[arg(long)]
    #[serde(skip)]
    pub print_config: bool,

    /// Configuration file path (YAML or JSON)
    #[arg(long, value_name = "FILE", env = "POW_MINER_CONFIG")]
    #[serde(skip)]
    pub config_file: Option<PathBuf>,

    /// Difficulty in leading zero bits (1-256)
    #[arg(short = 'd', long, default_value_t = TARGET_BITS as i64)]
    #[serde(default = "default_difficulty")]
    pub difficulty: i64,

    /// Number of search threads (0 = all cores)
    #[arg(short = 'c', long, default_value_t = 0, env = "POW_MINER_WORKERS")]
    #[serde(default)]
    pub workers: usize,

    /// Exclusive upper bound of the nonce space
    #[arg(long, default_value_t = MAX_NONCE)]
    #[serde(default = "default_max_nonce")]
    pub max_nonce: i64,

    /// Previous block digest (hex)
    #[arg(short = 'p', long, default_value = "")]
    #[serde(default)]
    pub prev_digest: String,

    /// Aggregate transaction digest (hex)
    #[arg(short = 'x', long, default_value = "")]
    #[serde(default)]
    pub tx_digest: String,

    /// Block timestamp in seconds (default: now)
    #[arg(short = 't', long)]
    pub timestamp: Option<i64>,

    /// Validate this nonce instead of mining
    #[arg(long, value_name = "NONCE")]
    pub validate_nonce: Option<i64>,

    /// Log level
    #[arg(short = 'l', long, default_value = "info")]
    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,

    /// Log output format
    #[arg(long, default_value = "plain")]
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

impl Config {
    /// Parse the command line and merge the configuration file if given
    pub fn load() -> Result<Self> {
        Self::from_config(Self::parse())
    }

    /// Merge the configuration file referenced by `config` and validate
    pub fn from_config(mut config: Self) -> Result<Self> {
        if let Some(config_file) = config.config_file.clone() {
            let file_config = Self::load_from_file(&config_file)?;
            config = config.merge_with_file(file_config);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        if path.extension().and_then(|s| s.to_str()) == Some("json") {
            serde_json::from_str(&content).map_err(Error::from)
        } else {
            // Default to YAML
            serde_yaml::from_str(&content).map_err(Error::from)
        }
    }

    /// Merge CLI config with file config
    ///
    /// Clap cannot tell an explicit flag from its default, so values still at
    /// their defaults are taken from the file.
    fn merge_with_file(mut self, file: Self) -> Self {
        if self.difficulty == default_difficulty() {
            self.difficulty = file.difficulty;
        }
        if self.workers == 0 {
            self.workers = file.workers;
        }
        if self.max_nonce == default_max_nonce() {
            self.max_nonce = file.max_nonce;
        }
        if self.prev_digest.is_empty() {
            self.prev_digest = file.prev_digest;
        }
        if self.tx_digest.is_empty() {
            self.tx_digest = file.tx_digest;
        }
        if self.timestamp.is_none() {
            self.timestamp = file.timestamp;
        }
        if self.validate_nonce.is_none() {
            self.validate_nonce = file.validate_nonce;
        }
        if self.log_level == default_log_level() {
            self.log_level = file.log_level;
        }
        if self.log_format == default_log_format() {
            self.log_format = file.log_format;
        }
        if self.log_file.is_none() {
            self.log_file = file.log_file;
        }
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        Difficulty::new(self.difficulty)?;
        hex_to_bytes(&self.prev_digest)
            .map_err(|e| Error::config(format!("Invalid prev digest: {}", e)))?;
        hex_to_bytes(&self.tx_digest)
            .map_err(|e| Error::config(format!("Invalid tx digest: {}", e)))?;

        if self.max_nonce <= 0 {
            return Err(Error::config("Max nonce must be greater than 0"));
        }

        Ok(())
    }

    /// Get parsed difficulty
    pub fn difficulty(&self) -> Result<Difficulty> {
        Difficulty::new(self.difficulty)
    }

    /// Search parameters
    pub fn search_config(&self) -> SearchConfig {
        SearchConfig::new(self.workers).with_max_nonce(self.max_nonce)
    }

    /// Block fields described by the configuration
    pub fn block(&self) -> Result<BlockFields> {
        let block = BlockFields::new(
            hex_to_bytes(&self.prev_digest)?,
            hex_to_bytes(&self.tx_digest)?,
            self.timestamp.unwrap_or_else(current_timestamp_secs),
        );
        Ok(match self.validate_nonce {
            Some(nonce) => block.with_nonce(Nonce::new(nonce)),
            None => block,
        })
    }
}

// Default value functions for serde
fn default_difficulty() -> i64 { i64::from(TARGET_BITS) }
fn default_max_nonce() -> i64 { MAX_NONCE }
fn default_log_level() -> LogLevel { LogLevel::Info }
fn default_log_format() -> LogFormat { LogFormat::Plain }
