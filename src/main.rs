//! pow-miner - mine or validate a single block payload

use pow_miner::{
    config::Config, logging::init_logging, ProofOfWork, Result, APP_NAME, APP_VERSION,
};
use std::process::ExitCode;
use tracing::{debug, error, info};

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            error!(category = e.category(), "{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<bool> {
    let config = Config::load()?;

    if config.print_config {
        print_configuration(&config)?;
        return Ok(true);
    }

    let _guard = init_logging(config.log_level, config.log_format, config.log_file.as_deref())?;

    info!("Starting {} v{}", APP_NAME, APP_VERSION);

    let difficulty = config.difficulty()?;
    let block = config.block()?;
    let pow = ProofOfWork::new(&block, difficulty);

    info!(
        "Block: prev={} tx={} timestamp={} difficulty={} threshold={}",
        hex::encode(&block.prev_digest),
        hex::encode(&block.tx_digest),
        block.timestamp,
        difficulty,
        pow.threshold()
    );

    if config.validate_nonce.is_some() {
        let valid = pow.validate();
        println!("{}", if valid { "valid" } else { "invalid" });
        return Ok(valid);
    }

    let result = pow.run(&config.search_config())?;
    debug!("Digest (little-endian): {}", result.digest_le_hex());

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(true)
}

/// Print current configuration
fn print_configuration(config: &Config) -> Result<()> {
    let config_yaml = serde_yaml::to_string(config)?;
    println!("{}", config_yaml);
    Ok(())
}
