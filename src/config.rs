use crate::chain::{Commitment, RpcConnector};
use crate::scan_core::{ExtractorPolicy, RetryPolicy, ScanOptions, DEFAULT_BATCH_SIZE};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_RPC_URL: &str = "https://api.mainnet-beta.solana.com";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing value: {0}")]
    MissingVariable(String),
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Runtime configuration: environment first, then command-line overrides.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub rpc_url: String,
    pub target_address: Option<String>,
    pub batch_size: usize,
    pub retry_backoff_ms: u64,
    pub max_retries: Option<u32>,
    pub rpc_timeout_secs: u64,
    pub commitment: Commitment,
    pub rust_log: Option<String>,
    pub json_output: Option<PathBuf>,
    pub plain: bool,
    /// Count every balance-moving transaction, not just plain transfers.
    pub all_shapes: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            target_address: None,
            batch_size: DEFAULT_BATCH_SIZE,
            retry_backoff_ms: 1_000,
            max_retries: None,
            rpc_timeout_secs: 60,
            commitment: Commitment::Confirmed,
            rust_log: None,
            json_output: None,
            plain: false,
            all_shapes: false,
        }
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidValue(format!("{} must be a number, got '{}'", name, raw)))
}

fn parse_commitment(raw: &str) -> Commitment {
    match raw.to_lowercase().as_str() {
        "processed" => Commitment::Processed,
        "confirmed" => Commitment::Confirmed,
        "finalized" => Commitment::Finalized,
        _ => {
            log::warn!("Invalid COMMITMENT '{}', defaulting to confirmed", raw);
            Commitment::Confirmed
        }
    }
}

impl ScanConfig {
    /// Environment variables:
    /// - `RPC_URL` (default: mainnet-beta public endpoint)
    /// - `TARGET_ADDRESS`
    /// - `BATCH_SIZE` (default: 20)
    /// - `RETRY_BACKOFF_MS` (default: 1000)
    /// - `MAX_RETRIES` (default: unbounded)
    /// - `RPC_TIMEOUT_SECS` (default: 60)
    /// - `COMMITMENT` (default: confirmed)
    /// - `RUST_LOG` (default: info with `--plain`, errors only in the TUI)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("RPC_URL") {
            config.rpc_url = url;
        }

        config.target_address = lookup("TARGET_ADDRESS").filter(|a| !a.trim().is_empty());

        if let Some(raw) = lookup("BATCH_SIZE") {
            config.batch_size = parse_number("BATCH_SIZE", &raw)?;
        }

        if let Some(raw) = lookup("RETRY_BACKOFF_MS") {
            config.retry_backoff_ms = parse_number("RETRY_BACKOFF_MS", &raw)?;
        }

        if let Some(raw) = lookup("MAX_RETRIES") {
            config.max_retries = Some(parse_number("MAX_RETRIES", &raw)?);
        }

        if let Some(raw) = lookup("RPC_TIMEOUT_SECS") {
            config.rpc_timeout_secs = parse_number("RPC_TIMEOUT_SECS", &raw)?;
        }

        if let Some(raw) = lookup("COMMITMENT") {
            config.commitment = parse_commitment(&raw);
        }

        config.rust_log = lookup("RUST_LOG").filter(|level| !level.trim().is_empty());

        Ok(config)
    }

    /// Apply `--rpc`, `--address`, `--batch-size`, `--json`, `--plain` and
    /// `--all-transactions`. A bare trailing argument is taken as the address.
    pub fn apply_args(&mut self, args: &[String]) -> Result<(), ConfigError> {
        let mut iter = args.iter().peekable();

        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--plain" => self.plain = true,
                "--all-transactions" => self.all_shapes = true,
                "--rpc" | "--address" | "--batch-size" | "--json" => {
                    let value = iter
                        .next()
                        .ok_or_else(|| ConfigError::MissingVariable(format!("value for {}", arg)))?;

                    match arg.as_str() {
                        "--rpc" => self.rpc_url = value.clone(),
                        "--address" => self.target_address = Some(value.clone()),
                        "--batch-size" => self.batch_size = parse_number("--batch-size", value)?,
                        _ => self.json_output = Some(PathBuf::from(value)),
                    }
                }
                other if other.starts_with("--") => {
                    return Err(ConfigError::InvalidValue(format!("unknown flag {}", other)));
                }
                other => {
                    if iter.peek().is_none() && self.target_address.is_none() {
                        self.target_address = Some(other.to_string());
                    } else {
                        return Err(ConfigError::InvalidValue(format!("unexpected argument {}", other)));
                    }
                }
            }
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.rpc_url.starts_with("http://") && !self.rpc_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "RPC URL must start with http:// or https://".to_string(),
            ));
        }

        if self.batch_size == 0 {
            return Err(ConfigError::InvalidValue("batch size must be at least 1".to_string()));
        }

        Ok(())
    }

    /// Log filter for the binary. Without `RUST_LOG` the TUI stays quiet
    /// (stderr shares the terminal) and plain mode logs at `info`.
    pub fn log_filter(&self) -> Option<&str> {
        match &self.rust_log {
            Some(level) => Some(level.as_str()),
            None if self.plain => Some("info"),
            None => None,
        }
    }

    pub fn scan_options(&self) -> ScanOptions {
        let mut retry = RetryPolicy::fixed(Duration::from_millis(self.retry_backoff_ms));
        retry.max_retries = self.max_retries;

        ScanOptions {
            batch_size: self.batch_size,
            retry,
            extractor: if self.all_shapes {
                ExtractorPolicy::any_shape()
            } else {
                ExtractorPolicy::default()
            },
        }
    }

    pub fn connector(&self) -> RpcConnector {
        RpcConnector {
            commitment: self.commitment,
            timeout: Duration::from_secs(self.rpc_timeout_secs),
        }
    }
}
