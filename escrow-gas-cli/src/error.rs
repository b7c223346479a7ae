//! Error types for the experiment binary.

use escrow_gas::{DescriptorError, RunError};

/// Configuration loading failure.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read config file {path}: {source}")]
    Read {
        /// Configuration file path.
        path: String,
        /// I/O error.
        source: std::io::Error,
    },
    /// The configuration is not valid TOML or has invalid values.
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Errors that abort the experiment binary.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The signer key is missing or malformed.
    #[error("invalid signer key: {0}")]
    InvalidKey(String),
    /// No token configured and no USDC deployment known for the chain.
    #[error("no token configured and no known USDC deployment on chain {0}")]
    UnknownToken(u64),
    /// A configured time-to-live pushes a timestamp past `u64`.
    #[error("{0} overflows the timestamp range")]
    TimeOverflow(&'static str),
    /// Payment terms or plan failed validation.
    #[error("malformed descriptor: {0}")]
    Descriptor(#[from] DescriptorError),
    /// The experiment run failed.
    #[error(transparent)]
    Run(#[from] RunError),
    /// The report could not be serialized.
    #[error("cannot serialize report: {0}")]
    Json(#[from] serde_json::Error),
}
