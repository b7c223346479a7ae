//! Experiment configuration.
//!
//! Loads configuration from a TOML file with support for environment variable
//! expansion in string values. Variables use `$VAR` or `${VAR}` syntax.
//!
//! # Example Configuration
//!
//! ```toml
//! rpc_url = "https://mainnet.base.org"
//! chain_id = 8453
//! signer_private_key = "$BUYER_PRIVATE_KEY"
//! capture_address = "0x2D893743B2A94Ac1695b5bB38dA965C49cf68450"
//! value = 10000
//!
//! [variants.calldata_optimized]
//! escrow = "0x948ca2f66C61a026b4B396EFCE887db811c6e35A"
//! salt = 123
//!
//! [variants.gas_optimized]
//! escrow = "0x0a04Bb730896B7bE1CE6c7ac62ecd7F5Daf52788"
//! salt = 456
//! ```
//!
//! # Environment Variables
//!
//! - `CONFIG` - Path to configuration file (default: `escrow-gas.toml`)
//! - `RPC_URL` - Override the RPC endpoint
//! - Signer keys referenced by `$VAR` in the config file

use std::path::Path;

use alloy_primitives::Address;
use escrow_gas::networks::{
    BASE_MAINNET, CALLDATA_OPTIMIZED_ESCROW_BASE, GAS_OPTIMIZED_ESCROW_BASE,
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;

/// Default configuration file name.
pub const DEFAULT_CONFIG_PATH: &str = "escrow-gas.toml";

/// Top-level experiment configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// HTTP RPC endpoint URL.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: Url,

    /// EIP-155 chain ID (default: Base, `8453`).
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,

    /// Private key of the buyer (hex, with or without `0x` prefix).
    /// Supports `$VAR` / `${VAR}` for environment variable expansion.
    pub signer_private_key: String,

    /// ERC-3009 token (default: USDC on `chain_id`).
    #[serde(default)]
    pub token: Option<Address>,

    /// EIP-712 domain name of the token (default: `USD Coin`).
    #[serde(default)]
    pub token_name: Option<String>,

    /// EIP-712 domain version of the token (default: `2`).
    #[serde(default)]
    pub token_version: Option<String>,

    /// Payment operator (default: the signer).
    #[serde(default)]
    pub operator: Option<Address>,

    /// Buyer (default: the signer).
    #[serde(default)]
    pub buyer: Option<Address>,

    /// Address receiving captured funds (default: the operator).
    #[serde(default)]
    pub capture_address: Option<Address>,

    /// Payment value in the token's smallest unit.
    #[serde(default = "default_value")]
    pub value: u64,

    /// Fee in basis points.
    #[serde(default)]
    pub fee_bps: u16,

    /// Fee recipient (default: zero address).
    #[serde(default)]
    pub fee_recipient: Option<Address>,

    /// Capture deadline, in seconds from start.
    #[serde(default = "default_capture_ttl")]
    pub capture_ttl_secs: u64,

    /// Authorization `validBefore`, in seconds from start.
    #[serde(default = "default_authorization_ttl")]
    pub authorization_ttl_secs: u64,

    /// Authorization `validAfter`, absolute Unix time.
    #[serde(default)]
    pub valid_after: u64,

    /// Receipt wait timeout in seconds; unset waits indefinitely.
    #[serde(default)]
    pub receipt_timeout_secs: Option<u64>,

    /// Block confirmations to wait for.
    #[serde(default = "default_confirmations")]
    pub confirmations: u64,

    /// Escrow deployments and salts.
    #[serde(default)]
    pub variants: VariantsConfig,
}

/// Both escrow variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantsConfig {
    /// Calldata-optimized escrow.
    #[serde(default = "default_calldata_optimized")]
    pub calldata_optimized: VariantConfig,
    /// Gas-optimized escrow.
    #[serde(default = "default_gas_optimized")]
    pub gas_optimized: VariantConfig,
}

impl Default for VariantsConfig {
    fn default() -> Self {
        Self {
            calldata_optimized: default_calldata_optimized(),
            gas_optimized: default_gas_optimized(),
        }
    }
}

/// One escrow deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantConfig {
    /// Escrow contract address.
    pub escrow: Address,
    /// Digest salt.
    pub salt: u64,
}

fn default_rpc_url() -> Url {
    Url::parse("https://mainnet.base.org").expect("static URL is valid")
}

const fn default_chain_id() -> u64 {
    BASE_MAINNET
}

const fn default_value() -> u64 {
    10_000
}

const fn default_capture_ttl() -> u64 {
    3_600
}

const fn default_authorization_ttl() -> u64 {
    7_200
}

const fn default_confirmations() -> u64 {
    1
}

const fn default_calldata_optimized() -> VariantConfig {
    VariantConfig {
        escrow: CALLDATA_OPTIMIZED_ESCROW_BASE,
        salt: 123,
    }
}

const fn default_gas_optimized() -> VariantConfig {
    VariantConfig {
        escrow: GAS_OPTIMIZED_ESCROW_BASE,
        salt: 456,
    }
}

impl ExperimentConfig {
    /// Loads configuration from `path`.
    ///
    /// All `$VAR` / `${VAR}` references are expanded from the process
    /// environment before parsing. `RPC_URL` overrides the file value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let mut config = Self::parse(&content)?;

        if let Ok(rpc_url) = std::env::var("RPC_URL") {
            if let Ok(url) = rpc_url.parse() {
                config.rpc_url = url;
            }
        }

        Ok(config)
    }

    /// Parses configuration text after environment expansion.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on invalid TOML or field values.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(content);
        Ok(toml::from_str(&expanded)?)
    }
}

/// Expands `$VAR` and `${VAR}` patterns in a string from environment variables.
///
/// Unresolved variables are left as-is.
fn expand_env_vars(input: &str) -> String {
    expand_with(input, |name| std::env::var(name).ok())
}

fn expand_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            result.push(ch);
            continue;
        }
        let braced = chars.peek() == Some(&'{');
        if braced {
            chars.next();
        }

        let mut var_name = String::new();
        while let Some(&c) = chars.peek() {
            if braced {
                if c == '}' {
                    chars.next();
                    break;
                }
            } else if !c.is_ascii_alphanumeric() && c != '_' {
                break;
            }
            var_name.push(c);
            chars.next();
        }

        match lookup(&var_name) {
            Some(value) if !var_name.is_empty() => result.push_str(&value),
            _ => {
                result.push('$');
                if braced {
                    result.push('{');
                }
                result.push_str(&var_name);
                if braced && !var_name.is_empty() {
                    result.push('}');
                }
            }
        }
    }

    result
}
