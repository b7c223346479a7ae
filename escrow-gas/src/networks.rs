//! Known chains, USDC deployments and escrow deployments.

use alloy_primitives::{Address, address};

/// Base Mainnet chain ID.
pub const BASE_MAINNET: u64 = 8453;

/// Base Sepolia (testnet) chain ID.
pub const BASE_SEPOLIA: u64 = 84532;

/// USDC contract address on Base Mainnet.
pub const USDC_BASE: Address = address!("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");

/// USDC contract address on Base Sepolia.
pub const USDC_BASE_SEPOLIA: Address = address!("0x036CbD53842c5426634e7929541eC2318f3dCF7e");

/// Default EIP-712 domain name for USDC.
pub const DEFAULT_USDC_NAME: &str = "USD Coin";

/// Default EIP-712 domain version for USDC.
pub const DEFAULT_USDC_VERSION: &str = "2";

/// Default token decimals for USDC.
pub const DEFAULT_TOKEN_DECIMALS: u8 = 6;

/// Calldata-optimized payment escrow on Base Mainnet.
pub const CALLDATA_OPTIMIZED_ESCROW_BASE: Address =
    address!("0x948ca2f66C61a026b4B396EFCE887db811c6e35A");

/// Gas-optimized payment escrow on Base Mainnet.
pub const GAS_OPTIMIZED_ESCROW_BASE: Address =
    address!("0x0a04Bb730896B7bE1CE6c7ac62ecd7F5Daf52788");

/// Escrow contracts and the ERC-3009 token they pull from on one chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscrowDeployment {
    /// EIP-155 chain ID.
    pub chain_id: u64,
    /// ERC-3009 token (verifying contract of the signing domain).
    pub token: Address,
    /// Calldata-optimized escrow address.
    pub calldata_optimized: Address,
    /// Gas-optimized escrow address.
    pub gas_optimized: Address,
}

/// Returns every known escrow deployment.
#[must_use]
pub fn known_deployments() -> Vec<EscrowDeployment> {
    vec![EscrowDeployment {
        chain_id: BASE_MAINNET,
        token: USDC_BASE,
        calldata_optimized: CALLDATA_OPTIMIZED_ESCROW_BASE,
        gas_optimized: GAS_OPTIMIZED_ESCROW_BASE,
    }]
}

/// Returns the escrow deployment on `chain_id`, if any.
#[must_use]
pub fn deployment_for(chain_id: u64) -> Option<EscrowDeployment> {
    known_deployments()
        .into_iter()
        .find(|d| d.chain_id == chain_id)
}

/// Returns the USDC address on `chain_id`, if known.
#[must_use]
pub const fn usdc_for(chain_id: u64) -> Option<Address> {
    match chain_id {
        BASE_MAINNET => Some(USDC_BASE),
        BASE_SEPOLIA => Some(USDC_BASE_SEPOLIA),
        _ => None,
    }
}
