//! Turns a loaded configuration into a validated experiment plan.
//!
//! This is the only place wall-clock time enters an experiment: the capture
//! deadline and the authorization `validBefore` are offsets from `now`.

use alloy_primitives::{Address, U256};
use escrow_gas::networks::{DEFAULT_USDC_NAME, DEFAULT_USDC_VERSION, usdc_for};
use escrow_gas::{
    AuthorizationDomain, AuthorizationWindow, Encoding, EscrowTarget, ExperimentPlan,
    PaymentDescriptor, Salt, UnixTimestamp,
};

use crate::config::ExperimentConfig;
use crate::error::CliError;

/// Command-line adjustments applied on top of the configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Draw fresh random salts instead of the configured ones.
    pub random_salts: bool,
    /// Amount to capture; the full payment value when unset.
    pub capture_value: Option<u64>,
}

/// Resolves the ERC-3009 token: the configured one, else USDC on the chain.
///
/// # Errors
///
/// Returns [`CliError::UnknownToken`] if neither is available.
pub fn resolve_token(config: &ExperimentConfig) -> Result<Address, CliError> {
    config
        .token
        .or_else(|| usdc_for(config.chain_id))
        .ok_or(CliError::UnknownToken(config.chain_id))
}

/// EIP-712 domain the buyer signs under.
#[must_use]
pub fn signing_domain(config: &ExperimentConfig, token: Address) -> AuthorizationDomain {
    AuthorizationDomain {
        name: config
            .token_name
            .clone()
            .unwrap_or_else(|| DEFAULT_USDC_NAME.to_owned()),
        version: config
            .token_version
            .clone()
            .unwrap_or_else(|| DEFAULT_USDC_VERSION.to_owned()),
        chain_id: config.chain_id,
        verifying_contract: token,
    }
}

/// Builds the plan for one run started at `now`.
///
/// The operator and the buyer default to `signer`, and the capture address
/// defaults to the operator.
///
/// # Errors
///
/// Returns [`CliError`] if the token cannot be resolved, a time-to-live
/// overflows, or the resulting terms fail validation.
pub fn build_plan(
    config: &ExperimentConfig,
    signer: Address,
    now: UnixTimestamp,
    options: RunOptions,
) -> Result<ExperimentPlan, CliError> {
    let token = resolve_token(config)?;
    let operator = config.operator.unwrap_or(signer);
    let buyer = config.buyer.unwrap_or(signer);
    let capture_address = config.capture_address.unwrap_or(operator);

    let deadline = now
        .checked_add(config.capture_ttl_secs)
        .ok_or(CliError::TimeOverflow("capture deadline"))?;
    let valid_before = now
        .checked_add(config.authorization_ttl_secs)
        .ok_or(CliError::TimeOverflow("authorization validBefore"))?;

    let descriptor = PaymentDescriptor::builder(operator, buyer, token, U256::from(config.value))
        .capture_address(capture_address)
        .capture_deadline(deadline)
        .fee(config.fee_recipient.unwrap_or_default(), config.fee_bps)
        .build(now)?;
    let window = AuthorizationWindow::new(UnixTimestamp::from_secs(config.valid_after), valid_before)?;

    let variants = &config.variants;
    let salt = |configured: u64| {
        if options.random_salts {
            Salt::random()
        } else {
            Salt::from(configured)
        }
    };
    let targets = [
        EscrowTarget {
            encoding: Encoding::Positional,
            escrow: variants.calldata_optimized.escrow,
            salt: salt(variants.calldata_optimized.salt),
        },
        EscrowTarget {
            encoding: Encoding::Struct,
            escrow: variants.gas_optimized.escrow,
            salt: salt(variants.gas_optimized.salt),
        },
    ];

    let capture_value = U256::from(options.capture_value.unwrap_or(config.value));
    Ok(ExperimentPlan::new(descriptor, window, targets, capture_value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use escrow_gas::DescriptorError;
    use escrow_gas::networks::{
        CALLDATA_OPTIMIZED_ESCROW_BASE, GAS_OPTIMIZED_ESCROW_BASE, USDC_BASE,
    };

    const NOW: UnixTimestamp = UnixTimestamp::from_secs(1_700_000_000);
    const SIGNER: Address = address!("0x2000000000000000000000000000000000000002");

    fn config(extra: &str) -> ExperimentConfig {
        ExperimentConfig::parse(&format!("signer_private_key = \"0x01\"\n{extra}")).unwrap()
    }

    #[test]
    fn test_defaults_follow_signer() {
        let plan = build_plan(&config(""), SIGNER, NOW, RunOptions::default()).unwrap();
        let descriptor = plan.descriptor();
        assert_eq!(descriptor.operator(), SIGNER);
        assert_eq!(descriptor.buyer(), SIGNER);
        assert_eq!(descriptor.capture_address(), SIGNER);
        assert_eq!(descriptor.token(), USDC_BASE);
        assert_eq!(descriptor.value(), U256::from(10_000));
        assert_eq!(descriptor.capture_deadline().as_secs(), 1_700_003_600);
        assert_eq!(plan.window().valid_after().as_secs(), 0);
        assert_eq!(plan.window().valid_before().as_secs(), 1_700_007_200);
        assert_eq!(plan.capture_value(), U256::from(10_000));
    }

    #[test]
    fn test_configured_targets() {
        let plan = build_plan(&config(""), SIGNER, NOW, RunOptions::default()).unwrap();
        let targets = plan.targets();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].encoding, Encoding::Positional);
        assert_eq!(targets[0].escrow, CALLDATA_OPTIMIZED_ESCROW_BASE);
        assert_eq!(targets[0].salt, Salt::from(123));
        assert_eq!(targets[1].encoding, Encoding::Struct);
        assert_eq!(targets[1].escrow, GAS_OPTIMIZED_ESCROW_BASE);
        assert_eq!(targets[1].salt, Salt::from(456));
    }

    #[test]
    fn test_random_salts() {
        let options = RunOptions {
            random_salts: true,
            capture_value: None,
        };
        let plan = build_plan(&config(""), SIGNER, NOW, options).unwrap();
        let targets = plan.targets();
        assert_ne!(targets[0].salt, Salt::from(123));
        assert_ne!(targets[0].salt, targets[1].salt);
    }

    #[test]
    fn test_capture_address_defaults_to_operator() {
        let operator = address!("0x1000000000000000000000000000000000000001");
        let plan = build_plan(
            &config("operator = \"0x1000000000000000000000000000000000000001\""),
            SIGNER,
            NOW,
            RunOptions::default(),
        )
        .unwrap();
        assert_eq!(plan.descriptor().operator(), operator);
        assert_eq!(plan.descriptor().capture_address(), operator);
        assert_eq!(plan.descriptor().buyer(), SIGNER);
    }

    #[test]
    fn test_partial_capture() {
        let options = RunOptions {
            random_salts: false,
            capture_value: Some(2_500),
        };
        let plan = build_plan(&config(""), SIGNER, NOW, options).unwrap();
        assert_eq!(plan.capture_value(), U256::from(2_500));

        let options = RunOptions {
            random_salts: false,
            capture_value: Some(20_000),
        };
        assert!(matches!(
            build_plan(&config(""), SIGNER, NOW, options),
            Err(CliError::Descriptor(DescriptorError::CaptureExceedsValue { .. }))
        ));
    }

    #[test]
    fn test_unknown_chain_needs_token() {
        let err = build_plan(&config("chain_id = 1"), SIGNER, NOW, RunOptions::default())
            .unwrap_err();
        assert!(matches!(err, CliError::UnknownToken(1)));

        let plan = build_plan(
            &config("chain_id = 1\ntoken = \"0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48\""),
            SIGNER,
            NOW,
            RunOptions::default(),
        )
        .unwrap();
        assert_eq!(
            plan.descriptor().token(),
            address!("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48")
        );
    }

    #[test]
    fn test_ttl_overflow() {
        let mut cfg = config("");
        cfg.capture_ttl_secs = u64::MAX;
        let err = build_plan(&cfg, SIGNER, NOW, RunOptions::default()).unwrap_err();
        assert!(matches!(err, CliError::TimeOverflow("capture deadline")));

        let mut cfg = config("");
        cfg.authorization_ttl_secs = u64::MAX;
        let err = build_plan(&cfg, SIGNER, NOW, RunOptions::default()).unwrap_err();
        assert!(matches!(err, CliError::TimeOverflow("authorization validBefore")));
    }

    #[test]
    fn test_signing_domain() {
        let cfg = config("token_name = \"USDC\"");
        let domain = signing_domain(&cfg, USDC_BASE);
        assert_eq!(domain.name, "USDC");
        assert_eq!(domain.version, "2");
        assert_eq!(domain.chain_id, 8453);
        assert_eq!(domain.verifying_contract, USDC_BASE);
    }
}
