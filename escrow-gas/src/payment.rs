//! Payment terms shared by both escrow encodings.
//!
//! A [`PaymentDescriptor`] is validated once, when it is built, and is then
//! read by both hash encoders and both orchestration paths without mutation.

use alloy_primitives::{Address, U256};
use rand::{RngExt, rng};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::error::DescriptorError;
use crate::timestamp::UnixTimestamp;

/// Fee ceiling in basis points (100%).
pub const MAX_FEE_BPS: u16 = 10_000;

/// All terms of one escrowed payment.
///
/// Fields are private: the only way to obtain a descriptor is
/// [`PaymentDescriptorBuilder::build`], which enforces `value > 0`,
/// `fee_bps <= 10000`, a fee recipient for non-zero fees, and a capture
/// deadline that is in the future and fits `uint48`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDescriptor {
    operator: Address,
    buyer: Address,
    token: Address,
    capture_address: Address,
    value: U256,
    capture_deadline: UnixTimestamp,
    fee_recipient: Address,
    fee_bps: u16,
}

impl PaymentDescriptor {
    /// Starts a builder for a payment of `value` units of `token` from `buyer`,
    /// operated by `operator`.
    #[must_use]
    pub const fn builder(
        operator: Address,
        buyer: Address,
        token: Address,
        value: U256,
    ) -> PaymentDescriptorBuilder {
        PaymentDescriptorBuilder {
            operator,
            buyer,
            token,
            value,
            capture_address: Address::ZERO,
            capture_deadline: UnixTimestamp::from_secs(0),
            fee_recipient: Address::ZERO,
            fee_bps: 0,
        }
    }

    /// Account allowed to capture, refund and void.
    #[must_use]
    pub const fn operator(&self) -> Address {
        self.operator
    }

    /// Payer, the `from` of the ERC-3009 authorization.
    #[must_use]
    pub const fn buyer(&self) -> Address {
        self.buyer
    }

    /// ERC-3009 token contract.
    #[must_use]
    pub const fn token(&self) -> Address {
        self.token
    }

    /// Address receiving captured funds.
    #[must_use]
    pub const fn capture_address(&self) -> Address {
        self.capture_address
    }

    /// Authorized amount in the token's smallest unit.
    #[must_use]
    pub const fn value(&self) -> U256 {
        self.value
    }

    /// Last moment a capture is accepted.
    #[must_use]
    pub const fn capture_deadline(&self) -> UnixTimestamp {
        self.capture_deadline
    }

    /// Address receiving the fee split.
    #[must_use]
    pub const fn fee_recipient(&self) -> Address {
        self.fee_recipient
    }

    /// Fee in basis points of the captured amount.
    #[must_use]
    pub const fn fee_bps(&self) -> u16 {
        self.fee_bps
    }
}

/// Builder for [`PaymentDescriptor`].
#[derive(Debug, Clone)]
pub struct PaymentDescriptorBuilder {
    operator: Address,
    buyer: Address,
    token: Address,
    value: U256,
    capture_address: Address,
    capture_deadline: UnixTimestamp,
    fee_recipient: Address,
    fee_bps: u16,
}

impl PaymentDescriptorBuilder {
    /// Sets the address receiving captured funds.
    #[must_use]
    pub const fn capture_address(mut self, capture_address: Address) -> Self {
        self.capture_address = capture_address;
        self
    }

    /// Sets the capture deadline.
    #[must_use]
    pub const fn capture_deadline(mut self, deadline: UnixTimestamp) -> Self {
        self.capture_deadline = deadline;
        self
    }

    /// Sets the fee split.
    #[must_use]
    pub const fn fee(mut self, recipient: Address, fee_bps: u16) -> Self {
        self.fee_recipient = recipient;
        self.fee_bps = fee_bps;
        self
    }

    /// Validates the terms against `now` and freezes them.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError`] when the value is zero, the fee exceeds
    /// [`MAX_FEE_BPS`], a non-zero fee has a zero recipient, or the capture
    /// deadline overflows `uint48` or is not after `now`.
    pub fn build(self, now: UnixTimestamp) -> Result<PaymentDescriptor, DescriptorError> {
        if self.value.is_zero() {
            return Err(DescriptorError::ZeroValue);
        }
        if self.fee_bps > MAX_FEE_BPS {
            return Err(DescriptorError::FeeBpsOverflow {
                fee_bps: self.fee_bps,
            });
        }
        if self.fee_bps > 0 && self.fee_recipient.is_zero() {
            return Err(DescriptorError::ZeroFeeRecipient);
        }
        if !self.capture_deadline.fits_uint48() {
            return Err(DescriptorError::CaptureDeadlineOverflow {
                deadline: self.capture_deadline,
            });
        }
        if self.capture_deadline.as_secs() <= now.as_secs() {
            return Err(DescriptorError::CaptureDeadlineElapsed {
                deadline: self.capture_deadline,
                now,
            });
        }
        Ok(PaymentDescriptor {
            operator: self.operator,
            buyer: self.buyer,
            token: self.token,
            capture_address: self.capture_address,
            value: self.value,
            capture_deadline: self.capture_deadline,
            fee_recipient: self.fee_recipient,
            fee_bps: self.fee_bps,
        })
    }
}

/// ERC-3009 validity bounds, shared by both variants of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationWindow {
    valid_after: UnixTimestamp,
    valid_before: UnixTimestamp,
}

impl AuthorizationWindow {
    /// Creates a window; `valid_after` must be strictly before `valid_before`.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::InvalidWindow`] for an empty window.
    pub fn new(
        valid_after: UnixTimestamp,
        valid_before: UnixTimestamp,
    ) -> Result<Self, DescriptorError> {
        if valid_after.as_secs() >= valid_before.as_secs() {
            return Err(DescriptorError::InvalidWindow {
                valid_after,
                valid_before,
            });
        }
        Ok(Self {
            valid_after,
            valid_before,
        })
    }

    /// Authorization is not valid before this timestamp.
    #[must_use]
    pub const fn valid_after(&self) -> UnixTimestamp {
        self.valid_after
    }

    /// Authorization expires at this timestamp.
    #[must_use]
    pub const fn valid_before(&self) -> UnixTimestamp {
        self.valid_before
    }
}

/// Per-variant entropy distinguishing otherwise identical payments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Salt(U256);

impl Salt {
    /// Wraps a raw `uint256` salt.
    #[must_use]
    pub const fn new(value: U256) -> Self {
        Self(value)
    }

    /// Draws a uniformly random 256-bit salt.
    #[must_use]
    pub fn random() -> Self {
        let bytes: [u8; 32] = rng().random();
        Self(U256::from_be_bytes(bytes))
    }

    /// The raw `uint256` value.
    #[must_use]
    pub const fn get(&self) -> U256 {
        self.0
    }
}

impl From<u64> for Salt {
    fn from(value: u64) -> Self {
        Self(U256::from(value))
    }
}

impl From<U256> for Salt {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl Display for Salt {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::networks::USDC_BASE;
    use crate::timestamp::MAX_UINT48;
    use alloy_primitives::address;

    pub(crate) const NOW: UnixTimestamp = UnixTimestamp::from_secs(1_700_000_000);
    pub(crate) const OPERATOR: Address = address!("0x1000000000000000000000000000000000000001");
    pub(crate) const BUYER: Address = address!("0x2000000000000000000000000000000000000002");
    pub(crate) const CAPTURE: Address = address!("0x2D893743B2A94Ac1695b5bB38dA965C49cf68450");

    pub(crate) fn builder() -> PaymentDescriptorBuilder {
        PaymentDescriptor::builder(OPERATOR, BUYER, USDC_BASE, U256::from(10_000))
            .capture_address(CAPTURE)
            .capture_deadline(UnixTimestamp::from_secs(1_700_003_600))
    }

    pub(crate) fn descriptor() -> PaymentDescriptor {
        builder().build(NOW).unwrap()
    }

    pub(crate) fn window() -> AuthorizationWindow {
        AuthorizationWindow::new(
            UnixTimestamp::from_secs(0),
            UnixTimestamp::from_secs(1_700_007_200),
        )
        .unwrap()
    }

    #[test]
    fn test_build_valid_descriptor() {
        let d = descriptor();
        assert_eq!(d.value(), U256::from(10_000));
        assert_eq!(d.fee_bps(), 0);
        assert_eq!(d.fee_recipient(), Address::ZERO);
        assert_eq!(d.capture_address(), CAPTURE);
    }

    #[test]
    fn test_fee_bps_boundary() {
        let recipient = address!("0x3000000000000000000000000000000000000003");
        assert!(builder().fee(recipient, 10_000).build(NOW).is_ok());
        assert_eq!(
            builder().fee(recipient, 10_001).build(NOW),
            Err(DescriptorError::FeeBpsOverflow { fee_bps: 10_001 })
        );
    }

    #[test]
    fn test_zero_value_rejected() {
        let result = PaymentDescriptor::builder(OPERATOR, BUYER, USDC_BASE, U256::ZERO)
            .capture_deadline(UnixTimestamp::from_secs(1_700_003_600))
            .build(NOW);
        assert_eq!(result, Err(DescriptorError::ZeroValue));
    }

    #[test]
    fn test_fee_without_recipient_rejected() {
        assert_eq!(
            builder().fee(Address::ZERO, 50).build(NOW),
            Err(DescriptorError::ZeroFeeRecipient)
        );
    }

    #[test]
    fn test_capture_deadline_must_be_future() {
        let result = builder().capture_deadline(NOW).build(NOW);
        assert!(matches!(
            result,
            Err(DescriptorError::CaptureDeadlineElapsed { .. })
        ));
    }

    #[test]
    fn test_capture_deadline_must_fit_uint48() {
        let deadline = UnixTimestamp::from_secs(MAX_UINT48 + 1);
        let result = builder().capture_deadline(deadline).build(NOW);
        assert_eq!(
            result,
            Err(DescriptorError::CaptureDeadlineOverflow { deadline })
        );
    }

    #[test]
    fn test_random_salts_differ() {
        assert_ne!(Salt::random(), Salt::random());
    }

    #[test]
    fn test_window_must_be_non_empty() {
        let t = UnixTimestamp::from_secs(100);
        assert!(AuthorizationWindow::new(t, t).is_err());
        assert!(AuthorizationWindow::new(UnixTimestamp::from_secs(101), t).is_err());
        assert!(AuthorizationWindow::new(UnixTimestamp::from_secs(99), t).is_ok());
    }
}
