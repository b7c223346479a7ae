//! Payment-hash derivation for both escrow encodings.
//!
//! The digest is the canonical identity of a payment: the escrow contract
//! recomputes it on `authorize`, and it is also the ERC-3009 nonce the buyer
//! signs. It must therefore be byte-identical to what the contract derives.
//!
//! - [`Encoding::Positional`] (calldata-optimized escrow) hashes ten fields in a
//!   fixed order. `buyer` is not part of this preimage; that escrow binds the
//!   buyer through the ERC-3009 `from` field instead.
//! - [`Encoding::Struct`] (gas-optimized escrow) hashes the ABI encoding of an
//!   eleven-field struct, which is also the `paymentDetails` argument sent on-chain.
//!
//! The two encoders intentionally disagree for the same payment.

use alloy_primitives::aliases::U48;
use alloy_primitives::{Address, B256, Bytes, keccak256};
use alloy_sol_types::{SolValue, sol};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::payment::{AuthorizationWindow, PaymentDescriptor, Salt};

sol! {
    /// Preimage layout hashed by the calldata-optimized escrow.
    ///
    /// Every member is static, so the struct encoding equals the flat
    /// parameter encoding `abi.encode(value, validAfter, ..., salt)`.
    #[allow(missing_docs)]
    #[derive(Debug)]
    struct PositionalPaymentTerms {
        uint256 value;
        uint256 validAfter;
        uint256 validBefore;
        uint48 captureDeadline;
        address operator;
        address captureAddress;
        uint16 feeBps;
        address feeRecipient;
        address token;
        uint256 salt;
    }
}

sol! {
    /// `paymentDetails` layout understood by the gas-optimized escrow.
    #[allow(missing_docs)]
    #[derive(Debug)]
    struct EncodedPaymentDetails {
        address token;
        address buyer;
        uint256 value;
        uint256 validAfter;
        uint256 validBefore;
        uint48 captureDeadline;
        address operator;
        address captureAddress;
        uint16 feeBps;
        address feeRecipient;
        uint256 salt;
    }
}

/// The on-chain encoding scheme a payment is hashed and submitted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Encoding {
    /// Flat positional hash, typed call arguments.
    #[serde(rename = "calldata-optimized")]
    Positional,
    /// Struct hash, payment details passed as `bytes`.
    #[serde(rename = "gas-optimized")]
    Struct,
}

impl Encoding {
    /// Both encodings, in run order.
    pub const ALL: [Self; 2] = [Self::Positional, Self::Struct];

    /// Name of the escrow variant using this encoding.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Positional => "calldata-optimized",
            Self::Struct => "gas-optimized",
        }
    }

    /// Derives the payment digest under this encoding.
    #[must_use]
    pub fn digest(
        self,
        descriptor: &PaymentDescriptor,
        window: &AuthorizationWindow,
        salt: Salt,
    ) -> PaymentDigest {
        match self {
            Self::Positional => positional_digest(descriptor, window, salt),
            Self::Struct => struct_digest(descriptor, window, salt),
        }
    }

    /// Derives the digest and binds it to the escrow that will verify it.
    #[must_use]
    pub fn scoped_digest(
        self,
        escrow: Address,
        descriptor: &PaymentDescriptor,
        window: &AuthorizationWindow,
        salt: Salt,
    ) -> ScopedDigest {
        ScopedDigest {
            digest: self.digest(descriptor, window, salt),
            encoding: self,
            escrow,
            salt,
        }
    }
}

impl Display for Encoding {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// 32-byte payment identity, also used as the ERC-3009 nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentDigest(B256);

impl PaymentDigest {
    /// Wraps a raw hash.
    #[must_use]
    pub const fn new(hash: B256) -> Self {
        Self(hash)
    }

    /// The raw 32 bytes.
    #[must_use]
    pub const fn as_b256(&self) -> B256 {
        self.0
    }
}

impl Display for PaymentDigest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A digest tagged with the encoding, escrow contract and salt it was derived for.
///
/// Only [`Encoding::scoped_digest`] creates one. Signing and call building take
/// a `ScopedDigest` rather than a bare digest, so the ERC-3009 `to` field and
/// the call target always come from the same place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopedDigest {
    digest: PaymentDigest,
    encoding: Encoding,
    escrow: Address,
    salt: Salt,
}

impl ScopedDigest {
    /// The payment digest.
    #[must_use]
    pub const fn digest(&self) -> PaymentDigest {
        self.digest
    }

    /// Encoding the digest was computed with.
    #[must_use]
    pub const fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Escrow contract the digest is bound to.
    #[must_use]
    pub const fn escrow(&self) -> Address {
        self.escrow
    }

    /// Salt included in the preimage.
    #[must_use]
    pub const fn salt(&self) -> Salt {
        self.salt
    }
}

/// ABI preimage of the calldata-optimized digest.
#[must_use]
pub fn positional_preimage(
    descriptor: &PaymentDescriptor,
    window: &AuthorizationWindow,
    salt: Salt,
) -> Vec<u8> {
    PositionalPaymentTerms {
        value: descriptor.value(),
        validAfter: window.valid_after().into(),
        validBefore: window.valid_before().into(),
        captureDeadline: U48::from(descriptor.capture_deadline().as_secs()),
        operator: descriptor.operator(),
        captureAddress: descriptor.capture_address(),
        feeBps: descriptor.fee_bps(),
        feeRecipient: descriptor.fee_recipient(),
        token: descriptor.token(),
        salt: salt.get(),
    }
    .abi_encode()
}

/// Calldata-optimized digest: `keccak256(abi.encode(value, ..., salt))`.
#[must_use]
pub fn positional_digest(
    descriptor: &PaymentDescriptor,
    window: &AuthorizationWindow,
    salt: Salt,
) -> PaymentDigest {
    PaymentDigest(keccak256(positional_preimage(descriptor, window, salt)))
}

/// ABI-encoded `paymentDetails` argument of the gas-optimized escrow.
#[must_use]
pub fn payment_details(
    descriptor: &PaymentDescriptor,
    window: &AuthorizationWindow,
    salt: Salt,
) -> Bytes {
    EncodedPaymentDetails {
        token: descriptor.token(),
        buyer: descriptor.buyer(),
        value: descriptor.value(),
        validAfter: window.valid_after().into(),
        validBefore: window.valid_before().into(),
        captureDeadline: U48::from(descriptor.capture_deadline().as_secs()),
        operator: descriptor.operator(),
        captureAddress: descriptor.capture_address(),
        feeBps: descriptor.fee_bps(),
        feeRecipient: descriptor.fee_recipient(),
        salt: salt.get(),
    }
    .abi_encode()
    .into()
}

/// Gas-optimized digest: `keccak256(paymentDetails)`.
#[must_use]
pub fn struct_digest(
    descriptor: &PaymentDescriptor,
    window: &AuthorizationWindow,
    salt: Salt,
) -> PaymentDigest {
    PaymentDigest(keccak256(payment_details(descriptor, window, salt)))
}
