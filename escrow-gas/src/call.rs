//! Calldata builders for every escrow operation.
//!
//! The orchestrator only sequences `authorize` and `capture`. `charge`,
//! `refund` and `void` are here so an authorized-but-uncaptured payment left
//! behind by a failed run can be settled or released by hand.

use alloy_primitives::aliases::U48;
use alloy_primitives::{Bytes, U256};
use alloy_sol_types::SolCall;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::contract::{IPaymentEscrowCalldataOptimized, IPaymentEscrowGasOptimized};
use crate::digest::{Encoding, ScopedDigest, payment_details};
use crate::payment::{AuthorizationWindow, PaymentDescriptor};
use crate::transport::ContractCall;

/// An escrow entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Register the payment and pull the authorized funds into escrow.
    Authorize,
    /// Settle an authorized payment to the capture address.
    Capture,
    /// Authorize and capture in one call.
    Charge,
    /// Return captured funds to the buyer.
    Refund,
    /// Release an uncaptured authorization.
    Void,
}

impl Operation {
    /// The Solidity function name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Authorize => "authorize",
            Self::Capture => "capture",
            Self::Charge => "charge",
            Self::Refund => "refund",
            Self::Void => "void",
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds escrow calls for one payment under one encoding.
///
/// The target contract, the encoding and the salt all come from the
/// [`ScopedDigest`], so every call lands on the escrow the digest was
/// derived for.
#[derive(Debug, Clone, Copy)]
pub struct EscrowCall<'a> {
    descriptor: &'a PaymentDescriptor,
    window: &'a AuthorizationWindow,
    scoped: ScopedDigest,
}

impl<'a> EscrowCall<'a> {
    /// Creates a builder for the payment identified by `scoped`.
    #[must_use]
    pub const fn new(
        descriptor: &'a PaymentDescriptor,
        window: &'a AuthorizationWindow,
        scoped: ScopedDigest,
    ) -> Self {
        Self {
            descriptor,
            window,
            scoped,
        }
    }

    fn details(&self) -> IPaymentEscrowCalldataOptimized::PaymentDetails {
        let d = self.descriptor;
        IPaymentEscrowCalldataOptimized::PaymentDetails {
            operator: d.operator(),
            buyer: d.buyer(),
            token: d.token(),
            captureAddress: d.capture_address(),
            value: d.value(),
            captureDeadline: U48::from(d.capture_deadline().as_secs()),
            feeRecipient: d.fee_recipient(),
            feeBps: d.fee_bps(),
        }
    }

    fn encoded_details(&self) -> Bytes {
        payment_details(self.descriptor, self.window, self.scoped.salt())
    }

    fn call(&self, operation: Operation, calldata: Vec<u8>) -> ContractCall {
        ContractCall {
            to: self.scoped.escrow(),
            calldata: calldata.into(),
            operation,
        }
    }

    /// `authorize` for the full descriptor value, carrying the buyer's signature.
    #[must_use]
    pub fn authorize(&self, signature: &Bytes) -> ContractCall {
        let calldata = match self.scoped.encoding() {
            Encoding::Positional => IPaymentEscrowCalldataOptimized::authorizeCall {
                salt: self.scoped.salt().get(),
                details: self.details(),
                validAfter: self.window.valid_after().into(),
                validBefore: self.window.valid_before().into(),
                value: self.descriptor.value(),
                signature: signature.clone(),
            }
            .abi_encode(),
            Encoding::Struct => IPaymentEscrowGasOptimized::authorizeCall {
                value: self.descriptor.value(),
                paymentDetails: self.encoded_details(),
                signature: signature.clone(),
            }
            .abi_encode(),
        };
        self.call(Operation::Authorize, calldata)
    }

    /// `capture` of `amount` from an authorized payment.
    #[must_use]
    pub fn capture(&self, amount: U256) -> ContractCall {
        let calldata = match self.scoped.encoding() {
            Encoding::Positional => IPaymentEscrowCalldataOptimized::captureCall {
                paymentHash: self.scoped.digest().as_b256(),
                value: amount,
            }
            .abi_encode(),
            Encoding::Struct => IPaymentEscrowGasOptimized::captureCall {
                value: amount,
                paymentDetails: self.encoded_details(),
            }
            .abi_encode(),
        };
        self.call(Operation::Capture, calldata)
    }

    /// `charge` of `amount`: authorize and capture in one transaction.
    #[must_use]
    pub fn charge(&self, amount: U256, signature: &Bytes) -> ContractCall {
        let calldata = match self.scoped.encoding() {
            Encoding::Positional => IPaymentEscrowCalldataOptimized::chargeCall {
                salt: self.scoped.salt().get(),
                details: self.details(),
                value: amount,
                signature: signature.clone(),
            }
            .abi_encode(),
            Encoding::Struct => IPaymentEscrowGasOptimized::chargeCall {
                value: amount,
                paymentDetails: self.encoded_details(),
                signature: signature.clone(),
            }
            .abi_encode(),
        };
        self.call(Operation::Charge, calldata)
    }

    /// `refund` of `amount` of captured funds.
    #[must_use]
    pub fn refund(&self, amount: U256) -> ContractCall {
        let calldata = match self.scoped.encoding() {
            Encoding::Positional => IPaymentEscrowCalldataOptimized::refundCall {
                paymentHash: self.scoped.digest().as_b256(),
                value: amount,
            }
            .abi_encode(),
            Encoding::Struct => IPaymentEscrowGasOptimized::refundCall {
                value: amount,
                paymentDetails: self.encoded_details(),
            }
            .abi_encode(),
        };
        self.call(Operation::Refund, calldata)
    }

    /// `void` of the remaining authorization.
    #[must_use]
    pub fn void(&self) -> ContractCall {
        let calldata = match self.scoped.encoding() {
            Encoding::Positional => IPaymentEscrowCalldataOptimized::voidCall {
                paymentHash: self.scoped.digest().as_b256(),
            }
            .abi_encode(),
            Encoding::Struct => IPaymentEscrowGasOptimized::voidCall {
                paymentDetails: self.encoded_details(),
            }
            .abi_encode(),
        };
        self.call(Operation::Void, calldata)
    }
}
