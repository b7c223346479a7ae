//! Error types for escrow experiment runs.
//!
//! Construction-time validation failures are [`DescriptorError`]s. Everything
//! that goes wrong after signing starts is a [`RunError`] carrying the variant
//! and phase it happened in, so an operator can resume by hand.

use alloy_primitives::{Address, TxHash, U256};

use crate::call::Operation;
use crate::digest::Encoding;
use crate::payment::{MAX_FEE_BPS, Salt};
use crate::timestamp::UnixTimestamp;

/// Boxed error returned by external collaborators (transport, signer backends).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Validation failure while assembling payment terms or an experiment plan.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DescriptorError {
    /// Payment value is zero.
    #[error("payment value must be greater than zero")]
    ZeroValue,
    /// Fee exceeds 100%.
    #[error("fee of {fee_bps} bps exceeds {max} bps", max = MAX_FEE_BPS)]
    FeeBpsOverflow {
        /// Offending fee in basis points.
        fee_bps: u16,
    },
    /// A non-zero fee has nowhere to go.
    #[error("a non-zero fee requires a non-zero fee recipient")]
    ZeroFeeRecipient,
    /// Capture deadline does not fit the on-chain `uint48`.
    #[error("capture deadline {deadline} does not fit uint48")]
    CaptureDeadlineOverflow {
        /// Offending deadline.
        deadline: UnixTimestamp,
    },
    /// Capture deadline is not in the future.
    #[error("capture deadline {deadline} is not after current time {now}")]
    CaptureDeadlineElapsed {
        /// Offending deadline.
        deadline: UnixTimestamp,
        /// Reference time used for validation.
        now: UnixTimestamp,
    },
    /// `validAfter` is not strictly before `validBefore`.
    #[error("empty authorization window: validAfter {valid_after} >= validBefore {valid_before}")]
    InvalidWindow {
        /// Window start.
        valid_after: UnixTimestamp,
        /// Window end.
        valid_before: UnixTimestamp,
    },
    /// Requested capture is larger than the authorized value.
    #[error("capture value {capture} exceeds authorized value {value}")]
    CaptureExceedsValue {
        /// Requested capture amount.
        capture: U256,
        /// Authorized payment value.
        value: U256,
    },
    /// Requested capture is zero.
    #[error("capture value must be greater than zero")]
    ZeroCapture,
    /// Two escrows share a salt and would collide on the authorization nonce.
    #[error("salt {salt} is shared by escrows {first} and {second}")]
    SaltReuse {
        /// The duplicated salt.
        salt: Salt,
        /// First escrow using it.
        first: Address,
        /// Second escrow using it.
        second: Address,
    },
    /// The same encoding variant was targeted twice.
    #[error("variant {0} is targeted more than once")]
    DuplicateVariant(Encoding),
    /// An encoding variant has no target, so the run could not compare fees.
    #[error("variant {0} has no escrow target")]
    MissingVariant(Encoding),
}

/// The signing capability rejected or failed to produce a signature.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct SigningError(String);

impl SigningError {
    /// Creates a signing error from any message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    /// The underlying message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Fee accounting failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GasError {
    /// A fee product or sum left the `uint256` range.
    #[error("arithmetic overflow while computing {0}")]
    ArithmeticOverflow(&'static str),
    /// A comparison was requested for a variant with no recorded operations.
    #[error("no operations recorded for variant {0}")]
    MissingVariant(Encoding),
}

/// Coarse classification of run failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid payment terms or plan; nothing was signed.
    MalformedDescriptor,
    /// The signing capability failed, or produced a signature for the wrong contract.
    SigningFailure,
    /// The transport rejected a call.
    SubmissionFailure,
    /// A submitted call was never confirmed, or was included and reverted.
    InclusionFailure,
    /// Fee arithmetic overflowed.
    ArithmeticOverflow,
}

/// Hard failure of an experiment run.
///
/// No failure is retried. A failed capture after a successful authorize leaves
/// the payment authorized-but-uncaptured on-chain; the error carries the
/// variant and phase so it can be captured, refunded or voided manually.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// The plan failed validation before anything was signed.
    #[error("malformed descriptor: {0}")]
    Descriptor(#[from] DescriptorError),
    /// The signing capability failed.
    #[error("[{variant}] signing failed: {source}")]
    Signing {
        /// Variant being signed for.
        variant: Encoding,
        /// Underlying failure.
        source: SigningError,
    },
    /// The signing domain's verifying contract is not the payment token.
    #[error("[{variant}] signing domain contract {actual} is not the payment token {expected}")]
    DomainMismatch {
        /// Variant being run.
        variant: Encoding,
        /// Payment token.
        expected: Address,
        /// Verifying contract of the signing domain.
        actual: Address,
    },
    /// The transport refused the call.
    #[error("[{variant}] {phase} submission failed: {source}")]
    Submission {
        /// Variant being run.
        variant: Encoding,
        /// Operation being submitted.
        phase: Operation,
        /// Transport error.
        source: BoxError,
    },
    /// The transport never confirmed the transaction.
    #[error("[{variant}] {phase} transaction {tx} was not confirmed: {source}")]
    Inclusion {
        /// Variant being run.
        variant: Encoding,
        /// Operation awaiting inclusion.
        phase: Operation,
        /// Submitted transaction.
        tx: TxHash,
        /// Transport error.
        source: BoxError,
    },
    /// The transaction was included with a failed status.
    #[error("[{variant}] {phase} transaction {tx} reverted")]
    Reverted {
        /// Variant being run.
        variant: Encoding,
        /// Operation that reverted.
        phase: Operation,
        /// Reverted transaction.
        tx: TxHash,
    },
    /// Fee accounting for an included transaction failed.
    #[error("[{variant}] {phase} fee accounting failed: {source}")]
    Gas {
        /// Variant being run.
        variant: Encoding,
        /// Operation being accounted.
        phase: Operation,
        /// Accounting error.
        source: GasError,
    },
    /// The final comparison failed.
    #[error("fee report failed: {0}")]
    Report(#[source] GasError),
}

impl RunError {
    /// Classifies the failure.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Descriptor(_) => ErrorKind::MalformedDescriptor,
            Self::Signing { .. } | Self::DomainMismatch { .. } => ErrorKind::SigningFailure,
            Self::Submission { .. } => ErrorKind::SubmissionFailure,
            Self::Inclusion { .. } | Self::Reverted { .. } => ErrorKind::InclusionFailure,
            Self::Gas { source, .. } | Self::Report(source) => match source {
                GasError::ArithmeticOverflow(_) => ErrorKind::ArithmeticOverflow,
                GasError::MissingVariant(_) => ErrorKind::InclusionFailure,
            },
        }
    }

    /// Variant the failure belongs to, if any.
    #[must_use]
    pub const fn variant(&self) -> Option<Encoding> {
        match self {
            Self::Descriptor(_) | Self::Report(_) => None,
            Self::Signing { variant, .. }
            | Self::DomainMismatch { variant, .. }
            | Self::Submission { variant, .. }
            | Self::Inclusion { variant, .. }
            | Self::Reverted { variant, .. }
            | Self::Gas { variant, .. } => Some(*variant),
        }
    }

    /// On-chain operation the failure happened in, if any.
    #[must_use]
    pub const fn phase(&self) -> Option<Operation> {
        match self {
            Self::Submission { phase, .. }
            | Self::Inclusion { phase, .. }
            | Self::Reverted { phase, .. }
            | Self::Gas { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}
