#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Payment-escrow authorization, capture and gas comparison.
//!
//! This crate builds, signs and submits `authorize` / `capture` operations
//! against two on-chain encodings of the same payment-escrow protocol, and
//! compares what each of them costs once the transactions are included.
//!
//! - **calldata-optimized** escrow: payment terms travel as typed arguments and
//!   the payment is identified on-chain by a positional hash of its terms.
//! - **gas-optimized** escrow: payment terms travel as one ABI-encoded `bytes`
//!   blob whose keccak hash identifies the payment.
//!
//! In both cases the payment hash doubles as the ERC-3009
//! `receiveWithAuthorization` nonce signed by the buyer.
//!
//! # Architecture
//!
//! - [`payment`] - Payment descriptor, authorization window and salt
//! - [`digest`] - The two payment-hash encoders and contract-scoped digests
//! - [`authorization`] - ERC-3009 typed-data signing requests and signers
//! - [`contract`] - Solidity interfaces of both escrow deployments
//! - [`call`] - Calldata builders for every escrow operation
//! - [`transport`] - Chain transport abstraction
//! - [`gas`] - Execution and data-availability fee accounting
//! - [`report`] - Two-variant fee comparison report
//! - [`orchestrator`] - Sequential authorize → capture runs per variant
//! - [`sink`] - Injected progress-line sinks
//!
//! # Feature Flags
//!
//! - `telemetry` - `tracing` instrumentation and [`sink::TracingSink`]
//! - `signer-local` - [`authorization::TypedDataSigner`] for `PrivateKeySigner`
//! - `provider` - alloy JSON-RPC [`transport::ChainTransport`] implementation

/// Awaits a future, optionally instrumenting it with a tracing span.
macro_rules! traced {
    ($fut:expr, $span:expr) => {{
        #[cfg(feature = "telemetry")]
        {
            use tracing::Instrument;
            $fut.instrument($span).await
        }
        #[cfg(not(feature = "telemetry"))]
        {
            $fut.await
        }
    }};
}

pub mod authorization;
pub mod call;
pub mod contract;
pub mod digest;
pub mod error;
pub mod gas;
pub mod networks;
pub mod orchestrator;
pub mod payment;
#[cfg(feature = "provider")]
pub mod provider;
pub mod report;
pub mod sink;
pub mod timestamp;
pub mod transport;

pub use authorization::{
    AuthorizationDomain, SignedAuthorization, TypedDataRequest, TypedDataSigner,
    sign_receive_authorization,
};
pub use call::{EscrowCall, Operation};
pub use digest::{Encoding, PaymentDigest, ScopedDigest};
pub use error::{DescriptorError, ErrorKind, GasError, RunError, SigningError};
pub use gas::{GasLedger, GasReceipt, OperationFee};
pub use orchestrator::{EscrowTarget, ExperimentPlan, Orchestrator};
pub use payment::{AuthorizationWindow, PaymentDescriptor, Salt};
pub use report::FeeReport;
pub use sink::LogSink;
pub use timestamp::UnixTimestamp;
pub use transport::{ChainTransport, ContractCall};
