//! Chain transport abstraction.
//!
//! Submission and inclusion are two separate steps so that a transaction hash
//! is known (and can be reported) even when waiting for it fails. Timeouts,
//! nonce management and retries belong to the implementation.

use alloy_primitives::{Address, Bytes, TxHash};
use std::future::Future;
use std::sync::Arc;

use crate::call::Operation;
use crate::gas::GasReceipt;

/// A contract call ready to be sent: target address and encoded calldata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    /// Target escrow contract.
    pub to: Address,
    /// ABI-encoded function call.
    pub calldata: Bytes,
    /// Escrow entry point the calldata invokes.
    pub operation: Operation,
}

/// Sends contract calls and reports their gas receipts once included.
pub trait ChainTransport: Send + Sync {
    /// Error type for submission and inclusion failures.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Signs and broadcasts `call`, returning its transaction hash.
    fn submit(&self, call: ContractCall)
    -> impl Future<Output = Result<TxHash, Self::Error>> + Send;

    /// Blocks until `tx` is included and returns its gas receipt.
    ///
    /// A receipt with a failed status is returned as `Ok`; the caller decides
    /// how to treat a revert.
    fn wait_for_inclusion(
        &self,
        tx: TxHash,
    ) -> impl Future<Output = Result<GasReceipt, Self::Error>> + Send;
}

impl<T: ChainTransport> ChainTransport for Arc<T> {
    type Error = T::Error;

    fn submit(
        &self,
        call: ContractCall,
    ) -> impl Future<Output = Result<TxHash, Self::Error>> + Send {
        (**self).submit(call)
    }

    fn wait_for_inclusion(
        &self,
        tx: TxHash,
    ) -> impl Future<Output = Result<GasReceipt, Self::Error>> + Send {
        (**self).wait_for_inclusion(tx)
    }
}
