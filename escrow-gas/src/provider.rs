//! Alloy JSON-RPC implementation of [`ChainTransport`].
//!
//! The provider is expected to carry a wallet filler (nonce, gas, chain ID
//! and signing), as built by `ProviderBuilder::new().network::<AnyNetwork>().wallet(..)`.
//! `AnyNetwork` keeps the OP-stack receipt extensions (`l1Fee`, `l1GasUsed`,
//! `l1GasPrice`) in the receipt's other fields, where the data-availability
//! part of the fee is read from.

use alloy_network::{AnyNetwork, AnyTransactionReceipt, Network, ReceiptResponse, TransactionBuilder};
use alloy_primitives::{TxHash, U256};
use alloy_provider::{PendingTransactionBuilder, PendingTransactionError, Provider};
use alloy_serde::OtherFields;
use alloy_transport::TransportError;
use std::time::Duration;

use crate::gas::GasReceipt;
use crate::transport::{ChainTransport, ContractCall};

/// Errors raised by [`AlloyTransport`].
#[derive(Debug, thiserror::Error)]
pub enum AlloyTransportError {
    /// RPC transport error.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Pending transaction error, including the receipt timeout.
    #[error(transparent)]
    PendingTransaction(#[from] PendingTransactionError),
    /// An OP-stack fee field was present but not a quantity.
    #[error("malformed receipt field {field}: {source}")]
    MalformedReceipt {
        /// Receipt field name.
        field: &'static str,
        /// Decoding error.
        source: serde_json::Error,
    },
}

/// [`ChainTransport`] over an alloy provider.
#[derive(Debug, Clone)]
pub struct AlloyTransport<P> {
    provider: P,
    confirmations: u64,
    receipt_timeout: Option<Duration>,
}

impl<P> AlloyTransport<P> {
    /// Wraps `provider`, waiting for one confirmation and no extra timeout.
    #[must_use]
    pub const fn new(provider: P) -> Self {
        Self {
            provider,
            confirmations: 1,
            receipt_timeout: None,
        }
    }

    /// Number of block confirmations to wait for.
    #[must_use]
    pub const fn with_confirmations(mut self, confirmations: u64) -> Self {
        self.confirmations = confirmations;
        self
    }

    /// Fails inclusion waits that take longer than `timeout`.
    #[must_use]
    pub const fn with_receipt_timeout(mut self, timeout: Duration) -> Self {
        self.receipt_timeout = Some(timeout);
        self
    }

    /// The wrapped provider.
    #[must_use]
    pub const fn provider(&self) -> &P {
        &self.provider
    }
}

impl<P: Provider<AnyNetwork>> ChainTransport for AlloyTransport<P> {
    type Error = AlloyTransportError;

    async fn submit(&self, call: ContractCall) -> Result<TxHash, Self::Error> {
        let request = <AnyNetwork as Network>::TransactionRequest::default()
            .with_to(call.to)
            .with_input(call.calldata);
        let pending = self.provider.send_transaction(request).await?;
        #[cfg(feature = "telemetry")]
        tracing::debug!(tx = %pending.tx_hash(), to = %call.to, operation = %call.operation, "transaction sent");
        Ok(*pending.tx_hash())
    }

    async fn wait_for_inclusion(&self, tx: TxHash) -> Result<GasReceipt, Self::Error> {
        let receipt = PendingTransactionBuilder::new(self.provider.root().clone(), tx)
            .with_required_confirmations(self.confirmations)
            .with_timeout(self.receipt_timeout)
            .get_receipt()
            .await?;
        GasReceipt::from_any_receipt(&receipt)
    }
}

impl GasReceipt {
    /// Projects the cost fields of an alloy receipt.
    ///
    /// # Errors
    ///
    /// Returns [`AlloyTransportError::MalformedReceipt`] if an OP-stack fee
    /// field is present but cannot be decoded.
    pub fn from_any_receipt(receipt: &AnyTransactionReceipt) -> Result<Self, AlloyTransportError> {
        Self::from_parts(
            receipt.transaction_hash(),
            receipt.status(),
            receipt.gas_used(),
            receipt.effective_gas_price(),
            &receipt.other,
        )
    }

    /// Builds a receipt from the standard fields and the receipt's extra fields.
    ///
    /// # Errors
    ///
    /// Returns [`AlloyTransportError::MalformedReceipt`] if `l1GasUsed`,
    /// `l1GasPrice` or `l1Fee` is present but not a quantity.
    pub fn from_parts(
        transaction_hash: TxHash,
        success: bool,
        gas_used: u64,
        effective_gas_price: u128,
        other: &OtherFields,
    ) -> Result<Self, AlloyTransportError> {
        Ok(Self {
            transaction_hash,
            success,
            execution_gas_used: gas_used,
            execution_gas_price: effective_gas_price,
            data_availability_gas_used: quantity(other, "l1GasUsed")?,
            data_availability_gas_price: quantity(other, "l1GasPrice")?,
            data_availability_fee: quantity(other, "l1Fee")?,
        })
    }
}

fn quantity(other: &OtherFields, field: &'static str) -> Result<Option<U256>, AlloyTransportError> {
    match other.get(field) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(_) => other
            .get_deserialized::<U256>(field)
            .transpose()
            .map_err(|source| AlloyTransportError::MalformedReceipt { field, source }),
    }
}
