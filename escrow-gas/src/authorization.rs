//! ERC-3009 `receiveWithAuthorization` signing.
//!
//! The buyer authorizes the escrow contract to pull `value` tokens by signing
//! an EIP-712 `ReceiveWithAuthorization` message whose nonce is the payment
//! digest. `receiveWithAuthorization` additionally requires `msg.sender == to`,
//! so `to` must be the escrow that will submit the pull; a signature for any
//! other address is well-formed but unusable.
//!
//! A [`TypedDataRequest`] is only built from a [`ScopedDigest`], which makes
//! `to` and the nonce come from the same contract-bound value.

use alloy_primitives::{Address, B256, Bytes, b256};
use alloy_sol_types::{Eip712Domain, SolStruct, eip712_domain, sol};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use crate::digest::{PaymentDigest, ScopedDigest};
use crate::error::SigningError;
use crate::networks::{DEFAULT_USDC_NAME, DEFAULT_USDC_VERSION};
use crate::payment::{AuthorizationWindow, PaymentDescriptor};

sol!(
    /// EIP-712 message signed by the buyer for ERC-3009 `receiveWithAuthorization`.
    ///
    /// Field order and types are fixed by ERC-3009 and must not change: the
    /// token contract rebuilds this struct hash to verify the signature.
    #[allow(missing_docs)]
    #[derive(Debug, Serialize, Deserialize)]
    struct ReceiveWithAuthorization {
        address from;
        address to;
        uint256 value;
        uint256 validAfter;
        uint256 validBefore;
        bytes32 nonce;
    }
);

/// `keccak256("ReceiveWithAuthorization(address from,address to,uint256 value,uint256 validAfter,uint256 validBefore,bytes32 nonce)")`.
pub const RECEIVE_WITH_AUTHORIZATION_TYPEHASH: B256 =
    b256!("0xd099cc98ef71107a616c4f0f941f04c322d8e254fe26b3c6668db87aae413de8");

/// EIP-712 domain of the ERC-3009 token contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationDomain {
    /// Token name as returned by the contract's EIP-712 domain.
    pub name: String,
    /// Token version as returned by the contract's EIP-712 domain.
    pub version: String,
    /// EIP-155 chain ID.
    pub chain_id: u64,
    /// The token contract.
    pub verifying_contract: Address,
}

impl AuthorizationDomain {
    /// Domain of a USDC deployment (`"USD Coin"`, version `"2"`).
    #[must_use]
    pub fn usdc(chain_id: u64, token: Address) -> Self {
        Self {
            name: DEFAULT_USDC_NAME.to_owned(),
            version: DEFAULT_USDC_VERSION.to_owned(),
            chain_id,
            verifying_contract: token,
        }
    }

    /// Converts to the alloy EIP-712 domain used for hashing.
    #[must_use]
    pub fn to_eip712(&self) -> Eip712Domain {
        eip712_domain! {
            name: self.name.clone(),
            version: self.version.clone(),
            chain_id: self.chain_id,
            verifying_contract: self.verifying_contract,
        }
    }
}

/// A structured `ReceiveWithAuthorization` signing request.
///
/// Local keys sign [`TypedDataRequest::signing_hash`]; remote wallets can be
/// handed the domain, [`TypedDataRequest::type_schema`],
/// [`TypedDataRequest::primary_type`] and [`TypedDataRequest::message`] instead.
#[derive(Debug, Clone)]
pub struct TypedDataRequest {
    domain: AuthorizationDomain,
    message: ReceiveWithAuthorization,
    scoped: ScopedDigest,
}

impl TypedDataRequest {
    /// Builds the request for `descriptor` and `window`.
    ///
    /// `from` is the buyer, `to` is the escrow the digest was scoped to, and
    /// the nonce is the digest itself.
    #[must_use]
    pub fn receive_with_authorization(
        domain: AuthorizationDomain,
        descriptor: &PaymentDescriptor,
        window: &AuthorizationWindow,
        scoped: ScopedDigest,
    ) -> Self {
        let message = ReceiveWithAuthorization {
            from: descriptor.buyer(),
            to: scoped.escrow(),
            value: descriptor.value(),
            validAfter: window.valid_after().into(),
            validBefore: window.valid_before().into(),
            nonce: scoped.digest().as_b256(),
        };
        Self {
            domain,
            message,
            scoped,
        }
    }

    /// The signing domain.
    #[must_use]
    pub const fn domain(&self) -> &AuthorizationDomain {
        &self.domain
    }

    /// The message instance.
    #[must_use]
    pub const fn message(&self) -> &ReceiveWithAuthorization {
        &self.message
    }

    /// The contract-bound digest used as nonce.
    #[must_use]
    pub const fn scoped_digest(&self) -> ScopedDigest {
        self.scoped
    }

    /// Name of the primary EIP-712 type.
    #[must_use]
    pub const fn primary_type(&self) -> &'static str {
        ReceiveWithAuthorization::NAME
    }

    /// EIP-712 `encodeType` string of the message schema.
    #[must_use]
    pub fn type_schema(&self) -> Cow<'static, str> {
        ReceiveWithAuthorization::eip712_encode_type()
    }

    /// `keccak256("\x19\x01" ‖ domainSeparator ‖ hashStruct(message))`.
    #[must_use]
    pub fn signing_hash(&self) -> B256 {
        self.message.eip712_signing_hash(&self.domain.to_eip712())
    }
}

/// External key holder able to sign a typed-data request.
///
/// Mirrors alloy's signer split: local keys sign the EIP-712 hash, remote
/// signers may forward the structured request. The returned bytes are used
/// verbatim as the `signature` argument of the escrow call.
pub trait TypedDataSigner: Send + Sync {
    /// Address of the key, expected to be the buyer.
    fn address(&self) -> Address;

    /// Signs `request`.
    fn sign_typed_data(
        &self,
        request: &TypedDataRequest,
    ) -> impl Future<Output = Result<Bytes, SigningError>> + Send;
}

#[cfg(feature = "signer-local")]
impl TypedDataSigner for alloy_signer_local::PrivateKeySigner {
    fn address(&self) -> Address {
        Self::address(self)
    }

    async fn sign_typed_data(&self, request: &TypedDataRequest) -> Result<Bytes, SigningError> {
        let signature = alloy_signer::Signer::sign_hash(self, &request.signing_hash())
            .await
            .map_err(|e| SigningError::new(format!("{e:?}")))?;
        Ok(Bytes::copy_from_slice(&signature.as_bytes()))
    }
}

impl<T: TypedDataSigner> TypedDataSigner for Arc<T> {
    fn address(&self) -> Address {
        (**self).address()
    }

    async fn sign_typed_data(&self, request: &TypedDataRequest) -> Result<Bytes, SigningError> {
        (**self).sign_typed_data(request).await
    }
}

/// A buyer signature over one contract-bound payment digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedAuthorization {
    scoped: ScopedDigest,
    signature: Bytes,
}

impl SignedAuthorization {
    /// The signed payment digest.
    #[must_use]
    pub const fn digest(&self) -> PaymentDigest {
        self.scoped.digest()
    }

    /// Digest together with the escrow it is bound to.
    #[must_use]
    pub const fn scoped_digest(&self) -> ScopedDigest {
        self.scoped
    }

    /// Signature bytes as returned by the signer.
    #[must_use]
    pub const fn signature(&self) -> &Bytes {
        &self.signature
    }
}

/// Signs the `ReceiveWithAuthorization` for one variant.
///
/// # Errors
///
/// Returns [`SigningError`] if the signer is not the buyer or the signing
/// capability fails.
pub async fn sign_receive_authorization<S: TypedDataSigner>(
    signer: &S,
    domain: AuthorizationDomain,
    descriptor: &PaymentDescriptor,
    window: &AuthorizationWindow,
    scoped: ScopedDigest,
) -> Result<SignedAuthorization, SigningError> {
    if signer.address() != descriptor.buyer() {
        return Err(SigningError::new(format!(
            "signer {} is not the buyer {}",
            signer.address(),
            descriptor.buyer()
        )));
    }
    let request = TypedDataRequest::receive_with_authorization(domain, descriptor, window, scoped);
    let signature = signer.sign_typed_data(&request).await?;
    Ok(SignedAuthorization { scoped, signature })
}
