//! Sequential authorize → capture runs, one per escrow variant.
//!
//! Each variant runs to completion before the next one starts, and within a
//! variant every call waits for inclusion before the next is submitted. The
//! first failure aborts the run. Nothing is rolled back or retried: a
//! payment that was authorized but not captured stays that way on-chain and
//! can be settled with the builders in [`crate::call`].

use alloy_primitives::{Address, U256};

use crate::authorization::{AuthorizationDomain, TypedDataSigner, sign_receive_authorization};
use crate::call::EscrowCall;
use crate::digest::{Encoding, ScopedDigest};
use crate::error::{DescriptorError, RunError};
use crate::gas::GasLedger;
use crate::payment::{AuthorizationWindow, PaymentDescriptor, Salt};
use crate::report::{FeeReport, render_operation};
use crate::sink::LogSink;
use crate::transport::{ChainTransport, ContractCall};

/// One escrow deployment to run the payment against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscrowTarget {
    /// Encoding the deployment expects.
    pub encoding: Encoding,
    /// Deployment address.
    pub escrow: Address,
    /// Salt for this variant's digest.
    pub salt: Salt,
}

/// Validated inputs of one experiment run.
#[derive(Debug, Clone)]
pub struct ExperimentPlan {
    descriptor: PaymentDescriptor,
    window: AuthorizationWindow,
    targets: Vec<EscrowTarget>,
    capture_value: U256,
}

impl ExperimentPlan {
    /// Assembles a plan running `descriptor` against every target in order.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError`] if the capture amount is zero or above the
    /// payment value, a variant is targeted twice or not at all, or two
    /// different escrows share a salt (their authorization nonces would be
    /// derived from the same entropy).
    pub fn new(
        descriptor: PaymentDescriptor,
        window: AuthorizationWindow,
        targets: impl IntoIterator<Item = EscrowTarget>,
        capture_value: U256,
    ) -> Result<Self, DescriptorError> {
        if capture_value.is_zero() {
            return Err(DescriptorError::ZeroCapture);
        }
        if capture_value > descriptor.value() {
            return Err(DescriptorError::CaptureExceedsValue {
                capture: capture_value,
                value: descriptor.value(),
            });
        }
        let targets: Vec<EscrowTarget> = targets.into_iter().collect();
        for (i, target) in targets.iter().enumerate() {
            for earlier in &targets[..i] {
                if earlier.encoding == target.encoding {
                    return Err(DescriptorError::DuplicateVariant(target.encoding));
                }
                if earlier.salt == target.salt && earlier.escrow != target.escrow {
                    return Err(DescriptorError::SaltReuse {
                        salt: target.salt,
                        first: earlier.escrow,
                        second: target.escrow,
                    });
                }
            }
        }
        if let Some(missing) = Encoding::ALL
            .into_iter()
            .find(|encoding| !targets.iter().any(|t| t.encoding == *encoding))
        {
            return Err(DescriptorError::MissingVariant(missing));
        }
        Ok(Self {
            descriptor,
            window,
            targets,
            capture_value,
        })
    }

    /// Payment terms shared by every variant.
    #[must_use]
    pub const fn descriptor(&self) -> &PaymentDescriptor {
        &self.descriptor
    }

    /// Authorization window shared by every variant.
    #[must_use]
    pub const fn window(&self) -> &AuthorizationWindow {
        &self.window
    }

    /// Targets in run order.
    #[must_use]
    pub fn targets(&self) -> &[EscrowTarget] {
        &self.targets
    }

    /// Amount captured after each authorization.
    #[must_use]
    pub const fn capture_value(&self) -> U256 {
        self.capture_value
    }
}

/// Drives experiment runs through injected signing, transport and log capabilities.
#[derive(Debug)]
pub struct Orchestrator<S, T, L> {
    signer: S,
    transport: T,
    domain: AuthorizationDomain,
    sink: L,
}

impl<S, T, L> Orchestrator<S, T, L>
where
    S: TypedDataSigner,
    T: ChainTransport,
    L: LogSink,
{
    /// Creates an orchestrator signing under `domain`.
    #[must_use]
    pub const fn new(signer: S, transport: T, domain: AuthorizationDomain, sink: L) -> Self {
        Self {
            signer,
            transport,
            domain,
            sink,
        }
    }

    /// The log sink.
    #[must_use]
    pub const fn sink(&self) -> &L {
        &self.sink
    }

    /// Runs every target of `plan` and compares their fees.
    ///
    /// # Errors
    ///
    /// Returns the first [`RunError`]; later variants are not started.
    pub async fn run(&self, plan: &ExperimentPlan) -> Result<FeeReport, RunError> {
        let mut ledger = GasLedger::new();
        for target in plan.targets() {
            self.run_variant(plan, target, &mut ledger).await?;
        }
        let report = ledger.report().map_err(RunError::Report)?;
        for line in report.render() {
            self.sink.emit(&line);
        }
        Ok(report)
    }

    /// Signs, authorizes and captures the payment on one target, recording
    /// both receipts in `ledger`.
    ///
    /// # Errors
    ///
    /// Returns [`RunError`] tagged with the target's variant and the failing phase.
    pub async fn run_variant(
        &self,
        plan: &ExperimentPlan,
        target: &EscrowTarget,
        ledger: &mut GasLedger,
    ) -> Result<ScopedDigest, RunError> {
        let variant = target.encoding;
        let (descriptor, window) = (plan.descriptor(), plan.window());
        if self.domain.verifying_contract != descriptor.token() {
            return Err(RunError::DomainMismatch {
                variant,
                expected: descriptor.token(),
                actual: self.domain.verifying_contract,
            });
        }

        let scoped = variant.scoped_digest(target.escrow, descriptor, window, target.salt);
        self.sink.emit(&format!(
            "[{variant}] payment hash {} (salt {})",
            scoped.digest(),
            target.salt
        ));

        let signed =
            sign_receive_authorization(&self.signer, self.domain.clone(), descriptor, window, scoped)
                .await
                .map_err(|source| RunError::Signing { variant, source })?;
        self.sink.emit(&format!("[{variant}] signature {}", signed.signature()));

        let calls = EscrowCall::new(descriptor, window, signed.scoped_digest());
        self.execute(variant, calls.authorize(signed.signature()), ledger)
            .await?;
        self.execute(variant, calls.capture(plan.capture_value()), ledger)
            .await?;
        Ok(scoped)
    }

    async fn execute(
        &self,
        variant: Encoding,
        call: ContractCall,
        ledger: &mut GasLedger,
    ) -> Result<(), RunError> {
        let phase = call.operation;
        self.sink.emit(&format!("[{variant}] submitting {phase} to {}", call.to));

        let submit_fut = self.transport.submit(call);
        let tx = traced!(
            submit_fut,
            tracing::info_span!("submit", variant = %variant, phase = %phase)
        )
        .map_err(|e| RunError::Submission {
            variant,
            phase,
            source: Box::new(e),
        })?;
        self.sink.emit(&format!("[{variant}] {phase} transaction {tx}"));

        let inclusion_fut = self.transport.wait_for_inclusion(tx);
        let receipt = traced!(
            inclusion_fut,
            tracing::info_span!("wait_for_inclusion", variant = %variant, phase = %phase, tx = %tx)
        )
        .map_err(|e| RunError::Inclusion {
            variant,
            phase,
            tx,
            source: Box::new(e),
        })?;
        if !receipt.success {
            #[cfg(feature = "telemetry")]
            tracing::event!(tracing::Level::WARN, variant = %variant, phase = %phase, tx = %tx, "transaction reverted");
            return Err(RunError::Reverted { variant, phase, tx });
        }

        let fee = ledger
            .record(variant, phase, &receipt)
            .map_err(|source| RunError::Gas {
                variant,
                phase,
                source,
            })?;
        #[cfg(feature = "telemetry")]
        tracing::event!(tracing::Level::INFO,
            variant = %variant,
            phase = %phase,
            tx = %tx,
            gas_used = fee.gas_used,
            total_fee = %fee.total_fee,
            "operation included"
        );
        for line in render_operation(fee) {
            self.sink.emit(&line);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authorization::TypedDataRequest;
    use crate::call::Operation;
    use crate::contract::IPaymentEscrowCalldataOptimized;
    use crate::error::{ErrorKind, SigningError};
    use crate::gas::GasReceipt;
    use crate::networks::{
        BASE_MAINNET, CALLDATA_OPTIMIZED_ESCROW_BASE, GAS_OPTIMIZED_ESCROW_BASE, USDC_BASE,
    };
    use crate::payment::tests::{BUYER, descriptor, window};
    use crate::sink::MemorySink;
    use alloy_primitives::{B256, Bytes, TxHash};
    use alloy_sol_types::SolCall;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct FakeSigner {
        fail: bool,
        requests: Mutex<Vec<(Address, B256)>>,
    }

    impl TypedDataSigner for FakeSigner {
        fn address(&self) -> Address {
            BUYER
        }

        async fn sign_typed_data(
            &self,
            request: &TypedDataRequest,
        ) -> Result<Bytes, SigningError> {
            if self.fail {
                return Err(SigningError::new("user rejected the request"));
            }
            self.requests
                .lock()
                .unwrap()
                .push((request.message().to, request.message().nonce));
            let mut signature = request.signing_hash().to_vec();
            signature.extend_from_slice(&[0x1b; 33]);
            Ok(signature.into())
        }
    }

    #[derive(Debug, thiserror::Error)]
    #[error("{0}")]
    struct FakeError(&'static str);

    #[derive(Default)]
    struct FakeTransport {
        calls: Mutex<Vec<ContractCall>>,
        reject_submit: Option<usize>,
        drop_inclusion: Option<usize>,
        revert: Option<usize>,
    }

    impl FakeTransport {
        fn calls(&self) -> Vec<ContractCall> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ChainTransport for FakeTransport {
        type Error = FakeError;

        async fn submit(&self, call: ContractCall) -> Result<TxHash, FakeError> {
            let mut calls = self.calls.lock().unwrap();
            let index = calls.len();
            calls.push(call);
            if self.reject_submit == Some(index) {
                return Err(FakeError("execution reverted during estimation"));
            }
            Ok(B256::with_last_byte(u8::try_from(index).unwrap()))
        }

        async fn wait_for_inclusion(&self, tx: TxHash) -> Result<GasReceipt, FakeError> {
            let index = usize::from(tx[31]);
            if self.drop_inclusion == Some(index) {
                return Err(FakeError("timed out waiting for receipt"));
            }
            let calldata_len = u64::try_from(self.calls.lock().unwrap()[index].calldata.len()).unwrap();
            Ok(GasReceipt {
                transaction_hash: tx,
                success: self.revert != Some(index),
                execution_gas_used: 21_000 + 16 * calldata_len,
                execution_gas_price: 1_000_000,
                data_availability_gas_used: Some(U256::from(calldata_len * 16)),
                data_availability_gas_price: Some(U256::from(2_000_000_000u64)),
                data_availability_fee: Some(U256::from(calldata_len * 1_000)),
            })
        }
    }

    fn plan() -> ExperimentPlan {
        ExperimentPlan::new(
            descriptor(),
            window(),
            [
                EscrowTarget {
                    encoding: Encoding::Positional,
                    escrow: CALLDATA_OPTIMIZED_ESCROW_BASE,
                    salt: Salt::from(123),
                },
                EscrowTarget {
                    encoding: Encoding::Struct,
                    escrow: GAS_OPTIMIZED_ESCROW_BASE,
                    salt: Salt::from(456),
                },
            ],
            U256::from(10_000),
        )
        .unwrap()
    }

    fn orchestrator(
        signer: FakeSigner,
        transport: &Arc<FakeTransport>,
    ) -> Orchestrator<FakeSigner, Arc<FakeTransport>, MemorySink> {
        Orchestrator::new(
            signer,
            Arc::clone(transport),
            AuthorizationDomain::usdc(BASE_MAINNET, USDC_BASE),
            MemorySink::new(),
        )
    }

    #[tokio::test]
    async fn test_end_to_end_both_variants() {
        let transport = Arc::new(FakeTransport::default());
        let orchestrator = orchestrator(FakeSigner::default(), &transport);
        let report = orchestrator.run(&plan()).await.unwrap();

        assert_eq!(report.totals().len(), 2);
        assert!(report.winner().is_some());
        let [p, s] = [Encoding::Positional, Encoding::Struct].map(|e| report.totals()[&e]);
        assert_eq!(report.savings_absolute(), p.max(s) - p.min(s));

        let order: Vec<_> = report
            .operations()
            .iter()
            .map(|f| (f.variant, f.operation))
            .collect();
        assert_eq!(
            order,
            vec![
                (Encoding::Positional, Operation::Authorize),
                (Encoding::Positional, Operation::Capture),
                (Encoding::Struct, Operation::Authorize),
                (Encoding::Struct, Operation::Capture),
            ]
        );

        let targets: Vec<Address> = transport.calls().iter().map(|c| c.to).collect();
        assert_eq!(
            targets,
            vec![
                CALLDATA_OPTIMIZED_ESCROW_BASE,
                CALLDATA_OPTIMIZED_ESCROW_BASE,
                GAS_OPTIMIZED_ESCROW_BASE,
                GAS_OPTIMIZED_ESCROW_BASE,
            ]
        );

        let requests = orchestrator.signer.requests.lock().unwrap().clone();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].0, CALLDATA_OPTIMIZED_ESCROW_BASE);
        assert_eq!(requests[1].0, GAS_OPTIMIZED_ESCROW_BASE);
        assert_ne!(requests[0].1, requests[1].1);

        let lines = orchestrator.sink().lines();
        assert!(lines.iter().any(|l| l.starts_with("[gas-optimized] capture transaction")));
        assert_eq!(lines.last().map(String::as_str), report.render().last().map(String::as_str));
    }

    #[tokio::test]
    async fn test_submission_failure_aborts_run() {
        let transport = Arc::new(FakeTransport {
            reject_submit: Some(1),
            ..FakeTransport::default()
        });
        let err = orchestrator(FakeSigner::default(), &transport)
            .run(&plan())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SubmissionFailure);
        assert_eq!(err.variant(), Some(Encoding::Positional));
        assert_eq!(err.phase(), Some(Operation::Capture));
        assert_eq!(transport.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_inclusion_failure_reports_tx() {
        let transport = Arc::new(FakeTransport {
            drop_inclusion: Some(2),
            ..FakeTransport::default()
        });
        let err = orchestrator(FakeSigner::default(), &transport)
            .run(&plan())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InclusionFailure);
        assert_eq!(err.variant(), Some(Encoding::Struct));
        assert!(matches!(
            err,
            RunError::Inclusion { phase: Operation::Authorize, tx, .. } if tx == B256::with_last_byte(2)
        ));
    }

    #[tokio::test]
    async fn test_revert_is_hard_failure() {
        let transport = Arc::new(FakeTransport {
            revert: Some(0),
            ..FakeTransport::default()
        });
        let err = orchestrator(FakeSigner::default(), &transport)
            .run(&plan())
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::Reverted { phase: Operation::Authorize, .. }));
        assert_eq!(err.kind(), ErrorKind::InclusionFailure);
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_signing_failure_submits_nothing() {
        let transport = Arc::new(FakeTransport::default());
        let signer = FakeSigner {
            fail: true,
            ..FakeSigner::default()
        };
        let err = orchestrator(signer, &transport).run(&plan()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SigningFailure);
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_domain_must_match_token() {
        let transport = Arc::new(FakeTransport::default());
        let orchestrator = Orchestrator::new(
            FakeSigner::default(),
            Arc::clone(&transport),
            AuthorizationDomain::usdc(BASE_MAINNET, GAS_OPTIMIZED_ESCROW_BASE),
            |_: &str| {},
        );
        let err = orchestrator.run(&plan()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SigningFailure);
        assert!(matches!(
            err,
            RunError::DomainMismatch { variant: Encoding::Positional, expected, actual }
                if expected == USDC_BASE && actual == GAS_OPTIMIZED_ESCROW_BASE
        ));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_partial_capture() {
        let plan = ExperimentPlan::new(
            descriptor(),
            window(),
            plan().targets().to_vec(),
            U256::from(2_500),
        )
        .unwrap();
        let transport = Arc::new(FakeTransport::default());
        orchestrator(FakeSigner::default(), &transport)
            .run(&plan)
            .await
            .unwrap();
        let capture = &transport.calls()[1];
        let decoded =
            IPaymentEscrowCalldataOptimized::captureCall::abi_decode(&capture.calldata).unwrap();
        assert_eq!(decoded.value, U256::from(2_500));
    }

    #[test]
    fn test_plan_validation() {
        let targets = plan().targets().to_vec();
        assert_eq!(
            ExperimentPlan::new(descriptor(), window(), targets.clone(), U256::ZERO).unwrap_err(),
            DescriptorError::ZeroCapture
        );
        assert!(matches!(
            ExperimentPlan::new(descriptor(), window(), targets.clone(), U256::from(10_001)),
            Err(DescriptorError::CaptureExceedsValue { .. })
        ));

        let mut same_salt = targets.clone();
        same_salt[1].salt = Salt::from(123);
        assert!(matches!(
            ExperimentPlan::new(descriptor(), window(), same_salt, U256::from(1)),
            Err(DescriptorError::SaltReuse { .. })
        ));

        let mut duplicate = targets;
        duplicate[1].encoding = Encoding::Positional;
        assert_eq!(
            ExperimentPlan::new(descriptor(), window(), duplicate, U256::from(1)).unwrap_err(),
            DescriptorError::DuplicateVariant(Encoding::Positional)
        );
    }

    #[test]
    fn test_plan_requires_both_variants() {
        let targets = plan().targets().to_vec();
        assert_eq!(
            ExperimentPlan::new(descriptor(), window(), targets[..1].to_vec(), U256::from(1))
                .unwrap_err(),
            DescriptorError::MissingVariant(Encoding::Struct)
        );
        assert_eq!(
            ExperimentPlan::new(descriptor(), window(), targets[1..].to_vec(), U256::from(1))
                .unwrap_err(),
            DescriptorError::MissingVariant(Encoding::Positional)
        );
        assert_eq!(
            ExperimentPlan::new(descriptor(), window(), Vec::new(), U256::from(1)).unwrap_err(),
            DescriptorError::MissingVariant(Encoding::Positional)
        );
    }
}
