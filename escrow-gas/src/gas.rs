//! Execution and data-availability fee accounting.
//!
//! On OP-stack rollups a transaction pays for L2 execution
//! (`gasUsed × effectiveGasPrice`) and for publishing its data to L1. The L1
//! part is taken from the receipt's reported `l1Fee` as-is: the node already
//! applies the fee scalars and blob base fee, which are not recoverable from
//! `l1GasUsed × l1GasPrice`.
//!
//! Fee arithmetic is checked `U256`; an overflow is an error, never a wrap.
//! The savings percentage is scaled in `U512` and cannot overflow.

use alloy_primitives::{TxHash, U256, U512};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::call::Operation;
use crate::digest::Encoding;
use crate::error::GasError;
use crate::report::FeeReport;

/// Cost fields of one included transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasReceipt {
    /// Included transaction.
    pub transaction_hash: TxHash,
    /// Receipt status; `false` means the transaction reverted.
    pub success: bool,
    /// L2 gas used.
    pub execution_gas_used: u64,
    /// L2 effective gas price in wei.
    pub execution_gas_price: u128,
    /// L1 gas attributed to the transaction data, if reported.
    pub data_availability_gas_used: Option<U256>,
    /// L1 gas price used for the data fee, if reported.
    pub data_availability_gas_price: Option<U256>,
    /// L1 data fee in wei, if reported.
    pub data_availability_fee: Option<U256>,
}

/// Fee breakdown of one recorded operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationFee {
    /// Variant the operation belongs to.
    pub variant: Encoding,
    /// Escrow entry point.
    pub operation: Operation,
    /// Included transaction.
    pub transaction_hash: TxHash,
    /// L2 gas used.
    pub gas_used: u64,
    /// L2 effective gas price.
    pub effective_gas_price: u128,
    /// `gas_used × effective_gas_price`.
    pub execution_fee: U256,
    /// Reported L1 gas used.
    pub data_availability_gas_used: Option<U256>,
    /// Reported L1 gas price.
    pub data_availability_gas_price: Option<U256>,
    /// Reported L1 fee.
    pub data_availability_fee: Option<U256>,
    /// `execution_fee + data_availability_fee`.
    pub total_fee: U256,
}

impl OperationFee {
    /// Decomposes `receipt` into execution and data-availability fees.
    ///
    /// # Errors
    ///
    /// Returns [`GasError::ArithmeticOverflow`] if a product or sum leaves `U256`.
    pub fn from_receipt(
        variant: Encoding,
        operation: Operation,
        receipt: &GasReceipt,
    ) -> Result<Self, GasError> {
        let execution_fee = U256::from(receipt.execution_gas_used)
            .checked_mul(U256::from(receipt.execution_gas_price))
            .ok_or(GasError::ArithmeticOverflow("execution fee"))?;
        let total_fee = execution_fee
            .checked_add(receipt.data_availability_fee.unwrap_or_default())
            .ok_or(GasError::ArithmeticOverflow("total fee"))?;
        Ok(Self {
            variant,
            operation,
            transaction_hash: receipt.transaction_hash,
            gas_used: receipt.execution_gas_used,
            effective_gas_price: receipt.execution_gas_price,
            execution_fee,
            data_availability_gas_used: receipt.data_availability_gas_used,
            data_availability_gas_price: receipt.data_availability_gas_price,
            data_availability_fee: receipt.data_availability_fee,
            total_fee,
        })
    }

    /// Data-availability fee, zero when not reported.
    #[must_use]
    pub fn data_availability_fee_or_zero(&self) -> U256 {
        self.data_availability_fee.unwrap_or_default()
    }
}

/// Cost difference between two variant totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Savings {
    /// The cheaper variant, `None` on a tie.
    pub winner: Option<Encoding>,
    /// `|a − b|`.
    pub absolute: U256,
    /// `absolute / max(a, b) × 100`, two decimal places, round half up.
    pub percent: Decimal,
}

/// Compares two `(variant, total)` pairs.
///
/// The result does not depend on argument order.
#[must_use]
pub fn compare_totals(a: (Encoding, U256), b: (Encoding, U256)) -> Savings {
    let ((cheap_variant, cheap), (_, expensive)) = if a.1 <= b.1 { (a, b) } else { (b, a) };
    let absolute = expensive - cheap;
    let winner = (!absolute.is_zero()).then_some(cheap_variant);
    Savings {
        winner,
        absolute,
        percent: savings_percent(absolute, expensive),
    }
}

/// 100.00% in hundredths.
const FULL_HUNDREDTHS: u16 = 10_000;

/// `savings <= max`, so the quotient never exceeds [`FULL_HUNDREDTHS`]. The
/// scaled numerator is computed in 512 bits and cannot overflow.
fn savings_percent(savings: U256, max: U256) -> Decimal {
    if max.is_zero() {
        return Decimal::new(0, 2);
    }
    let max = U512::from_limbs_slice(max.as_limbs());
    let scaled = U512::from_limbs_slice(savings.as_limbs()) * U512::from(FULL_HUNDREDTHS);
    let hundredths = (scaled + max / U512::from(2u64)) / max;
    let hundredths = u16::try_from(hundredths).unwrap_or(FULL_HUNDREDTHS);
    Decimal::new(i64::from(hundredths), 2)
}

/// Per-operation fee records in call order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GasLedger {
    operations: Vec<OperationFee>,
}

impl GasLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            operations: Vec::new(),
        }
    }

    /// Records the fee of one included operation.
    ///
    /// # Errors
    ///
    /// Returns [`GasError::ArithmeticOverflow`] if the fee cannot be computed;
    /// nothing is recorded in that case.
    pub fn record(
        &mut self,
        variant: Encoding,
        operation: Operation,
        receipt: &GasReceipt,
    ) -> Result<&OperationFee, GasError> {
        let fee = OperationFee::from_receipt(variant, operation, receipt)?;
        self.operations.push(fee);
        Ok(&self.operations[self.operations.len() - 1])
    }

    /// Recorded operations in call order.
    #[must_use]
    pub fn operations(&self) -> &[OperationFee] {
        &self.operations
    }

    /// Sum of `total_fee` over the operations of `variant`.
    ///
    /// # Errors
    ///
    /// Returns [`GasError::ArithmeticOverflow`] if the sum leaves `U256`.
    pub fn total_for(&self, variant: Encoding) -> Result<U256, GasError> {
        self.operations
            .iter()
            .filter(|fee| fee.variant == variant)
            .try_fold(U256::ZERO, |acc, fee| acc.checked_add(fee.total_fee))
            .ok_or(GasError::ArithmeticOverflow("variant total"))
    }

    /// Builds the two-variant comparison.
    ///
    /// # Errors
    ///
    /// Returns [`GasError::MissingVariant`] if either variant has no recorded
    /// operation, or [`GasError::ArithmeticOverflow`] if a total overflows.
    pub fn report(&self) -> Result<FeeReport, GasError> {
        let mut totals = BTreeMap::new();
        for variant in Encoding::ALL {
            if !self.operations.iter().any(|fee| fee.variant == variant) {
                return Err(GasError::MissingVariant(variant));
            }
            totals.insert(variant, self.total_for(variant)?);
        }
        let [a, b] = Encoding::ALL;
        let savings = compare_totals((a, totals[&a]), (b, totals[&b]));
        Ok(FeeReport::new(self.operations.clone(), totals, savings))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use alloy_primitives::B256;
    use std::str::FromStr;

    pub(crate) fn receipt(gas_used: u64, gas_price: u128, l1_fee: Option<u64>) -> GasReceipt {
        GasReceipt {
            transaction_hash: B256::repeat_byte(0x11),
            success: true,
            execution_gas_used: gas_used,
            execution_gas_price: gas_price,
            data_availability_gas_used: l1_fee.map(|_| U256::from(1_600)),
            data_availability_gas_price: l1_fee.map(|_| U256::from(3_000_000_000u64)),
            data_availability_fee: l1_fee.map(U256::from),
        }
    }

    fn ledger(positional: &[GasReceipt], structured: &[GasReceipt]) -> GasLedger {
        let mut ledger = GasLedger::new();
        for (receipts, variant) in [(positional, Encoding::Positional), (structured, Encoding::Struct)]
        {
            for (receipt, operation) in receipts.iter().zip([Operation::Authorize, Operation::Capture]) {
                ledger.record(variant, operation, receipt).unwrap();
            }
        }
        ledger
    }

    #[test]
    fn test_fee_additivity() {
        let fee = OperationFee::from_receipt(
            Encoding::Positional,
            Operation::Authorize,
            &receipt(90_000, 1_000_000, Some(42_000)),
        )
        .unwrap();
        assert_eq!(fee.execution_fee, U256::from(90_000_000_000u64));
        assert_eq!(fee.total_fee, fee.execution_fee + fee.data_availability_fee_or_zero());
    }

    #[test]
    fn test_missing_data_availability_is_zero() {
        let fee = OperationFee::from_receipt(
            Encoding::Struct,
            Operation::Capture,
            &receipt(50_000, 10, None),
        )
        .unwrap();
        assert_eq!(fee.data_availability_fee, None);
        assert_eq!(fee.total_fee, U256::from(500_000));
    }

    #[test]
    fn test_reported_l1_fee_not_recomputed() {
        let fee = OperationFee::from_receipt(
            Encoding::Struct,
            Operation::Capture,
            &receipt(1, 1, Some(7)),
        )
        .unwrap();
        // 1600 × 3 gwei would be far larger than the reported fee
        assert_eq!(fee.total_fee, U256::from(8));
    }

    #[test]
    fn test_max_execution_product_fits() {
        let fee = OperationFee::from_receipt(
            Encoding::Positional,
            Operation::Authorize,
            &receipt(u64::MAX, u128::MAX, None),
        )
        .unwrap();
        assert_eq!(fee.execution_fee, U256::from(u64::MAX) * U256::from(u128::MAX));
    }

    #[test]
    fn test_total_fee_overflow() {
        let mut r = receipt(2, 1, None);
        r.data_availability_fee = Some(U256::MAX);
        assert_eq!(
            OperationFee::from_receipt(Encoding::Positional, Operation::Authorize, &r),
            Err(GasError::ArithmeticOverflow("total fee"))
        );
    }

    #[test]
    fn test_variant_total_overflow() {
        let mut r = receipt(0, 0, None);
        r.data_availability_fee = Some(U256::MAX);
        let ledger = ledger(&[r.clone(), r], &[]);
        assert_eq!(
            ledger.total_for(Encoding::Positional),
            Err(GasError::ArithmeticOverflow("variant total"))
        );
    }

    #[test]
    fn test_variant_total_sums_operations() {
        let ledger = ledger(
            &[receipt(100, 2, Some(5)), receipt(50, 2, None)],
            &[receipt(80, 2, Some(3)), receipt(40, 2, Some(1))],
        );
        assert_eq!(ledger.total_for(Encoding::Positional).unwrap(), U256::from(305));
        assert_eq!(ledger.total_for(Encoding::Struct).unwrap(), U256::from(244));
        let sum: U256 = ledger
            .operations()
            .iter()
            .filter(|f| f.variant == Encoding::Struct)
            .map(|f| f.total_fee)
            .sum();
        assert_eq!(sum, U256::from(244));
    }

    #[test]
    fn test_compare_totals_symmetric() {
        let a = (Encoding::Positional, U256::from(305));
        let b = (Encoding::Struct, U256::from(244));
        let ab = compare_totals(a, b);
        let ba = compare_totals(b, a);
        assert_eq!(ab, ba);
        assert_eq!(ab.winner, Some(Encoding::Struct));
        assert_eq!(ab.absolute, U256::from(61));
        assert_eq!(ab.percent, Decimal::from_str("20.00").unwrap());
    }

    #[test]
    fn test_percent_rounds_half_up() {
        // 1/8 = 12.5% exactly; 1/3 = 33.333..%; 2/3 = 66.666..%
        let pct = |s: u64, m: u64| {
            compare_totals(
                (Encoding::Positional, U256::from(m - s)),
                (Encoding::Struct, U256::from(m)),
            )
            .percent
        };
        assert_eq!(pct(1, 8), Decimal::from_str("12.50").unwrap());
        assert_eq!(pct(1, 3), Decimal::from_str("33.33").unwrap());
        assert_eq!(pct(2, 3), Decimal::from_str("66.67").unwrap());
        assert_eq!(pct(1, 20_000), Decimal::from_str("0.01").unwrap());
    }

    #[test]
    fn test_tie_has_no_winner() {
        let s = compare_totals(
            (Encoding::Positional, U256::from(10)),
            (Encoding::Struct, U256::from(10)),
        );
        assert_eq!(s.winner, None);
        assert!(s.absolute.is_zero());
        assert!(s.percent.is_zero());

        let zero = compare_totals(
            (Encoding::Positional, U256::ZERO),
            (Encoding::Struct, U256::ZERO),
        );
        assert!(zero.percent.is_zero());
    }

    #[test]
    fn test_percent_near_u256_max() {
        let full = compare_totals(
            (Encoding::Positional, U256::ZERO),
            (Encoding::Struct, U256::MAX),
        );
        assert_eq!(full.winner, Some(Encoding::Positional));
        assert_eq!(full.absolute, U256::MAX);
        assert_eq!(full.percent, Decimal::from_str("100.00").unwrap());

        let half = compare_totals(
            (Encoding::Positional, U256::MAX / U256::from(2u64)),
            (Encoding::Struct, U256::MAX),
        );
        assert_eq!(half.percent, Decimal::from_str("50.00").unwrap());
    }

    #[test]
    fn test_report_requires_both_variants() {
        let ledger = ledger(&[receipt(1, 1, None)], &[]);
        assert_eq!(ledger.report(), Err(GasError::MissingVariant(Encoding::Struct)));
    }

    #[test]
    fn test_report_idempotent() {
        let ledger = ledger(
            &[receipt(100, 2, Some(5)), receipt(50, 2, None)],
            &[receipt(80, 2, Some(3)), receipt(40, 2, Some(1))],
        );
        let first = ledger.report().unwrap();
        let second = ledger.report().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.render(), second.render());
    }
}
