//! Two-variant fee comparison report.

use alloy_primitives::U256;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Display;

use crate::digest::Encoding;
use crate::gas::{OperationFee, Savings};

/// Outcome of one experiment: every operation's fees and the per-variant comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeReport {
    operations: Vec<OperationFee>,
    totals: BTreeMap<Encoding, U256>,
    winner: Option<Encoding>,
    savings_absolute: U256,
    savings_percent: Decimal,
}

impl FeeReport {
    pub(crate) const fn new(
        operations: Vec<OperationFee>,
        totals: BTreeMap<Encoding, U256>,
        savings: Savings,
    ) -> Self {
        Self {
            operations,
            totals,
            winner: savings.winner,
            savings_absolute: savings.absolute,
            savings_percent: savings.percent,
        }
    }

    /// Per-operation fees in call order.
    #[must_use]
    pub fn operations(&self) -> &[OperationFee] {
        &self.operations
    }

    /// Summed total fee per variant.
    #[must_use]
    pub const fn totals(&self) -> &BTreeMap<Encoding, U256> {
        &self.totals
    }

    /// The cheaper variant, `None` when both cost the same.
    #[must_use]
    pub const fn winner(&self) -> Option<Encoding> {
        self.winner
    }

    /// Absolute difference between the two totals, in wei.
    #[must_use]
    pub const fn savings_absolute(&self) -> U256 {
        self.savings_absolute
    }

    /// Savings relative to the more expensive variant, in percent, two decimals.
    #[must_use]
    pub const fn savings_percent(&self) -> Decimal {
        self.savings_percent
    }

    /// Human-readable lines: every operation followed by the summary.
    #[must_use]
    pub fn render(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .operations
            .iter()
            .flat_map(render_operation)
            .collect();
        lines.push("Fee comparison:".to_owned());
        for (variant, total) in &self.totals {
            lines.push(format!("  {variant}: {total} wei"));
        }
        match self.winner {
            Some(winner) => lines.push(format!(
                "  {winner} is cheaper by {} wei ({}%)",
                self.savings_absolute, self.savings_percent
            )),
            None => lines.push("  both variants cost the same".to_owned()),
        }
        lines
    }
}

/// Receipt analysis lines for one operation.
#[must_use]
pub fn render_operation(fee: &OperationFee) -> Vec<String> {
    vec![
        format!("[{}] {} {}", fee.variant, fee.operation, fee.transaction_hash),
        format!("  Gas Used: {}", fee.gas_used),
        format!("  Effective Gas Price: {}", fee.effective_gas_price),
        format!("  Execution Fee: {}", fee.execution_fee),
        format!("  L1 Gas Used: {}", or_na(fee.data_availability_gas_used)),
        format!("  L1 Gas Price: {}", or_na(fee.data_availability_gas_price)),
        format!("  L1 Fee: {}", or_na(fee.data_availability_fee)),
        format!("  Total Fee: {}", fee.total_fee),
    ]
}

fn or_na<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| "N/A".to_owned(), |v| v.to_string())
}
