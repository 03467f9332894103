// 💵 Collection Mutator - record a partial payment against one record
//
// Copy-on-write: the input slice is never touched, callers swap in the
// returned array as a whole.

use crate::error::{RecoveryError, Result};
use crate::parsing::format_currency;
use crate::record::CanonicalRecord;
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Outcome of one applied collection, for status lines and API responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionReceipt {
    pub original_index: usize,
    pub amount: f64,
    pub previous_balance: f64,
    pub new_balance: f64,
    pub collected_total: f64,
}

impl CollectionReceipt {
    /// More was collected than was owed
    pub fn over_collected(&self) -> bool {
        self.new_balance < 0.0
    }
}

/// Validate what the user typed. Accepts "200", "$1,250.00", " 75.5 ".
/// Anything that is not a finite positive number is rejected so the caller
/// can ask again.
pub fn parse_collection_amount(input: &str) -> Result<f64> {
    let cleaned: String = input
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();

    match cleaned.parse::<f64>() {
        Ok(amount) if amount.is_finite() && amount > 0.0 => Ok(amount),
        _ => Err(RecoveryError::InvalidAmount(input.trim().to_string())),
    }
}

/// Apply `amount` to the record whose `original_index` is `index`.
///
/// Returns the replacement array and a receipt. Over-collection is allowed:
/// the balance goes negative.
pub fn collect(
    records: &[CanonicalRecord],
    index: usize,
    amount: f64,
) -> Result<(Vec<CanonicalRecord>, CollectionReceipt)> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(RecoveryError::InvalidAmount(amount.to_string()));
    }

    let position = records
        .iter()
        .position(|r| r.original_index == index)
        .ok_or(RecoveryError::RecordNotFound(index))?;

    let mut updated = records.to_vec();
    let record = &mut updated[position];

    let previous_balance = record.canonical_balance;
    record.collected_amount += amount;
    record.canonical_balance -= amount;

    // Keep the displayed cell in step with the canonical value
    if let Some(column) = record.balance_column.clone() {
        record
            .raw
            .insert(&column, &format_currency(record.canonical_balance));
    }

    let receipt = CollectionReceipt {
        original_index: index,
        amount,
        previous_balance,
        new_balance: record.canonical_balance,
        collected_total: record.collected_amount,
    };

    if receipt.over_collected() {
        warn!(
            "Collection of {:.2} on record {} exceeds the remaining {:.2}",
            amount, index, previous_balance
        );
    } else {
        info!(
            "Collected {:.2} on record {}, balance now {:.2}",
            amount, index, receipt.new_balance
        );
    }

    Ok((updated, receipt))
}
