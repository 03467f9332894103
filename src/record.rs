// 📄 Record types - raw spreadsheet rows and their canonical form

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// RAW RECORD
// ============================================================================

/// RawRecord - One row of a source sheet, keyed by trimmed header name.
/// A cell missing from a short row is simply absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord {
    fields: HashMap<String, String>,
}

impl RawRecord {
    pub fn new() -> Self {
        RawRecord::default()
    }

    /// Builder pattern: add a cell
    pub fn with(mut self, column: &str, value: &str) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: &str, value: &str) {
        self.fields.insert(column.trim().to_string(), value.to_string());
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(|v| v.as_str())
    }

    /// Value of `column` if present and not blank
    pub fn non_empty(&self, column: &str) -> Option<&str> {
        self.get(column).filter(|v| !v.trim().is_empty())
    }

    /// First column of `chain` holding a non-blank value, with that value
    pub fn first_present<'a>(&'a self, chain: &[&'a str]) -> Option<(&'a str, &'a str)> {
        chain
            .iter()
            .find_map(|column| self.non_empty(column).map(|value| (*column, value)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for RawRecord {
    fn from_iter<T: IntoIterator<Item = (&'a str, &'a str)>>(iter: T) -> Self {
        let mut record = RawRecord::new();
        for (column, value) in iter {
            record.insert(column, value);
        }
        record
    }
}

// ============================================================================
// CANONICAL RECORD
// ============================================================================

/// CanonicalRecord - A raw row plus the normalized fields every source shares.
///
/// `original_index` is the stable key used by collections; it is never
/// renumbered. `canonical_total_due` is fixed at normalization time while
/// `canonical_balance` and `collected_amount` move with each collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub original_index: usize,
    pub canonical_balance: f64,
    pub canonical_total_due: f64,
    pub collected_amount: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_payment_date: Option<NaiveDate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,

    /// Raw column the balance was read from, rewritten after a collection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance_column: Option<String>,

    pub raw: RawRecord,
}

impl CanonicalRecord {
    /// Cell text for table display ("-" when blank, as the sheets show it)
    pub fn display_value(&self, column: &str) -> String {
        self.raw
            .non_empty(column)
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-".to_string())
    }

    /// Share of the original total already paid off (above 1.0 after
    /// over-collection)
    pub fn paid_fraction(&self) -> f64 {
        if self.canonical_total_due == 0.0 {
            0.0
        } else {
            (self.canonical_total_due - self.canonical_balance) / self.canonical_total_due
        }
    }
}
