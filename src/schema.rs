// 📐 Schema Normalizer
// Polymorphic per-source schemas: each feed names its own columns, every
// schema resolves them to the same canonical fields.

use crate::parsing::{parse_currency, parse_date};
use crate::record::{CanonicalRecord, RawRecord};
use crate::source::Source;

/// Columns holding address and identity data that the Captira-style table hides
const CAPTIRA_HIDDEN: &[&str] = &[
    "Address",
    "City",
    "State",
    "Zip",
    "Mobile Ph #",
    "Date of Birth",
    "Last Payment Date",
];

const SIMPLY_HIDDEN: &[&str] = &["Def. Phone"];

// ============================================================================
// CORE TRAIT
// ============================================================================

/// SourceSchema - How one feed maps onto the canonical record.
///
/// Only the balance chains and the hidden columns are mandatory. Feeds
/// without a payment date, city or phone column keep the `None` defaults.
pub trait SourceSchema: Send + Sync {
    fn source(&self) -> Source;

    /// Columns tried in order for the balance still owed
    fn balance_chain(&self) -> &'static [&'static str];

    /// Columns tried in order for the original amount due
    fn total_due_chain(&self) -> &'static [&'static str];

    /// Raw columns left out of the record table
    fn hidden_columns(&self) -> &'static [&'static str];

    fn aging_field(&self) -> Option<&'static str> {
        None
    }

    fn location_field(&self) -> Option<&'static str> {
        None
    }

    fn contact_field(&self) -> Option<&'static str> {
        None
    }

    /// Whether the dashboard shows the days-since-payment chart
    fn has_aging_chart(&self) -> bool {
        false
    }

    /// Whether the dashboard shows the top-cities chart
    fn has_location_chart(&self) -> bool {
        false
    }

    /// Year selector only makes sense when a payment date is tracked
    fn supports_year_filter(&self) -> bool {
        self.aging_field().is_some()
    }

    fn total_balance_label(&self) -> &'static str {
        "Total Balance Owed"
    }

    fn current_balance_label(&self) -> &'static str {
        "Current Balance"
    }

    /// Label/value pairs shown in the record detail view
    fn detail_fields(&self, record: &CanonicalRecord) -> Vec<(&'static str, String)>;
}

// ============================================================================
// FACTORY FUNCTIONS
// ============================================================================

/// Get the schema for a source
pub fn schema_for(source: Source) -> &'static dyn SourceSchema {
    match source {
        Source::Captira => &CaptiraSchema,
        Source::Simply => &SimplySchema,
        Source::Joint => &JointSchema,
    }
}

/// Resolve the canonical fields of one raw row. Never fails: a row with no
/// usable balance column normalizes to a zero balance.
pub fn normalize(source: Source, raw: RawRecord, index: usize) -> CanonicalRecord {
    let schema = schema_for(source);

    let balance_hit = raw.first_present(schema.balance_chain());
    let canonical_balance = parse_currency(balance_hit.map(|(_, v)| v));
    let balance_column = balance_hit.map(|(column, _)| column.to_string());

    let canonical_total_due = parse_currency(
        raw.first_present(schema.total_due_chain()).map(|(_, v)| v),
    );

    let last_payment_date = schema
        .aging_field()
        .and_then(|field| parse_date(raw.get(field)));

    let location = schema
        .location_field()
        .and_then(|field| raw.non_empty(field))
        .map(|city| city.trim().to_string());

    let contact_phone = schema
        .contact_field()
        .and_then(|field| raw.non_empty(field))
        .map(|phone| phone.trim().to_string());

    CanonicalRecord {
        original_index: index,
        canonical_balance,
        canonical_total_due,
        collected_amount: 0.0,
        last_payment_date,
        location,
        contact_phone,
        balance_column,
        raw,
    }
}

/// Headers to show in the record table, in sheet order
pub fn visible_columns(source: Source, headers: &[String]) -> Vec<String> {
    let hidden = schema_for(source).hidden_columns();
    headers
        .iter()
        .filter(|header| !hidden.contains(&header.as_str()))
        .cloned()
        .collect()
}

fn join_present(record: &CanonicalRecord, columns: &[&str]) -> String {
    let parts: Vec<&str> = columns
        .iter()
        .filter_map(|column| record.raw.non_empty(column))
        .collect();

    if parts.is_empty() {
        "-".to_string()
    } else {
        parts.join(", ")
    }
}

// ============================================================================
// CAPTIRA
// ============================================================================

pub struct CaptiraSchema;

impl SourceSchema for CaptiraSchema {
    fn source(&self) -> Source {
        Source::Captira
    }

    fn balance_chain(&self) -> &'static [&'static str] {
        &["Balance Owed", "Current Balance", "Balance"]
    }

    fn total_due_chain(&self) -> &'static [&'static str] {
        &["Balance Owed", "Current Balance", "Balance"]
    }

    fn hidden_columns(&self) -> &'static [&'static str] {
        CAPTIRA_HIDDEN
    }

    fn aging_field(&self) -> Option<&'static str> {
        Some("Last Payment Date")
    }

    fn location_field(&self) -> Option<&'static str> {
        Some("City")
    }

    fn contact_field(&self) -> Option<&'static str> {
        Some("Mobile Ph #")
    }

    fn has_aging_chart(&self) -> bool {
        true
    }

    fn has_location_chart(&self) -> bool {
        true
    }

    fn detail_fields(&self, record: &CanonicalRecord) -> Vec<(&'static str, String)> {
        vec![
            ("Name", record.display_value("Defendant")),
            ("Date of Birth", record.display_value("Date of Birth")),
            ("Address", record.display_value("Address")),
            ("City/State/Zip", join_present(record, &["City", "State", "Zip"])),
            ("Mobile Phone", record.display_value("Mobile Ph #")),
            ("Balance Owed", record.display_value("Balance Owed")),
        ]
    }
}

// ============================================================================
// SIMPLY
// ============================================================================

pub struct SimplySchema;

impl SourceSchema for SimplySchema {
    fn source(&self) -> Source {
        Source::Simply
    }

    fn balance_chain(&self) -> &'static [&'static str] {
        &["Outstanding Balance", "Total Due"]
    }

    fn total_due_chain(&self) -> &'static [&'static str] {
        &["Total Due"]
    }

    fn hidden_columns(&self) -> &'static [&'static str] {
        SIMPLY_HIDDEN
    }

    fn contact_field(&self) -> Option<&'static str> {
        Some("Def. Phone")
    }

    fn total_balance_label(&self) -> &'static str {
        "Total Due"
    }

    fn current_balance_label(&self) -> &'static str {
        "Outstanding Balance"
    }

    fn detail_fields(&self, record: &CanonicalRecord) -> Vec<(&'static str, String)> {
        let name = record
            .raw
            .first_present(&["Name", "Def."])
            .map(|(_, v)| v.to_string())
            .unwrap_or_else(|| "-".to_string());

        vec![
            ("Name", name),
            ("Phone Number", record.display_value("Def. Phone")),
            ("Total Due", record.display_value("Total Due")),
            ("Outstanding Balance", record.display_value("Outstanding Balance")),
        ]
    }
}

// ============================================================================
// JOINT
// ============================================================================

/// Joint exports carry their own underscore-named balance columns. A payment
/// date column may exist, but it is not mapped: Joint has no year filter and
/// an all-zero aging chart. Cities still feed the location chart.
pub struct JointSchema;

impl SourceSchema for JointSchema {
    fn source(&self) -> Source {
        Source::Joint
    }

    fn balance_chain(&self) -> &'static [&'static str] {
        &["Current_Balance"]
    }

    fn total_due_chain(&self) -> &'static [&'static str] {
        &["Total_Balance"]
    }

    fn hidden_columns(&self) -> &'static [&'static str] {
        CAPTIRA_HIDDEN
    }

    fn location_field(&self) -> Option<&'static str> {
        Some("City")
    }

    fn contact_field(&self) -> Option<&'static str> {
        Some("Contact")
    }

    fn has_aging_chart(&self) -> bool {
        true
    }

    fn has_location_chart(&self) -> bool {
        true
    }

    fn detail_fields(&self, record: &CanonicalRecord) -> Vec<(&'static str, String)> {
        vec![
            ("Name", record.display_value("Defendant")),
            ("Date of Birth", record.display_value("Date of Birth")),
            ("Address", record.display_value("Address")),
            ("City/State/Zip", join_present(record, &["City", "State", "Zip"])),
            ("Contact", record.display_value("Contact")),
            ("Total Balance", record.display_value("Total_Balance")),
            ("Current Balance", record.display_value("Current_Balance")),
        ]
    }
}

// ============================================================================
// TESTS
// ============================================================================
