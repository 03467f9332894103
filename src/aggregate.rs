// 📊 Aggregator - dashboard statistics over the full active record set
//
// Always computed over every loaded record of the active source. The year
// and balance filters narrow the table only, never these numbers.

use crate::parsing::days_since;
use crate::record::CanonicalRecord;
use crate::schema::schema_for;
use crate::source::Source;
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Cities shown in the location chart
pub const TOP_LOCATIONS: usize = 10;

/// (label, inclusive upper bound). The last bucket is open-ended.
const BALANCE_BUCKETS: [(&str, f64); 5] = [
    ("0–500", 500.0),
    ("501–1,000", 1_000.0),
    ("1,001–3,000", 3_000.0),
    ("3,001–5,000", 5_000.0),
    ("5,001+", f64::INFINITY),
];

/// (label, inclusive upper bound in days)
const AGING_BUCKETS: [(&str, i64); 4] = [
    ("0–30 days", 30),
    ("31–60 days", 60),
    ("61–90 days", 90),
    ("91+ days", i64::MAX),
];

// ============================================================================
// OUTPUT TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionBucket {
    pub label: String,
    pub count: usize,
}

impl DistributionBucket {
    fn new(label: &str, count: usize) -> Self {
        DistributionBucket {
            label: label.to_string(),
            count,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub total_records: usize,
    /// Sum of the original amounts due
    pub total_balance: f64,
    /// Sum of what is still owed
    pub current_balance: f64,
    /// Not clamped: over-collection pushes this past 100
    pub percentage_paid: f64,
}

impl SummaryStats {
    pub fn from_records(records: &[CanonicalRecord]) -> Self {
        let total_balance: f64 = records.iter().map(|r| r.canonical_total_due).sum();
        let current_balance: f64 = records.iter().map(|r| r.canonical_balance).sum();

        let percentage_paid = if total_balance == 0.0 {
            0.0
        } else {
            (total_balance - current_balance) / total_balance * 100.0
        };

        SummaryStats {
            total_records: records.len(),
            total_balance,
            current_balance,
            percentage_paid,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub summary: SummaryStats,
    pub balance_distribution: Vec<DistributionBucket>,
    /// Empty for sources without an aging chart
    pub payment_aging: Vec<DistributionBucket>,
    /// Top cities, empty for sources without a location chart
    pub location_distribution: Vec<DistributionBucket>,
}

// ============================================================================
// AGGREGATION
// ============================================================================

/// Compute the summary and the three distributions for `source`
pub fn aggregate(records: &[CanonicalRecord], source: Source, today: NaiveDate) -> Dashboard {
    let schema = schema_for(source);

    let dashboard = Dashboard {
        summary: SummaryStats::from_records(records),
        balance_distribution: balance_distribution(records),
        payment_aging: if schema.has_aging_chart() {
            payment_aging(records, today)
        } else {
            Vec::new()
        },
        location_distribution: if schema.has_location_chart() {
            location_distribution(records, TOP_LOCATIONS)
        } else {
            Vec::new()
        },
    };

    debug!(
        "Aggregated {} {} records: balance {:.2} of {:.2}",
        dashboard.summary.total_records,
        source,
        dashboard.summary.current_balance,
        dashboard.summary.total_balance
    );

    dashboard
}

/// Index of the balance bucket for an amount (negatives land in the first)
pub fn balance_bucket(balance: f64) -> usize {
    BALANCE_BUCKETS
        .iter()
        .position(|(_, upper)| balance <= *upper)
        .unwrap_or(BALANCE_BUCKETS.len() - 1)
}

pub fn balance_bucket_label(balance: f64) -> &'static str {
    BALANCE_BUCKETS[balance_bucket(balance)].0
}

/// One count per record, so the counts always sum to the record count
pub fn balance_distribution(records: &[CanonicalRecord]) -> Vec<DistributionBucket> {
    let mut counts = [0usize; BALANCE_BUCKETS.len()];
    for record in records {
        counts[balance_bucket(record.canonical_balance)] += 1;
    }

    BALANCE_BUCKETS
        .iter()
        .zip(counts)
        .map(|((label, _), count)| DistributionBucket::new(label, count))
        .collect()
}

/// Days since last payment. Records without a valid date count nowhere.
pub fn payment_aging(records: &[CanonicalRecord], today: NaiveDate) -> Vec<DistributionBucket> {
    let mut counts = [0usize; AGING_BUCKETS.len()];

    for date in records.iter().filter_map(|r| r.last_payment_date) {
        let days = days_since(date, today);
        let bucket = AGING_BUCKETS
            .iter()
            .position(|(_, upper)| days <= *upper)
            .unwrap_or(AGING_BUCKETS.len() - 1);
        counts[bucket] += 1;
    }

    AGING_BUCKETS
        .iter()
        .zip(counts)
        .map(|((label, _), count)| DistributionBucket::new(label, count))
        .collect()
}

/// Record count per city, most frequent first. Ties keep the order in which
/// the cities were first seen.
pub fn location_distribution(records: &[CanonicalRecord], limit: usize) -> Vec<DistributionBucket> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();

    for record in records {
        let Some(city) = record.location.as_deref().map(str::trim) else {
            continue;
        };
        if city.is_empty() {
            continue;
        }

        let count = counts.entry(city).or_insert(0);
        if *count == 0 {
            order.push(city);
        }
        *count += 1;
    }

    let mut result: Vec<DistributionBucket> = order
        .into_iter()
        .map(|city| DistributionBucket::new(city, counts[city]))
        .collect();

    // sort_by is stable
    result.sort_by(|a, b| b.count.cmp(&a.count));
    result.truncate(limit);
    result
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RawRecord;
    use crate::schema::normalize;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    fn captira(balance: &str, last_payment: &str, city: &str, index: usize) -> CanonicalRecord {
        let raw = RawRecord::new()
            .with("Balance Owed", balance)
            .with("Last Payment Date", last_payment)
            .with("City", city);
        normalize(Source::Captira, raw, index)
    }

    fn counts(buckets: &[DistributionBucket]) -> Vec<usize> {
        buckets.iter().map(|b| b.count).collect()
    }

    #[test]
    fn test_balance_bucket_boundaries() {
        assert_eq!(balance_bucket(-20.0), 0);
        assert_eq!(balance_bucket(0.0), 0);
        assert_eq!(balance_bucket(500.0), 0);
        assert_eq!(balance_bucket(500.01), 1);
        assert_eq!(balance_bucket(1000.0), 1);
        assert_eq!(balance_bucket(3000.0), 2);
        assert_eq!(balance_bucket(5000.0), 3);
        assert_eq!(balance_bucket(5000.5), 4);
        assert_eq!(balance_bucket_label(1200.0), "1,001–3,000");
    }

    #[test]
    fn test_balance_distribution_sums_to_record_count() {
        let records = vec![
            captira("$100", "", "", 0),
            captira("$1,200.00", "", "", 1),
            captira("$9,999", "", "", 2),
            captira("garbage", "", "", 3),
            captira("$4,000", "", "", 4),
        ];

        let buckets = balance_distribution(&records);
        assert_eq!(counts(&buckets), vec![2, 0, 1, 1, 1]);
        assert_eq!(buckets.iter().map(|b| b.count).sum::<usize>(), records.len());
    }

    #[test]
    fn test_payment_aging_excludes_invalid_dates() {
        let records = vec![
            captira("$1", "06/20/2024", "", 0), // 10 days
            captira("$1", "05/31/2024", "", 1), // 30 days
            captira("$1", "05/30/2024", "", 2), // 31 days
            captira("$1", "04/01/2024", "", 3), // 90 days
            captira("$1", "01/01/2023", "", 4),
            captira("$1", "", "", 5),
            captira("$1", "not a date", "", 6),
        ];

        let buckets = payment_aging(&records, today());
        assert_eq!(counts(&buckets), vec![2, 1, 1, 1]);
        assert_eq!(buckets[3].label, "91+ days");
    }

    #[test]
    fn test_location_distribution_ties_keep_first_seen_order() {
        let records = vec![
            captira("$1", "", "Waco", 0),
            captira("$1", "", "Austin", 1),
            captira("$1", "", " Austin ", 2),
            captira("$1", "", "Dallas", 3),
            captira("$1", "", "Waco", 4),
            captira("$1", "", "", 5),
            captira("$1", "", "El Paso", 6),
        ];

        let buckets = location_distribution(&records, TOP_LOCATIONS);
        let labels: Vec<&str> = buckets.iter().map(|b| b.label.as_str()).collect();

        assert_eq!(labels, vec!["Waco", "Austin", "Dallas", "El Paso"]);
        assert_eq!(counts(&buckets), vec![2, 2, 1, 1]);
    }

    #[test]
    fn test_location_distribution_truncates_to_top_ten() {
        let records: Vec<CanonicalRecord> = (0..15)
            .map(|i| captira("$1", "", &format!("City {}", i), i))
            .collect();

        assert_eq!(location_distribution(&records, TOP_LOCATIONS).len(), 10);
    }

    #[test]
    fn test_summary_percentage_paid() {
        let mut records = vec![captira("$1,000", "", "", 0), captira("$1,000", "", "", 1)];
        records[0].canonical_balance = 500.0;

        let summary = SummaryStats::from_records(&records);
        assert_eq!(summary.total_records, 2);
        assert_eq!(summary.total_balance, 2000.0);
        assert_eq!(summary.current_balance, 1500.0);
        assert_eq!(summary.percentage_paid, 25.0);
    }

    #[test]
    fn test_summary_zero_total_is_zero_percent() {
        let records = vec![captira("", "", "", 0)];
        assert_eq!(SummaryStats::from_records(&records).percentage_paid, 0.0);
        assert_eq!(SummaryStats::from_records(&[]).percentage_paid, 0.0);
    }

    #[test]
    fn test_summary_over_collection_not_clamped() {
        let mut records = vec![captira("$100", "", "", 0)];
        records[0].canonical_balance = -50.0;

        assert_eq!(SummaryStats::from_records(&records).percentage_paid, 150.0);
    }

    #[test]
    fn test_aggregate_simply_has_no_aging_or_locations() {
        let raw = RawRecord::new()
            .with("Outstanding Balance", "$450")
            .with("Total Due", "$900");
        let records = vec![normalize(Source::Simply, raw, 0)];

        let dashboard = aggregate(&records, Source::Simply, today());
        assert!(dashboard.payment_aging.is_empty());
        assert!(dashboard.location_distribution.is_empty());
        assert_eq!(counts(&dashboard.balance_distribution), vec![1, 0, 0, 0, 0]);
        assert_eq!(dashboard.summary.percentage_paid, 50.0);
    }

    #[test]
    fn test_aggregate_joint_has_zero_aging_buckets() {
        let raw = RawRecord::new()
            .with("Current_Balance", "$700")
            .with("Total_Balance", "$700")
            .with("City", "Dallas")
            .with("Last Payment Date", "06/01/2024");
        let records = vec![normalize(Source::Joint, raw, 0)];

        let dashboard = aggregate(&records, Source::Joint, today());
        assert_eq!(counts(&dashboard.payment_aging), vec![0, 0, 0, 0]);
        assert_eq!(dashboard.location_distribution.len(), 1);
        assert_eq!(dashboard.location_distribution[0].label, "Dallas");
    }
}
