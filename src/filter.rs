// 🔍 Filter Engine - narrows the record table (never the dashboard)

use crate::error::{RecoveryError, Result};
use crate::parsing::parse_date;
use crate::record::CanonicalRecord;
use crate::schema::schema_for;
use crate::source::Source;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// FILTER TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YearFilter {
    #[default]
    All,
    Year(i32),
}

impl YearFilter {
    pub fn matches(&self, record: &CanonicalRecord) -> bool {
        match self {
            YearFilter::All => true,
            YearFilter::Year(year) => record
                .last_payment_date
                .map_or(false, |date| date.year() == *year),
        }
    }

    /// Next entry of the year selector: All → newest year → … → oldest → All
    pub fn cycle(&self, years: &[i32]) -> Self {
        match self {
            YearFilter::All => years.first().map_or(YearFilter::All, |y| YearFilter::Year(*y)),
            YearFilter::Year(current) => years
                .iter()
                .position(|y| y == current)
                .and_then(|i| years.get(i + 1))
                .map_or(YearFilter::All, |y| YearFilter::Year(*y)),
        }
    }
}

impl fmt::Display for YearFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YearFilter::All => f.write_str("all"),
            YearFilter::Year(year) => write!(f, "{}", year),
        }
    }
}

impl FromStr for YearFilter {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            Ok(YearFilter::All)
        } else {
            s.parse::<i32>().map(YearFilter::Year)
        }
    }
}

/// Inclusive range on the canonical balance
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BalanceRange {
    pub min: f64,
    pub max: f64,
}

impl BalanceRange {
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if min.is_nan() || max.is_nan() || min > max {
            return Err(RecoveryError::InvalidRange { min, max });
        }
        Ok(BalanceRange { min, max })
    }

    /// Smallest and largest balance of the set (0..0 when it is empty)
    pub fn bounds(records: &[CanonicalRecord]) -> Self {
        let mut balances = records.iter().map(|r| r.canonical_balance);
        let Some(first) = balances.next() else {
            return BalanceRange::default();
        };

        let (min, max) = balances.fold((first, first), |(lo, hi), b| (lo.min(b), hi.max(b)));
        BalanceRange { min, max }
    }

    pub fn contains(&self, balance: f64) -> bool {
        balance >= self.min && balance <= self.max
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flip(&self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            SortDirection::Asc => "▲",
            SortDirection::Desc => "▼",
        }
    }
}

impl FromStr for SortDirection {
    type Err = RecoveryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Asc),
            "desc" | "descending" => Ok(SortDirection::Desc),
            _ => Err(RecoveryError::InvalidSortDirection(s.to_string())),
        }
    }
}

/// Table column the view is ordered by
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    pub column: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortOrder {
    pub fn new(column: &str, direction: SortDirection) -> Self {
        SortOrder {
            column: column.to_string(),
            direction,
        }
    }

    /// Next column of the sort selector: unsorted → first column → … → last
    /// → unsorted. The direction carries over.
    pub fn cycle(current: Option<&SortOrder>, columns: &[String]) -> Option<SortOrder> {
        let next = match current {
            None => columns.first(),
            Some(order) => columns
                .iter()
                .position(|c| *c == order.column)
                .and_then(|i| columns.get(i + 1)),
        }?;

        let direction = current.map(|o| o.direction).unwrap_or_default();
        Some(SortOrder::new(next, direction))
    }
}

/// Everything the table view is narrowed (and ordered) by
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub year: YearFilter,
    pub balance_range: BalanceRange,
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub sort: Option<SortOrder>,
}

// ============================================================================
// FILTERING
// ============================================================================

/// Year filter, then balance filter; both must pass. Sources that track no
/// payment date ignore the year filter. The input is left untouched.
pub fn filter(
    records: &[CanonicalRecord],
    source: Source,
    year: YearFilter,
    range: BalanceRange,
) -> Vec<CanonicalRecord> {
    let year_applies = schema_for(source).supports_year_filter();

    records
        .iter()
        .filter(|record| !year_applies || year.matches(record))
        .filter(|record| range.contains(record.canonical_balance))
        .cloned()
        .collect()
}

/// [`filter`] plus the free-text search box, then the column sort
pub fn apply_criteria(
    records: &[CanonicalRecord],
    source: Source,
    criteria: &FilterCriteria,
) -> Vec<CanonicalRecord> {
    let mut view = filter(records, source, criteria.year, criteria.balance_range);
    if !criteria.search.trim().is_empty() {
        view.retain(|record| matches_search(record, &criteria.search));
    }
    if let Some(order) = &criteria.sort {
        sort_records(&mut view, order);
    }
    view
}

// ============================================================================
// SORTING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Number,
    Date,
    Text,
}

#[derive(Debug, Clone, PartialEq)]
enum SortKey {
    Number(Option<f64>),
    Date(Option<NaiveDate>),
    Text(String),
}

impl SortKey {
    /// Blank cells order before any value
    fn compare(&self, other: &SortKey) -> Ordering {
        match (self, other) {
            (SortKey::Number(a), SortKey::Number(b)) => match (a, b) {
                (Some(a), Some(b)) => a.total_cmp(b),
                _ => a.is_some().cmp(&b.is_some()),
            },
            (SortKey::Date(a), SortKey::Date(b)) => a.cmp(b),
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

/// Cell as a plain amount ("$1,200.00", "450", "-3.5"); `None` for text
fn numeric_cell(value: &str) -> Option<f64> {
    let cleaned: String = value
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Balance cells sort on the canonical value, which tracks collections
fn number_key(record: &CanonicalRecord, column: &str) -> Option<f64> {
    if record.balance_column.as_deref() == Some(column) {
        return Some(record.canonical_balance);
    }
    record.raw.non_empty(column).and_then(numeric_cell)
}

/// A column is numeric (or a date column) only if every filled cell is
fn column_kind(records: &[CanonicalRecord], column: &str) -> ColumnKind {
    let cells: Vec<&str> = records
        .iter()
        .filter(|r| r.balance_column.as_deref() != Some(column))
        .filter_map(|r| r.raw.non_empty(column))
        .collect();

    if cells.iter().all(|c| numeric_cell(c).is_some()) {
        ColumnKind::Number
    } else if cells.iter().all(|c| parse_date(Some(*c)).is_some()) {
        ColumnKind::Date
    } else {
        ColumnKind::Text
    }
}

/// Stable sort on one column: equal keys keep their current order, so a
/// filtered view stays in export order within ties.
pub fn sort_records(records: &mut Vec<CanonicalRecord>, order: &SortOrder) {
    let column = order.column.as_str();
    let kind = column_kind(records.as_slice(), column);

    let mut keyed: Vec<(SortKey, CanonicalRecord)> = records
        .drain(..)
        .map(|record| {
            let key = match kind {
                ColumnKind::Number => SortKey::Number(number_key(&record, column)),
                ColumnKind::Date => SortKey::Date(parse_date(record.raw.get(column))),
                ColumnKind::Text => SortKey::Text(
                    record.raw.get(column).unwrap_or("").trim().to_lowercase(),
                ),
            };
            (key, record)
        })
        .collect();

    keyed.sort_by(|(a, _), (b, _)| match order.direction {
        SortDirection::Asc => a.compare(b),
        SortDirection::Desc => b.compare(a),
    });

    records.extend(keyed.into_iter().map(|(_, record)| record));
}

/// Case-insensitive substring match over raw cells and canonical fields
pub fn matches_search(record: &CanonicalRecord, term: &str) -> bool {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }

    let hit = |text: &str| text.to_lowercase().contains(&needle);

    record.raw.iter().any(|(_, value)| hit(value))
        || record.location.as_deref().map_or(false, hit)
        || record.contact_phone.as_deref().map_or(false, hit)
        || hit(&record.original_index.to_string())
        || hit(&format!("{:.2}", record.canonical_balance))
}

/// Distinct payment years, newest first, for the year selector
pub fn available_years(records: &[CanonicalRecord]) -> Vec<i32> {
    let mut years: Vec<i32> = records
        .iter()
        .filter_map(|r| r.last_payment_date.map(|d| d.year()))
        .collect();
    years.sort_unstable_by(|a, b| b.cmp(a));
    years.dedup();
    years
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RawRecord;
    use crate::schema::normalize;

    fn captira(balance: &str, last_payment: &str, index: usize) -> CanonicalRecord {
        let raw = RawRecord::new()
            .with("Defendant", &format!("Defendant {}", index))
            .with("Balance Owed", balance)
            .with("Last Payment Date", last_payment);
        normalize(Source::Captira, raw, index)
    }

    fn indexes(records: &[CanonicalRecord]) -> Vec<usize> {
        records.iter().map(|r| r.original_index).collect()
    }

    fn sample() -> Vec<CanonicalRecord> {
        vec![
            captira("$100", "03/01/2023", 0),
            captira("$2,000", "07/15/2023", 1),
            captira("$600", "01/10/2024", 2),
            captira("$50", "", 3),
        ]
    }

    #[test]
    fn test_bounds() {
        let bounds = BalanceRange::bounds(&sample());
        assert_eq!(bounds, BalanceRange { min: 50.0, max: 2000.0 });
        assert_eq!(BalanceRange::bounds(&[]), BalanceRange { min: 0.0, max: 0.0 });
    }

    #[test]
    fn test_default_bounds_keep_everything() {
        let records = sample();
        let view = filter(&records, Source::Captira, YearFilter::All, BalanceRange::bounds(&records));
        assert_eq!(view, records);
    }

    #[test]
    fn test_year_filter_excludes_missing_dates() {
        let records = sample();
        let view = filter(&records, Source::Captira, YearFilter::Year(2023), BalanceRange::bounds(&records));
        assert_eq!(indexes(&view), vec![0, 1]);
    }

    #[test]
    fn test_year_and_balance_are_conjunctive() {
        let records = sample();
        let range = BalanceRange::new(0.0, 1000.0).unwrap();
        let view = filter(&records, Source::Captira, YearFilter::Year(2023), range);
        assert_eq!(indexes(&view), vec![0]);
    }

    #[test]
    fn test_balance_range_is_inclusive() {
        let records = sample();
        let range = BalanceRange::new(100.0, 600.0).unwrap();
        let view = filter(&records, Source::Captira, YearFilter::All, range);
        assert_eq!(indexes(&view), vec![0, 2]);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let records = sample();
        let range = BalanceRange::new(60.0, 5000.0).unwrap();
        let once = filter(&records, Source::Captira, YearFilter::Year(2023), range);
        let twice = filter(&once, Source::Captira, YearFilter::Year(2023), range);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_year_filter_is_noop_for_joint() {
        let records: Vec<CanonicalRecord> = (0..3)
            .map(|i| {
                let raw = RawRecord::new()
                    .with("Current_Balance", "$10")
                    .with("Last Payment Date", "01/01/2020");
                normalize(Source::Joint, raw, i)
            })
            .collect();

        let view = filter(&records, Source::Joint, YearFilter::Year(2023), BalanceRange::bounds(&records));
        assert_eq!(view.len(), 3);
    }

    #[test]
    fn test_invalid_range_rejected() {
        assert!(BalanceRange::new(10.0, 5.0).is_err());
        assert!(BalanceRange::new(f64::NAN, 5.0).is_err());
    }

    #[test]
    fn test_available_years_newest_first() {
        assert_eq!(available_years(&sample()), vec![2024, 2023]);
    }

    #[test]
    fn test_year_filter_cycle() {
        let years = vec![2024, 2023];
        let mut year = YearFilter::All;
        year = year.cycle(&years);
        assert_eq!(year, YearFilter::Year(2024));
        year = year.cycle(&years);
        assert_eq!(year, YearFilter::Year(2023));
        year = year.cycle(&years);
        assert_eq!(year, YearFilter::All);
        assert_eq!(YearFilter::All.cycle(&[]), YearFilter::All);
    }

    #[test]
    fn test_year_filter_from_str() {
        assert_eq!("all".parse::<YearFilter>().unwrap(), YearFilter::All);
        assert_eq!("".parse::<YearFilter>().unwrap(), YearFilter::All);
        assert_eq!("2023".parse::<YearFilter>().unwrap(), YearFilter::Year(2023));
        assert!("twenty".parse::<YearFilter>().is_err());
    }

    #[test]
    fn test_search_matches_raw_cells() {
        let records = sample();
        let criteria = FilterCriteria {
            year: YearFilter::All,
            balance_range: BalanceRange::bounds(&records),
            search: "defendant 2".to_string(),
            sort: None,
        };
        assert_eq!(indexes(&apply_criteria(&records, Source::Captira, &criteria)), vec![2]);
    }

    fn sorted(records: &[CanonicalRecord], column: &str, direction: SortDirection) -> Vec<usize> {
        let mut view = records.to_vec();
        sort_records(&mut view, &SortOrder::new(column, direction));
        indexes(&view)
    }

    #[test]
    fn test_sort_balance_numerically() {
        let records = sample();
        assert_eq!(sorted(&records, "Balance Owed", SortDirection::Asc), vec![3, 0, 2, 1]);
        assert_eq!(sorted(&records, "Balance Owed", SortDirection::Desc), vec![1, 2, 0, 3]);
    }

    #[test]
    fn test_sort_ties_keep_export_order() {
        let records = vec![
            captira("$10", "", 0),
            captira("$5", "", 1),
            captira("$10", "", 2),
            captira("$5", "", 3),
        ];
        assert_eq!(sorted(&records, "Balance Owed", SortDirection::Asc), vec![1, 3, 0, 2]);
        assert_eq!(sorted(&records, "Balance Owed", SortDirection::Desc), vec![0, 2, 1, 3]);
    }

    #[test]
    fn test_sort_dates_chronologically() {
        // Lexical order would put 01/10/2024 first
        let records = sample();
        assert_eq!(sorted(&records, "Last Payment Date", SortDirection::Asc), vec![3, 0, 1, 2]);
        assert_eq!(sorted(&records, "Last Payment Date", SortDirection::Desc), vec![2, 1, 0, 3]);
    }

    #[test]
    fn test_sort_text_ignores_case() {
        let records: Vec<CanonicalRecord> = ["bravo", "Alpha", "charlie"]
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let raw = RawRecord::new().with("Defendant", name).with("Balance Owed", "$1");
                normalize(Source::Captira, raw, i)
            })
            .collect();
        assert_eq!(sorted(&records, "Defendant", SortDirection::Asc), vec![1, 0, 2]);
    }

    #[test]
    fn test_sort_runs_after_filtering() {
        let records = sample();
        let criteria = FilterCriteria {
            year: YearFilter::Year(2023),
            balance_range: BalanceRange::bounds(&records),
            search: String::new(),
            sort: Some(SortOrder::new("Balance Owed", SortDirection::Desc)),
        };
        assert_eq!(indexes(&apply_criteria(&records, Source::Captira, &criteria)), vec![1, 0]);
    }

    #[test]
    fn test_sort_order_cycle() {
        let columns = vec!["Defendant".to_string(), "Balance Owed".to_string()];

        let first = SortOrder::cycle(None, &columns);
        assert_eq!(first, Some(SortOrder::new("Defendant", SortDirection::Asc)));

        let desc = SortOrder::new("Defendant", SortDirection::Desc);
        let second = SortOrder::cycle(Some(&desc), &columns);
        assert_eq!(second, Some(SortOrder::new("Balance Owed", SortDirection::Desc)));

        assert_eq!(SortOrder::cycle(second.as_ref(), &columns), None);
    }

    #[test]
    fn test_sort_direction_from_str() {
        assert_eq!("ASC".parse::<SortDirection>().unwrap(), SortDirection::Asc);
        assert_eq!("descending".parse::<SortDirection>().unwrap(), SortDirection::Desc);
        assert!(matches!(
            "sideways".parse::<SortDirection>(),
            Err(RecoveryError::InvalidSortDirection(_))
        ));
    }
}
