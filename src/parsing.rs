// 🔢 Numeric/Date Parser
// Tolerant conversions from spreadsheet cells to numbers and dates.
// Nothing in here fails: bad input becomes 0 or None.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

// ============================================================================
// CURRENCY
// ============================================================================

/// Parse a currency-like cell ("$1,234.50", "450", " -12.5 ") into a number.
///
/// `$` and `,` are stripped, then the longest numeric prefix is read, so
/// trailing noise such as "1200 USD" still yields 1200. Absent, empty,
/// unparsable or non-finite input yields 0.
pub fn parse_currency(value: Option<&str>) -> f64 {
    let Some(raw) = value else {
        return 0.0;
    };

    let cleaned: String = raw.chars().filter(|c| *c != '$' && *c != ',').collect();
    let prefix = numeric_prefix(cleaned.trim_start());

    if prefix.is_empty() {
        return 0.0;
    }

    match prefix.parse::<f64>() {
        Ok(n) if n.is_finite() => n,
        _ => 0.0,
    }
}

/// Same contract as [`parse_currency`] for a value that is already numeric.
pub fn parse_currency_value(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Longest prefix of `text` that reads as a decimal float
/// (sign, digits, optional fraction, optional exponent).
fn numeric_prefix(text: &str) -> &str {
    let bytes = text.as_bytes();
    let mut end = 0;

    if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
        end += 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        end = frac_end;
    }

    if digits == 0 {
        return "";
    }

    // Exponent only counts when at least one digit follows it
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    &text[..end]
}

/// Render an amount the way the source sheets write it: "$1,234.50", "-$12.00".
pub fn format_currency(value: f64) -> String {
    let value = parse_currency_value(value);
    let cents = (value.abs() * 100.0).round() as u64;
    let whole = cents / 100;
    let frac = cents % 100;

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, grouped, frac)
}

// ============================================================================
// DATES
// ============================================================================

const DATE_FORMATS: &[&str] = &[
    "%m/%d/%Y",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m-%d-%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Parse a calendar date cell. `None` is the "invalid" marker: callers must
/// leave such records out of aging and year computations.
pub fn parse_date(value: Option<&str>) -> Option<NaiveDate> {
    let text = value?.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(date) = parse_short_year(text) {
        return Some(date);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(dt.date());
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, fmt) {
            return Some(date);
        }
    }

    None
}

/// "1/5/24" style dates. Handled up front because `%Y` would happily read
/// "24" as the year 24.
fn parse_short_year(text: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = text.split('/').collect();
    if parts.len() != 3 || parts[2].len() != 2 {
        return None;
    }
    if !parts.iter().all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit())) {
        return None;
    }
    NaiveDate::parse_from_str(text, "%m/%d/%y").ok()
}

/// Whole days elapsed between `date` and `now`. Negative when `date` lies in
/// the future.
pub fn days_since(date: NaiveDate, now: NaiveDate) -> i64 {
    now.signed_duration_since(date).num_days()
}

// ============================================================================
// TESTS
// ============================================================================
