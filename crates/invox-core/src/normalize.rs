//! Locale-ambiguous amount, date, and currency normalization.
//!
//! Pure functions, no external state. Nothing here errors: malformed
//! or ambiguous input yields `None` and the caller leaves the field
//! unset.

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Currency codes and symbols recognized by [`detect_currency`].
const CURRENCY_CODES: [&str; 5] = ["AED", "USD", "EUR", "GBP", "SAR"];

/// Parse a locale-ambiguous amount string.
///
/// When both `,` and `.` occur, the separator appearing later is the
/// decimal point ("1.234,56" vs "1,234.56"). A lone comma is decimal
/// only when exactly two digits follow it; otherwise it groups
/// thousands. Currency symbols and codes are stripped first.
pub fn normalize_amount(text: &str) -> Option<Decimal> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.' || *c == '-')
        .collect();

    if cleaned.is_empty() || !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let normalized = match (cleaned.rfind(','), cleaned.rfind('.')) {
        (Some(comma), Some(dot)) => {
            if comma > dot {
                // European: dot groups, comma is decimal
                cleaned.replace('.', "").replace(',', ".")
            } else {
                // US: comma groups, dot is decimal
                cleaned.replace(',', "")
            }
        }
        (Some(comma), None) => {
            let after = &cleaned[comma + 1..];
            if after.len() == 2 && after.chars().all(|c| c.is_ascii_digit()) {
                cleaned.replace(',', ".")
            } else {
                cleaned.replace(',', "")
            }
        }
        _ => cleaned,
    };

    Decimal::from_str(&normalized).ok().filter(|d| !d.is_sign_negative())
}

/// Parse a date in `DD/MM/YYYY`, `MM/DD/YYYY`, or `YYYY-MM-DD` form.
///
/// Day-first is the default for the ambiguous slash/dot/dash forms; a
/// first component above 12 forces day-first, a second component above
/// 12 forces month-first. Unparseable input yields `None`.
pub fn normalize_date(text: &str) -> Option<NaiveDate> {
    let trimmed = text.trim();

    // ISO: YYYY-MM-DD (also with / or .)
    let parts: Vec<&str> = trimmed.split(['-', '/', '.']).collect();
    if parts.len() == 3 {
        if parts[0].len() == 4 {
            let year: i32 = parts[0].parse().ok()?;
            let month: u32 = parts[1].parse().ok()?;
            let day: u32 = parts[2].parse().ok()?;
            return NaiveDate::from_ymd_opt(year, month, day);
        }

        let a: u32 = parts[0].parse().ok()?;
        let b: u32 = parts[1].parse().ok()?;
        let year = widen_year(parts[2].parse().ok()?);

        // Values above 12 disambiguate; otherwise assume day-first.
        let (day, month) = if a > 12 {
            (a, b)
        } else if b > 12 {
            (b, a)
        } else {
            (a, b)
        };
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    None
}

/// Widen a two-digit year: 00-50 land in the 2000s, 51-99 in the
/// 1900s.
fn widen_year(year: i32) -> i32 {
    if year < 100 {
        if year <= 50 { 2000 + year } else { 1900 + year }
    } else {
        year
    }
}

/// Detect a currency code or symbol in free text.
pub fn detect_currency(text: &str) -> Option<String> {
    let upper = text.to_uppercase();
    for code in CURRENCY_CODES {
        let found = upper
            .split(|c: char| !c.is_ascii_alphabetic())
            .any(|token| token == code);
        if found {
            return Some(code.to_string());
        }
    }

    if text.contains('$') {
        return Some("USD".to_string());
    }
    if text.contains('€') {
        return Some("EUR".to_string());
    }
    if text.contains('£') {
        return Some("GBP".to_string());
    }
    if text.contains("د.إ") {
        return Some("AED".to_string());
    }

    None
}

/// Add a payment term to an invoice date ("net 30" handling).
pub fn apply_term_days(invoice_date: NaiveDate, days: i64) -> NaiveDate {
    invoice_date + Duration::days(days)
}
