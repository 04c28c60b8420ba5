//! Plausibility correction for known-bad extractions.
//!
//! The canonical failure mode: a discount or subtotal line is taken as
//! the invoice total, leaving `total < vat`. Correction is never run
//! speculatively; the pipeline invokes it only when that invariant is
//! violated. An explicit payable-amount statement in the raw text
//! always beats magnitude-based inference.

use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::heuristics::patterns::{CURRENCY_AMOUNT, PAYABLE_PHRASE};
use crate::heuristics::{TIER_GENERIC, TIER_LABELED};
use crate::models::{ExtractionConfig, ExtractionResult, FieldKey, FieldSource, FieldValue};
use crate::normalize::normalize_amount;

/// Whether the result violates the `total >= vat` invariant.
pub fn needs_correction(result: &ExtractionResult) -> bool {
    match (
        result.amount(FieldKey::TotalAmount),
        result.amount(FieldKey::VatAmount),
    ) {
        (Some(total), Some(vat)) => total < vat,
        _ => false,
    }
}

/// Re-derive a corrected total from the raw text.
///
/// If no better candidate is found the original value stays and the
/// result is otherwise untouched.
pub fn correct(result: &mut ExtractionResult, raw_text: &str, config: &ExtractionConfig) {
    let (Some(total), Some(vat)) = (
        result.amount(FieldKey::TotalAmount),
        result.amount(FieldKey::VatAmount),
    ) else {
        return;
    };

    // An explicit payable statement wins outright.
    if let Some(caps) = PAYABLE_PHRASE.captures(raw_text) {
        if let Some(amount) = normalize_amount(&caps[1]) {
            let phrase = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
            info!(%amount, "adopting explicit payable-amount statement as total");
            result
                .trace
                .chosen(FieldKey::TotalAmount, phrase, FieldSource::Heuristic);
            result.replace_for_correction(
                FieldKey::TotalAmount,
                FieldValue::Amount(amount),
                TIER_LABELED,
                FieldSource::Heuristic,
            );
            return;
        }
    }

    // Magnitude scan over currency-prefixed amounts: candidates must
    // beat the implausible total but stay within the sanity bound.
    let bound = vat * Decimal::from(config.correction_vat_multiplier);
    let mut best: Option<Decimal> = None;

    for caps in CURRENCY_AMOUNT.captures_iter(raw_text) {
        let candidate_text = &caps[1];
        let Some(candidate) = normalize_amount(candidate_text) else {
            continue;
        };
        result.trace.considered(FieldKey::TotalAmount, candidate_text);

        if candidate <= total {
            result
                .trace
                .rejected(FieldKey::TotalAmount, candidate_text, "not above current total");
            continue;
        }
        if candidate > bound {
            result
                .trace
                .rejected(FieldKey::TotalAmount, candidate_text, "exceeds sanity bound");
            continue;
        }
        best = Some(best.map_or(candidate, |b: Decimal| b.max(candidate)));
    }

    match best {
        Some(amount) => {
            info!(%amount, %total, "corrected implausible total from raw-text scan");
            result.trace.chosen(
                FieldKey::TotalAmount,
                amount.to_string(),
                FieldSource::Heuristic,
            );
            result.replace_for_correction(
                FieldKey::TotalAmount,
                FieldValue::Amount(amount),
                TIER_GENERIC,
                FieldSource::Heuristic,
            );
        }
        None => {
            // Silent: original value retained, confidence untouched.
            debug!(%total, %vat, "no plausible replacement total found");
        }
    }
}
