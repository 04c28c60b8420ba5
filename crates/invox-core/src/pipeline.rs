//! Top-level extraction pipeline: remote structured analysis merged
//! with the local heuristic pass, then derivation, plausibility
//! correction, and scoring.
//!
//! Merge policy: structured values win, heuristics only fill fields
//! the service left unset. Corrections are the one exception and may
//! replace a structured value.

use std::time::Instant;

use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::confidence;
use crate::correct;
use crate::error::Result;
use crate::heuristics::HeuristicParser;
use crate::job::{AnalysisJobRunner, DocumentAnalysisService, ObjectStore};
use crate::models::{
    ExtractionConfig, ExtractionResult, FieldKey, FieldSource, FieldState, FieldValue,
    PipelineConfig,
};
use crate::normalize::apply_term_days;
use crate::structured;

/// Runs documents end to end: upload, analyze, parse, merge, correct,
/// score.
///
/// Holds only read-only configuration and the runner's collaborators;
/// one pipeline may process any number of concurrent documents.
pub struct ExtractionPipeline<S, O> {
    runner: AnalysisJobRunner<S, O>,
    parser: HeuristicParser,
    extraction: ExtractionConfig,
}

impl<S: DocumentAnalysisService, O: ObjectStore> ExtractionPipeline<S, O> {
    pub fn new(service: S, store: O, config: &PipelineConfig) -> Self {
        Self {
            runner: AnalysisJobRunner::new(service, store, config),
            parser: HeuristicParser::new()
                .with_known_customers(config.extraction.known_customers.clone()),
            extraction: config.extraction.clone(),
        }
    }

    /// Process one document through both extraction strategies.
    ///
    /// Empty input is not an error: it yields an all-missing result
    /// with zero confidence and nothing is uploaded.
    pub async fn process(&self, bytes: &[u8], filename: &str) -> Result<ExtractionResult> {
        if bytes.is_empty() {
            debug!(filename, "empty document, skipping extraction");
            return Ok(ExtractionResult::empty());
        }

        let analyzed = self.runner.run(bytes, filename).await?;

        let mut result = ExtractionResult::empty();
        result.elapsed_ms = analyzed.elapsed_ms;
        result.temp_locator = Some(analyzed.temp_locator.clone());

        let mapped = structured::map_fields(&analyzed.fields);
        result.trace.merge(mapped.trace);
        for (key, state) in mapped.fields {
            result.fill(key, state);
        }

        self.finish(&mut result, &analyzed.raw_text);
        info!(
            populated = result.populated(),
            confidence = result.overall_confidence,
            "document extraction complete"
        );
        Ok(result)
    }

    /// Local-only entry point for hosts that already have the text.
    pub fn process_text(&self, text: &str) -> ExtractionResult {
        let started = Instant::now();
        let mut result = ExtractionResult::empty();
        self.finish(&mut result, text);
        result.elapsed_ms = started.elapsed().as_millis() as u64;
        result
    }

    /// Shared tail of both entry points: heuristic fill, derivations,
    /// plausibility correction, scoring, text truncation.
    fn finish(&self, result: &mut ExtractionResult, raw_text: &str) {
        let heuristic = self.parser.parse(raw_text);
        result.trace.merge(heuristic.trace);
        for (key, state) in heuristic.fields {
            result.fill(key, state);
        }

        // Correct before deriving: arithmetic on an implausible total
        // would propagate the bad value (or skip a negative subtotal).
        if correct::needs_correction(result) {
            correct::correct(result, raw_text, &self.extraction);
        }

        derive_missing(result, &self.extraction);

        if result.text(FieldKey::Currency).is_none() && result.populated() > 0 {
            result.fill(
                FieldKey::Currency,
                FieldState::Extracted {
                    value: FieldValue::Text(self.extraction.default_currency.clone()),
                    confidence: crate::heuristics::TIER_GENERIC,
                    source: FieldSource::Heuristic,
                    raw: None,
                },
            );
        }

        result.overall_confidence = confidence::score(&result.fields);
        result.raw_text = truncate(raw_text, self.extraction.max_raw_text_len);
    }
}

/// Fill fields that follow arithmetically from others.
///
/// Derived values carry the lowest confidence of their inputs and are
/// attributed to the heuristic source.
fn derive_missing(result: &mut ExtractionResult, config: &ExtractionConfig) {
    // Subtotal from total and VAT.
    if result.amount(FieldKey::Amount).is_none() {
        if let (Some(total), Some(vat)) = (
            result.amount(FieldKey::TotalAmount),
            result.amount(FieldKey::VatAmount),
        ) {
            let net = total - vat;
            if net > Decimal::ZERO {
                let confidence = derived_confidence(result, &[FieldKey::TotalAmount, FieldKey::VatAmount]);
                result.fill(
                    FieldKey::Amount,
                    FieldState::Extracted {
                        value: FieldValue::Amount(net),
                        confidence,
                        source: FieldSource::Heuristic,
                        raw: None,
                    },
                );
                debug!(%net, "derived subtotal from total minus vat");
            }
        }
    }

    // Total from subtotal and VAT.
    if result.amount(FieldKey::TotalAmount).is_none() {
        if let (Some(net), Some(vat)) = (
            result.amount(FieldKey::Amount),
            result.amount(FieldKey::VatAmount),
        ) {
            let confidence = derived_confidence(result, &[FieldKey::Amount, FieldKey::VatAmount]);
            result.fill(
                FieldKey::TotalAmount,
                FieldState::Extracted {
                    value: FieldValue::Amount(net + vat),
                    confidence,
                    source: FieldSource::Heuristic,
                    raw: None,
                },
            );
        }
    }

    // Default payment term when no due date was stated.
    if result.date(FieldKey::DueDate).is_none() {
        if let Some(invoice_date) = result.date(FieldKey::InvoiceDate) {
            let due = apply_term_days(invoice_date, config.default_due_term_days);
            let confidence = derived_confidence(result, &[FieldKey::InvoiceDate]);
            result.fill(
                FieldKey::DueDate,
                FieldState::Extracted {
                    value: FieldValue::Date(due),
                    confidence,
                    source: FieldSource::Heuristic,
                    raw: None,
                },
            );
            debug!(%due, term_days = config.default_due_term_days, "applied default payment term");
        }
    }
}

fn derived_confidence(result: &ExtractionResult, inputs: &[FieldKey]) -> u8 {
    inputs
        .iter()
        .filter_map(|k| result.state(*k).scoring_confidence())
        .min()
        .unwrap_or(crate::heuristics::TIER_GENERIC)
}

/// Truncate to at most `max_len` bytes without splitting a character.
fn truncate(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        return text.to_string();
    }
    let mut end = max_len;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}
