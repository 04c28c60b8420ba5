//! Canonical field schema and per-field extraction state.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The fixed set of canonical invoice fields every extraction source
/// is normalized into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKey {
    InvoiceNumber,
    CustomerName,
    CustomerEmail,
    /// Subtotal before VAT.
    Amount,
    VatAmount,
    TotalAmount,
    Currency,
    InvoiceDate,
    DueDate,
    Description,
    /// Tax registration number (TRN/VAT number).
    TaxId,
    VendorName,
    VendorAddress,
}

impl FieldKey {
    /// All canonical fields, in schema order.
    pub const ALL: [FieldKey; 13] = [
        FieldKey::InvoiceNumber,
        FieldKey::CustomerName,
        FieldKey::CustomerEmail,
        FieldKey::Amount,
        FieldKey::VatAmount,
        FieldKey::TotalAmount,
        FieldKey::Currency,
        FieldKey::InvoiceDate,
        FieldKey::DueDate,
        FieldKey::Description,
        FieldKey::TaxId,
        FieldKey::VendorName,
        FieldKey::VendorAddress,
    ];

    /// Fields that must be non-empty before a draft can be finalized.
    pub fn is_required(&self) -> bool {
        matches!(
            self,
            FieldKey::InvoiceNumber | FieldKey::CustomerName | FieldKey::Amount | FieldKey::DueDate
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKey::InvoiceNumber => "invoice_number",
            FieldKey::CustomerName => "customer_name",
            FieldKey::CustomerEmail => "customer_email",
            FieldKey::Amount => "amount",
            FieldKey::VatAmount => "vat_amount",
            FieldKey::TotalAmount => "total_amount",
            FieldKey::Currency => "currency",
            FieldKey::InvoiceDate => "invoice_date",
            FieldKey::DueDate => "due_date",
            FieldKey::Description => "description",
            FieldKey::TaxId => "tax_id",
            FieldKey::VendorName => "vendor_name",
            FieldKey::VendorAddress => "vendor_address",
        }
    }
}

impl std::fmt::Display for FieldKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Amount(Decimal),
    Date(NaiveDate),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_amount(&self) -> Option<Decimal> {
        match self {
            FieldValue::Amount(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Whether the value is empty for required-ness purposes.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Amount(d) => write!(f, "{d}"),
            FieldValue::Date(d) => write!(f, "{d}"),
        }
    }
}

/// Where an extracted value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSource {
    /// Remote structured document-analysis service.
    Structured,
    /// Local pattern-cascade parser over raw text.
    Heuristic,
}

/// Extraction state of one canonical field.
///
/// `Manual` is reachable only through an explicit reviewer edit in the
/// reconciliation workflow; the prior confidence is kept for audit but
/// never drives auto-accept once overridden.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FieldState {
    Missing,
    Extracted {
        value: FieldValue,
        /// Confidence on the 0..=100 scale.
        confidence: u8,
        source: FieldSource,
        /// Verbatim text the value was derived from, kept for audit.
        #[serde(skip_serializing_if = "Option::is_none")]
        raw: Option<String>,
    },
    Manual {
        value: FieldValue,
        /// Confidence the field carried before the reviewer override.
        #[serde(skip_serializing_if = "Option::is_none")]
        prior_confidence: Option<u8>,
    },
}

impl FieldState {
    pub fn is_missing(&self) -> bool {
        matches!(self, FieldState::Missing)
    }

    pub fn value(&self) -> Option<&FieldValue> {
        match self {
            FieldState::Missing => None,
            FieldState::Extracted { value, .. } | FieldState::Manual { value, .. } => Some(value),
        }
    }

    /// Confidence used for scoring: the extracted confidence, or the
    /// pre-edit confidence for manually overridden fields.
    pub fn scoring_confidence(&self) -> Option<u8> {
        match self {
            FieldState::Missing => None,
            FieldState::Extracted { confidence, .. } => Some(*confidence),
            FieldState::Manual {
                prior_confidence, ..
            } => *prior_confidence,
        }
    }

    pub fn source(&self) -> Option<FieldSource> {
        match self {
            FieldState::Extracted { source, .. } => Some(*source),
            _ => None,
        }
    }
}

/// Why a candidate value was considered, dropped, or adopted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TraceOutcome {
    Considered,
    Rejected { reason: String },
    Chosen { source: FieldSource },
}

/// One decision made while extracting a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub field: FieldKey,
    pub candidate: String,
    #[serde(flatten)]
    pub outcome: TraceOutcome,
}

/// Ordered record of extraction decisions, returned instead of logged
/// so tests can assert on why a value was chosen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionTrace {
    pub events: Vec<TraceEvent>,
}

impl ExtractionTrace {
    pub fn considered(&mut self, field: FieldKey, candidate: impl Into<String>) {
        self.events.push(TraceEvent {
            field,
            candidate: candidate.into(),
            outcome: TraceOutcome::Considered,
        });
    }

    pub fn rejected(&mut self, field: FieldKey, candidate: impl Into<String>, reason: impl Into<String>) {
        self.events.push(TraceEvent {
            field,
            candidate: candidate.into(),
            outcome: TraceOutcome::Rejected {
                reason: reason.into(),
            },
        });
    }

    pub fn chosen(&mut self, field: FieldKey, candidate: impl Into<String>, source: FieldSource) {
        self.events.push(TraceEvent {
            field,
            candidate: candidate.into(),
            outcome: TraceOutcome::Chosen { source },
        });
    }

    /// Events recorded for one field, in decision order.
    pub fn for_field(&self, field: FieldKey) -> Vec<&TraceEvent> {
        self.events.iter().filter(|e| e.field == field).collect()
    }

    pub fn merge(&mut self, other: ExtractionTrace) {
        self.events.extend(other.events);
    }
}

/// Aggregate result of one document's extraction.
///
/// Created once per submitted document and populated stage by stage.
/// Later stages only add missing fields or replace a value to correct
/// a detected implausibility; the original raw text of a replaced
/// value stays in the field's `raw` slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub fields: BTreeMap<FieldKey, FieldState>,
    /// Mean confidence over populated fields, 0..=100.
    pub overall_confidence: u8,
    /// Raw extracted text, truncated to the configured bound.
    pub raw_text: String,
    /// Wall-clock processing time.
    pub elapsed_ms: u64,
    /// Locator the document occupied in temporary storage while in
    /// flight; the object itself is already deleted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_locator: Option<String>,
    #[serde(default)]
    pub trace: ExtractionTrace,
}

impl ExtractionResult {
    /// An empty result: all fields unset, zero confidence.
    pub fn empty() -> Self {
        let fields = FieldKey::ALL
            .iter()
            .map(|k| (*k, FieldState::Missing))
            .collect();
        Self {
            fields,
            overall_confidence: 0,
            raw_text: String::new(),
            elapsed_ms: 0,
            temp_locator: None,
            trace: ExtractionTrace::default(),
        }
    }

    pub fn state(&self, key: FieldKey) -> &FieldState {
        self.fields.get(&key).unwrap_or(&FieldState::Missing)
    }

    pub fn value(&self, key: FieldKey) -> Option<&FieldValue> {
        self.state(key).value()
    }

    pub fn amount(&self, key: FieldKey) -> Option<Decimal> {
        self.value(key).and_then(|v| v.as_amount())
    }

    pub fn date(&self, key: FieldKey) -> Option<NaiveDate> {
        self.value(key).and_then(|v| v.as_date())
    }

    pub fn text(&self, key: FieldKey) -> Option<&str> {
        self.value(key).and_then(|v| v.as_text())
    }

    /// Set a field only if it is still missing.
    pub fn fill(&mut self, key: FieldKey, state: FieldState) {
        let entry = self.fields.entry(key).or_insert(FieldState::Missing);
        if entry.is_missing() {
            *entry = state;
        }
    }

    /// Replace a field's value to correct a detected implausibility,
    /// keeping the original raw text for audit.
    pub fn replace_for_correction(
        &mut self,
        key: FieldKey,
        value: FieldValue,
        confidence: u8,
        source: FieldSource,
    ) {
        let prior_raw = match self.fields.get(&key) {
            Some(FieldState::Extracted { raw, value, .. }) => {
                raw.clone().or_else(|| Some(value.to_string()))
            }
            _ => None,
        };
        self.fields.insert(
            key,
            FieldState::Extracted {
                value,
                confidence,
                source,
                raw: prior_raw,
            },
        );
    }

    /// Count of fields that carry a value.
    pub fn populated(&self) -> usize {
        self.fields.values().filter(|s| !s.is_missing()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_result_has_all_fields_unset() {
        let result = ExtractionResult::empty();
        assert_eq!(result.fields.len(), FieldKey::ALL.len());
        assert!(result.fields.values().all(|s| s.is_missing()));
        assert_eq!(result.overall_confidence, 0);
    }

    #[test]
    fn test_fill_does_not_overwrite() {
        let mut result = ExtractionResult::empty();
        result.fill(
            FieldKey::InvoiceNumber,
            FieldState::Extracted {
                value: FieldValue::Text("INV-1".into()),
                confidence: 90,
                source: FieldSource::Structured,
                raw: None,
            },
        );
        result.fill(
            FieldKey::InvoiceNumber,
            FieldState::Extracted {
                value: FieldValue::Text("INV-2".into()),
                confidence: 55,
                source: FieldSource::Heuristic,
                raw: None,
            },
        );
        assert_eq!(result.text(FieldKey::InvoiceNumber), Some("INV-1"));
    }

    #[test]
    fn test_correction_preserves_raw_for_audit() {
        let mut result = ExtractionResult::empty();
        result.fill(
            FieldKey::TotalAmount,
            FieldState::Extracted {
                value: FieldValue::Amount(Decimal::new(5000, 2)),
                confidence: 80,
                source: FieldSource::Structured,
                raw: Some("50.00".into()),
            },
        );
        result.replace_for_correction(
            FieldKey::TotalAmount,
            FieldValue::Amount(Decimal::new(123456, 2)),
            70,
            FieldSource::Heuristic,
        );
        match result.state(FieldKey::TotalAmount) {
            FieldState::Extracted { raw, value, .. } => {
                assert_eq!(raw.as_deref(), Some("50.00"));
                assert_eq!(value.as_amount(), Some(Decimal::new(123456, 2)));
            }
            other => panic!("unexpected state: {other:?}"),
        }
    }

    #[test]
    fn test_manual_scoring_uses_prior_confidence() {
        let state = FieldState::Manual {
            value: FieldValue::Text("edited".into()),
            prior_confidence: Some(42),
        };
        assert_eq!(state.scoring_confidence(), Some(42));
        assert_eq!(state.source(), None);
    }
}
