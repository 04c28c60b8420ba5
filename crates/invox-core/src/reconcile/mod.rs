//! Human-reviewable reconciliation of an extraction result into the
//! final invoice draft record.
//!
//! Single-writer, synchronous: a draft belongs to one reviewing
//! session. Validation never mutates the draft; it only reports
//! per-field pass/fail.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::heuristics::patterns::EMAIL;
use crate::models::{
    ExtractionResult, FieldKey, FieldState, FieldValue, InvoiceDraftRecord,
};

/// One failed validation, reported at `proceed()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub field: FieldKey,
    pub message: String,
}

/// Per-field review state inside a draft.
#[derive(Debug, Clone)]
pub struct DraftField {
    pub state: FieldState,
    /// Accepted into the committed draft, by auto-accept or by a
    /// manual edit.
    pub committed: bool,
    /// Last validation error reported for this field, cleared by an
    /// edit.
    pub error: Option<String>,
}

/// Mutable working copy of an extraction result under review.
#[derive(Debug, Clone)]
pub struct ReconciliationDraft {
    entries: BTreeMap<FieldKey, DraftField>,
}

impl ReconciliationDraft {
    /// Initialize the draft from an extraction result, one entry per
    /// canonical field whether or not it was extracted.
    pub fn seed(result: &ExtractionResult) -> Self {
        let entries = FieldKey::ALL
            .iter()
            .map(|key| {
                (
                    *key,
                    DraftField {
                        state: result.state(*key).clone(),
                        committed: false,
                        error: None,
                    },
                )
            })
            .collect();
        Self { entries }
    }

    pub fn state(&self, key: FieldKey) -> &FieldState {
        &self.entries[&key].state
    }

    pub fn value(&self, key: FieldKey) -> Option<&FieldValue> {
        self.entries[&key].state.value()
    }

    /// Overwrite a field with a reviewer-provided value. The prior
    /// confidence is retained for audit but no longer drives
    /// auto-accept; any validation error on the field is cleared.
    pub fn edit_field(&mut self, key: FieldKey, value: FieldValue) {
        let Some(entry) = self.entries.get_mut(&key) else {
            return;
        };
        let prior_confidence = entry.state.scoring_confidence();
        entry.state = FieldState::Manual {
            value,
            prior_confidence,
        };
        entry.committed = true;
        entry.error = None;
        debug!(field = %key, "field manually overridden");
    }

    /// Commit every extracted field whose confidence meets the
    /// threshold; fields below it stay pending. Manual fields are
    /// already committed and are not re-judged by confidence.
    pub fn auto_accept(&mut self, threshold: u8) -> Vec<FieldKey> {
        let mut accepted = Vec::new();
        for (key, entry) in &mut self.entries {
            if let FieldState::Extracted { confidence, .. } = entry.state {
                if !entry.committed && confidence >= threshold {
                    entry.committed = true;
                    accepted.push(*key);
                }
            }
        }
        debug!(accepted = accepted.len(), threshold, "auto-accept pass");
        accepted
    }

    /// Fields holding a value that has not been committed yet.
    pub fn pending(&self) -> Vec<FieldKey> {
        self.entries
            .iter()
            .filter(|(_, e)| !e.committed && !e.state.is_missing())
            .map(|(k, _)| *k)
            .collect()
    }

    pub fn committed(&self) -> Vec<FieldKey> {
        self.entries
            .iter()
            .filter(|(_, e)| e.committed)
            .map(|(k, _)| *k)
            .collect()
    }

    /// Audit list of manual overrides with the confidence each field
    /// carried before the edit.
    pub fn manual_edits(&self) -> Vec<(FieldKey, Option<u8>)> {
        self.entries
            .iter()
            .filter_map(|(k, e)| match &e.state {
                FieldState::Manual {
                    prior_confidence, ..
                } => Some((*k, *prior_confidence)),
                _ => None,
            })
            .collect()
    }

    /// Validate every field and, if all pass, emit the finalized
    /// record. All violations are collected; validation stops at
    /// nothing and mutates nothing.
    pub fn proceed(&mut self) -> Result<InvoiceDraftRecord, Vec<ValidationIssue>> {
        let mut issues = Vec::new();

        for key in FieldKey::ALL {
            if let Some(message) = validate_field(key, &self.entries[&key].state) {
                issues.push(ValidationIssue {
                    field: key,
                    message,
                });
            }
        }

        // Date ordering spans two fields; report it on the due date.
        if let (Some(invoice_date), Some(due_date)) = (
            self.value(FieldKey::InvoiceDate).and_then(|v| v.as_date()),
            self.value(FieldKey::DueDate).and_then(|v| v.as_date()),
        ) {
            if due_date < invoice_date {
                issues.push(ValidationIssue {
                    field: FieldKey::DueDate,
                    message: "due date precedes invoice date".to_string(),
                });
            }
        }

        if !issues.is_empty() {
            for issue in &issues {
                if let Some(entry) = self.entries.get_mut(&issue.field) {
                    entry.error = Some(issue.message.clone());
                }
            }
            return Err(issues);
        }

        Ok(self.finalize())
    }

    fn finalize(&self) -> InvoiceDraftRecord {
        let text = |key: FieldKey| {
            self.value(key)
                .and_then(|v| v.as_text())
                .map(str::to_string)
        };
        let amount = |key: FieldKey| self.value(key).and_then(|v| v.as_amount());
        let date = |key: FieldKey| self.value(key).and_then(|v| v.as_date());

        // Required fields validated before this is reached.
        InvoiceDraftRecord {
            invoice_number: text(FieldKey::InvoiceNumber).unwrap_or_default(),
            customer_name: text(FieldKey::CustomerName).unwrap_or_default(),
            customer_email: text(FieldKey::CustomerEmail),
            amount: amount(FieldKey::Amount).unwrap_or_default(),
            vat_amount: amount(FieldKey::VatAmount),
            total_amount: amount(FieldKey::TotalAmount),
            currency: text(FieldKey::Currency).unwrap_or_else(|| "AED".to_string()),
            invoice_date: date(FieldKey::InvoiceDate),
            due_date: date(FieldKey::DueDate).unwrap_or_default(),
            description: text(FieldKey::Description),
            tax_id: text(FieldKey::TaxId),
            vendor_name: text(FieldKey::VendorName),
            vendor_address: text(FieldKey::VendorAddress),
        }
    }
}

/// Field-local validation: required-ness plus format rules. Returns a
/// human-readable message on failure.
fn validate_field(key: FieldKey, state: &FieldState) -> Option<String> {
    let value = state.value();

    if key.is_required() {
        match value {
            None => return Some(format!("{key} is required")),
            Some(v) if v.is_empty() => return Some(format!("{key} must not be empty")),
            _ => {}
        }
    }

    let Some(value) = value else { return None };

    match key {
        FieldKey::Amount | FieldKey::TotalAmount => match value.as_amount() {
            Some(d) if d > Decimal::ZERO => None,
            Some(_) => Some(format!("{key} must be positive")),
            None => Some(format!("{key} must be a numeric amount")),
        },
        FieldKey::VatAmount => match value.as_amount() {
            Some(d) if d >= Decimal::ZERO => None,
            Some(_) => Some(format!("{key} must not be negative")),
            None => Some(format!("{key} must be a numeric amount")),
        },
        FieldKey::InvoiceDate | FieldKey::DueDate => match value.as_date() {
            Some(_) => None,
            None => Some(format!("{key} must be a parseable date")),
        },
        FieldKey::CustomerEmail => match value.as_text() {
            Some(s) if EMAIL.find(s).is_some_and(|m| m.as_str() == s.trim()) => None,
            _ => Some(format!("{key} is not a valid email address")),
        },
        FieldKey::TaxId => match value.as_text() {
            Some(s) => {
                let digits = s.chars().filter(|c| c.is_ascii_digit()).count();
                if (10..=15).contains(&digits) {
                    None
                } else {
                    Some(format!("{key} must contain 10-15 digits"))
                }
            }
            None => Some(format!("{key} must be text")),
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FieldSource;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn extracted(value: FieldValue, confidence: u8) -> FieldState {
        FieldState::Extracted {
            value,
            confidence,
            source: FieldSource::Structured,
            raw: None,
        }
    }

    fn reviewable_result() -> ExtractionResult {
        let mut result = ExtractionResult::empty();
        result.fill(
            FieldKey::InvoiceNumber,
            extracted(FieldValue::Text("INV-100".into()), 96),
        );
        result.fill(
            FieldKey::CustomerName,
            extracted(FieldValue::Text("Al Noor Contracting".into()), 94),
        );
        result.fill(
            FieldKey::Amount,
            extracted(FieldValue::Amount(dec("1000.00")), 100),
        );
        result.fill(
            FieldKey::DueDate,
            extracted(
                FieldValue::Date(NaiveDate::from_ymd_opt(2024, 2, 14).unwrap()),
                90,
            ),
        );
        result
    }

    #[test]
    fn test_seed_creates_entry_per_canonical_field() {
        let draft = ReconciliationDraft::seed(&ExtractionResult::empty());
        assert_eq!(draft.entries.len(), FieldKey::ALL.len());
        assert!(draft.pending().is_empty());
    }

    #[test]
    fn test_auto_accept_threshold_boundary() {
        // A:96, B:94, C:100 with threshold 95 commits A and C only
        let mut draft = ReconciliationDraft::seed(&reviewable_result());
        let accepted = draft.auto_accept(95);

        assert_eq!(
            accepted,
            vec![FieldKey::InvoiceNumber, FieldKey::Amount]
        );
        assert!(draft.pending().contains(&FieldKey::CustomerName));
    }

    #[test]
    fn test_edit_field_retains_prior_confidence() {
        let mut draft = ReconciliationDraft::seed(&reviewable_result());
        draft.edit_field(
            FieldKey::CustomerName,
            FieldValue::Text("Al Noor Contracting LLC".into()),
        );

        assert_eq!(draft.manual_edits(), vec![(FieldKey::CustomerName, Some(94))]);
        assert!(draft.committed().contains(&FieldKey::CustomerName));

        // A later auto-accept pass must not re-judge the manual field
        let accepted = draft.auto_accept(10);
        assert!(!accepted.contains(&FieldKey::CustomerName));
    }

    #[test]
    fn test_proceed_emits_record_when_valid() {
        let mut draft = ReconciliationDraft::seed(&reviewable_result());
        let record = draft.proceed().unwrap();

        assert_eq!(record.invoice_number, "INV-100");
        assert_eq!(record.customer_name, "Al Noor Contracting");
        assert_eq!(record.amount, dec("1000.00"));
        assert_eq!(
            record.due_date,
            NaiveDate::from_ymd_opt(2024, 2, 14).unwrap()
        );
    }

    #[test]
    fn test_proceed_reports_missing_required_field() {
        let mut result = reviewable_result();
        result.fields.insert(FieldKey::CustomerName, FieldState::Missing);

        let mut draft = ReconciliationDraft::seed(&result);
        let issues = draft.proceed().unwrap_err();

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, FieldKey::CustomerName);
    }

    #[test]
    fn test_proceed_collects_all_violations() {
        let mut result = reviewable_result();
        result.fields.insert(FieldKey::CustomerName, FieldState::Missing);
        result.fields.insert(
            FieldKey::Amount,
            extracted(FieldValue::Amount(dec("-5.00")), 100),
        );
        result.fields.insert(
            FieldKey::CustomerEmail,
            extracted(FieldValue::Text("not-an-email".into()), 80),
        );

        let mut draft = ReconciliationDraft::seed(&result);
        let issues = draft.proceed().unwrap_err();

        assert_eq!(issues.len(), 3);
    }

    #[test]
    fn test_short_tax_id_rejected() {
        let mut result = reviewable_result();
        result.fill(
            FieldKey::TaxId,
            extracted(FieldValue::Text("12345678".into()), 80),
        );

        let mut draft = ReconciliationDraft::seed(&result);
        let issues = draft.proceed().unwrap_err();

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, FieldKey::TaxId);
    }

    #[test]
    fn test_due_date_before_invoice_date_rejected() {
        let mut result = reviewable_result();
        result.fill(
            FieldKey::InvoiceDate,
            extracted(
                FieldValue::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()),
                90,
            ),
        );

        let mut draft = ReconciliationDraft::seed(&result);
        let issues = draft.proceed().unwrap_err();

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, FieldKey::DueDate);
    }

    #[test]
    fn test_edit_clears_validation_error() {
        let mut result = reviewable_result();
        result.fields.insert(FieldKey::CustomerName, FieldState::Missing);

        let mut draft = ReconciliationDraft::seed(&result);
        assert!(draft.proceed().is_err());
        assert!(draft.entries[&FieldKey::CustomerName].error.is_some());

        draft.edit_field(
            FieldKey::CustomerName,
            FieldValue::Text("Manually Entered LLC".into()),
        );
        assert!(draft.entries[&FieldKey::CustomerName].error.is_none());

        assert!(draft.proceed().is_ok());
    }
}
