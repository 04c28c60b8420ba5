//! Maps the remote service's typed/labelled field list onto the
//! canonical schema.
//!
//! For each canonical field, candidate type names are tried in
//! priority order; a remote field matches when its normalized type
//! equals the candidate or its label contains the candidate. The
//! service-reported confidence (0.0..=1.0) is scaled to the 0..=100
//! scale once, here.

use std::collections::BTreeMap;

use tracing::debug;

use crate::job::TypedLabelledField;
use crate::models::{ExtractionTrace, FieldKey, FieldSource, FieldState, FieldValue};
use crate::normalize::{normalize_amount, normalize_date};

/// Candidate type names per canonical field, most specific first.
/// Order is the tie-break policy.
const CANDIDATES: &[(FieldKey, &[&str])] = &[
    (FieldKey::InvoiceNumber, &["invoiceid", "invoicenumber", "invoiceno"]),
    (FieldKey::VendorName, &["vendorname", "suppliername", "merchantname"]),
    (FieldKey::VendorAddress, &["vendoraddress", "supplieraddress"]),
    (
        FieldKey::CustomerName,
        &["customername", "billto", "receivername", "debtorname", "customer"],
    ),
    (FieldKey::CustomerEmail, &["customeremail", "email"]),
    (FieldKey::Amount, &["subtotal", "netamount", "amountbeforetax"]),
    (FieldKey::VatAmount, &["totaltax", "vatamount", "taxamount"]),
    (
        FieldKey::TotalAmount,
        &["invoicetotal", "amountdue", "totalamount", "total"],
    ),
    (FieldKey::Currency, &["currencycode", "currency"]),
    (FieldKey::InvoiceDate, &["invoicedate", "issuedate"]),
    (FieldKey::DueDate, &["duedate", "paymentduedate"]),
    (FieldKey::Description, &["description", "purpose"]),
    (FieldKey::TaxId, &["vendortaxid", "taxregistrationnumber", "taxid", "trn"]),
];

/// Label words that mark a total-typed field as the payable amount
/// rather than a subtotal or discount line.
const PAYABLE_LABEL_HINTS: [&str; 3] = ["payable", "due", "balance"];

/// Canonical fields extracted from the structured service output.
#[derive(Debug, Default)]
pub struct StructuredFields {
    pub fields: BTreeMap<FieldKey, FieldState>,
    pub trace: ExtractionTrace,
}

impl StructuredFields {
    pub fn value(&self, key: FieldKey) -> Option<&FieldValue> {
        self.fields.get(&key).and_then(|s| s.value())
    }
}

/// Map a remote field list onto the canonical schema.
pub fn map_fields(remote: &[TypedLabelledField]) -> StructuredFields {
    let mut out = StructuredFields::default();

    // Vendor first: customer candidates equal to the vendor value are
    // rejected.
    let mut vendor_name: Option<String> = None;

    for (key, candidates) in CANDIDATES {
        let chosen = if *key == FieldKey::TotalAmount {
            select_total(remote, &mut out.trace)
        } else {
            select_by_priority(*key, remote, candidates, vendor_name.as_deref(), &mut out.trace)
        };

        let Some(field) = chosen else { continue };
        let Some(raw_value) = field.value.as_deref() else {
            continue;
        };

        let Some(value) = coerce(*key, raw_value) else {
            out.trace.rejected(*key, raw_value, "value failed normalization");
            continue;
        };

        if *key == FieldKey::VendorName {
            vendor_name = value.as_text().map(str::to_string);
        }

        out.trace.chosen(*key, raw_value, FieldSource::Structured);
        out.fields.insert(
            *key,
            FieldState::Extracted {
                value,
                confidence: scale_confidence(field.confidence),
                source: FieldSource::Structured,
                raw: Some(raw_value.to_string()),
            },
        );
    }

    debug!(fields = out.fields.len(), "structured mapping complete");
    out
}

/// Scale the service's 0.0..=1.0 confidence to 0..=100.
pub fn scale_confidence(confidence: f32) -> u8 {
    (confidence.clamp(0.0, 1.0) * 100.0).round() as u8
}

fn select_by_priority<'a>(
    key: FieldKey,
    remote: &'a [TypedLabelledField],
    candidates: &[&str],
    vendor_name: Option<&str>,
    trace: &mut ExtractionTrace,
) -> Option<&'a TypedLabelledField> {
    for candidate in candidates {
        for field in remote {
            if !matches_candidate(field, candidate) {
                continue;
            }
            let shown = field.value.as_deref().unwrap_or(&field.field_type);
            trace.considered(key, shown);

            // Customer/vendor disambiguation: the paying party must
            // not be the issuing company.
            if matches!(key, FieldKey::CustomerName) {
                if let (Some(vendor), Some(value)) = (vendor_name, field.value.as_deref()) {
                    if value.eq_ignore_ascii_case(vendor) {
                        trace.rejected(key, value, "equals vendor value");
                        continue;
                    }
                }
            }

            return Some(field);
        }
    }
    None
}

/// Among total-typed fields, prefer the one whose label suggests the
/// payable/balance-due amount over a generic "total" so a subtotal or
/// discount line is not taken as the amount owed.
fn select_total<'a>(
    remote: &'a [TypedLabelledField],
    trace: &mut ExtractionTrace,
) -> Option<&'a TypedLabelledField> {
    let total_candidates: &[&str] = &["invoicetotal", "amountdue", "totalamount", "total"];
    let matching: Vec<&TypedLabelledField> = remote
        .iter()
        .filter(|f| total_candidates.iter().any(|c| matches_candidate(f, c)))
        .collect();

    for &field in &matching {
        let label = normalize(field.label.as_deref().unwrap_or(""));
        let shown = field.value.as_deref().unwrap_or(&field.field_type);
        trace.considered(FieldKey::TotalAmount, shown);
        if PAYABLE_LABEL_HINTS.iter().any(|hint| label.contains(hint)) {
            return Some(field);
        }
    }

    // No payable-labelled field: fall back to candidate priority.
    for candidate in total_candidates {
        if let Some(&field) = matching.iter().find(|f| matches_candidate(f, candidate)) {
            return Some(field);
        }
    }
    None
}

fn matches_candidate(field: &TypedLabelledField, candidate: &str) -> bool {
    if normalize(&field.field_type) == candidate {
        return true;
    }
    field
        .label
        .as_deref()
        .is_some_and(|label| normalize(label).contains(candidate))
}

/// Lowercase and strip everything but letters and digits.
fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

/// Coerce a remote text value to the canonical field's type.
fn coerce(key: FieldKey, raw: &str) -> Option<FieldValue> {
    match key {
        FieldKey::Amount | FieldKey::VatAmount | FieldKey::TotalAmount => {
            normalize_amount(raw).map(FieldValue::Amount)
        }
        FieldKey::InvoiceDate | FieldKey::DueDate => normalize_date(raw).map(FieldValue::Date),
        _ => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(FieldValue::Text(trimmed.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn field(field_type: &str, label: Option<&str>, value: &str, confidence: f32) -> TypedLabelledField {
        TypedLabelledField {
            field_type: field_type.to_string(),
            label: label.map(str::to_string),
            value: Some(value.to_string()),
            confidence,
        }
    }

    #[test]
    fn test_basic_mapping_with_scaled_confidence() {
        let remote = vec![
            field("InvoiceId", None, "INV-2024-001", 0.97),
            field("InvoiceDate", None, "2024-01-15", 0.92),
            field("InvoiceTotal", Some("Total"), "1,230.00", 0.88),
        ];
        let out = map_fields(&remote);

        assert_eq!(
            out.value(FieldKey::InvoiceNumber).and_then(|v| v.as_text()),
            Some("INV-2024-001")
        );
        match out.fields.get(&FieldKey::InvoiceNumber) {
            Some(FieldState::Extracted { confidence, .. }) => assert_eq!(*confidence, 97),
            other => panic!("unexpected state: {other:?}"),
        }
        assert_eq!(
            out.value(FieldKey::TotalAmount).and_then(|v| v.as_amount()),
            Some(Decimal::from_str("1230.00").unwrap())
        );
    }

    #[test]
    fn test_payable_label_beats_generic_total() {
        // Two total-typed fields; the generic one is actually the
        // subtotal line. Label priority picks the balance due.
        let remote = vec![
            field("Total", Some("Total"), "900.00", 0.9),
            field("Total", Some("Balance Due"), "1,050.00", 0.85),
        ];
        let out = map_fields(&remote);

        assert_eq!(
            out.value(FieldKey::TotalAmount).and_then(|v| v.as_amount()),
            Some(Decimal::from_str("1050.00").unwrap())
        );
    }

    #[test]
    fn test_customer_equal_to_vendor_is_rejected() {
        let remote = vec![
            field("VendorName", None, "Gulf Stationery LLC", 0.95),
            field("CustomerName", None, "Gulf Stationery LLC", 0.80),
            field("Customer", Some("Bill To"), "Al Noor Contracting", 0.75),
        ];
        let out = map_fields(&remote);

        assert_eq!(
            out.value(FieldKey::CustomerName).and_then(|v| v.as_text()),
            Some("Al Noor Contracting")
        );
        // And the rejection is visible in the trace
        let rejected = out
            .trace
            .for_field(FieldKey::CustomerName)
            .into_iter()
            .any(|e| matches!(&e.outcome, crate::models::TraceOutcome::Rejected { reason } if reason == "equals vendor value"));
        assert!(rejected);
    }

    #[test]
    fn test_label_substring_match() {
        let remote = vec![field(
            "CustomField7",
            Some("Tax Registration Number (TRN)"),
            "100123456700003",
            0.9,
        )];
        let out = map_fields(&remote);

        assert_eq!(
            out.value(FieldKey::TaxId).and_then(|v| v.as_text()),
            Some("100123456700003")
        );
    }

    #[test]
    fn test_unparseable_amount_left_missing() {
        let remote = vec![field("InvoiceTotal", None, "not a number", 0.9)];
        let out = map_fields(&remote);
        assert!(out.value(FieldKey::TotalAmount).is_none());
    }

    #[test]
    fn test_empty_input_maps_nothing() {
        let out = map_fields(&[]);
        assert!(out.fields.is_empty());
    }
}
