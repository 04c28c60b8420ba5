//! Ordered pattern-cascade parser over raw invoice text.
//!
//! Each field has an ordered list of rules, most specific first; the
//! first candidate that passes the field's sanity check wins and the
//! cascade stops. The ordering is the tie-break policy and must not be
//! reordered. Matching never errors: a field with no surviving
//! candidate stays `Missing`.

use std::collections::BTreeMap;

use regex::Regex;
use tracing::debug;

use crate::models::{ExtractionTrace, FieldKey, FieldSource, FieldState, FieldValue};
use crate::normalize::{apply_term_days, detect_currency, normalize_amount, normalize_date};

use super::patterns::*;

/// Confidence tier for an exact known-entity match.
pub const TIER_KNOWN_ENTITY: u8 = 80;
/// Confidence tier for a labeled pattern match.
pub const TIER_LABELED: u8 = 65;
/// Confidence tier for a generic/positional match.
pub const TIER_GENERIC: u8 = 55;

/// One step of a field's cascade.
struct PatternRule {
    name: &'static str,
    regex: &'static Regex,
    tier: u8,
    /// Adopt the whole match instead of capture group 1.
    whole_match: bool,
}

impl PatternRule {
    fn labeled(name: &'static str, regex: &'static Regex) -> Self {
        Self {
            name,
            regex,
            tier: TIER_LABELED,
            whole_match: false,
        }
    }

    fn generic(name: &'static str, regex: &'static Regex) -> Self {
        Self {
            name,
            regex,
            tier: TIER_GENERIC,
            whole_match: false,
        }
    }
}

/// Fields extracted by the heuristic pass.
#[derive(Debug, Default)]
pub struct HeuristicFields {
    pub fields: BTreeMap<FieldKey, FieldState>,
    pub trace: ExtractionTrace,
}

impl HeuristicFields {
    pub fn value(&self, key: FieldKey) -> Option<&FieldValue> {
        self.fields.get(&key).and_then(|s| s.value())
    }
}

/// Stateless heuristic text parser.
///
/// Holds only read-only configuration; one instance may serve any
/// number of concurrent documents.
pub struct HeuristicParser {
    known_customers: Vec<String>,
}

impl HeuristicParser {
    pub fn new() -> Self {
        Self {
            known_customers: Vec::new(),
        }
    }

    /// Known customer names matched before any generic name pattern.
    pub fn with_known_customers(mut self, names: Vec<String>) -> Self {
        self.known_customers = names;
        self
    }

    /// Run every field cascade over the raw text.
    pub fn parse(&self, text: &str) -> HeuristicFields {
        let mut out = HeuristicFields::default();
        if text.trim().is_empty() {
            return out;
        }

        // Vendor first: customer candidates equal to the vendor are
        // rejected downstream.
        let vendor = self.extract_vendor_name(text, &mut out);
        self.extract_vendor_address(text, &mut out);
        self.extract_invoice_number(text, &mut out);
        self.extract_customer_name(text, vendor.as_deref(), &mut out);
        self.extract_customer_email(text, &mut out);
        self.extract_amounts(text, &mut out);
        self.extract_currency(text, &mut out);
        self.extract_dates(text, &mut out);
        self.extract_tax_id(text, &mut out);
        self.extract_description(text, &mut out);

        debug!(
            fields = out.fields.len(),
            "heuristic pass extracted fields"
        );
        out
    }

    /// Evaluate a cascade: first structurally-valid candidate wins.
    fn cascade(
        field: FieldKey,
        text: &str,
        rules: &[PatternRule],
        sanity: impl Fn(&str) -> Result<(), &'static str>,
        out: &mut HeuristicFields,
    ) -> Option<(String, u8, String)> {
        for rule in rules {
            for caps in rule.regex.captures_iter(text) {
                let whole = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
                let candidate = if rule.whole_match {
                    whole.trim()
                } else {
                    caps.get(1).map(|m| m.as_str().trim()).unwrap_or(whole)
                };

                out.trace.considered(field, candidate);
                match sanity(candidate) {
                    Ok(()) => {
                        out.trace.chosen(field, candidate, FieldSource::Heuristic);
                        return Some((candidate.to_string(), rule.tier, whole.to_string()));
                    }
                    Err(reason) => {
                        out.trace.rejected(field, candidate, reason);
                        debug!(field = %field, rule = rule.name, candidate, reason, "candidate rejected");
                    }
                }
            }
        }
        None
    }

    fn set_text(out: &mut HeuristicFields, key: FieldKey, value: String, tier: u8, raw: String) {
        out.fields.insert(
            key,
            FieldState::Extracted {
                value: FieldValue::Text(value),
                confidence: tier,
                source: FieldSource::Heuristic,
                raw: Some(raw),
            },
        );
    }

    fn extract_vendor_name(&self, text: &str, out: &mut HeuristicFields) -> Option<String> {
        let rules = [PatternRule::labeled("vendor_label", &VENDOR_LABEL)];
        if let Some((value, tier, raw)) =
            Self::cascade(FieldKey::VendorName, text, &rules, sane_name, out)
        {
            Self::set_text(out, FieldKey::VendorName, value.clone(), tier, raw);
            return Some(value);
        }

        // Positional fallback: issuing company usually heads the page.
        let first_line = text
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())?
            .to_string();
        out.trace.considered(FieldKey::VendorName, &first_line);
        match sane_header_name(&first_line) {
            Ok(()) => {
                out.trace
                    .chosen(FieldKey::VendorName, &first_line, FieldSource::Heuristic);
                Self::set_text(
                    out,
                    FieldKey::VendorName,
                    first_line.clone(),
                    TIER_GENERIC,
                    first_line.clone(),
                );
                Some(first_line)
            }
            Err(reason) => {
                out.trace.rejected(FieldKey::VendorName, &first_line, reason);
                None
            }
        }
    }

    fn extract_vendor_address(&self, text: &str, out: &mut HeuristicFields) {
        let rules = [PatternRule::generic("address_label", &ADDRESS_LABEL)];
        if let Some((value, tier, raw)) = Self::cascade(
            FieldKey::VendorAddress,
            text,
            &rules,
            |c| {
                if c.len() > 5 { Ok(()) } else { Err("too short") }
            },
            out,
        ) {
            Self::set_text(out, FieldKey::VendorAddress, value, tier, raw);
        }
    }

    fn extract_invoice_number(&self, text: &str, out: &mut HeuristicFields) {
        let rules = [
            PatternRule::labeled("invoice_number_labeled", &INVOICE_NUMBER),
            PatternRule {
                name: "invoice_number_standalone",
                regex: &INVOICE_NUMBER_STANDALONE,
                tier: TIER_GENERIC,
                whole_match: true,
            },
        ];
        let sanity = |c: &str| {
            if c.len() < 3 || c.len() > 32 {
                return Err("length out of bounds");
            }
            if !c.chars().any(|ch| ch.is_ascii_digit()) {
                return Err("no digits");
            }
            if ANY_DATE.find(c).is_some_and(|m| m.as_str() == c) {
                return Err("looks like a date");
            }
            Ok(())
        };
        if let Some((value, tier, raw)) =
            Self::cascade(FieldKey::InvoiceNumber, text, &rules, sanity, out)
        {
            Self::set_text(out, FieldKey::InvoiceNumber, value, tier, raw);
        }
    }

    fn extract_customer_name(
        &self,
        text: &str,
        vendor: Option<&str>,
        out: &mut HeuristicFields,
    ) {
        // Known customer names take priority over any label pattern.
        let lowered = text.to_lowercase();
        for known in &self.known_customers {
            out.trace.considered(FieldKey::CustomerName, known);
            if lowered.contains(&known.to_lowercase()) {
                out.trace
                    .chosen(FieldKey::CustomerName, known, FieldSource::Heuristic);
                Self::set_text(
                    out,
                    FieldKey::CustomerName,
                    known.clone(),
                    TIER_KNOWN_ENTITY,
                    known.clone(),
                );
                return;
            }
            out.trace
                .rejected(FieldKey::CustomerName, known, "not present in text");
        }

        let rules = [PatternRule::labeled("customer_label", &CUSTOMER_LABEL)];
        let sanity = |c: &str| {
            sane_name(c)?;
            if let Some(v) = vendor {
                if c.eq_ignore_ascii_case(v) {
                    return Err("equals vendor name");
                }
            }
            Ok(())
        };
        if let Some((value, tier, raw)) =
            Self::cascade(FieldKey::CustomerName, text, &rules, sanity, out)
        {
            Self::set_text(out, FieldKey::CustomerName, value, tier, raw);
        }
    }

    fn extract_customer_email(&self, text: &str, out: &mut HeuristicFields) {
        let rules = [PatternRule::labeled("email", &EMAIL)];
        if let Some((value, tier, raw)) = Self::cascade(
            FieldKey::CustomerEmail,
            text,
            &rules,
            |c| {
                if c.contains('@') { Ok(()) } else { Err("not an email") }
            },
            out,
        ) {
            Self::set_text(out, FieldKey::CustomerEmail, value, tier, raw);
        }
    }

    fn extract_amounts(&self, text: &str, out: &mut HeuristicFields) {
        let amount_fields: [(FieldKey, &[PatternRule]); 3] = [
            (
                FieldKey::TotalAmount,
                &[
                    PatternRule::labeled("total_payable", &TOTAL_PAYABLE),
                    PatternRule::generic("total_generic", &TOTAL_GENERIC),
                ],
            ),
            (
                FieldKey::Amount,
                &[PatternRule::labeled("subtotal", &SUBTOTAL)],
            ),
            (
                FieldKey::VatAmount,
                &[PatternRule::labeled("vat_amount", &VAT_AMOUNT)],
            ),
        ];

        for (key, rules) in amount_fields {
            let sanity = |c: &str| match normalize_amount(c) {
                Some(d) if d > rust_decimal::Decimal::ZERO => Ok(()),
                Some(_) => Err("not positive"),
                None => Err("unparseable amount"),
            };
            if let Some((value, tier, raw)) = Self::cascade(key, text, rules, sanity, out) {
                // Sanity guaranteed Some
                if let Some(amount) = normalize_amount(&value) {
                    out.fields.insert(
                        key,
                        FieldState::Extracted {
                            value: FieldValue::Amount(amount),
                            confidence: tier,
                            source: FieldSource::Heuristic,
                            raw: Some(raw),
                        },
                    );
                }
            }
        }
    }

    fn extract_currency(&self, text: &str, out: &mut HeuristicFields) {
        if let Some(code) = detect_currency(text) {
            out.trace
                .chosen(FieldKey::Currency, &code, FieldSource::Heuristic);
            Self::set_text(out, FieldKey::Currency, code.clone(), TIER_GENERIC, code);
        }
    }

    fn extract_dates(&self, text: &str, out: &mut HeuristicFields) {
        let sanity = |c: &str| {
            if normalize_date(c).is_some() {
                Ok(())
            } else {
                Err("unparseable date")
            }
        };

        let invoice_rules = [
            PatternRule::labeled("invoice_date_labeled", &INVOICE_DATE),
            PatternRule::generic("any_date", &ANY_DATE),
        ];
        let invoice_date = Self::cascade(FieldKey::InvoiceDate, text, &invoice_rules, sanity, out)
            .and_then(|(value, tier, raw)| {
                let date = normalize_date(&value)?;
                out.fields.insert(
                    FieldKey::InvoiceDate,
                    FieldState::Extracted {
                        value: FieldValue::Date(date),
                        confidence: tier,
                        source: FieldSource::Heuristic,
                        raw: Some(raw),
                    },
                );
                Some(date)
            });

        let due_rules = [PatternRule::labeled("due_date_labeled", &DUE_DATE)];
        if let Some((value, tier, raw)) =
            Self::cascade(FieldKey::DueDate, text, &due_rules, sanity, out)
        {
            if let Some(date) = normalize_date(&value) {
                out.fields.insert(
                    FieldKey::DueDate,
                    FieldState::Extracted {
                        value: FieldValue::Date(date),
                        confidence: tier,
                        source: FieldSource::Heuristic,
                        raw: Some(raw),
                    },
                );
                return;
            }
        }

        // Payment-terms phrase instead of an explicit due date:
        // due = invoice date + N days.
        if let (Some(invoice_date), Some(caps)) = (invoice_date, PAYMENT_TERMS.captures(text)) {
            let days = (1..=3)
                .find_map(|i| caps.get(i))
                .and_then(|m| m.as_str().parse::<i64>().ok());
            if let Some(days) = days {
                let phrase = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
                let due = apply_term_days(invoice_date, days);
                out.trace
                    .chosen(FieldKey::DueDate, phrase, FieldSource::Heuristic);
                out.fields.insert(
                    FieldKey::DueDate,
                    FieldState::Extracted {
                        value: FieldValue::Date(due),
                        confidence: TIER_GENERIC,
                        source: FieldSource::Heuristic,
                        raw: Some(phrase.to_string()),
                    },
                );
            }
        }
    }

    fn extract_tax_id(&self, text: &str, out: &mut HeuristicFields) {
        let rules = [PatternRule::labeled("tax_id", &TAX_ID)];
        let sanity = |c: &str| {
            let digits = c.chars().filter(|ch| ch.is_ascii_digit()).count();
            if (8..=15).contains(&digits) {
                Ok(())
            } else {
                Err("digit count out of bounds")
            }
        };
        if let Some((value, tier, raw)) = Self::cascade(FieldKey::TaxId, text, &rules, sanity, out)
        {
            let canonical: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
            Self::set_text(out, FieldKey::TaxId, canonical, tier, raw);
        }
    }

    fn extract_description(&self, text: &str, out: &mut HeuristicFields) {
        let rules = [PatternRule::generic("description_label", &DESCRIPTION_LABEL)];
        if let Some((value, tier, raw)) = Self::cascade(
            FieldKey::Description,
            text,
            &rules,
            |c| {
                if (3..=200).contains(&c.len()) {
                    Ok(())
                } else {
                    Err("length out of bounds")
                }
            },
            out,
        ) {
            Self::set_text(out, FieldKey::Description, value, tier, raw);
        }
    }
}

impl Default for HeuristicParser {
    fn default() -> Self {
        Self::new()
    }
}

fn sane_name(c: &str) -> Result<(), &'static str> {
    if c.len() < 2 || c.len() > 80 {
        return Err("length out of bounds");
    }
    if !c.chars().any(|ch| ch.is_alphabetic()) {
        return Err("no letters");
    }
    if c.contains('@') {
        return Err("looks like an email");
    }
    Ok(())
}

fn sane_header_name(c: &str) -> Result<(), &'static str> {
    sane_name(c)?;
    let lowered = c.to_lowercase();
    if lowered.contains("invoice") || lowered.contains("statement") {
        return Err("document title, not a name");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    const SAMPLE: &str = "Gulf Stationery Trading LLC\n\
        Address: Unit 4, Industrial Area 2, Sharjah\n\
        TRN: 100123456700003\n\
        TAX INVOICE\n\
        Invoice Number V01250857\n\
        Invoice Date: 15/01/2024\n\
        Bill To: Al Noor Contracting LLC\n\
        accounts@alnoor.example\n\
        Description: office supplies January\n\
        Subtotal AED 1,000.00\n\
        VAT (5%) AED 234,56\n\
        Total EUR 1.234,56\n\
        Terms: Net 30\n";

    #[test]
    fn test_parse_sample_invoice() {
        let parser = HeuristicParser::new();
        let out = parser.parse(SAMPLE);

        assert_eq!(
            out.value(FieldKey::InvoiceNumber).and_then(|v| v.as_text()),
            Some("V01250857")
        );
        assert_eq!(
            out.value(FieldKey::TotalAmount).and_then(|v| v.as_amount()),
            Some(dec("1234.56"))
        );
        assert_eq!(
            out.value(FieldKey::VatAmount).and_then(|v| v.as_amount()),
            Some(dec("234.56"))
        );
        assert_eq!(
            out.value(FieldKey::Amount).and_then(|v| v.as_amount()),
            Some(dec("1000.00"))
        );
        assert_eq!(
            out.value(FieldKey::CustomerName).and_then(|v| v.as_text()),
            Some("Al Noor Contracting LLC")
        );
        assert_eq!(
            out.value(FieldKey::CustomerEmail).and_then(|v| v.as_text()),
            Some("accounts@alnoor.example")
        );
        assert_eq!(
            out.value(FieldKey::TaxId).and_then(|v| v.as_text()),
            Some("100123456700003")
        );
        assert_eq!(
            out.value(FieldKey::VendorName).and_then(|v| v.as_text()),
            Some("Gulf Stationery Trading LLC")
        );
        assert_eq!(
            out.value(FieldKey::InvoiceDate).and_then(|v| v.as_date()),
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
    }

    #[test]
    fn test_explicit_due_date_beats_terms_phrase() {
        let text = "Invoice Date: 01/02/2024\nDue Date: 20/02/2024\nTerms: Net 30\n";
        let out = HeuristicParser::new().parse(text);
        assert_eq!(
            out.value(FieldKey::DueDate).and_then(|v| v.as_date()),
            NaiveDate::from_ymd_opt(2024, 2, 20)
        );
    }

    #[test]
    fn test_net_terms_compute_due_date() {
        let text = "Invoice Date: 01/02/2024\nTerms: Net 30\n";
        let out = HeuristicParser::new().parse(text);
        assert_eq!(
            out.value(FieldKey::DueDate).and_then(|v| v.as_date()),
            NaiveDate::from_ymd_opt(2024, 3, 2)
        );
    }

    #[test]
    fn test_known_customer_beats_label_pattern() {
        let parser = HeuristicParser::new()
            .with_known_customers(vec!["Falcon Logistics".to_string()]);
        let text = "Bill To: Some Generic Name\nShip via Falcon Logistics fleet\n";
        let out = parser.parse(text);
        assert_eq!(
            out.value(FieldKey::CustomerName).and_then(|v| v.as_text()),
            Some("Falcon Logistics")
        );
        // The trace records why
        let chosen = out
            .trace
            .for_field(FieldKey::CustomerName)
            .into_iter()
            .find(|e| matches!(e.outcome, crate::models::TraceOutcome::Chosen { .. }))
            .unwrap();
        assert_eq!(chosen.candidate, "Falcon Logistics");
    }

    #[test]
    fn test_empty_text_yields_nothing() {
        let out = HeuristicParser::new().parse("   \n  ");
        assert!(out.fields.is_empty());
    }

    #[test]
    fn test_invoice_number_rejects_dates() {
        // "Invoice 15/01/2024" must not adopt the date as the number
        let out = HeuristicParser::new().parse("Invoice 15/01/2024\n");
        assert!(out.value(FieldKey::InvoiceNumber).is_none());
    }
}
