//! Regex patterns for heuristic invoice field extraction.
//!
//! Bilingual (English/Arabic) labels appear where scanned invoices in
//! the wild carry them: TRN and payable-amount phrasing.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Invoice number patterns
    pub static ref INVOICE_NUMBER: Regex = Regex::new(
        r"(?i)(?:invoice|inv\.?|bill)[ \t]*(?:number|num\.?|no\.?|#)?[ \t:#]*([A-Za-z0-9][A-Za-z0-9/\-_]{2,})"
    ).unwrap();

    pub static ref INVOICE_NUMBER_STANDALONE: Regex = Regex::new(
        r"\b(?:INV|IN|V)[\-/]?(\d{4,10})\b"
    ).unwrap();

    // Party labels
    pub static ref CUSTOMER_LABEL: Regex = Regex::new(
        r"(?i)(?:bill\s*to|invoice\s*to|sold\s*to|customer(?:\s*name)?|client(?:\s*name)?)[ \t:]+([^\n]+)"
    ).unwrap();

    pub static ref VENDOR_LABEL: Regex = Regex::new(
        r"(?i)(?:from|vendor|supplier|issued\s*by)[ \t:]+([^\n]+)"
    ).unwrap();

    pub static ref ADDRESS_LABEL: Regex = Regex::new(
        r"(?i)address[ \t:]+([^\n]+)"
    ).unwrap();

    // Email pattern
    pub static ref EMAIL: Regex = Regex::new(
        r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}"
    ).unwrap();

    // Amount patterns: two decimal digits required, optional currency
    // marker between label and value
    pub static ref TOTAL_PAYABLE: Regex = Regex::new(
        r"(?i)(?:amount\s*payable|total\s*payable|balance\s*due|amount\s*due|grand\s*total)[\s:]*(?:AED|USD|EUR|GBP|SAR|\$|€|£)?\s*(\d{1,3}(?:[.,\s]?\d{3})*[.,]\d{2})\b"
    ).unwrap();

    pub static ref TOTAL_GENERIC: Regex = Regex::new(
        r"(?i)\btotal\b[\s:]*(?:AED|USD|EUR|GBP|SAR|\$|€|£)?\s*(\d{1,3}(?:[.,\s]?\d{3})*[.,]\d{2})\b"
    ).unwrap();

    pub static ref SUBTOTAL: Regex = Regex::new(
        r"(?i)(?:sub\s*-?\s*total|net\s*amount|amount\s*before\s*(?:tax|vat))[\s:]*(?:AED|USD|EUR|GBP|SAR|\$|€|£)?\s*(\d{1,3}(?:[.,\s]?\d{3})*[.,]\d{2})\b"
    ).unwrap();

    pub static ref VAT_AMOUNT: Regex = Regex::new(
        r"(?i)\b(?:vat|tax)\b\s*(?:amount)?\s*(?:\(?\d{1,2}(?:\.\d+)?\s*%\)?)?[\s:]*(?:AED|USD|EUR|GBP|SAR|\$|€|£)?\s*(\d{1,3}(?:[.,\s]?\d{3})*[.,]\d{2})\b"
    ).unwrap();

    // Every currency-prefixed amount in the document; feeds the
    // plausibility corrector's magnitude scan
    pub static ref CURRENCY_AMOUNT: Regex = Regex::new(
        r"(?:AED|USD|EUR|GBP|SAR|\$|€|£)\s*(\d{1,3}(?:[.,\s]?\d{3})*[.,]\d{2})\b"
    ).unwrap();

    // Explicit payable-amount statements, English and Arabic; these
    // override magnitude-based total correction
    pub static ref PAYABLE_PHRASE: Regex = Regex::new(
        r"(?i)(?:amount\s*payable|total\s*payable|net\s*payable|balance\s*due|المبلغ\s*المستحق|الإجمالي\s*المستحق)[\s:]*(?:AED|USD|EUR|GBP|SAR|\$|€|£)?\s*(\d{1,3}(?:[.,\s]?\d{3})*[.,]\d{2})\b"
    ).unwrap();

    // Labeled dates
    pub static ref INVOICE_DATE: Regex = Regex::new(
        r"(?i)(?:invoice\s*date|date\s*of\s*issue|issued?\s*(?:date|on))[\s:]*([0-9]{1,4}[./\-][0-9]{1,2}[./\-][0-9]{1,4})"
    ).unwrap();

    pub static ref DUE_DATE: Regex = Regex::new(
        r"(?i)(?:due\s*date|payment\s*due|pay\s*by|due\s*on)[\s:]*([0-9]{1,4}[./\-][0-9]{1,2}[./\-][0-9]{1,4})"
    ).unwrap();

    pub static ref ANY_DATE: Regex = Regex::new(
        r"\b(\d{1,4}[./\-]\d{1,2}[./\-]\d{1,4})\b"
    ).unwrap();

    // Payment terms phrases implying a due date
    pub static ref PAYMENT_TERMS: Regex = Regex::new(
        r"(?i)(?:net\s*(\d{1,3})\b|due\s*in\s*(\d{1,3})\s*days|payment\s*within\s*(\d{1,3})\s*days)"
    ).unwrap();

    // Tax registration number (TRN/VAT number), English and Arabic
    pub static ref TAX_ID: Regex = Regex::new(
        r"(?i)(?:TRN|tax\s*registration\s*(?:no\.?|number)?|vat\s*(?:reg(?:istration)?\.?\s*)?(?:no\.?|number)|الرقم\s*الضريبي)[\s:.]*(\d[\d\s\-]{7,20}\d)"
    ).unwrap();

    // Free-text description
    pub static ref DESCRIPTION_LABEL: Regex = Regex::new(
        r"(?i)(?:description|details|being)[ \t:]+([^\n]+)"
    ).unwrap();
}
