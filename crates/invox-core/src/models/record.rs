//! Finalized invoice draft record handed to the system of record.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The canonical, validated invoice draft emitted by the
/// reconciliation workflow. Immutable once produced; persistence is
/// the host's concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceDraftRecord {
    pub invoice_number: String,

    pub customer_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,

    /// Subtotal before VAT.
    pub amount: Decimal,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub vat_amount: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<Decimal>,

    #[serde(default = "default_currency")]
    pub currency: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_date: Option<NaiveDate>,

    pub due_date: NaiveDate,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Tax registration number (TRN/VAT number).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_address: Option<String>,
}

fn default_currency() -> String {
    "AED".to_string()
}
