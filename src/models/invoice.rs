use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::field::ExtractedField;

/// Invoice header fields pulled from document text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoiceMetadata {
    pub invoice_number: ExtractedField<String>,
    pub invoice_date: ExtractedField<Option<NaiveDate>>,
    pub due_date: ExtractedField<Option<NaiveDate>>,
    pub po_number: ExtractedField<String>,
    pub confidence: f64,
}

/// Monetary totals and payment information. Amounts are decimals, not
/// floats; reconciliation tolerances are meaningless under binary rounding.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinancialSummary {
    pub currency: ExtractedField<String>,
    pub subtotal_amount: Option<BigDecimal>,
    pub tax_amount: Option<BigDecimal>,
    pub tax_rate: Option<BigDecimal>,
    pub discount_amount: Option<BigDecimal>,
    pub shipping_amount: Option<BigDecimal>,
    pub total_amount: Option<BigDecimal>,
    pub payment_terms: ExtractedField<String>,
    pub confidence: f64,
}

/// Which financial fields reconciliation derived rather than extracted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationFlags {
    pub calculated_total: bool,
    pub calculated_tax_rate: bool,
}

/// One invoice line. `line_number` is 1-based and dense within a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub line_number: i64,
    pub description: String,
    pub item_code: Option<String>,
    pub quantity: BigDecimal,
    pub unit_of_measure: String,
    pub unit_price: BigDecimal,
    pub total_price: BigDecimal,
    pub tax_amount: Option<BigDecimal>,
    pub discount_amount: Option<BigDecimal>,
    pub confidence: f64,
}

impl Default for LineItem {
    fn default() -> Self {
        Self {
            line_number: 1,
            description: String::new(),
            item_code: None,
            quantity: BigDecimal::from(1),
            unit_of_measure: "each".to_string(),
            unit_price: BigDecimal::from(0),
            total_price: BigDecimal::from(0),
            tax_amount: None,
            discount_amount: None,
            confidence: 0.0,
        }
    }
}
