use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::ProcessingState;

/// Persisted invoice document record. Created in `Pending` state at upload,
/// filled in by the pipeline, and finalized with a terminal state plus the
/// aggregated confidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceDocument {
    pub id: Uuid,
    pub tenant_id: String,
    pub invoice_number: Option<String>,
    pub invoice_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub po_number: Option<String>,
    pub issuer_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub currency: String,
    pub subtotal_amount: Option<BigDecimal>,
    pub tax_amount: Option<BigDecimal>,
    pub tax_rate: Option<BigDecimal>,
    pub discount_amount: Option<BigDecimal>,
    pub shipping_amount: Option<BigDecimal>,
    pub total_amount: Option<BigDecimal>,
    pub payment_terms: Option<String>,
    pub original_filename: String,
    pub file_size_bytes: i64,
    pub content_hash: String,
    pub state: ProcessingState,
    pub extraction_confidence: Option<f64>,
    pub requires_review: bool,
    pub is_duplicate: bool,
    pub duplicate_of: Option<Uuid>,
    pub line_items_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InvoiceDocument {
    /// Fresh record for an accepted upload, before any pipeline stage ran.
    pub fn new_pending(
        tenant_id: &str,
        original_filename: &str,
        file_size_bytes: i64,
        content_hash: &str,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.to_string(),
            invoice_number: None,
            invoice_date: None,
            due_date: None,
            po_number: None,
            issuer_id: None,
            customer_id: None,
            currency: "USD".to_string(),
            subtotal_amount: None,
            tax_amount: None,
            tax_rate: None,
            discount_amount: None,
            shipping_amount: None,
            total_amount: None,
            payment_terms: None,
            original_filename: original_filename.to_string(),
            file_size_bytes,
            content_hash: content_hash.to_string(),
            state: ProcessingState::Pending,
            extraction_confidence: None,
            requires_review: false,
            is_duplicate: false,
            duplicate_of: None,
            line_items_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}
