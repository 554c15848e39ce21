use chrono::NaiveDate;
use uuid::Uuid;

use super::enums::ProcessingState;

/// Listing filter for invoice documents. All criteria are optional and
/// combine with AND; results are newest-first.
#[derive(Debug, Default)]
pub struct InvoiceFilter {
    pub state: Option<ProcessingState>,
    pub issuer_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub requires_review: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
