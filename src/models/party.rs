use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::field::ExtractedField;

// ---------------------------------------------------------------------------
// Extraction drafts
// ---------------------------------------------------------------------------

/// Issuer details as extracted from document text. Every field carries the
/// confidence of the pattern that produced it; `known_issuer_id` is set when
/// the directory lookup matched a previously seen issuer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssuerDraft {
    pub name: ExtractedField<String>,
    pub address_line1: ExtractedField<String>,
    pub address_line2: ExtractedField<String>,
    pub city: ExtractedField<String>,
    pub state_province: ExtractedField<String>,
    pub postal_code: ExtractedField<String>,
    pub country: ExtractedField<String>,
    pub phone: ExtractedField<String>,
    pub email: ExtractedField<String>,
    pub tax_id: ExtractedField<String>,
    pub website: ExtractedField<String>,
    pub known_issuer_id: Option<Uuid>,
    pub confidence: f64,
}

/// Bill-to party as extracted from document text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerDraft {
    pub name: ExtractedField<String>,
    pub company_name: ExtractedField<String>,
    pub billing_address_line1: ExtractedField<String>,
    pub billing_address_line2: ExtractedField<String>,
    pub billing_city: ExtractedField<String>,
    pub billing_state_province: ExtractedField<String>,
    pub billing_postal_code: ExtractedField<String>,
    pub billing_country: ExtractedField<String>,
    pub email: ExtractedField<String>,
    pub phone: ExtractedField<String>,
    pub known_customer_id: Option<Uuid>,
    pub confidence: f64,
}

impl IssuerDraft {
    /// Pre-fill absent fields from a previously seen issuer. A field the
    /// patterns already matched is never overwritten, whatever its score.
    pub fn backfill_from(&mut self, existing: &IssuerRecord) {
        self.known_issuer_id = Some(existing.id);

        fill_absent(&mut self.address_line1, existing.address_line1.as_deref());
        fill_absent(&mut self.phone, existing.phone.as_deref());
        fill_absent(&mut self.email, existing.email.as_deref());
    }
}

impl CustomerDraft {
    /// Pre-fill absent contact fields from a previously seen customer.
    pub fn backfill_from(&mut self, existing: &CustomerRecord) {
        self.known_customer_id = Some(existing.id);

        fill_absent(&mut self.email, existing.email.as_deref());
        fill_absent(&mut self.phone, existing.phone.as_deref());
    }
}

/// Directory values are verbatim copies of stored records, so a backfilled
/// field carries full confidence.
fn fill_absent(field: &mut ExtractedField<String>, stored: Option<&str>) {
    if field.value.is_empty() {
        if let Some(value) = stored {
            if !value.is_empty() {
                *field = ExtractedField::new(value.to_string(), 1.0);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Persisted party records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuerRecord {
    pub id: Uuid,
    pub tenant_id: String,
    pub name: String,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub state_province: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub tax_id: Option<String>,
    pub website: Option<String>,
    pub currency: Option<String>,
    pub invoice_count: i64,
    pub total_billed: BigDecimal,
    pub last_invoice_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub id: Uuid,
    pub tenant_id: String,
    pub name: String,
    pub company_name: Option<String>,
    pub billing_address_line1: Option<String>,
    pub billing_address_line2: Option<String>,
    pub billing_city: Option<String>,
    pub billing_state_province: Option<String>,
    pub billing_postal_code: Option<String>,
    pub billing_country: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub tax_id: Option<String>,
    pub payment_terms_days: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IssuerRecord {
    pub fn from_draft(draft: &IssuerDraft, tenant_id: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.to_string(),
            name: draft.name.value.clone(),
            address_line1: present(&draft.address_line1),
            address_line2: present(&draft.address_line2),
            city: present(&draft.city),
            state_province: present(&draft.state_province),
            postal_code: present(&draft.postal_code),
            country: present(&draft.country),
            phone: present(&draft.phone),
            email: present(&draft.email),
            tax_id: present(&draft.tax_id),
            website: present(&draft.website),
            currency: None,
            invoice_count: 0,
            total_billed: BigDecimal::from(0),
            last_invoice_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite stored fields with every non-empty freshly extracted value.
    pub fn apply_draft(&mut self, draft: &IssuerDraft) {
        if !draft.name.value.is_empty() {
            self.name = draft.name.value.clone();
        }
        overwrite(&mut self.address_line1, &draft.address_line1);
        overwrite(&mut self.address_line2, &draft.address_line2);
        overwrite(&mut self.city, &draft.city);
        overwrite(&mut self.state_province, &draft.state_province);
        overwrite(&mut self.postal_code, &draft.postal_code);
        overwrite(&mut self.country, &draft.country);
        overwrite(&mut self.phone, &draft.phone);
        overwrite(&mut self.email, &draft.email);
        overwrite(&mut self.tax_id, &draft.tax_id);
        overwrite(&mut self.website, &draft.website);
        self.updated_at = Utc::now();
    }
}

impl CustomerRecord {
    pub fn from_draft(draft: &CustomerDraft, tenant_id: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.to_string(),
            name: draft.name.value.clone(),
            company_name: present(&draft.company_name),
            billing_address_line1: present(&draft.billing_address_line1),
            billing_address_line2: present(&draft.billing_address_line2),
            billing_city: present(&draft.billing_city),
            billing_state_province: present(&draft.billing_state_province),
            billing_postal_code: present(&draft.billing_postal_code),
            billing_country: present(&draft.billing_country),
            email: present(&draft.email),
            phone: present(&draft.phone),
            tax_id: None,
            payment_terms_days: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_draft(&mut self, draft: &CustomerDraft) {
        if !draft.name.value.is_empty() {
            self.name = draft.name.value.clone();
        }
        overwrite(&mut self.company_name, &draft.company_name);
        overwrite(&mut self.billing_address_line1, &draft.billing_address_line1);
        overwrite(&mut self.billing_address_line2, &draft.billing_address_line2);
        overwrite(&mut self.billing_city, &draft.billing_city);
        overwrite(&mut self.billing_state_province, &draft.billing_state_province);
        overwrite(&mut self.billing_postal_code, &draft.billing_postal_code);
        overwrite(&mut self.billing_country, &draft.billing_country);
        overwrite(&mut self.email, &draft.email);
        overwrite(&mut self.phone, &draft.phone);
        self.updated_at = Utc::now();
    }
}

fn present(field: &ExtractedField<String>) -> Option<String> {
    if field.value.is_empty() {
        None
    } else {
        Some(field.value.clone())
    }
}

fn overwrite(slot: &mut Option<String>, field: &ExtractedField<String>) {
    if !field.value.is_empty() {
        *slot = Some(field.value.clone());
    }
}
