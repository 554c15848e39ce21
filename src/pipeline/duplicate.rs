//! Duplicate detection.
//!
//! Two independent mechanisms: exact content-hash collisions catch the same
//! bytes uploaded twice, and fuzzy party-identity matching catches the same
//! company or customer extracted under a slightly different rendering. A
//! secondary lookup by (invoice number, issuer) catches re-submissions of
//! the same logical invoice in a different file.

use std::collections::HashSet;

use base64::Engine;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::db::repository;
use crate::db::DatabaseError;
use crate::models::{CustomerRecord, InvoiceDocument, IssuerRecord};

/// Name similarity two issuers must exceed before a shared address marks
/// them as the same company.
const ISSUER_NAME_THRESHOLD: f64 = 0.8;

/// Customers use a stricter bar; a false merge corrupts billing history.
const CUSTOMER_NAME_THRESHOLD: f64 = 0.9;

// ---------------------------------------------------------------------------
// Content hash
// ---------------------------------------------------------------------------

/// SHA-256 over the uploaded bytes, base64-encoded.
pub fn compute_content_hash(bytes: &[u8]) -> String {
    let hash = Sha256::digest(bytes);
    base64::engine::general_purpose::STANDARD.encode(hash)
}

// ---------------------------------------------------------------------------
// Document-level checks
// ---------------------------------------------------------------------------

/// Pre-pipeline duplicate check result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateCheck {
    pub is_duplicate: bool,
    pub existing_document_id: Option<Uuid>,
    pub content_hash: String,
}

/// Exact content-hash lookup within one tenant. A hit means the same bytes
/// were uploaded before, whatever the filename says, and short-circuits the
/// pipeline.
pub fn check_content_hash(
    conn: &Connection,
    tenant_id: &str,
    content_hash: &str,
) -> Result<DuplicateCheck, DatabaseError> {
    let existing = repository::find_invoice_by_hash(conn, tenant_id, content_hash)?;
    Ok(DuplicateCheck {
        is_duplicate: existing.is_some(),
        existing_document_id: existing.map(|doc| doc.id),
        content_hash: content_hash.to_string(),
    })
}

/// Logical re-submission check: another document with the same invoice
/// number from the same issuer. Runs after extraction, once number and
/// issuer are known; returns the original's id.
pub fn find_logical_duplicate(
    conn: &Connection,
    doc: &InvoiceDocument,
) -> Result<Option<Uuid>, DatabaseError> {
    let number = match doc.invoice_number.as_deref() {
        Some(n) if !n.is_empty() => n,
        _ => return Ok(None),
    };
    let issuer_id = match doc.issuer_id.as_ref() {
        Some(id) => id,
        None => return Ok(None),
    };

    let existing =
        repository::find_invoice_by_number(conn, &doc.tenant_id, number, issuer_id, &doc.id)?;
    Ok(existing.map(|original| original.id))
}

// ---------------------------------------------------------------------------
// Party identity
// ---------------------------------------------------------------------------

/// Whether two issuer records describe the same company.
///
/// Symmetric: `is_duplicate_issuer(a, b) == is_duplicate_issuer(b, a)`.
pub fn is_duplicate_issuer(a: &IssuerRecord, b: &IssuerRecord) -> bool {
    if a.name.to_lowercase() == b.name.to_lowercase() {
        return true;
    }

    if let (Some(a_tax), Some(b_tax)) = (&a.tax_id, &b.tax_id) {
        if !a_tax.is_empty() && a_tax == b_tax {
            return true;
        }
    }

    issuer_name_similarity(&a.name, &b.name) > ISSUER_NAME_THRESHOLD && same_issuer_address(a, b)
}

/// Whether two customer records describe the same bill-to party.
///
/// Symmetric, like the issuer check. An email is the strongest customer
/// identifier and matches outright.
pub fn is_duplicate_customer(a: &CustomerRecord, b: &CustomerRecord) -> bool {
    if let (Some(a_email), Some(b_email)) = (&a.email, &b.email) {
        if !a_email.is_empty() && a_email.to_lowercase() == b_email.to_lowercase() {
            return true;
        }
    }

    if a.name.to_lowercase() == b.name.to_lowercase() {
        return true;
    }

    if let (Some(a_tax), Some(b_tax)) = (&a.tax_id, &b.tax_id) {
        if !a_tax.is_empty() && a_tax == b_tax {
            return true;
        }
    }

    customer_name_similarity(&a.name, &b.name) > CUSTOMER_NAME_THRESHOLD
        && same_billing_address(a, b)
}

/// Issuer name similarity in [0,1]: exact 1.0, substring containment 0.8,
/// otherwise Jaccard overlap of whitespace tokens.
fn issuer_name_similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();

    if a == b {
        return 1.0;
    }
    if a.contains(&b) || b.contains(&a) {
        return 0.8;
    }
    token_jaccard(&a, &b)
}

/// Customer names skip the containment shortcut: "Smith" must not score
/// 0.8 against "Smith Holdings".
fn customer_name_similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();

    if a == b {
        return 1.0;
    }
    token_jaccard(&a, &b)
}

fn token_jaccard(a: &str, b: &str) -> f64 {
    let a_tokens: HashSet<&str> = a.split_whitespace().collect();
    let b_tokens: HashSet<&str> = b.split_whitespace().collect();

    if a_tokens.is_empty() || b_tokens.is_empty() {
        return 0.0;
    }

    let intersection = a_tokens.intersection(&b_tokens).count() as f64;
    let union = a_tokens.union(&b_tokens).count() as f64;
    intersection / union
}

fn same_issuer_address(a: &IssuerRecord, b: &IssuerRecord) -> bool {
    a.address_line1 == b.address_line1 && a.city == b.city && a.postal_code == b.postal_code
}

fn same_billing_address(a: &CustomerRecord, b: &CustomerRecord) -> bool {
    a.billing_address_line1 == b.billing_address_line1
        && a.billing_city == b.billing_city
        && a.billing_postal_code == b.billing_postal_code
}
