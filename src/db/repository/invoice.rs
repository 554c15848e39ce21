use std::str::FromStr;

use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::*;
use crate::models::*;

use super::{parse_opt_date, parse_opt_decimal, parse_timestamp, parse_uuid};

pub fn insert_invoice(conn: &Connection, doc: &InvoiceDocument) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO invoices (id, tenant_id, invoice_number, invoice_date, due_date, po_number,
         issuer_id, customer_id, currency, subtotal_amount, tax_amount, tax_rate,
         discount_amount, shipping_amount, total_amount, payment_terms, original_filename,
         file_size_bytes, content_hash, status, extraction_confidence, requires_review,
         is_duplicate, duplicate_of, line_items_count, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
                 ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27)",
        params![
            doc.id.to_string(),
            doc.tenant_id,
            doc.invoice_number,
            doc.invoice_date.map(|d| d.to_string()),
            doc.due_date.map(|d| d.to_string()),
            doc.po_number,
            doc.issuer_id.map(|id| id.to_string()),
            doc.customer_id.map(|id| id.to_string()),
            doc.currency,
            doc.subtotal_amount.as_ref().map(|a| a.to_string()),
            doc.tax_amount.as_ref().map(|a| a.to_string()),
            doc.tax_rate.as_ref().map(|a| a.to_string()),
            doc.discount_amount.as_ref().map(|a| a.to_string()),
            doc.shipping_amount.as_ref().map(|a| a.to_string()),
            doc.total_amount.as_ref().map(|a| a.to_string()),
            doc.payment_terms,
            doc.original_filename,
            doc.file_size_bytes,
            doc.content_hash,
            doc.state.as_str(),
            doc.extraction_confidence,
            doc.requires_review as i32,
            doc.is_duplicate as i32,
            doc.duplicate_of.map(|id| id.to_string()),
            doc.line_items_count,
            doc.created_at.to_rfc3339(),
            doc.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn get_invoice(conn: &Connection, id: &Uuid) -> Result<Option<InvoiceDocument>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, tenant_id, invoice_number, invoice_date, due_date, po_number,
         issuer_id, customer_id, currency, subtotal_amount, tax_amount, tax_rate,
         discount_amount, shipping_amount, total_amount, payment_terms, original_filename,
         file_size_bytes, content_hash, status, extraction_confidence, requires_review,
         is_duplicate, duplicate_of, line_items_count, created_at, updated_at
         FROM invoices WHERE id = ?1",
    )?;

    let result = stmt.query_row(params![id.to_string()], read_invoice_row);

    match result {
        Ok(row) => Ok(Some(invoice_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Persist every mutable field of an invoice record. id, tenant_id,
/// original_filename, content_hash and created_at never change after insert.
pub fn update_invoice(conn: &Connection, doc: &InvoiceDocument) -> Result<(), DatabaseError> {
    let rows = conn.execute(
        "UPDATE invoices SET invoice_number = ?2, invoice_date = ?3, due_date = ?4,
         po_number = ?5, issuer_id = ?6, customer_id = ?7, currency = ?8,
         subtotal_amount = ?9, tax_amount = ?10, tax_rate = ?11, discount_amount = ?12,
         shipping_amount = ?13, total_amount = ?14, payment_terms = ?15, status = ?16,
         extraction_confidence = ?17, requires_review = ?18, is_duplicate = ?19,
         duplicate_of = ?20, line_items_count = ?21, updated_at = ?22
         WHERE id = ?1",
        params![
            doc.id.to_string(),
            doc.invoice_number,
            doc.invoice_date.map(|d| d.to_string()),
            doc.due_date.map(|d| d.to_string()),
            doc.po_number,
            doc.issuer_id.map(|id| id.to_string()),
            doc.customer_id.map(|id| id.to_string()),
            doc.currency,
            doc.subtotal_amount.as_ref().map(|a| a.to_string()),
            doc.tax_amount.as_ref().map(|a| a.to_string()),
            doc.tax_rate.as_ref().map(|a| a.to_string()),
            doc.discount_amount.as_ref().map(|a| a.to_string()),
            doc.shipping_amount.as_ref().map(|a| a.to_string()),
            doc.total_amount.as_ref().map(|a| a.to_string()),
            doc.payment_terms,
            doc.state.as_str(),
            doc.extraction_confidence,
            doc.requires_review as i32,
            doc.is_duplicate as i32,
            doc.duplicate_of.map(|id| id.to_string()),
            doc.line_items_count,
            doc.updated_at.to_rfc3339(),
        ],
    )?;

    if rows == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "invoice".into(),
            id: doc.id.to_string(),
        });
    }
    Ok(())
}

/// Update only the processing state of an invoice.
pub fn set_invoice_state(
    conn: &Connection,
    id: &Uuid,
    state: ProcessingState,
) -> Result<(), DatabaseError> {
    let rows = conn.execute(
        "UPDATE invoices SET status = ?2, updated_at = ?3 WHERE id = ?1",
        params![
            id.to_string(),
            state.as_str(),
            chrono::Utc::now().to_rfc3339()
        ],
    )?;

    if rows == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "invoice".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Exact content-hash lookup within one tenant. Returns the earliest match,
/// which is the original rather than a later resubmission.
pub fn find_invoice_by_hash(
    conn: &Connection,
    tenant_id: &str,
    content_hash: &str,
) -> Result<Option<InvoiceDocument>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, tenant_id, invoice_number, invoice_date, due_date, po_number,
         issuer_id, customer_id, currency, subtotal_amount, tax_amount, tax_rate,
         discount_amount, shipping_amount, total_amount, payment_terms, original_filename,
         file_size_bytes, content_hash, status, extraction_confidence, requires_review,
         is_duplicate, duplicate_of, line_items_count, created_at, updated_at
         FROM invoices WHERE tenant_id = ?1 AND content_hash = ?2
         ORDER BY created_at ASC LIMIT 1",
    )?;

    let result = stmt.query_row(params![tenant_id, content_hash], read_invoice_row);

    match result {
        Ok(row) => Ok(Some(invoice_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Logical duplicate lookup: same invoice number from the same issuer within
/// one tenant, excluding the document being processed. Rows already marked
/// duplicate are skipped so duplicates always point at originals.
pub fn find_invoice_by_number(
    conn: &Connection,
    tenant_id: &str,
    invoice_number: &str,
    issuer_id: &Uuid,
    exclude: &Uuid,
) -> Result<Option<InvoiceDocument>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, tenant_id, invoice_number, invoice_date, due_date, po_number,
         issuer_id, customer_id, currency, subtotal_amount, tax_amount, tax_rate,
         discount_amount, shipping_amount, total_amount, payment_terms, original_filename,
         file_size_bytes, content_hash, status, extraction_confidence, requires_review,
         is_duplicate, duplicate_of, line_items_count, created_at, updated_at
         FROM invoices
         WHERE tenant_id = ?1 AND invoice_number = ?2 AND issuer_id = ?3
           AND id != ?4 AND is_duplicate = 0
         ORDER BY created_at ASC LIMIT 1",
    )?;

    let result = stmt.query_row(
        params![
            tenant_id,
            invoice_number,
            issuer_id.to_string(),
            exclude.to_string()
        ],
        read_invoice_row,
    );

    match result {
        Ok(row) => Ok(Some(invoice_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_invoices(
    conn: &Connection,
    tenant_id: &str,
    filter: &InvoiceFilter,
) -> Result<Vec<InvoiceDocument>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, tenant_id, invoice_number, invoice_date, due_date, po_number,
         issuer_id, customer_id, currency, subtotal_amount, tax_amount, tax_rate,
         discount_amount, shipping_amount, total_amount, payment_terms, original_filename,
         file_size_bytes, content_hash, status, extraction_confidence, requires_review,
         is_duplicate, duplicate_of, line_items_count, created_at, updated_at
         FROM invoices
         WHERE tenant_id = ?1
           AND (?2 IS NULL OR status = ?2)
           AND (?3 IS NULL OR issuer_id = ?3)
           AND (?4 IS NULL OR customer_id = ?4)
           AND (?5 IS NULL OR invoice_date >= ?5)
           AND (?6 IS NULL OR invoice_date <= ?6)
           AND (?7 IS NULL OR requires_review = ?7)
         ORDER BY created_at DESC
         LIMIT ?8 OFFSET ?9",
    )?;

    let rows = stmt.query_map(
        params![
            tenant_id,
            filter.state.map(|s| s.as_str()),
            filter.issuer_id.map(|id| id.to_string()),
            filter.customer_id.map(|id| id.to_string()),
            filter.date_from.map(|d| d.to_string()),
            filter.date_to.map(|d| d.to_string()),
            filter.requires_review.map(|r| r as i32),
            filter.limit.unwrap_or(50),
            filter.offset.unwrap_or(0),
        ],
        read_invoice_row,
    )?;

    let mut invoices = Vec::new();
    for row in rows {
        invoices.push(invoice_from_row(row?)?);
    }
    Ok(invoices)
}

// Internal row type for InvoiceDocument mapping
struct InvoiceRow {
    id: String,
    tenant_id: String,
    invoice_number: Option<String>,
    invoice_date: Option<String>,
    due_date: Option<String>,
    po_number: Option<String>,
    issuer_id: Option<String>,
    customer_id: Option<String>,
    currency: String,
    subtotal_amount: Option<String>,
    tax_amount: Option<String>,
    tax_rate: Option<String>,
    discount_amount: Option<String>,
    shipping_amount: Option<String>,
    total_amount: Option<String>,
    payment_terms: Option<String>,
    original_filename: String,
    file_size_bytes: i64,
    content_hash: String,
    status: String,
    extraction_confidence: Option<f64>,
    requires_review: i32,
    is_duplicate: i32,
    duplicate_of: Option<String>,
    line_items_count: i64,
    created_at: String,
    updated_at: String,
}

fn read_invoice_row(row: &rusqlite::Row<'_>) -> Result<InvoiceRow, rusqlite::Error> {
    Ok(InvoiceRow {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        invoice_number: row.get(2)?,
        invoice_date: row.get(3)?,
        due_date: row.get(4)?,
        po_number: row.get(5)?,
        issuer_id: row.get(6)?,
        customer_id: row.get(7)?,
        currency: row.get(8)?,
        subtotal_amount: row.get(9)?,
        tax_amount: row.get(10)?,
        tax_rate: row.get(11)?,
        discount_amount: row.get(12)?,
        shipping_amount: row.get(13)?,
        total_amount: row.get(14)?,
        payment_terms: row.get(15)?,
        original_filename: row.get(16)?,
        file_size_bytes: row.get(17)?,
        content_hash: row.get(18)?,
        status: row.get(19)?,
        extraction_confidence: row.get(20)?,
        requires_review: row.get(21)?,
        is_duplicate: row.get(22)?,
        duplicate_of: row.get(23)?,
        line_items_count: row.get(24)?,
        created_at: row.get(25)?,
        updated_at: row.get(26)?,
    })
}

fn invoice_from_row(row: InvoiceRow) -> Result<InvoiceDocument, DatabaseError> {
    Ok(InvoiceDocument {
        id: parse_uuid(&row.id)?,
        tenant_id: row.tenant_id,
        invoice_number: row.invoice_number,
        invoice_date: parse_opt_date(row.invoice_date),
        due_date: parse_opt_date(row.due_date),
        po_number: row.po_number,
        issuer_id: row.issuer_id.and_then(|s| Uuid::parse_str(&s).ok()),
        customer_id: row.customer_id.and_then(|s| Uuid::parse_str(&s).ok()),
        currency: row.currency,
        subtotal_amount: parse_opt_decimal("subtotal_amount", row.subtotal_amount)?,
        tax_amount: parse_opt_decimal("tax_amount", row.tax_amount)?,
        tax_rate: parse_opt_decimal("tax_rate", row.tax_rate)?,
        discount_amount: parse_opt_decimal("discount_amount", row.discount_amount)?,
        shipping_amount: parse_opt_decimal("shipping_amount", row.shipping_amount)?,
        total_amount: parse_opt_decimal("total_amount", row.total_amount)?,
        payment_terms: row.payment_terms,
        original_filename: row.original_filename,
        file_size_bytes: row.file_size_bytes,
        content_hash: row.content_hash,
        state: ProcessingState::from_str(&row.status)?,
        extraction_confidence: row.extraction_confidence,
        requires_review: row.requires_review != 0,
        is_duplicate: row.is_duplicate != 0,
        duplicate_of: row.duplicate_of.and_then(|s| Uuid::parse_str(&s).ok()),
        line_items_count: row.line_items_count,
        created_at: parse_timestamp(&row.created_at),
        updated_at: parse_timestamp(&row.updated_at),
    })
}
