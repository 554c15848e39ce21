use bigdecimal::BigDecimal;
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::*;

use super::{parse_decimal, parse_opt_date, parse_timestamp, parse_uuid};

pub fn insert_issuer(conn: &Connection, issuer: &IssuerRecord) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO issuers (id, tenant_id, name, address_line1, address_line2, city,
         state_province, postal_code, country, phone, email, tax_id, website, currency,
         invoice_count, total_billed, last_invoice_date, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                 ?17, ?18, ?19)",
        params![
            issuer.id.to_string(),
            issuer.tenant_id,
            issuer.name,
            issuer.address_line1,
            issuer.address_line2,
            issuer.city,
            issuer.state_province,
            issuer.postal_code,
            issuer.country,
            issuer.phone,
            issuer.email,
            issuer.tax_id,
            issuer.website,
            issuer.currency,
            issuer.invoice_count,
            issuer.total_billed.to_string(),
            issuer.last_invoice_date.map(|d| d.to_string()),
            issuer.created_at.to_rfc3339(),
            issuer.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn get_issuer(conn: &Connection, id: &Uuid) -> Result<Option<IssuerRecord>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, tenant_id, name, address_line1, address_line2, city, state_province,
         postal_code, country, phone, email, tax_id, website, currency, invoice_count,
         total_billed, last_invoice_date, created_at, updated_at
         FROM issuers WHERE id = ?1",
    )?;

    let result = stmt.query_row(params![id.to_string()], read_issuer_row);

    match result {
        Ok(row) => Ok(Some(issuer_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Persist profile fields. Usage statistics are only written through
/// `refresh_issuer_statistics`.
pub fn update_issuer(conn: &Connection, issuer: &IssuerRecord) -> Result<(), DatabaseError> {
    let rows = conn.execute(
        "UPDATE issuers SET name = ?2, address_line1 = ?3, address_line2 = ?4, city = ?5,
         state_province = ?6, postal_code = ?7, country = ?8, phone = ?9, email = ?10,
         tax_id = ?11, website = ?12, currency = ?13, updated_at = ?14
         WHERE id = ?1",
        params![
            issuer.id.to_string(),
            issuer.name,
            issuer.address_line1,
            issuer.address_line2,
            issuer.city,
            issuer.state_province,
            issuer.postal_code,
            issuer.country,
            issuer.phone,
            issuer.email,
            issuer.tax_id,
            issuer.website,
            issuer.currency,
            issuer.updated_at.to_rfc3339(),
        ],
    )?;

    if rows == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "issuer".into(),
            id: issuer.id.to_string(),
        });
    }
    Ok(())
}

/// Candidate lookup for the duplicate detector. An exact tax id match wins
/// outright; otherwise fall back to case-insensitive name containment.
pub fn find_similar_issuers(
    conn: &Connection,
    tenant_id: &str,
    name: &str,
    tax_id: Option<&str>,
    limit: i64,
) -> Result<Vec<IssuerRecord>, DatabaseError> {
    if let Some(tax_id) = tax_id.filter(|t| !t.is_empty()) {
        let mut stmt = conn.prepare(
            "SELECT id, tenant_id, name, address_line1, address_line2, city, state_province,
             postal_code, country, phone, email, tax_id, website, currency, invoice_count,
             total_billed, last_invoice_date, created_at, updated_at
             FROM issuers WHERE tenant_id = ?1 AND tax_id = ?2 LIMIT 1",
        )?;

        let result = stmt.query_row(params![tenant_id, tax_id], read_issuer_row);
        match result {
            Ok(row) => return Ok(vec![issuer_from_row(row)?]),
            Err(rusqlite::Error::QueryReturnedNoRows) => {}
            Err(e) => return Err(e.into()),
        }
    }

    if name.is_empty() {
        return Ok(Vec::new());
    }

    let pattern = format!("%{name}%");
    let mut stmt = conn.prepare(
        "SELECT id, tenant_id, name, address_line1, address_line2, city, state_province,
         postal_code, country, phone, email, tax_id, website, currency, invoice_count,
         total_billed, last_invoice_date, created_at, updated_at
         FROM issuers WHERE tenant_id = ?1 AND name LIKE ?2 LIMIT ?3",
    )?;

    let rows = stmt.query_map(params![tenant_id, pattern, limit], read_issuer_row)?;

    let mut issuers = Vec::new();
    for row in rows {
        issuers.push(issuer_from_row(row?)?);
    }
    Ok(issuers)
}

/// Recompute usage statistics from this issuer's invoices. The billed total
/// is summed as decimals in Rust; SQLite SUM would coerce to floats.
pub fn refresh_issuer_statistics(conn: &Connection, issuer_id: &Uuid) -> Result<(), DatabaseError> {
    let mut stmt =
        conn.prepare("SELECT total_amount, invoice_date FROM invoices WHERE issuer_id = ?1")?;

    let rows = stmt.query_map(params![issuer_id.to_string()], |row| {
        Ok((
            row.get::<_, Option<String>>(0)?,
            row.get::<_, Option<String>>(1)?,
        ))
    })?;

    let mut count: i64 = 0;
    let mut total = BigDecimal::from(0);
    let mut last_date: Option<NaiveDate> = None;

    for row in rows {
        let (amount, date) = row?;
        count += 1;
        if let Some(amount) = amount {
            total += parse_decimal("total_amount", &amount)?;
        }
        if let Some(date) = parse_opt_date(date) {
            last_date = Some(last_date.map_or(date, |d| d.max(date)));
        }
    }

    let rows = conn.execute(
        "UPDATE issuers SET invoice_count = ?2, total_billed = ?3, last_invoice_date = ?4,
         updated_at = ?5 WHERE id = ?1",
        params![
            issuer_id.to_string(),
            count,
            total.to_string(),
            last_date.map(|d| d.to_string()),
            Utc::now().to_rfc3339(),
        ],
    )?;

    if rows == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "issuer".into(),
            id: issuer_id.to_string(),
        });
    }
    Ok(())
}

// Internal row type for IssuerRecord mapping
struct IssuerRow {
    id: String,
    tenant_id: String,
    name: String,
    address_line1: Option<String>,
    address_line2: Option<String>,
    city: Option<String>,
    state_province: Option<String>,
    postal_code: Option<String>,
    country: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    tax_id: Option<String>,
    website: Option<String>,
    currency: Option<String>,
    invoice_count: i64,
    total_billed: String,
    last_invoice_date: Option<String>,
    created_at: String,
    updated_at: String,
}

fn read_issuer_row(row: &rusqlite::Row<'_>) -> Result<IssuerRow, rusqlite::Error> {
    Ok(IssuerRow {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        name: row.get(2)?,
        address_line1: row.get(3)?,
        address_line2: row.get(4)?,
        city: row.get(5)?,
        state_province: row.get(6)?,
        postal_code: row.get(7)?,
        country: row.get(8)?,
        phone: row.get(9)?,
        email: row.get(10)?,
        tax_id: row.get(11)?,
        website: row.get(12)?,
        currency: row.get(13)?,
        invoice_count: row.get(14)?,
        total_billed: row.get(15)?,
        last_invoice_date: row.get(16)?,
        created_at: row.get(17)?,
        updated_at: row.get(18)?,
    })
}

fn issuer_from_row(row: IssuerRow) -> Result<IssuerRecord, DatabaseError> {
    Ok(IssuerRecord {
        id: parse_uuid(&row.id)?,
        tenant_id: row.tenant_id,
        name: row.name,
        address_line1: row.address_line1,
        address_line2: row.address_line2,
        city: row.city,
        state_province: row.state_province,
        postal_code: row.postal_code,
        country: row.country,
        phone: row.phone,
        email: row.email,
        tax_id: row.tax_id,
        website: row.website,
        currency: row.currency,
        invoice_count: row.invoice_count,
        total_billed: parse_decimal("total_billed", &row.total_billed)?,
        last_invoice_date: parse_opt_date(row.last_invoice_date),
        created_at: parse_timestamp(&row.created_at),
        updated_at: parse_timestamp(&row.updated_at),
    })
}
