use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::*;

use super::{parse_timestamp, parse_uuid};

pub fn insert_customer(conn: &Connection, customer: &CustomerRecord) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO customers (id, tenant_id, name, company_name, billing_address_line1,
         billing_address_line2, billing_city, billing_state_province, billing_postal_code,
         billing_country, email, phone, tax_id, payment_terms_days, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        params![
            customer.id.to_string(),
            customer.tenant_id,
            customer.name,
            customer.company_name,
            customer.billing_address_line1,
            customer.billing_address_line2,
            customer.billing_city,
            customer.billing_state_province,
            customer.billing_postal_code,
            customer.billing_country,
            customer.email,
            customer.phone,
            customer.tax_id,
            customer.payment_terms_days,
            customer.created_at.to_rfc3339(),
            customer.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn get_customer(conn: &Connection, id: &Uuid) -> Result<Option<CustomerRecord>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, tenant_id, name, company_name, billing_address_line1, billing_address_line2,
         billing_city, billing_state_province, billing_postal_code, billing_country, email,
         phone, tax_id, payment_terms_days, created_at, updated_at
         FROM customers WHERE id = ?1",
    )?;

    let result = stmt.query_row(params![id.to_string()], read_customer_row);

    match result {
        Ok(row) => Ok(Some(customer_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn update_customer(conn: &Connection, customer: &CustomerRecord) -> Result<(), DatabaseError> {
    let rows = conn.execute(
        "UPDATE customers SET name = ?2, company_name = ?3, billing_address_line1 = ?4,
         billing_address_line2 = ?5, billing_city = ?6, billing_state_province = ?7,
         billing_postal_code = ?8, billing_country = ?9, email = ?10, phone = ?11,
         tax_id = ?12, payment_terms_days = ?13, updated_at = ?14
         WHERE id = ?1",
        params![
            customer.id.to_string(),
            customer.name,
            customer.company_name,
            customer.billing_address_line1,
            customer.billing_address_line2,
            customer.billing_city,
            customer.billing_state_province,
            customer.billing_postal_code,
            customer.billing_country,
            customer.email,
            customer.phone,
            customer.tax_id,
            customer.payment_terms_days,
            customer.updated_at.to_rfc3339(),
        ],
    )?;

    if rows == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "customer".into(),
            id: customer.id.to_string(),
        });
    }
    Ok(())
}

/// Candidate lookup for the duplicate detector. An exact email match wins,
/// then exact tax id, then case-insensitive name containment.
pub fn find_similar_customers(
    conn: &Connection,
    tenant_id: &str,
    name: &str,
    email: Option<&str>,
    tax_id: Option<&str>,
    limit: i64,
) -> Result<Vec<CustomerRecord>, DatabaseError> {
    if let Some(email) = email.filter(|e| !e.is_empty()) {
        let mut stmt = conn.prepare(
            "SELECT id, tenant_id, name, company_name, billing_address_line1,
             billing_address_line2, billing_city, billing_state_province, billing_postal_code,
             billing_country, email, phone, tax_id, payment_terms_days, created_at, updated_at
             FROM customers WHERE tenant_id = ?1 AND email = ?2 COLLATE NOCASE LIMIT 1",
        )?;

        let result = stmt.query_row(params![tenant_id, email], read_customer_row);
        match result {
            Ok(row) => return Ok(vec![customer_from_row(row)?]),
            Err(rusqlite::Error::QueryReturnedNoRows) => {}
            Err(e) => return Err(e.into()),
        }
    }

    if let Some(tax_id) = tax_id.filter(|t| !t.is_empty()) {
        let mut stmt = conn.prepare(
            "SELECT id, tenant_id, name, company_name, billing_address_line1,
             billing_address_line2, billing_city, billing_state_province, billing_postal_code,
             billing_country, email, phone, tax_id, payment_terms_days, created_at, updated_at
             FROM customers WHERE tenant_id = ?1 AND tax_id = ?2 LIMIT 1",
        )?;

        let result = stmt.query_row(params![tenant_id, tax_id], read_customer_row);
        match result {
            Ok(row) => return Ok(vec![customer_from_row(row)?]),
            Err(rusqlite::Error::QueryReturnedNoRows) => {}
            Err(e) => return Err(e.into()),
        }
    }

    if name.is_empty() {
        return Ok(Vec::new());
    }

    let pattern = format!("%{name}%");
    let mut stmt = conn.prepare(
        "SELECT id, tenant_id, name, company_name, billing_address_line1, billing_address_line2,
         billing_city, billing_state_province, billing_postal_code, billing_country, email,
         phone, tax_id, payment_terms_days, created_at, updated_at
         FROM customers WHERE tenant_id = ?1 AND name LIKE ?2 LIMIT ?3",
    )?;

    let rows = stmt.query_map(params![tenant_id, pattern, limit], read_customer_row)?;

    let mut customers = Vec::new();
    for row in rows {
        customers.push(customer_from_row(row?)?);
    }
    Ok(customers)
}

// Internal row type for CustomerRecord mapping
struct CustomerRow {
    id: String,
    tenant_id: String,
    name: String,
    company_name: Option<String>,
    billing_address_line1: Option<String>,
    billing_address_line2: Option<String>,
    billing_city: Option<String>,
    billing_state_province: Option<String>,
    billing_postal_code: Option<String>,
    billing_country: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    tax_id: Option<String>,
    payment_terms_days: Option<i64>,
    created_at: String,
    updated_at: String,
}

fn read_customer_row(row: &rusqlite::Row<'_>) -> Result<CustomerRow, rusqlite::Error> {
    Ok(CustomerRow {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        name: row.get(2)?,
        company_name: row.get(3)?,
        billing_address_line1: row.get(4)?,
        billing_address_line2: row.get(5)?,
        billing_city: row.get(6)?,
        billing_state_province: row.get(7)?,
        billing_postal_code: row.get(8)?,
        billing_country: row.get(9)?,
        email: row.get(10)?,
        phone: row.get(11)?,
        tax_id: row.get(12)?,
        payment_terms_days: row.get(13)?,
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
    })
}

fn customer_from_row(row: CustomerRow) -> Result<CustomerRecord, DatabaseError> {
    Ok(CustomerRecord {
        id: parse_uuid(&row.id)?,
        tenant_id: row.tenant_id,
        name: row.name,
        company_name: row.company_name,
        billing_address_line1: row.billing_address_line1,
        billing_address_line2: row.billing_address_line2,
        billing_city: row.billing_city,
        billing_state_province: row.billing_state_province,
        billing_postal_code: row.billing_postal_code,
        billing_country: row.billing_country,
        email: row.email,
        phone: row.phone,
        tax_id: row.tax_id,
        payment_terms_days: row.payment_terms_days,
        created_at: parse_timestamp(&row.created_at),
        updated_at: parse_timestamp(&row.updated_at),
    })
}
