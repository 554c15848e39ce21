use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::*;

use super::{parse_decimal, parse_opt_decimal};

/// Replace an invoice's line items wholesale. Line numbers are unique per
/// invoice, so re-running extraction stays idempotent.
pub fn replace_line_items(
    conn: &Connection,
    invoice_id: &Uuid,
    items: &[LineItem],
) -> Result<(), DatabaseError> {
    conn.execute(
        "DELETE FROM line_items WHERE invoice_id = ?1",
        params![invoice_id.to_string()],
    )?;

    let mut stmt = conn.prepare(
        "INSERT INTO line_items (id, invoice_id, line_number, description, item_code,
         quantity, unit_of_measure, unit_price, total_price, tax_amount, discount_amount,
         confidence)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
    )?;

    for item in items {
        stmt.execute(params![
            Uuid::new_v4().to_string(),
            invoice_id.to_string(),
            item.line_number,
            item.description,
            item.item_code,
            item.quantity.to_string(),
            item.unit_of_measure,
            item.unit_price.to_string(),
            item.total_price.to_string(),
            item.tax_amount.as_ref().map(|a| a.to_string()),
            item.discount_amount.as_ref().map(|a| a.to_string()),
            item.confidence,
        ])?;
    }
    Ok(())
}

pub fn get_line_items(
    conn: &Connection,
    invoice_id: &Uuid,
) -> Result<Vec<LineItem>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT line_number, description, item_code, quantity, unit_of_measure, unit_price,
         total_price, tax_amount, discount_amount, confidence
         FROM line_items WHERE invoice_id = ?1 ORDER BY line_number ASC",
    )?;

    let rows = stmt.query_map(params![invoice_id.to_string()], read_line_item_row)?;

    let mut items = Vec::new();
    for row in rows {
        items.push(line_item_from_row(row?)?);
    }
    Ok(items)
}

// Internal row type for LineItem mapping
struct LineItemRow {
    line_number: i64,
    description: String,
    item_code: Option<String>,
    quantity: String,
    unit_of_measure: String,
    unit_price: String,
    total_price: String,
    tax_amount: Option<String>,
    discount_amount: Option<String>,
    confidence: Option<f64>,
}

fn read_line_item_row(row: &rusqlite::Row<'_>) -> Result<LineItemRow, rusqlite::Error> {
    Ok(LineItemRow {
        line_number: row.get(0)?,
        description: row.get(1)?,
        item_code: row.get(2)?,
        quantity: row.get(3)?,
        unit_of_measure: row.get(4)?,
        unit_price: row.get(5)?,
        total_price: row.get(6)?,
        tax_amount: row.get(7)?,
        discount_amount: row.get(8)?,
        confidence: row.get(9)?,
    })
}

fn line_item_from_row(row: LineItemRow) -> Result<LineItem, DatabaseError> {
    Ok(LineItem {
        line_number: row.line_number,
        description: row.description,
        item_code: row.item_code,
        quantity: parse_decimal("quantity", &row.quantity)?,
        unit_of_measure: row.unit_of_measure,
        unit_price: parse_decimal("unit_price", &row.unit_price)?,
        total_price: parse_decimal("total_price", &row.total_price)?,
        tax_amount: parse_opt_decimal("tax_amount", row.tax_amount)?,
        discount_amount: parse_opt_decimal("discount_amount", row.discount_amount)?,
        confidence: row.confidence.unwrap_or(0.0),
    })
}
