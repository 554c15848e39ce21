//! Repository layer: entity-scoped database operations.
//!
//! Each sub-module owns the SQL for one table. All public functions are
//! re-exported here so callers address the layer as a whole.

mod audit;
mod customer;
mod invoice;
mod issuer;
mod line_item;

use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use super::DatabaseError;

// Re-export all public items from sub-modules
pub use audit::*;
pub use customer::*;
pub use invoice::*;
pub use issuer::*;
pub use line_item::*;

// ---------------------------------------------------------------------------
// Column parsing helpers
// ---------------------------------------------------------------------------

fn parse_uuid(s: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(s).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
}

/// Monetary columns hold canonical decimal strings. A value that fails to
/// parse is data corruption, not a recoverable absence.
fn parse_decimal(column: &str, value: &str) -> Result<BigDecimal, DatabaseError> {
    BigDecimal::from_str(value).map_err(|_| DatabaseError::InvalidColumn {
        column: column.into(),
        value: value.into(),
    })
}

fn parse_opt_decimal(
    column: &str,
    value: Option<String>,
) -> Result<Option<BigDecimal>, DatabaseError> {
    value.map(|v| parse_decimal(column, &v)).transpose()
}

fn parse_opt_date(value: Option<String>) -> Option<NaiveDate> {
    value.and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok())
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_default()
}
