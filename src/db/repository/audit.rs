use std::str::FromStr;

use chrono::{Duration, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::*;
use crate::models::*;

use super::{parse_timestamp, parse_uuid};

/// Append one immutable audit entry and return its assigned sequence number.
pub fn append_audit_entry(conn: &Connection, entry: &AuditEntry) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO audit_log (document_id, stage, severity, message, elapsed_ms,
         confidence, error_code, detail, metadata, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            entry.document_id.to_string(),
            entry.stage.as_str(),
            entry.severity.as_str(),
            entry.message,
            entry.elapsed_ms,
            entry.confidence,
            entry.error_code,
            entry.detail,
            entry.metadata,
            entry.created_at.to_rfc3339(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Full processing history for one document, in append order.
pub fn get_audit_entries(
    conn: &Connection,
    document_id: &Uuid,
) -> Result<Vec<AuditEntry>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT seq, document_id, stage, severity, message, elapsed_ms, confidence,
         error_code, detail, metadata, created_at
         FROM audit_log WHERE document_id = ?1 ORDER BY seq ASC",
    )?;

    let rows = stmt.query_map(params![document_id.to_string()], read_audit_row)?;

    let mut entries = Vec::new();
    for row in rows {
        entries.push(audit_from_row(row?)?);
    }
    Ok(entries)
}

/// Most recent entries first, for status polling.
pub fn get_recent_audit_entries(
    conn: &Connection,
    document_id: &Uuid,
    limit: i64,
) -> Result<Vec<AuditEntry>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT seq, document_id, stage, severity, message, elapsed_ms, confidence,
         error_code, detail, metadata, created_at
         FROM audit_log WHERE document_id = ?1 ORDER BY seq DESC LIMIT ?2",
    )?;

    let rows = stmt.query_map(params![document_id.to_string(), limit], read_audit_row)?;

    let mut entries = Vec::new();
    for row in rows {
        entries.push(audit_from_row(row?)?);
    }
    Ok(entries)
}

/// Delete entries older than the retention window and return how many rows
/// were removed. Stored timestamps are RFC 3339 UTC, so lexicographic
/// comparison is chronological.
pub fn prune_audit_log(conn: &Connection, retention_days: i64) -> Result<usize, DatabaseError> {
    let cutoff = (Utc::now() - Duration::days(retention_days)).to_rfc3339();
    let removed = conn.execute(
        "DELETE FROM audit_log WHERE created_at < ?1",
        params![cutoff],
    )?;
    Ok(removed)
}

// Internal row type for AuditEntry mapping
struct AuditRow {
    seq: i64,
    document_id: String,
    stage: String,
    severity: String,
    message: String,
    elapsed_ms: Option<i64>,
    confidence: Option<f64>,
    error_code: Option<String>,
    detail: Option<String>,
    metadata: Option<String>,
    created_at: String,
}

fn read_audit_row(row: &rusqlite::Row<'_>) -> Result<AuditRow, rusqlite::Error> {
    Ok(AuditRow {
        seq: row.get(0)?,
        document_id: row.get(1)?,
        stage: row.get(2)?,
        severity: row.get(3)?,
        message: row.get(4)?,
        elapsed_ms: row.get(5)?,
        confidence: row.get(6)?,
        error_code: row.get(7)?,
        detail: row.get(8)?,
        metadata: row.get(9)?,
        created_at: row.get(10)?,
    })
}

fn audit_from_row(row: AuditRow) -> Result<AuditEntry, DatabaseError> {
    Ok(AuditEntry {
        seq: row.seq,
        document_id: parse_uuid(&row.document_id)?,
        stage: AuditStage::from_str(&row.stage)?,
        severity: AuditSeverity::from_str(&row.severity)?,
        message: row.message,
        elapsed_ms: row.elapsed_ms,
        confidence: row.confidence,
        error_code: row.error_code,
        detail: row.detail,
        metadata: row.metadata,
        created_at: parse_timestamp(&row.created_at),
    })
}
