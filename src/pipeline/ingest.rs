//! Upload gate in front of the pipeline.
//!
//! Every upload passes four checks before a document record exists:
//! extension allowlist, size cap, content hash, tenant-scoped duplicate
//! lookup. Rejections are typed outcomes the caller can present, not
//! errors; only storage failures surface as `Err`. An accepted upload
//! leaves a `pending` document and an upload audit entry behind.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::db::repository;
use crate::db::DatabaseError;
use crate::models::{AuditEntry, AuditStage, InvoiceDocument};
use crate::pipeline::duplicate;
use crate::validators;

/// Outcome of one upload attempt. `document_id` is set only for accepted
/// uploads; a duplicate points at the already-stored document instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResult {
    pub document_id: Option<Uuid>,
    pub original_filename: String,
    pub file_size_bytes: u64,
    pub content_hash: Option<String>,
    pub duplicate_of: Option<Uuid>,
    pub status: IngestStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IngestStatus {
    Accepted,
    Duplicate,
    UnsupportedExtension,
    TooLarge,
}

/// Run the upload gate and, on acceptance, create the `pending` document.
///
/// The caller hands over the raw bytes; nothing is written to disk here.
/// An invalid or empty tenant id falls back to the configured default.
pub fn ingest_document(
    conn: &Connection,
    tenant_id: &str,
    filename: &str,
    bytes: &[u8],
    config: &AppConfig,
) -> Result<IngestResult, DatabaseError> {
    let original_filename = validators::sanitize_file_name(filename);
    let tenant = if validators::is_valid_tenant_id(tenant_id) {
        tenant_id
    } else {
        config.default_tenant.as_str()
    };
    let file_size_bytes = bytes.len() as u64;

    tracing::info!(
        tenant = %tenant,
        file = %original_filename,
        size = file_size_bytes,
        "Upload received"
    );

    // Step 1: extension allowlist
    if !validators::has_allowed_extension(&original_filename, &config.allowed_extensions) {
        tracing::info!(file = %original_filename, "Upload rejected: unsupported extension");
        return Ok(rejection(
            original_filename,
            file_size_bytes,
            IngestStatus::UnsupportedExtension,
        ));
    }

    // Step 2: size cap
    if file_size_bytes > config.max_file_size_bytes {
        tracing::info!(
            file = %original_filename,
            size = file_size_bytes,
            limit = config.max_file_size_bytes,
            "Upload rejected: file too large"
        );
        return Ok(rejection(original_filename, file_size_bytes, IngestStatus::TooLarge));
    }

    // Step 3: content hash
    let content_hash = duplicate::compute_content_hash(bytes);

    // Step 4: tenant-scoped duplicate pre-check
    let check = duplicate::check_content_hash(conn, tenant, &content_hash)?;
    if check.is_duplicate {
        tracing::info!(
            file = %original_filename,
            duplicate_of = ?check.existing_document_id,
            "Duplicate upload short-circuited"
        );
        return Ok(IngestResult {
            document_id: None,
            original_filename,
            file_size_bytes,
            content_hash: Some(content_hash),
            duplicate_of: check.existing_document_id,
            status: IngestStatus::Duplicate,
        });
    }

    // Step 5: pending record plus the upload audit entry
    let document = InvoiceDocument::new_pending(
        tenant,
        &original_filename,
        bytes.len() as i64,
        &content_hash,
    );
    repository::insert_invoice(conn, &document)?;

    let metadata = serde_json::json!({
        "filename": original_filename,
        "file_size_bytes": file_size_bytes,
    });
    let entry = AuditEntry::new(
        document.id,
        AuditStage::Upload,
        format!("Invoice uploaded: {original_filename} ({file_size_bytes} bytes)"),
    )
    .with_metadata(metadata.to_string());
    repository::append_audit_entry(conn, &entry)?;

    tracing::info!(document_id = %document.id, file = %original_filename, "Upload accepted");

    Ok(IngestResult {
        document_id: Some(document.id),
        original_filename,
        file_size_bytes,
        content_hash: Some(content_hash),
        duplicate_of: None,
        status: IngestStatus::Accepted,
    })
}

fn rejection(original_filename: String, file_size_bytes: u64, status: IngestStatus) -> IngestResult {
    IngestResult {
        document_id: None,
        original_filename,
        file_size_bytes,
        content_hash: None,
        duplicate_of: None,
        status,
    }
}
