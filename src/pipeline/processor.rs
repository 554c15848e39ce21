//! Pipeline orchestrator.
//!
//! Drives one uploaded document through every stage: OCR, normalization,
//! pattern extraction, reconciliation, party resolution, duplicate
//! detection, validation, and the terminal state transition. Each stage
//! appends its audit entry before the next stage starts, so a crash
//! mid-pipeline leaves a trail up to the failing stage.
//!
//! The OCR engine arrives as a trait object, which keeps the orchestrator
//! testable without a recognition backend.

use std::time::Instant;

use bigdecimal::BigDecimal;
use chrono::Utc;
use rusqlite::Connection;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::db::repository;
use crate::db::DatabaseError;
use crate::models::{
    AuditEntry, AuditStage, CustomerDraft, CustomerRecord, InvoiceDocument, IssuerDraft,
    IssuerRecord, ProcessingState, ValidationReport,
};
use crate::pipeline::confidence::aggregate_confidence;
use crate::pipeline::duplicate;
use crate::pipeline::extraction::{
    assemble_outcome, extract_invoice, ExtractedInvoice, ExtractionError, OcrEngine,
};
use crate::pipeline::normalize::{normalize_text, text_statistics};
use crate::pipeline::reconcile::reconcile;
use crate::pipeline::rules::ruleset;
use crate::pipeline::validation::validate_invoice;

/// Directory rows fetched per party lookup before identity matching.
const PARTY_CANDIDATE_LIMIT: i64 = 5;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that abort the pipeline for one document.
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("Document not found: {0}")]
    DocumentNotFound(Uuid),

    #[error("Document {id} is already {}", .state.as_str())]
    AlreadyProcessed { id: Uuid, state: ProcessingState },

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Summary returned to the caller after one processing run. The full detail
/// lives in the document row, its line items, and the audit log.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingOutcome {
    pub document_id: Uuid,
    pub state: ProcessingState,
    pub requires_review: bool,
    pub is_duplicate: bool,
    pub duplicate_of: Option<Uuid>,
    pub extraction_confidence: Option<f64>,
    pub line_items_count: i64,
    /// Absent when a re-submission short-circuited before validation.
    pub validation: Option<ValidationReport>,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Runs the pipeline for pending documents.
///
/// Pure pipeline logic over an open connection; queueing and concurrency
/// belong to the worker layer.
pub struct DocumentProcessor {
    ocr: Box<dyn OcrEngine + Send + Sync>,
    config: AppConfig,
}

impl DocumentProcessor {
    pub fn new(ocr: Box<dyn OcrEngine + Send + Sync>, config: AppConfig) -> Self {
        Self { ocr, config }
    }

    /// Process one uploaded document through the full pipeline.
    ///
    /// On any stage failure the document is moved to `failed` with an error
    /// audit entry, and the failure is returned to the caller. Documents
    /// already in a terminal state are refused before any bookkeeping.
    pub fn process(
        &self,
        conn: &Connection,
        document_id: &Uuid,
        image_bytes: &[u8],
    ) -> Result<ProcessingOutcome, ProcessingError> {
        let doc = repository::get_invoice(conn, document_id)?
            .ok_or(ProcessingError::DocumentNotFound(*document_id))?;
        if doc.state.is_terminal() {
            return Err(ProcessingError::AlreadyProcessed {
                id: doc.id,
                state: doc.state,
            });
        }

        match self.run_pipeline(conn, doc, image_bytes) {
            Ok(outcome) => Ok(outcome),
            Err(error) => {
                mark_failed(conn, document_id, &error);
                Err(error)
            }
        }
    }

    fn run_pipeline(
        &self,
        conn: &Connection,
        mut doc: InvoiceDocument,
        image_bytes: &[u8],
    ) -> Result<ProcessingOutcome, ProcessingError> {
        repository::set_invoice_state(conn, &doc.id, ProcessingState::Processing)?;
        doc.state = ProcessingState::Processing;
        tracing::info!(
            document_id = %doc.id,
            filename = %doc.original_filename,
            "Starting invoice processing"
        );

        // 1. OCR
        let started = Instant::now();
        let raw_blocks = self.ocr.recognize(image_bytes)?;
        let ocr = assemble_outcome(raw_blocks, self.config.ocr_confidence_threshold);
        let entry = AuditEntry::new(
            doc.id,
            AuditStage::Ocr,
            format!("OCR completed with {} text blocks", ocr.total_blocks),
        )
        .with_elapsed_ms(elapsed_ms(started))
        .with_confidence(ocr.overall_confidence)
        .with_metadata(
            json!({
                "total_blocks": ocr.total_blocks,
                "high_confidence_blocks": ocr.high_confidence_blocks,
                "average_confidence": ocr.average_confidence,
            })
            .to_string(),
        );
        repository::append_audit_entry(conn, &entry)?;

        // 2. Normalization, extraction, reconciliation
        let started = Instant::now();
        let text = normalize_text(&ocr.full_text);
        let statistics = text_statistics(&text);
        let mut draft = extract_invoice(&text, ruleset());
        let reconciliation = reconcile(&mut draft.financial, &self.config.reconcile_tolerance);

        // 3. Party resolution against the directory
        let issuer_id = resolve_issuer(conn, &doc.tenant_id, &mut draft.issuer)?;
        let customer_id = resolve_customer(conn, &doc.tenant_id, &mut draft.customer)?;

        let confidence = aggregate_confidence(&draft.confidence, draft.line_items.len());
        apply_extraction(&mut doc, &draft, issuer_id, customer_id);
        doc.extraction_confidence = Some(confidence);
        repository::update_invoice(conn, &doc)?;
        repository::replace_line_items(conn, &doc.id, &draft.line_items)?;

        let entry = AuditEntry::new(
            doc.id,
            AuditStage::Extraction,
            format!(
                "Data extraction completed with {} line items",
                draft.line_items.len()
            ),
        )
        .with_elapsed_ms(elapsed_ms(started))
        .with_confidence(confidence)
        .with_metadata(
            json!({
                "section_confidences": draft.confidence,
                "reconciliation": reconciliation,
                "text_statistics": statistics,
            })
            .to_string(),
        );
        repository::append_audit_entry(conn, &entry)?;

        // 4. Logical re-submission check, now that number and issuer are known
        if let Some(original_id) = duplicate::find_logical_duplicate(conn, &doc)? {
            return finish_as_duplicate(conn, doc, original_id, confidence);
        }

        // 5. Validation
        let started = Instant::now();
        let report = validate_invoice(&draft, &self.config);
        let entry = AuditEntry::new(
            doc.id,
            AuditStage::Validation,
            format!("Validation completed - Valid: {}", report.is_valid),
        )
        .with_elapsed_ms(elapsed_ms(started))
        .with_confidence(report.confidence_score)
        .with_metadata(json!(report).to_string());
        repository::append_audit_entry(conn, &entry)?;

        // 6. Terminal state
        if report.is_valid {
            doc.state = ProcessingState::Completed;
            doc.requires_review = report.requires_review;
        } else {
            doc.state = ProcessingState::Failed;
            doc.requires_review = true;
        }
        doc.updated_at = Utc::now();
        repository::update_invoice(conn, &doc)?;

        if doc.state == ProcessingState::Completed {
            if let Some(issuer_id) = doc.issuer_id.as_ref() {
                repository::refresh_issuer_statistics(conn, issuer_id)?;
            }
        }

        let entry = AuditEntry::new(
            doc.id,
            AuditStage::Completion,
            format!(
                "Invoice processing completed with status: {}",
                doc.state.as_str()
            ),
        )
        .with_confidence(confidence);
        repository::append_audit_entry(conn, &entry)?;

        tracing::info!(
            document_id = %doc.id,
            state = doc.state.as_str(),
            confidence,
            requires_review = doc.requires_review,
            "Invoice processing finished"
        );

        Ok(outcome_for(&doc, Some(report)))
    }
}

/// A re-submission completes without validation. Review resolves which of
/// the two documents stands.
fn finish_as_duplicate(
    conn: &Connection,
    mut doc: InvoiceDocument,
    original_id: Uuid,
    confidence: f64,
) -> Result<ProcessingOutcome, ProcessingError> {
    doc.is_duplicate = true;
    doc.duplicate_of = Some(original_id);
    doc.state = ProcessingState::Completed;
    doc.requires_review = true;
    doc.updated_at = Utc::now();
    repository::update_invoice(conn, &doc)?;

    let entry = AuditEntry::new(
        doc.id,
        AuditStage::Completion,
        format!(
            "Invoice processing completed with status: {}",
            doc.state.as_str()
        ),
    )
    .with_confidence(confidence)
    .with_metadata(json!({ "duplicate_of": original_id }).to_string());
    repository::append_audit_entry(conn, &entry)?;

    tracing::warn!(
        document_id = %doc.id,
        duplicate_of = %original_id,
        "Invoice is a re-submission of an existing document"
    );

    Ok(outcome_for(&doc, None))
}

// ---------------------------------------------------------------------------
// Party resolution
// ---------------------------------------------------------------------------

/// Match the extracted issuer against the directory. A hit backfills the
/// draft's absent fields from the stored record, then refreshes the record
/// with every non-empty extracted value; a miss creates the issuer.
fn resolve_issuer(
    conn: &Connection,
    tenant_id: &str,
    draft: &mut IssuerDraft,
) -> Result<Option<Uuid>, ProcessingError> {
    if draft.name.value.trim().is_empty() {
        return Ok(None);
    }

    let candidates = repository::find_similar_issuers(
        conn,
        tenant_id,
        &draft.name.value,
        non_empty(&draft.tax_id.value),
        PARTY_CANDIDATE_LIMIT,
    )?;
    let incoming = IssuerRecord::from_draft(draft, tenant_id);

    for mut existing in candidates {
        if duplicate::is_duplicate_issuer(&existing, &incoming) {
            draft.backfill_from(&existing);
            existing.apply_draft(draft);
            repository::update_issuer(conn, &existing)?;
            tracing::debug!(issuer_id = %existing.id, name = %existing.name, "Matched existing issuer");
            return Ok(Some(existing.id));
        }
    }

    repository::insert_issuer(conn, &incoming)?;
    tracing::debug!(issuer_id = %incoming.id, name = %incoming.name, "Created issuer");
    Ok(Some(incoming.id))
}

/// Customer counterpart of [`resolve_issuer`], keyed on email first.
fn resolve_customer(
    conn: &Connection,
    tenant_id: &str,
    draft: &mut CustomerDraft,
) -> Result<Option<Uuid>, ProcessingError> {
    if draft.name.value.trim().is_empty() {
        return Ok(None);
    }

    let candidates = repository::find_similar_customers(
        conn,
        tenant_id,
        &draft.name.value,
        non_empty(&draft.email.value),
        None,
        PARTY_CANDIDATE_LIMIT,
    )?;
    let incoming = CustomerRecord::from_draft(draft, tenant_id);

    for mut existing in candidates {
        if duplicate::is_duplicate_customer(&existing, &incoming) {
            draft.backfill_from(&existing);
            existing.apply_draft(draft);
            repository::update_customer(conn, &existing)?;
            tracing::debug!(customer_id = %existing.id, name = %existing.name, "Matched existing customer");
            return Ok(Some(existing.id));
        }
    }

    repository::insert_customer(conn, &incoming)?;
    tracing::debug!(customer_id = %incoming.id, name = %incoming.name, "Created customer");
    Ok(Some(incoming.id))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Copy the reconciled draft onto the stored document. Extracted values only
/// fill or overwrite; an empty extraction never clears a stored field.
fn apply_extraction(
    doc: &mut InvoiceDocument,
    draft: &ExtractedInvoice,
    issuer_id: Option<Uuid>,
    customer_id: Option<Uuid>,
) {
    if !draft.metadata.invoice_number.value.is_empty() {
        doc.invoice_number = Some(draft.metadata.invoice_number.value.clone());
    }
    if let Some(date) = draft.metadata.invoice_date.value {
        doc.invoice_date = Some(date);
    }
    if let Some(date) = draft.metadata.due_date.value {
        doc.due_date = Some(date);
    }
    if !draft.metadata.po_number.value.is_empty() {
        doc.po_number = Some(draft.metadata.po_number.value.clone());
    }

    doc.issuer_id = issuer_id.or(doc.issuer_id);
    doc.customer_id = customer_id.or(doc.customer_id);

    if !draft.financial.currency.value.is_empty() {
        doc.currency = draft.financial.currency.value.clone();
    }
    assign_present(&mut doc.subtotal_amount, &draft.financial.subtotal_amount);
    assign_present(&mut doc.tax_amount, &draft.financial.tax_amount);
    assign_present(&mut doc.tax_rate, &draft.financial.tax_rate);
    assign_present(&mut doc.discount_amount, &draft.financial.discount_amount);
    assign_present(&mut doc.shipping_amount, &draft.financial.shipping_amount);
    assign_present(&mut doc.total_amount, &draft.financial.total_amount);
    if !draft.financial.payment_terms.value.is_empty() {
        doc.payment_terms = Some(draft.financial.payment_terms.value.clone());
    }

    doc.line_items_count = draft.line_items.len() as i64;
    doc.updated_at = Utc::now();
}

fn assign_present(slot: &mut Option<BigDecimal>, value: &Option<BigDecimal>) {
    if value.is_some() {
        *slot = value.clone();
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn elapsed_ms(started: Instant) -> i64 {
    started.elapsed().as_millis() as i64
}

fn outcome_for(doc: &InvoiceDocument, validation: Option<ValidationReport>) -> ProcessingOutcome {
    ProcessingOutcome {
        document_id: doc.id,
        state: doc.state,
        requires_review: doc.requires_review,
        is_duplicate: doc.is_duplicate,
        duplicate_of: doc.duplicate_of,
        extraction_confidence: doc.extraction_confidence,
        line_items_count: doc.line_items_count,
        validation,
    }
}

/// Best-effort failure bookkeeping. A document that cannot be loaded or
/// updated here has nothing left to record against.
fn mark_failed(conn: &Connection, document_id: &Uuid, error: &ProcessingError) {
    let mut doc = match repository::get_invoice(conn, document_id) {
        Ok(Some(doc)) => doc,
        Ok(None) => return,
        Err(e) => {
            tracing::error!(
                document_id = %document_id,
                error = %e,
                "Could not load document for failure bookkeeping"
            );
            return;
        }
    };

    doc.state = ProcessingState::Failed;
    doc.requires_review = true;
    doc.updated_at = Utc::now();
    if let Err(e) = repository::update_invoice(conn, &doc) {
        tracing::error!(document_id = %doc.id, error = %e, "Could not mark document failed");
    }

    let entry = AuditEntry::failure(
        doc.id,
        format!("Processing failed: {error}"),
        error.to_string(),
    );
    if let Err(e) = repository::append_audit_entry(conn, &entry) {
        tracing::error!(document_id = %doc.id, error = %e, "Could not record failure audit entry");
    }

    tracing::error!(document_id = %doc.id, error = %error, "Invoice processing failed");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
