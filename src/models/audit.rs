use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{AuditSeverity, AuditStage};

/// One immutable record of a pipeline stage outcome. Entries are append-only;
/// `seq` is assigned by the store and orders a document's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub seq: i64,
    pub document_id: Uuid,
    pub stage: AuditStage,
    pub severity: AuditSeverity,
    pub message: String,
    pub elapsed_ms: Option<i64>,
    pub confidence: Option<f64>,
    pub error_code: Option<String>,
    pub detail: Option<String>,
    pub metadata: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(document_id: Uuid, stage: AuditStage, message: impl Into<String>) -> Self {
        Self {
            seq: 0,
            document_id,
            stage,
            severity: AuditSeverity::Info,
            message: message.into(),
            elapsed_ms: None,
            confidence: None,
            error_code: None,
            detail: None,
            metadata: None,
            created_at: Utc::now(),
        }
    }

    /// ERROR-severity entry recording why processing failed.
    pub fn failure(document_id: Uuid, message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: AuditSeverity::Error,
            error_code: Some("PROCESSING_FAILED".to_string()),
            detail: Some(detail.into()),
            ..Self::new(document_id, AuditStage::Error, message)
        }
    }

    pub fn with_severity(mut self, severity: AuditSeverity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_elapsed_ms(mut self, elapsed_ms: i64) -> Self {
        self.elapsed_ms = Some(elapsed_ms);
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Structured stage payload, stored as a JSON string.
    pub fn with_metadata(mut self, metadata: String) -> Self {
        self.metadata = Some(metadata);
        self
    }
}
