//! Bounded worker pool for background document processing.
//!
//! OCR, extraction and SQLite writes are blocking work, so each job runs on
//! the blocking thread pool with its own database connection. A semaphore
//! caps how many jobs run at once; jobs spawned past the cap queue in FIFO
//! order. Shutdown stops intake and waits for the queue to drain, so no
//! document is left stranded in `processing`.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::db::repository;
use crate::db::sqlite;
use crate::pipeline::extraction::OcrEngine;
use crate::pipeline::processor::{DocumentProcessor, ProcessingError, ProcessingOutcome};

/// Finished jobs between opportunistic audit-log pruning passes.
const PRUNE_EVERY: u64 = 50;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Worker pool is shutting down")]
    ShuttingDown,
    #[error("Worker task aborted: {0}")]
    Join(String),
    #[error(transparent)]
    Processing(#[from] ProcessingError),
}

struct PoolInner {
    database_path: PathBuf,
    processor: DocumentProcessor,
    config: AppConfig,
    permits: Semaphore,
    accepting: AtomicBool,
    finished: AtomicU64,
    concurrency: usize,
}

/// Runs document processing jobs off the async runtime.
///
/// The pool holds no database connection itself; every job opens one
/// against `database_path`, so jobs never contend on a shared handle.
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

impl WorkerPool {
    pub fn new(
        database_path: PathBuf,
        ocr: Box<dyn OcrEngine + Send + Sync>,
        config: AppConfig,
    ) -> Self {
        let concurrency = config.worker_concurrency.max(1);
        tracing::info!(concurrency, "Worker pool started");
        Self {
            inner: Arc::new(PoolInner {
                database_path,
                processor: DocumentProcessor::new(ocr, config.clone()),
                config,
                permits: Semaphore::new(concurrency),
                accepting: AtomicBool::new(true),
                finished: AtomicU64::new(0),
                concurrency,
            }),
        }
    }

    /// Queue a document for processing and return a joinable handle.
    ///
    /// The job waits for a free worker slot before it touches the document,
    /// so callers may spawn more jobs than `worker_concurrency` without
    /// overloading the host.
    pub fn spawn(
        &self,
        document_id: Uuid,
        image_bytes: Vec<u8>,
    ) -> Result<WorkerHandle, WorkerError> {
        if !self.inner.accepting.load(Ordering::SeqCst) {
            return Err(WorkerError::ShuttingDown);
        }
        let inner = self.inner.clone();
        let task = tokio::spawn(async move {
            let _permit = inner
                .permits
                .acquire()
                .await
                .map_err(|_| WorkerError::ShuttingDown)?;
            let worker = inner.clone();
            // Blocking task so OCR and SQLite work stay off the async runtime.
            let outcome =
                tokio::task::spawn_blocking(move || run_one(&worker, document_id, &image_bytes))
                    .await
                    .map_err(|e| WorkerError::Join(e.to_string()))?;
            Ok(outcome?)
        });
        Ok(WorkerHandle { task })
    }

    /// Stop accepting jobs and wait for queued and running jobs to finish.
    ///
    /// The permit queue is fair, so every job spawned before this call
    /// completes before the drain acquires the last slot.
    pub async fn shutdown(&self) {
        self.inner.accepting.store(false, Ordering::SeqCst);
        tracing::info!(slots = self.inner.concurrency, "Worker pool draining");
        let _drain = self
            .inner
            .permits
            .acquire_many(self.inner.concurrency as u32)
            .await;
        tracing::info!(
            finished = self.inner.finished.load(Ordering::SeqCst),
            "Worker pool stopped"
        );
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.inner.accepting.store(false, Ordering::SeqCst);
    }
}

/// Handle to a single queued job.
pub struct WorkerHandle {
    task: JoinHandle<Result<ProcessingOutcome, WorkerError>>,
}

impl WorkerHandle {
    /// Wait for the job and return its outcome.
    pub async fn join(self) -> Result<ProcessingOutcome, WorkerError> {
        self.task
            .await
            .map_err(|e| WorkerError::Join(e.to_string()))?
    }
}

/// One job: open a connection, run the pipeline, occasionally prune the
/// audit log. Pruning failures are logged and never fail the job.
fn run_one(
    inner: &PoolInner,
    document_id: Uuid,
    image_bytes: &[u8],
) -> Result<ProcessingOutcome, ProcessingError> {
    let conn = sqlite::open_database(&inner.database_path)?;
    let result = inner.processor.process(&conn, &document_id, image_bytes);

    let finished = inner.finished.fetch_add(1, Ordering::SeqCst) + 1;
    if finished % PRUNE_EVERY == 0 {
        match repository::prune_audit_log(&conn, inner.config.audit_retention_days) {
            Ok(0) => {}
            Ok(removed) => tracing::info!(removed, "Pruned expired audit entries"),
            Err(e) => tracing::warn!("Audit log pruning failed: {e}"),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProcessingState;
    use crate::pipeline::extraction::MockOcrEngine;
    use crate::pipeline::ingest::{ingest_document, IngestStatus};

    const INVOICE_TEXT: &str = "Vendor Inc\nInvoice #W-100\nSubtotal: $50.00\nTotal: $50.00";

    fn make_pool(dir: &std::path::Path, concurrency: usize) -> WorkerPool {
        let mut config = AppConfig::default();
        config.worker_concurrency = concurrency;
        WorkerPool::new(
            dir.join("factura.db"),
            Box::new(MockOcrEngine::new(INVOICE_TEXT, 0.9)),
            config,
        )
    }

    fn upload(dir: &std::path::Path, filename: &str, bytes: &[u8]) -> Uuid {
        let conn = sqlite::open_database(&dir.join("factura.db")).unwrap();
        let result =
            ingest_document(&conn, "default", filename, bytes, &AppConfig::default()).unwrap();
        assert_eq!(result.status, IngestStatus::Accepted);
        result.document_id.unwrap()
    }

    #[tokio::test]
    async fn pool_processes_a_document_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let document_id = upload(dir.path(), "invoice.png", b"w-100 image bytes");

        let pool = make_pool(dir.path(), 2);
        let handle = pool.spawn(document_id, b"w-100 image bytes".to_vec()).unwrap();
        let outcome = handle.join().await.unwrap();

        assert_eq!(outcome.document_id, document_id);
        assert_eq!(outcome.state, ProcessingState::Completed);
        // No customer and no line items on the document, so review is forced.
        assert!(outcome.requires_review);
        assert!(outcome.validation.unwrap().is_valid);

        let conn = sqlite::open_database(&dir.path().join("factura.db")).unwrap();
        let doc = repository::get_invoice(&conn, &document_id).unwrap().unwrap();
        assert_eq!(doc.state, ProcessingState::Completed);
        assert_eq!(doc.invoice_number.as_deref(), Some("W-100"));
    }

    #[tokio::test]
    async fn concurrent_jobs_share_the_database() {
        let dir = tempfile::tempdir().unwrap();
        let first = upload(dir.path(), "a.png", b"first image");
        let second = upload(dir.path(), "b.png", b"second image");

        let pool = make_pool(dir.path(), 2);
        let handle_a = pool.spawn(first, b"first image".to_vec()).unwrap();
        let handle_b = pool.spawn(second, b"second image".to_vec()).unwrap();

        // Both must finish even when their writes interleave on one file.
        let outcome_a = handle_a.join().await.unwrap();
        let outcome_b = handle_b.join().await.unwrap();
        assert_eq!(outcome_a.state, ProcessingState::Completed);
        assert_eq!(outcome_b.state, ProcessingState::Completed);

        let conn = sqlite::open_database(&dir.path().join("factura.db")).unwrap();
        for id in [first, second] {
            let doc = repository::get_invoice(&conn, &id).unwrap().unwrap();
            assert_eq!(doc.state, ProcessingState::Completed);
        }
    }

    #[tokio::test]
    async fn shutdown_waits_for_active_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let document_id = upload(dir.path(), "invoice.png", b"image bytes");

        let pool = make_pool(dir.path(), 1);
        let handle = pool.spawn(document_id, b"image bytes".to_vec()).unwrap();
        tokio::task::yield_now().await;

        pool.shutdown().await;
        assert!(matches!(
            pool.spawn(document_id, Vec::new()),
            Err(WorkerError::ShuttingDown)
        ));

        // The job spawned before shutdown still ran to completion.
        let outcome = handle.join().await.unwrap();
        assert_eq!(outcome.state, ProcessingState::Completed);
    }

    #[tokio::test]
    async fn zero_concurrency_still_runs_one_worker() {
        let dir = tempfile::tempdir().unwrap();
        let document_id = upload(dir.path(), "invoice.png", b"image bytes");

        let pool = make_pool(dir.path(), 0);
        let outcome = pool
            .spawn(document_id, b"image bytes".to_vec())
            .unwrap()
            .join()
            .await
            .unwrap();
        assert_eq!(outcome.state, ProcessingState::Completed);
    }

    #[tokio::test]
    async fn processing_failures_surface_through_the_handle() {
        let dir = tempfile::tempdir().unwrap();
        let document_id = upload(dir.path(), "invoice.png", b"image bytes");

        let mut config = AppConfig::default();
        config.worker_concurrency = 1;
        let pool = WorkerPool::new(
            dir.path().join("factura.db"),
            Box::new(MockOcrEngine::failing()),
            config,
        );

        let err = pool
            .spawn(document_id, b"image bytes".to_vec())
            .unwrap()
            .join()
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WorkerError::Processing(ProcessingError::Extraction(_))
        ));

        let conn = sqlite::open_database(&dir.path().join("factura.db")).unwrap();
        let doc = repository::get_invoice(&conn, &document_id).unwrap().unwrap();
        assert_eq!(doc.state, ProcessingState::Failed);
    }
}
