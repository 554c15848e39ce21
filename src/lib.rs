//! Factura: invoice document understanding.
//!
//! Scanned invoices go through upload gating, OCR assembly, text
//! normalization, pattern extraction, financial reconciliation, party
//! resolution, duplicate detection and validation, with every stage
//! recorded in an audit log. All state lives in SQLite. Processing runs
//! through [`pipeline::processor::DocumentProcessor`], either directly or
//! via the bounded [`pipeline::worker::WorkerPool`].

pub mod config;
pub mod db;
pub mod models;
pub mod pipeline;
pub mod validators;

use tracing_subscriber::EnvFilter;

/// Initialize tracing from `RUST_LOG`, falling back to the built-in filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} v{}", config::APP_NAME, config::APP_VERSION);
}
