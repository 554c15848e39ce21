//! Application configuration: ingest limits, validation bounds and
//! confidence policy.
//!
//! `AppConfig::default()` carries the documented defaults. `from_env()`
//! layers `FACTURA_*` environment overrides on top of them for the
//! operational knobs; unset or unparseable variables leave the default
//! untouched. Validation bounds and confidence floors change only through
//! construction.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

/// Application-level constants
pub const APP_NAME: &str = "Factura";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Minimum per-section confidence before validation flags the section
/// for review.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceFloors {
    pub metadata: f64,
    pub issuer: f64,
    pub customer: f64,
    pub financial: f64,
    pub line_items: f64,
}

/// Operational configuration for the processing pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Largest accepted upload in bytes.
    pub max_file_size_bytes: u64,
    /// Lowercase file extensions accepted at ingest.
    pub allowed_extensions: Vec<String>,
    /// Tenant applied when a caller does not supply one.
    pub default_tenant: String,
    /// OCR blocks at or above this confidence count as high-confidence text.
    pub ocr_confidence_threshold: f64,
    /// Documents processed concurrently by the worker pool.
    pub worker_concurrency: usize,
    /// Days of audit history kept by pruning. Default is seven years.
    pub audit_retention_days: i64,
    /// Largest difference tolerated between a stated and a recomputed total
    /// before reconciliation overrides the stated value.
    pub reconcile_tolerance: BigDecimal,
    /// Largest difference tolerated by the arithmetic consistency checks.
    pub validation_tolerance: BigDecimal,
    /// Smallest total accepted without a business-rule violation.
    pub min_total: BigDecimal,
    /// Largest total accepted without a business-rule violation.
    pub max_total: BigDecimal,
    /// Highest plausible tax rate, in percent.
    pub max_tax_rate: BigDecimal,
    /// Most line items accepted on a single document.
    pub max_line_items: usize,
    /// How many days in the future an issue date may lie.
    pub max_future_days: i64,
    /// Per-section confidence floors.
    pub confidence_floors: ConfidenceFloors,
}

// ═══════════════════════════════════════════════════════════
// Defaults
// ═══════════════════════════════════════════════════════════

impl Default for ConfidenceFloors {
    fn default() -> Self {
        Self {
            metadata: 0.6,
            issuer: 0.5,
            customer: 0.4,
            financial: 0.7,
            line_items: 0.5,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: 10 * 1024 * 1024,
            allowed_extensions: vec![
                "pdf".into(),
                "jpg".into(),
                "jpeg".into(),
                "png".into(),
            ],
            default_tenant: "default".into(),
            ocr_confidence_threshold: 0.7,
            worker_concurrency: 4,
            audit_retention_days: 2555,
            reconcile_tolerance: dec("0.01"),
            validation_tolerance: dec("0.02"),
            min_total: dec("0.01"),
            max_total: dec("1000000.00"),
            max_tax_rate: dec("50"),
            max_line_items: 100,
            max_future_days: 30,
            confidence_floors: ConfidenceFloors::default(),
        }
    }
}

fn dec(literal: &str) -> BigDecimal {
    BigDecimal::from_str(literal).unwrap()
}

// ═══════════════════════════════════════════════════════════
// Environment overrides
// ═══════════════════════════════════════════════════════════

impl AppConfig {
    /// Build a config from the defaults plus `FACTURA_*` environment
    /// overrides for the operational knobs.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(v) = env_parse("FACTURA_MAX_FILE_SIZE_BYTES") {
            config.max_file_size_bytes = v;
        }
        if let Some(v) = env_parse("FACTURA_OCR_CONFIDENCE_THRESHOLD") {
            config.ocr_confidence_threshold = v;
        }
        if let Some(v) = env_parse("FACTURA_WORKER_CONCURRENCY") {
            config.worker_concurrency = v;
        }
        if let Some(v) = env_parse("FACTURA_AUDIT_RETENTION_DAYS") {
            config.audit_retention_days = v;
        }
        if let Ok(v) = env::var("FACTURA_DEFAULT_TENANT") {
            if !v.is_empty() {
                config.default_tenant = v;
            }
        }
        if let Ok(v) = env::var("FACTURA_ALLOWED_EXTENSIONS") {
            let extensions: Vec<String> = v
                .split(',')
                .map(|e| e.trim().to_ascii_lowercase())
                .filter(|e| !e.is_empty())
                .collect();
            if !extensions.is_empty() {
                config.allowed_extensions = extensions;
            }
        }
        config
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

// ═══════════════════════════════════════════════════════════
// Paths
// ═══════════════════════════════════════════════════════════

/// Get the application data directory
/// ~/Factura/ on all platforms (user-visible)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join(APP_NAME)
}

/// Get the default on-disk database location
pub fn database_path() -> PathBuf {
    app_data_dir().join("invoices.db")
}

/// Tracing filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "info"
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
