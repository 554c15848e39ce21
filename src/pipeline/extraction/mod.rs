pub mod types;
pub mod ocr;
pub mod dates;
pub mod address;
pub mod metadata;
pub mod issuer;
pub mod customer;
pub mod financial;
pub mod line_items;
pub mod engine;

pub use engine::*;
pub use ocr::*;
pub use types::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("OCR processing failed: {0}")]
    OcrProcessing(String),
}

/// Mean of the contributed pattern scores. An empty section scores zero.
pub(crate) fn mean_confidence(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}

/// First pattern whose group 1 matches, trimmed.
pub(crate) fn first_capture(patterns: &[regex::Regex], text: &str) -> Option<String> {
    patterns
        .iter()
        .find_map(|p| p.captures(text).map(|c| c[1].trim().to_string()))
}
