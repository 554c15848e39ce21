use serde::{Deserialize, Serialize};

use super::ExtractionError;
use crate::models::{CustomerDraft, FinancialSummary, InvoiceMetadata, IssuerDraft, LineItem};

/// Axis-aligned region of the source page (for highlighting in review screens)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Raw recognition unit as produced by an OCR engine, confidence in 0.0..=1.0
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrBlock {
    pub text: String,
    pub confidence: f64,
    pub bounding_box: Option<BoundingBox>,
}

/// Recognition unit after thresholding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: String,
    pub confidence: f64,
    pub bounding_box: Option<BoundingBox>,
    pub above_threshold: bool,
}

/// Assembled OCR output for one document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrOutcome {
    pub full_text: String,
    pub high_confidence_text: String,
    pub text_blocks: Vec<TextBlock>,
    pub total_blocks: usize,
    pub high_confidence_blocks: usize,
    pub average_confidence: f64,
    pub overall_confidence: f64,
}

/// Per-section extraction confidence: the mean of the scores contributed by
/// the patterns that matched within the section, 0.0 when nothing matched
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SectionConfidences {
    pub metadata: f64,
    pub issuer: f64,
    pub customer: f64,
    pub financial: f64,
    pub line_items: f64,
}

impl SectionConfidences {
    /// Unweighted mean of the four header sections. The line-item score is
    /// tracked separately for validation floors.
    pub fn overall(&self) -> f64 {
        (self.metadata + self.issuer + self.customer + self.financial) / 4.0
    }
}

/// Structured draft produced by the pattern extraction engine. Values are
/// candidates until reconciliation and validation have run over them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedInvoice {
    pub metadata: InvoiceMetadata,
    pub issuer: IssuerDraft,
    pub customer: CustomerDraft,
    pub financial: FinancialSummary,
    pub line_items: Vec<LineItem>,
    pub confidence: SectionConfidences,
}

/// OCR engine abstraction (allows mocking for tests)
pub trait OcrEngine {
    fn recognize(&self, image_bytes: &[u8]) -> Result<Vec<OcrBlock>, ExtractionError>;
}
