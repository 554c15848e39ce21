//! OCR outcome assembly.
//!
//! Engines return raw recognition blocks; this module filters and thresholds
//! them into a single [`OcrOutcome`] carrying document-level confidence.

use super::types::{OcrBlock, OcrEngine, OcrOutcome, TextBlock};
use super::ExtractionError;

/// Fold raw engine blocks into the assembled outcome.
///
/// Blocks that are empty after trimming are dropped. The average confidence
/// covers only blocks at or above `threshold`; the overall confidence is that
/// average capped by the fraction of raw blocks that survived the empty
/// filter.
pub fn assemble_outcome(raw_blocks: Vec<OcrBlock>, threshold: f64) -> OcrOutcome {
    let raw_count = raw_blocks.len();

    let mut text_blocks = Vec::new();
    for block in raw_blocks {
        let text = block.text.trim();
        if text.is_empty() {
            continue;
        }
        text_blocks.push(TextBlock {
            text: text.to_string(),
            confidence: block.confidence,
            bounding_box: block.bounding_box,
            above_threshold: block.confidence >= threshold,
        });
    }

    let full_text = text_blocks
        .iter()
        .map(|b| b.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string();

    let high: Vec<&TextBlock> = text_blocks.iter().filter(|b| b.above_threshold).collect();
    let high_confidence_text = high
        .iter()
        .map(|b| b.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string();

    let average_confidence = if high.is_empty() {
        0.0
    } else {
        high.iter().map(|b| b.confidence).sum::<f64>() / high.len() as f64
    };

    let kept_ratio = text_blocks.len() as f64 / raw_count.max(1) as f64;
    let overall_confidence = average_confidence.min(kept_ratio);

    OcrOutcome {
        total_blocks: text_blocks.len(),
        high_confidence_blocks: high.len(),
        full_text,
        high_confidence_text,
        text_blocks,
        average_confidence,
        overall_confidence,
    }
}

/// Canned engine for tests and deployments without a recognition backend.
/// Returns its configured text as a single full-page block.
pub struct MockOcrEngine {
    pub text: String,
    pub confidence: f64,
    pub fail: bool,
}

impl MockOcrEngine {
    pub fn new(text: &str, confidence: f64) -> Self {
        Self {
            text: text.to_string(),
            confidence,
            fail: false,
        }
    }

    /// Engine that fails every call, for exercising the error path.
    pub fn failing() -> Self {
        Self {
            text: String::new(),
            confidence: 0.0,
            fail: true,
        }
    }
}

impl OcrEngine for MockOcrEngine {
    fn recognize(&self, _image_bytes: &[u8]) -> Result<Vec<OcrBlock>, ExtractionError> {
        if self.fail {
            return Err(ExtractionError::OcrProcessing(
                "mock engine configured to fail".to_string(),
            ));
        }
        Ok(vec![OcrBlock {
            text: self.text.clone(),
            confidence: self.confidence,
            bounding_box: None,
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(text: &str, confidence: f64) -> OcrBlock {
        OcrBlock {
            text: text.to_string(),
            confidence,
            bounding_box: None,
        }
    }

    #[test]
    fn drops_blocks_that_are_empty_after_trimming() {
        let outcome = assemble_outcome(
            vec![block("Invoice", 0.9), block("   ", 0.99), block("Total: $5", 0.5)],
            0.7,
        );

        assert_eq!(outcome.total_blocks, 2);
        assert_eq!(outcome.full_text, "Invoice Total: $5");
    }

    #[test]
    fn average_covers_only_blocks_above_threshold() {
        let outcome = assemble_outcome(vec![block("A", 0.8), block("B", 0.6)], 0.7);

        assert_eq!(outcome.high_confidence_blocks, 1);
        assert!((outcome.average_confidence - 0.8).abs() < 1e-9);
        assert_eq!(outcome.high_confidence_text, "A");
    }

    #[test]
    fn overall_confidence_is_capped_by_kept_ratio() {
        let outcome = assemble_outcome(
            vec![block("Invoice", 0.9), block("", 0.9), block("", 0.9)],
            0.7,
        );

        // One of three raw blocks survived, so the 0.9 average is capped.
        assert!((outcome.overall_confidence - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn no_usable_blocks_yields_zeroed_outcome() {
        let outcome = assemble_outcome(vec![block("  ", 0.9)], 0.7);

        assert_eq!(outcome.total_blocks, 0);
        assert!(outcome.full_text.is_empty());
        assert!(outcome.average_confidence.abs() < f64::EPSILON);
        assert!(outcome.overall_confidence.abs() < f64::EPSILON);
    }

    #[test]
    fn all_blocks_below_threshold_average_to_zero() {
        let outcome = assemble_outcome(vec![block("A", 0.2), block("B", 0.3)], 0.7);

        assert_eq!(outcome.high_confidence_blocks, 0);
        assert!(outcome.average_confidence.abs() < f64::EPSILON);
        assert!(outcome.high_confidence_text.is_empty());
    }

    #[test]
    fn mock_engine_returns_configured_text() {
        let engine = MockOcrEngine::new("INVOICE #A-1", 0.92);
        let blocks = engine.recognize(b"image-bytes").unwrap();

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "INVOICE #A-1");
        assert!((blocks[0].confidence - 0.92).abs() < f64::EPSILON);
    }

    #[test]
    fn failing_mock_surfaces_a_processing_error() {
        let engine = MockOcrEngine::failing();
        let err = engine.recognize(b"image-bytes").unwrap_err();

        assert!(matches!(err, ExtractionError::OcrProcessing(_)));
    }
}
