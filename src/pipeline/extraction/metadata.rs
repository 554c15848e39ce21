//! Header-field extraction: invoice number, dates, purchase-order number.

use chrono::NaiveDate;
use regex::Regex;

use crate::models::{ExtractedField, InvoiceMetadata};
use crate::pipeline::rules::{Ruleset, WeightedPattern};

use super::dates::parse_flexible_date;
use super::mean_confidence;

/// Length of the document head scanned when no date keyword matches.
const DATE_FALLBACK_WINDOW: usize = 200;

pub fn extract_metadata(text: &str, rules: &Ruleset) -> InvoiceMetadata {
    let mut scores = Vec::new();
    let mut metadata = InvoiceMetadata::default();

    if let Some((value, confidence)) = first_weighted_capture(&rules.invoice_number, text) {
        metadata.invoice_number = ExtractedField::new(value, confidence);
        scores.push(confidence);
    }

    if let Some(date) = date_near_keyword(text, &rules.invoice_date_keywords, rules) {
        metadata.invoice_date = ExtractedField::new(Some(date), 0.9);
        scores.push(0.9);
    } else if let Some(date) = date_in_document_head(text, rules) {
        metadata.invoice_date = ExtractedField::new(Some(date), 0.6);
        scores.push(0.6);
    }

    if let Some(date) = date_near_keyword(text, &rules.due_date_keywords, rules) {
        metadata.due_date = ExtractedField::new(Some(date), 0.9);
        scores.push(0.9);
    }

    if let Some((value, confidence)) = first_weighted_capture(&rules.po_number, text) {
        metadata.po_number = ExtractedField::new(value, confidence);
        scores.push(confidence);
    }

    metadata.confidence = mean_confidence(&scores);
    metadata
}

fn first_weighted_capture(patterns: &[WeightedPattern], text: &str) -> Option<(String, f64)> {
    patterns.iter().find_map(|p| {
        p.regex
            .captures(text)
            .map(|c| (c[1].trim().to_string(), p.confidence))
    })
}

/// A keyword whose capture window holds no parseable date falls through to
/// the next keyword.
fn date_near_keyword(text: &str, windows: &[Regex], rules: &Ruleset) -> Option<NaiveDate> {
    for window in windows {
        if let Some(captures) = window.captures(text) {
            if let Some(date) = parse_flexible_date(&captures[1], rules) {
                return Some(date);
            }
        }
    }
    None
}

fn date_in_document_head(text: &str, rules: &Ruleset) -> Option<NaiveDate> {
    let head: String = text.chars().take(DATE_FALLBACK_WINDOW).collect();
    parse_flexible_date(&head, rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::rules::ruleset;

    #[test]
    fn keyword_anchored_invoice_number_scores_high() {
        let metadata = extract_metadata("Invoice #INV-2024-001", ruleset());

        assert_eq!(metadata.invoice_number.value, "INV-2024-001");
        assert!((metadata.invoice_number.confidence - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn keyword_dates_score_higher_than_the_head_fallback() {
        let with_keyword = extract_metadata("Date: 01/15/2024", ruleset());
        assert_eq!(
            with_keyword.invoice_date.value,
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
        assert!((with_keyword.invoice_date.confidence - 0.9).abs() < f64::EPSILON);

        let head_only = extract_metadata("Issued 01/15/2024 by accounting", ruleset());
        assert_eq!(
            head_only.invoice_date.value,
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
        assert!((head_only.invoice_date.confidence - 0.6).abs() < f64::EPSILON);
    }

    #[test]
    fn due_date_has_no_fallback() {
        let metadata = extract_metadata("Invoice #A-1\nDue: 02/15/2024", ruleset());
        assert_eq!(
            metadata.due_date.value,
            NaiveDate::from_ymd_opt(2024, 2, 15)
        );

        let without = extract_metadata("02/15/2024", ruleset());
        assert!(without.due_date.value.is_none());
        assert!(without.due_date.confidence.abs() < f64::EPSILON);
    }

    #[test]
    fn purchase_order_keyword_outranks_po_abbreviation() {
        let metadata = extract_metadata("Purchase Order #: 4500012345", ruleset());

        assert_eq!(metadata.po_number.value, "4500012345");
        assert!((metadata.po_number.confidence - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn section_confidence_is_the_mean_of_contributions() {
        let metadata = extract_metadata("Invoice #INV-1\nDate: 01/15/2024", ruleset());

        // invoice number 0.9 and invoice date 0.9
        assert!((metadata.confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn empty_text_yields_an_empty_section() {
        let metadata = extract_metadata("", ruleset());

        assert!(metadata.invoice_number.value.is_empty());
        assert!(metadata.invoice_date.value.is_none());
        assert!(metadata.confidence.abs() < f64::EPSILON);
    }
}
