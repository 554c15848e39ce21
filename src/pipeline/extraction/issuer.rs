//! Issuer extraction: the company issuing the document, read from the
//! header lines plus whole-text contact patterns.

use crate::models::{ExtractedField, IssuerDraft};
use crate::pipeline::rules::Ruleset;
use crate::validators;

use super::address::parse_address;
use super::{first_capture, mean_confidence};

pub fn extract_issuer(text: &str, rules: &Ruleset) -> IssuerDraft {
    let mut scores = Vec::new();
    let mut draft = IssuerDraft::default();

    if let Some((name, confidence)) = company_name(text, rules) {
        draft.name = ExtractedField::new(name, confidence);
        scores.push(confidence);
    }

    let address = parse_address(text.lines(), rules);
    if !address.is_empty() {
        if let Some(line1) = address.line1 {
            draft.address_line1 = ExtractedField::new(line1, 0.8);
        }
        if let Some(city) = address.city {
            draft.city = ExtractedField::new(city, 0.8);
        }
        if let Some(state) = address.state {
            draft.state_province = ExtractedField::new(state, 0.8);
        }
        if let Some(postal) = address.postal_code {
            draft.postal_code = ExtractedField::new(postal, 0.8);
        }
        scores.push(0.8);
    }

    if let Some(phone) = formatted_phone(text, rules) {
        draft.phone = ExtractedField::new(phone, 0.8);
        scores.push(0.8);
    }

    if let Some(found) = rules.email.find(text) {
        draft.email = ExtractedField::new(found.as_str().to_string(), 0.9);
        scores.push(0.9);
    }

    if let Some(found) = rules.website.find(text) {
        draft.website = ExtractedField::new(found.as_str().to_string(), 0.8);
        scores.push(0.8);
    }

    // The labelled capture is loose; junk like a lone "12" is discarded.
    if let Some(tax_id) =
        first_capture(&rules.tax_id, text).filter(|id| validators::is_valid_tax_id(id))
    {
        draft.tax_id = ExtractedField::new(tax_id, 0.8);
        scores.push(0.8);
    }

    draft.confidence = mean_confidence(&scores);
    draft
}

/// First plausible name among the five leading lines. Document labels,
/// address lines and contact lines are skipped; confidence decays with
/// distance from the top.
fn company_name(text: &str, rules: &Ruleset) -> Option<(String, f64)> {
    for (index, line) in text.lines().take(5).enumerate() {
        let line = line.trim();
        if line.is_empty()
            || matches!(line.to_lowercase().as_str(), "invoice" | "bill" | "receipt")
        {
            continue;
        }
        if rules.name_skip_street.is_match(line)
            || rules.email.is_match(line)
            || rules.phone.iter().any(|p| p.is_match(line))
        {
            continue;
        }
        if line.chars().count() > 2 && !line.chars().all(|c| c.is_ascii_digit()) {
            let confidence = if index == 0 {
                0.9
            } else {
                (0.7 - index as f64 * 0.1).max(0.3)
            };
            return Some((validators::sanitize_text(line), confidence));
        }
    }
    None
}

/// Phone patterns carry three digit groups; render them in the house style.
fn formatted_phone(text: &str, rules: &Ruleset) -> Option<String> {
    rules.phone.iter().find_map(|pattern| {
        pattern
            .captures(text)
            .map(|c| format!("({}) {}-{}", &c[1], &c[2], &c[3]))
    })
}
