//! Customer extraction from "bill to" style sections.

use crate::models::{CustomerDraft, ExtractedField};
use crate::pipeline::rules::Ruleset;
use crate::validators;

use super::address::parse_address;
use super::mean_confidence;

pub fn extract_customer(text: &str, rules: &Ruleset) -> CustomerDraft {
    let mut scores = Vec::new();
    let mut draft = CustomerDraft::default();

    for pattern in &rules.customer_sections {
        let Some(captures) = pattern.captures(text) else {
            continue;
        };
        let section = captures[1].trim().to_string();
        let Some(name) = section.lines().map(str::trim).find(|l| !l.is_empty()) else {
            continue;
        };

        // The first non-empty section line is the name, minus control noise.
        draft.name = ExtractedField::new(validators::sanitize_text(name), 0.8);
        scores.push(0.8);

        if let Some(found) = rules.email.find(&section) {
            draft.email = ExtractedField::new(found.as_str().to_string(), 0.9);
        }
        if let Some(found) = rules.phone.iter().find_map(|p| p.find(&section)) {
            // The phone shapes admit a leading separator; drop it.
            draft.phone = ExtractedField::new(found.as_str().trim().to_string(), 0.8);
        }
        break;
    }

    if let Some(captures) = rules.bill_to_section.captures(text) {
        let address = parse_address(captures[1].lines(), rules);
        if !address.is_empty() {
            if let Some(line1) = address.line1 {
                draft.billing_address_line1 = ExtractedField::new(line1, 0.7);
            }
            if let Some(city) = address.city {
                draft.billing_city = ExtractedField::new(city, 0.7);
            }
            if let Some(state) = address.state {
                draft.billing_state_province = ExtractedField::new(state, 0.7);
            }
            if let Some(postal) = address.postal_code {
                draft.billing_postal_code = ExtractedField::new(postal, 0.7);
            }
            scores.push(0.7);
        }
    }

    draft.confidence = mean_confidence(&scores);
    draft
}
