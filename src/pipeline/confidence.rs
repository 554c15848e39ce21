use crate::pipeline::extraction::SectionConfidences;

/// Relative weight of each extraction section in the document score
pub mod section_weights {
    /// Invoice number, dates, PO number
    pub const METADATA: f64 = 0.3;

    /// Issuing company block
    pub const ISSUER: f64 = 0.25;

    /// Bill-to block, least costly to get wrong
    pub const CUSTOMER: f64 = 0.15;

    /// Monetary totals
    pub const FINANCIAL: f64 = 0.3;

    /// Added once when at least one line item was recovered
    pub const LINE_ITEM_BONUS: f64 = 0.1;
}

/// Roll the per-section confidences up into the single score persisted on
/// the document.
///
/// Weighted mean over the four header sections; a section whose patterns
/// matched nothing scores 0.0 and pulls the mean down rather than being
/// skipped. Recovering any line item adds a fixed bonus, since a parsed
/// items table is the strongest signal the document really is an invoice.
/// Result is capped at 1.0 and rounded to three decimal places.
pub fn aggregate_confidence(sections: &SectionConfidences, line_item_count: usize) -> f64 {
    let weighted = [
        (sections.metadata, section_weights::METADATA),
        (sections.issuer, section_weights::ISSUER),
        (sections.customer, section_weights::CUSTOMER),
        (sections.financial, section_weights::FINANCIAL),
    ];

    let mut total_confidence = 0.0;
    let mut total_weight = 0.0;
    for (confidence, weight) in weighted {
        total_confidence += confidence * weight;
        total_weight += weight;
    }

    let mut overall = if total_weight > 0.0 {
        total_confidence / total_weight
    } else {
        0.0
    };

    if line_item_count > 0 {
        overall = (overall + section_weights::LINE_ITEM_BONUS).min(1.0);
    }

    round3(overall.clamp(0.0, 1.0))
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
