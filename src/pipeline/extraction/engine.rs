//! Rule-driven extraction over normalized document text. Each section
//! extractor runs independently; their scores land in `SectionConfidences`.

use crate::pipeline::rules::Ruleset;

use super::customer::extract_customer;
use super::financial::extract_financial;
use super::issuer::extract_issuer;
use super::line_items::extract_line_items;
use super::metadata::extract_metadata;
use super::types::{ExtractedInvoice, SectionConfidences};

pub fn extract_invoice(text: &str, rules: &Ruleset) -> ExtractedInvoice {
    let metadata = extract_metadata(text, rules);
    let issuer = extract_issuer(text, rules);
    let customer = extract_customer(text, rules);
    let financial = extract_financial(text, rules);
    let (line_items, items_confidence) = extract_line_items(text, rules);

    let confidence = SectionConfidences {
        metadata: metadata.confidence,
        issuer: issuer.confidence,
        customer: customer.confidence,
        financial: financial.confidence,
        line_items: items_confidence,
    };

    ExtractedInvoice {
        metadata,
        issuer,
        customer,
        financial,
        line_items,
        confidence,
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    use super::*;
    use crate::pipeline::rules::ruleset;

    const INVOICE: &str = "INVOICE #INV-2024-001\nDate: 01/15/2024\nDue: 02/15/2024\nABC Corp\nBill To: Jane Doe jane@x.com\n2 Widgets 10.00 20.00\nSubtotal: $20.00\nTax: $1.60\nTotal: $21.60";

    fn money(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn full_document_extracts_every_section() {
        let extracted = extract_invoice(INVOICE, ruleset());

        assert_eq!(extracted.metadata.invoice_number.value, "INV-2024-001");
        assert_eq!(
            extracted.metadata.invoice_date.value,
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
        assert_eq!(
            extracted.metadata.due_date.value,
            NaiveDate::from_ymd_opt(2024, 2, 15)
        );

        assert_eq!(extracted.line_items.len(), 1);
        assert_eq!(extracted.line_items[0].quantity, BigDecimal::from(2));
        assert_eq!(extracted.line_items[0].unit_price, money("10.00"));
        assert_eq!(extracted.line_items[0].total_price, money("20.00"));

        assert_eq!(extracted.financial.subtotal_amount, Some(money("20.00")));
        assert_eq!(extracted.financial.tax_amount, Some(money("1.60")));
        assert_eq!(extracted.financial.total_amount, Some(money("21.60")));
        assert_eq!(extracted.financial.currency.value, "USD");

        assert_eq!(extracted.customer.name.value, "Jane Doe jane@x.com");
        assert_eq!(extracted.customer.email.value, "jane@x.com");
    }

    #[test]
    fn section_scores_stay_reviewable_on_a_clean_document() {
        let extracted = extract_invoice(INVOICE, ruleset());
        let confidence = &extracted.confidence;

        assert!(confidence.metadata > 0.6);
        assert!(confidence.issuer > 0.5);
        assert!(confidence.customer > 0.4);
        assert!(confidence.financial > 0.7);
        assert!(confidence.line_items > 0.5);
        assert!(confidence.overall() > 0.8);
    }

    #[test]
    fn empty_text_yields_an_empty_draft() {
        let extracted = extract_invoice("", ruleset());

        assert!(extracted.metadata.invoice_number.value.is_empty());
        assert_eq!(extracted.metadata.invoice_date.value, None);
        assert!(extracted.line_items.is_empty());
        // Currency always falls back, so the financial section keeps a
        // token score while everything else bottoms out.
        assert_eq!(extracted.financial.currency.value, "USD");
        assert_eq!(extracted.confidence.metadata, 0.0);
        assert_eq!(extracted.confidence.line_items, 0.0);
    }
}
