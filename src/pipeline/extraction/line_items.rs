//! Line-item extraction: header-anchored section capture with a shape-scan
//! fallback, then per-row parsing.

use std::str::FromStr;

use bigdecimal::{BigDecimal, Zero};
use regex::Captures;

use crate::models::LineItem;
use crate::pipeline::rules::Ruleset;

use super::mean_confidence;

/// Returns the parsed items plus their mean confidence. Row numbers are
/// dense over kept items; dropped rows do not consume a number.
pub fn extract_line_items(text: &str, rules: &Ruleset) -> (Vec<LineItem>, f64) {
    let mut items: Vec<LineItem> = Vec::new();

    for line in items_section(text, rules).lines() {
        if line.trim().is_empty() {
            continue;
        }
        let Some(mut item) = parse_line_item(line, items.len() as i64 + 1, rules) else {
            continue;
        };
        if item.description.is_empty() {
            continue;
        }
        if item.total_price.is_zero() && !item.quantity.is_zero() && !item.unit_price.is_zero() {
            item.total_price = (&item.quantity * &item.unit_price).round(2);
        }
        items.push(item);
    }

    let scores: Vec<f64> = items.iter().map(|item| item.confidence).collect();
    let confidence = mean_confidence(&scores);
    (items, confidence)
}

/// The region of text holding item rows. Column headers win; otherwise a
/// scan collects from the first row-shaped line to the first blank or
/// summary line.
fn items_section(text: &str, rules: &Ruleset) -> String {
    for pattern in &rules.line_item_headers {
        if let Some(captures) = pattern.captures(text) {
            return captures[1].to_string();
        }
    }

    let mut collected = Vec::new();
    let mut in_items = false;
    for line in text.lines() {
        let line = line.trim();
        if rules.line_item_shape.is_match(line) {
            in_items = true;
            collected.push(line);
        } else if in_items && (line.is_empty() || rules.summary_line.is_match(line)) {
            break;
        } else if in_items {
            collected.push(line);
        }
    }
    collected.join("\n")
}

/// One row in either column order at 0.8, or a bare description at 0.3
/// when the row carries no recognizable numbers.
fn parse_line_item(line: &str, line_number: i64, rules: &Ruleset) -> Option<LineItem> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if let Some(captures) = rules.line_qty_first.captures(line) {
        if let Some(item) = qty_first_item(&captures, line_number) {
            return Some(item);
        }
    }
    if let Some(captures) = rules.line_desc_first.captures(line) {
        if let Some(item) = desc_first_item(&captures, line_number) {
            return Some(item);
        }
    }

    if !rules.non_item_line.is_match(line) {
        return Some(LineItem {
            line_number,
            description: line.to_string(),
            confidence: 0.3,
            ..LineItem::default()
        });
    }
    None
}

fn qty_first_item(captures: &Captures<'_>, line_number: i64) -> Option<LineItem> {
    Some(LineItem {
        line_number,
        quantity: dec(&captures[1])?,
        description: captures[2].trim().to_string(),
        unit_price: dec(&captures[3])?,
        total_price: dec(&captures[4])?,
        confidence: 0.8,
        ..LineItem::default()
    })
}

fn desc_first_item(captures: &Captures<'_>, line_number: i64) -> Option<LineItem> {
    Some(LineItem {
        line_number,
        description: captures[1].trim().to_string(),
        quantity: dec(&captures[2])?,
        unit_price: dec(&captures[3])?,
        total_price: dec(&captures[4])?,
        confidence: 0.8,
        ..LineItem::default()
    })
}

fn dec(raw: &str) -> Option<BigDecimal> {
    BigDecimal::from_str(raw).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::rules::ruleset;

    fn money(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn quantity_first_row_is_found_by_the_shape_scan() {
        let text = "2 Widgets 10.00 20.00\nSubtotal: $20.00\nTax: $1.60\nTotal: $21.60";
        let (items, confidence) = extract_line_items(text, ruleset());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].line_number, 1);
        assert_eq!(items[0].description, "Widgets");
        assert_eq!(items[0].quantity, BigDecimal::from(2));
        assert_eq!(items[0].unit_price, money("10.00"));
        assert_eq!(items[0].total_price, money("20.00"));
        assert!((items[0].confidence - 0.8).abs() < f64::EPSILON);
        assert!((confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn column_headers_anchor_the_section() {
        let text = "Description Quantity Price Amount\n\
                    Widgets 2 10.00 20.00\n\
                    Gadgets 1 5.00 5.00\n\
                    Subtotal: $25.00";
        let (items, confidence) = extract_line_items(text, ruleset());
        assert_eq!(items.len(), 3);
        // The header row itself parses as a bare-description item.
        assert_eq!(items[0].description, "Description Quantity Price Amount");
        assert!((items[0].confidence - 0.3).abs() < f64::EPSILON);
        assert_eq!(items[1].description, "Widgets");
        assert_eq!(items[1].quantity, BigDecimal::from(2));
        assert_eq!(items[2].line_number, 3);
        assert!((confidence - 1.9 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn zero_total_is_recomputed_from_quantity_and_unit_price() {
        let (items, _) = extract_line_items("Widgets 2 10.00 0", ruleset());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].total_price, money("20.00"));
    }

    #[test]
    fn residual_lines_between_rows_become_bare_descriptions() {
        let text = "2 Widgets 10.00 20.00\n\
                    special order notes\n\
                    1 Gadget 5.00 5.00\n\
                    \n\
                    Total: $25.00";
        let (items, _) = extract_line_items(text, ruleset());
        assert_eq!(items.len(), 3);
        assert_eq!(items[1].description, "special order notes");
        assert!((items[1].confidence - 0.3).abs() < f64::EPSILON);
        assert_eq!(items[2].line_number, 3);
    }

    #[test]
    fn unstructured_row_survives_as_a_low_confidence_item() {
        let text = "Description Quantity Price Amount\n\
                    Consulting services 500\n\
                    Subtotal: $500.00";
        let (items, _) = extract_line_items(text, ruleset());
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].description, "Consulting services 500");
        assert_eq!(items[1].quantity, BigDecimal::from(1));
        assert!(items[1].unit_price.is_zero());
        assert!(items[1].total_price.is_zero());
        assert!((items[1].confidence - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn currency_marks_and_fractional_quantities_parse() {
        let (items, _) = extract_line_items("1.5 Hours $100.00 $150.00", ruleset());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, money("1.5"));
        assert_eq!(items[0].unit_price, money("100.00"));
        assert_eq!(items[0].total_price, money("150.00"));
    }

    #[test]
    fn summary_only_text_yields_no_items() {
        let (items, confidence) = extract_line_items("Subtotal: $20.00\nTotal: $21.60", ruleset());
        assert!(items.is_empty());
        assert_eq!(confidence, 0.0);
    }
}
