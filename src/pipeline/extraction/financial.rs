//! Financial extraction: currency, labelled amounts, tax rate, and
//! payment terms.

use std::str::FromStr;

use bigdecimal::{BigDecimal, Zero};
use regex::Regex;

use crate::models::{ExtractedField, FinancialSummary};
use crate::pipeline::rules::{Ruleset, TermsStyle};

use super::mean_confidence;

/// Symbols checked before falling back to ISO code words.
const CURRENCY_SYMBOLS: [(char, &str); 5] = [
    ('$', "USD"),
    ('€', "EUR"),
    ('£', "GBP"),
    ('¥', "JPY"),
    ('₹', "INR"),
];

pub fn extract_financial(text: &str, rules: &Ruleset) -> FinancialSummary {
    let mut scores = Vec::new();
    let mut summary = FinancialSummary::default();

    let (currency, confidence) = detect_currency(text, rules);
    summary.currency = ExtractedField::new(currency, confidence);
    scores.push(confidence);

    if let Some(amount) = first_decimal(&rules.subtotal, text) {
        summary.subtotal_amount = Some(amount);
        scores.push(0.9);
    }
    if let Some(amount) = first_decimal(&rules.tax_amount, text) {
        summary.tax_amount = Some(amount);
        scores.push(0.9);
    }
    if let Some(amount) = first_decimal(&rules.total, text) {
        summary.total_amount = Some(amount);
        scores.push(0.9);
    }
    if let Some(amount) = first_decimal(&rules.discount, text) {
        summary.discount_amount = Some(amount);
        scores.push(0.8);
    }
    if let Some(amount) = first_decimal(&rules.shipping, text) {
        summary.shipping_amount = Some(amount);
        scores.push(0.8);
    }

    // A matched rate of 0% carries no information and is left unset.
    if let Some(rate) = first_decimal(&rules.tax_rate, text).filter(|rate| !rate.is_zero()) {
        summary.tax_rate = Some(rate);
        scores.push(0.9);
    }

    if let Some((terms, confidence)) = detect_payment_terms(text, rules) {
        summary.payment_terms = ExtractedField::new(terms, confidence);
        scores.push(confidence);
    }

    summary.confidence = mean_confidence(&scores);
    summary
}

fn detect_currency(text: &str, rules: &Ruleset) -> (String, f64) {
    for (symbol, code) in CURRENCY_SYMBOLS {
        if text.contains(symbol) {
            return (code.to_string(), 0.9);
        }
    }
    if let Some(captures) = rules.currency_code.captures(text) {
        return (captures[1].to_uppercase(), 0.9);
    }
    ("USD".to_string(), 0.3)
}

/// First pattern whose group 1 parses as a decimal, commas stripped.
fn first_decimal(patterns: &[Regex], text: &str) -> Option<BigDecimal> {
    for pattern in patterns {
        if let Some(captures) = pattern.captures(text) {
            if let Some(amount) = parse_decimal(&captures[1]) {
                return Some(amount);
            }
        }
    }
    None
}

fn parse_decimal(raw: &str) -> Option<BigDecimal> {
    let cleaned = raw.replace(',', "");
    BigDecimal::from_str(cleaned.trim_end_matches('.')).ok()
}

fn detect_payment_terms(text: &str, rules: &Ruleset) -> Option<(String, f64)> {
    for terms in &rules.payment_terms {
        let Some(captures) = terms.regex.captures(text) else {
            continue;
        };
        let label = match terms.style {
            TermsStyle::NetDays => format!("Net {}", &captures[1]),
            TermsStyle::DueOnReceipt => "Due on receipt".to_string(),
            TermsStyle::DaysOnly => format!("{} days", &captures[1]),
            TermsStyle::CashOnDelivery => "Cash on delivery".to_string(),
        };
        return Some((label, terms.confidence));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::rules::ruleset;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn labelled_amounts_land_in_their_fields() {
        let text = "Subtotal: $20.00\nTax: $1.60\nTotal: $21.60";
        let summary = extract_financial(text, ruleset());
        assert_eq!(summary.subtotal_amount, Some(dec("20.00")));
        assert_eq!(summary.tax_amount, Some(dec("1.60")));
        assert_eq!(summary.total_amount, Some(dec("21.60")));
        assert_eq!(summary.discount_amount, None);
        assert_eq!(summary.shipping_amount, None);
        assert_eq!(summary.currency.value, "USD");
        // Currency plus three amounts, all at 0.9.
        assert!((summary.confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn subtotal_alone_never_satisfies_the_total_field() {
        let summary = extract_financial("Subtotal: $20.00", ruleset());
        assert_eq!(summary.subtotal_amount, Some(dec("20.00")));
        assert_eq!(summary.total_amount, None);
    }

    #[test]
    fn amount_due_backs_up_the_total_keyword() {
        let summary = extract_financial("Amount Due: $1,234.56", ruleset());
        assert_eq!(summary.total_amount, Some(dec("1234.56")));
    }

    #[test]
    fn currency_code_word_is_uppercased() {
        let summary = extract_financial("amount payable in eur only", ruleset());
        assert_eq!(summary.currency.value, "EUR");
        assert!((summary.currency.confidence - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_markers_default_to_usd_at_low_confidence() {
        let summary = extract_financial("no monetary markers here", ruleset());
        assert_eq!(summary.currency.value, "USD");
        assert!((summary.currency.confidence - 0.3).abs() < f64::EPSILON);
        assert!((summary.confidence - 0.3).abs() < 1e-9);
    }

    #[test]
    fn tax_rate_and_net_terms_are_read_together() {
        let text = "Tax Rate: 8.25%\nPayment Terms: Net 30";
        let summary = extract_financial(text, ruleset());
        assert_eq!(summary.tax_rate, Some(dec("8.25")));
        assert_eq!(summary.payment_terms.value, "Net 30");
        assert!((summary.payment_terms.confidence - 0.9).abs() < f64::EPSILON);
        // Default currency 0.3 plus rate and terms at 0.9 each.
        assert!((summary.confidence - 0.7).abs() < 1e-9);
    }

    #[test]
    fn zero_percent_rate_is_not_recorded() {
        let summary = extract_financial("Tax: 0% applied", ruleset());
        assert_eq!(summary.tax_rate, None);
        // The amount keyword still reads the bare zero.
        assert_eq!(summary.tax_amount, Some(BigDecimal::from(0)));
    }

    #[test]
    fn delivery_terms_normalize_to_one_label() {
        let summary = extract_financial("Terms: COD", ruleset());
        assert_eq!(summary.payment_terms.value, "Cash on delivery");
        assert!((summary.payment_terms.confidence - 0.8).abs() < f64::EPSILON);
    }
}
