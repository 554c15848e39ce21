//! Compiled extraction ruleset.
//!
//! Every pattern the extraction engine runs lives here, compiled once per
//! process and shared by reference across concurrent pipeline runs. Candidate
//! lists are ordered most-specific first: extractors take the first hit and
//! score it with the confidence the matching pattern carries.

use std::sync::LazyLock;

use regex::Regex;

// ---------------------------------------------------------------------------
// Pattern kinds
// ---------------------------------------------------------------------------

/// A candidate pattern plus the confidence earned when it is the first match.
pub struct WeightedPattern {
    pub regex: Regex,
    pub confidence: f64,
}

impl WeightedPattern {
    fn new(pattern: &str, confidence: f64) -> Self {
        Self {
            regex: re(pattern),
            confidence,
        }
    }
}

/// How a matched payment-terms pattern is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermsStyle {
    /// "Net {days}"
    NetDays,
    /// "Due on receipt"
    DueOnReceipt,
    /// "{days} days"
    DaysOnly,
    /// "Cash on delivery"
    CashOnDelivery,
}

pub struct TermsPattern {
    pub regex: Regex,
    pub style: TermsStyle,
    pub confidence: f64,
}

impl TermsPattern {
    fn new(pattern: &str, style: TermsStyle, confidence: f64) -> Self {
        Self {
            regex: re(pattern),
            style,
            confidence,
        }
    }
}

// ---------------------------------------------------------------------------
// Ruleset
// ---------------------------------------------------------------------------

/// Immutable bundle of every compiled pattern the extractors consult.
pub struct Ruleset {
    pub invoice_number: Vec<WeightedPattern>,
    pub po_number: Vec<WeightedPattern>,
    /// Date shapes tried in order by the date parser.
    pub date_formats: Vec<Regex>,
    /// Keyword-anchored capture windows for the issue date, strongest first.
    pub invoice_date_keywords: Vec<Regex>,
    pub due_date_keywords: Vec<Regex>,
    pub email: Regex,
    pub phone: Vec<Regex>,
    pub website: Regex,
    pub tax_id: Vec<Regex>,
    /// Short street shape used only to skip address lines during name scans.
    pub name_skip_street: Regex,
    pub street_address: Regex,
    pub city_state_zip: Regex,
    pub postal_code: Regex,
    /// "Bill to" style section captures, body in group 1.
    pub customer_sections: Vec<Regex>,
    pub bill_to_section: Regex,
    pub currency_code: Regex,
    pub subtotal: Vec<Regex>,
    pub tax_amount: Vec<Regex>,
    pub total: Vec<Regex>,
    pub discount: Vec<Regex>,
    pub shipping: Vec<Regex>,
    pub tax_rate: Vec<Regex>,
    pub payment_terms: Vec<TermsPattern>,
    /// Column-header anchored line-item section captures, body in group 1.
    pub line_item_headers: Vec<Regex>,
    /// Shape of a bare item row in either column order, for the fallback scan.
    pub line_item_shape: Regex,
    /// Summary keywords that end the fallback line-item scan.
    pub summary_line: Regex,
    /// Keywords that disqualify a residual line from the low-confidence fallback.
    pub non_item_line: Regex,
    pub line_qty_first: Regex,
    pub line_desc_first: Regex,
}

/// The process-wide ruleset.
pub fn ruleset() -> &'static Ruleset {
    static RULESET: LazyLock<Ruleset> = LazyLock::new(Ruleset::compile);
    &RULESET
}

impl Ruleset {
    fn compile() -> Self {
        Self {
            invoice_number: vec![
                WeightedPattern::new(r"(?i)invoice\s*#?\s*:?\s*([A-Z0-9\-]+)", 0.9),
                WeightedPattern::new(r"(?i)inv\s*#?\s*:?\s*([A-Z0-9\-]+)", 0.7),
                WeightedPattern::new(r"(?i)bill\s*#?\s*:?\s*([A-Z0-9\-]+)", 0.7),
                WeightedPattern::new(r"(?i)receipt\s*#?\s*:?\s*([A-Z0-9\-]+)", 0.7),
                WeightedPattern::new(r"(?i)#\s*([A-Z0-9\-]{3,})", 0.7),
            ],
            po_number: vec![
                WeightedPattern::new(r"(?i)p\.?o\.?\s*#?\s*:?\s*([A-Z0-9\-]+)", 0.7),
                WeightedPattern::new(r"(?i)purchase\s+order\s*#?\s*:?\s*([A-Z0-9\-]+)", 0.8),
                WeightedPattern::new(r"(?i)order\s*#?\s*:?\s*([A-Z0-9\-]+)", 0.7),
            ],
            date_formats: vec![
                re(r"(\d{1,2})[/-](\d{1,2})[/-](\d{2,4})"),
                re(r"(\d{2,4})[/-](\d{1,2})[/-](\d{1,2})"),
                re(r"(?i)(\d{1,2})\s+(Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)\s+(\d{2,4})"),
                re(r"(?i)(Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)\s+(\d{1,2}),?\s+(\d{2,4})"),
            ],
            invoice_date_keywords: keyword_windows(&["invoice date", "date", "dated", "bill date"]),
            due_date_keywords: keyword_windows(&["due date", "due", "payment due", "payable by"]),
            email: re(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[a-zA-Z]{2,}\b"),
            phone: vec![
                re(r"\+?1?[-.\s]?\(?(\d{3})\)?[-.\s]?(\d{3})[-.\s]?(\d{4})"),
                re(r"\+?(\d{1,3})[-.\s]?(\d{3,4})[-.\s]?(\d{3,4})[-.\s]?(\d{3,4})"),
                re(r"(\d{3})[-.\s]?(\d{3})[-.\s]?(\d{4})"),
            ],
            website: re(r"(?:https?://)?(?:www\.)?([a-zA-Z0-9-]+\.)+[a-zA-Z]{2,}(?:/[^\s]*)?"),
            tax_id: vec![
                re(r"(?i)tax\s*id\s*:?\s*([A-Z0-9\-]+)"),
                re(r"(?i)ein\s*:?\s*(\d{2}-\d{7})"),
                re(r"(?i)ssn\s*:?\s*(\d{3}-\d{2}-\d{4})"),
                re(r"(?i)vat\s*:?\s*([A-Z0-9\-]+)"),
            ],
            name_skip_street: re(r"(?i)\d+\s+[A-Za-z\s]+(?:St|Street|Ave|Avenue)"),
            street_address: re(
                r"(?i)(\d+\s+[A-Za-z\s]+(?:St|Street|Ave|Avenue|Rd|Road|Blvd|Boulevard|Dr|Drive|Ln|Lane|Ct|Court|Pl|Place)\.?)",
            ),
            city_state_zip: re(r"(?i)([A-Za-z\s]+),\s*([A-Z]{2})\s+(\d{5}(?:-\d{4})?)"),
            postal_code: re(r"(\d{5}(?:-\d{4})?)"),
            customer_sections: vec![
                re(r"(?is)bill\s+to\s*:?\s*(.*?)(?:\n\n|\n[A-Za-z]|\z)"),
                re(r"(?is)customer\s*:?\s*(.*?)(?:\n\n|\n[A-Za-z]|\z)"),
                re(r"(?is)sold\s+to\s*:?\s*(.*?)(?:\n\n|\n[A-Za-z]|\z)"),
            ],
            bill_to_section: re(r"(?is)bill\s+to\s*:?\s*(.*?)(?:\n\n|\n[A-Za-z]|\z)"),
            currency_code: re(r"(?i)\b(USD|EUR|GBP|JPY|INR|CAD|AUD)\b"),
            subtotal: amount_patterns(&["subtotal", r"sub\s*total"]),
            tax_amount: amount_patterns(&["tax", "vat"]),
            total: amount_patterns(&["total", r"amount\s*due"]),
            discount: amount_patterns(&["discount"]),
            shipping: amount_patterns(&["shipping", "freight"]),
            tax_rate: vec![
                re(r"(?i)tax\s*(?:rate)?\s*:?\s*(\d{1,2}(?:\.\d{1,2})?)%"),
                re(r"(?i)(\d{1,2}(?:\.\d{1,2})?)%\s*tax"),
                re(r"(?i)vat\s*:?\s*(\d{1,2}(?:\.\d{1,2})?)%"),
            ],
            payment_terms: vec![
                TermsPattern::new(r"(?i)\bnet\s+(\d+)", TermsStyle::NetDays, 0.9),
                TermsPattern::new(r"(?i)due\s+on\s+receipt", TermsStyle::DueOnReceipt, 0.9),
                TermsPattern::new(r"(?i)(\d+)\s+days?", TermsStyle::DaysOnly, 0.8),
                TermsPattern::new(r"(?i)cash\s+on\s+delivery", TermsStyle::CashOnDelivery, 0.8),
                TermsPattern::new(r"(?i)\bcod\b", TermsStyle::CashOnDelivery, 0.8),
            ],
            line_item_headers: vec![
                re(r"(?is)(description\s*quantity\s*price\s*amount.*?)(?:\n\s*subtotal|\n\s*tax|\n\s*total|\z)"),
                re(r"(?is)(item\s*qty\s*price\s*total.*?)(?:\n\s*subtotal|\n\s*tax|\n\s*total|\z)"),
                re(r"(?is)(qty\s*description\s*unit\s*price\s*total.*?)(?:\n\s*subtotal|\n\s*tax|\n\s*total|\z)"),
            ],
            line_item_shape: re(
                r"^(?:.+\s+\d+(?:\.\d{1,3})?|\d+(?:\.\d{1,3})?\s+.+)\s+\$?\d+(?:\.\d{2})?\s+\$?\d+(?:\.\d{2})?$",
            ),
            summary_line: re(r"(?i)subtotal|tax|total"),
            non_item_line: re(r"(?i)subtotal|tax|total|shipping|discount"),
            line_qty_first: re(
                r"(?i)(\d+(?:\.\d{1,3})?)\s+([^\d$€£¥₹]+?)\s+\$?(\d+(?:\.\d{2})?)\s+\$?(\d+(?:\.\d{2})?)",
            ),
            line_desc_first: re(
                r"(?i)([^\d$€£¥₹]+?)\s+(\d+(?:\.\d{1,3})?)\s+\$?(\d+(?:\.\d{2})?)\s+\$?(\d+(?:\.\d{2})?)",
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Construction helpers
// ---------------------------------------------------------------------------

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap()
}

/// A case-insensitive keyword followed by a capture window of up to 50
/// characters on the same line.
fn keyword_windows(keywords: &[&str]) -> Vec<Regex> {
    keywords
        .iter()
        .map(|kw| re(&format!(r"(?i){kw}\s*:?\s*(.{{0,50}})")))
        .collect()
}

/// A labelled amount: word-anchored keyword, optional colon, optional
/// currency symbol, thousands-separated number in group 1. The anchor keeps
/// "total" from firing inside "subtotal".
fn amount_patterns(keywords: &[&str]) -> Vec<Regex> {
    keywords
        .iter()
        .map(|kw| re(&format!(r"(?i)\b{kw}\s*:?\s*\$?(\d{{1,3}}(?:,\d{{3}})*\.?\d{{0,2}})")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ruleset_compiles_once() {
        let first = ruleset() as *const Ruleset;
        let second = ruleset() as *const Ruleset;
        assert_eq!(first, second);
    }

    #[test]
    fn invoice_number_prefers_keyword_anchor() {
        let rules = ruleset();
        let hit = rules
            .invoice_number
            .iter()
            .find_map(|p| p.regex.captures("Invoice #INV-2024-001").map(|c| (c, p.confidence)));
        let (captures, confidence) = hit.unwrap();
        assert_eq!(&captures[1], "INV-2024-001");
        assert!((confidence - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn generic_hash_pattern_scores_lower() {
        let rules = ruleset();
        let hit = rules
            .invoice_number
            .iter()
            .find_map(|p| p.regex.captures("# REF-778").map(|c| (c, p.confidence)));
        let (captures, confidence) = hit.unwrap();
        assert_eq!(&captures[1], "REF-778");
        assert!((confidence - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn customer_section_stops_at_blank_line_or_letter_line() {
        let rules = ruleset();
        let text = "Bill To: Jane Doe\n2 Widgets 10.00 20.00\nSubtotal: $20.00";
        let captures = rules.customer_sections[0].captures(text).unwrap();
        assert_eq!(&captures[1], "Jane Doe\n2 Widgets 10.00 20.00");
    }

    #[test]
    fn amount_pattern_accepts_thousands_separators() {
        let rules = ruleset();
        let captures = rules.total[0].captures("Total: $1,234.56").unwrap();
        assert_eq!(&captures[1], "1,234.56");
    }

    #[test]
    fn item_row_shape_accepts_both_column_orders() {
        let rules = ruleset();
        assert!(rules.line_item_shape.is_match("2 Widgets 10.00 20.00"));
        assert!(rules.line_item_shape.is_match("Widgets 2 10.00 20.00"));
        assert!(!rules.line_item_shape.is_match("Thank you for your business"));
    }

    #[test]
    fn cod_only_matches_as_a_word() {
        let rules = ruleset();
        let cod = &rules.payment_terms[4];
        assert!(cod.regex.is_match("Terms: COD"));
        assert!(!cod.regex.is_match("Item code: 7"));
    }

    #[test]
    fn total_keyword_does_not_fire_inside_subtotal() {
        let rules = ruleset();
        let total = &rules.total[0];
        assert!(!total.is_match("Subtotal: $20.00"));
        let caps = total.captures("Total: $21.60").unwrap();
        assert_eq!(&caps[1], "21.60");
    }

    #[test]
    fn net_terms_do_not_fire_inside_internet() {
        let rules = ruleset();
        let net = &rules.payment_terms[0];
        assert!(net.regex.is_match("Payment terms: Net 30"));
        assert!(!net.regex.is_match("Internet 5 included"));
    }
}
