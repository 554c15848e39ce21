//! Business-rule validation of the extracted draft.
//!
//! Checks run in a fixed order and accumulate findings into a
//! [`ValidationReport`] in four severity bands: blocking errors, policy
//! violations, data-quality issues and warnings. Each band deducts a fixed
//! amount from the report score; the review decision follows from the bands
//! and the score. The draft itself is never mutated, so validating the same
//! input twice yields the same report.

use bigdecimal::{BigDecimal, RoundingMode, Zero};
use chrono::{Datelike, Duration, NaiveDate, Utc};

use crate::config::{AppConfig, ConfidenceFloors};
use crate::models::{
    CustomerDraft, FinancialSummary, InvoiceMetadata, IssuerDraft, LineItem, ValidationReport,
};
use crate::pipeline::extraction::{ExtractedInvoice, SectionConfidences};
use crate::validators;

/// Score deduction per blocking error.
const ERROR_DEDUCTION: f64 = 0.20;
/// Score deduction per business-rule violation.
const VIOLATION_DEDUCTION: f64 = 0.15;
/// Score deduction per data-quality issue.
const QUALITY_DEDUCTION: f64 = 0.10;
/// Score deduction per warning.
const WARNING_DEDUCTION: f64 = 0.05;

/// Review is forced when the score lands below this.
const REVIEW_SCORE_FLOOR: f64 = 0.7;

/// Review is forced at this many data-quality issues.
const REVIEW_QUALITY_ISSUE_LIMIT: usize = 3;

/// Currency codes accepted without a warning.
const COMMON_CURRENCIES: [&str; 7] = ["USD", "EUR", "GBP", "CAD", "AUD", "JPY", "INR"];

/// Payment terms beyond this many days draw a warning.
const MAX_PAYMENT_TERMS_DAYS: i64 = 365;

/// Validate an extracted draft against format, consistency and policy rules.
///
/// Intended to run after reconciliation, over the reconciled financial
/// figures. Only errors make the document invalid; violations, a low score
/// or piled-up quality issues force review without invalidating it.
pub fn validate_invoice(draft: &ExtractedInvoice, config: &AppConfig) -> ValidationReport {
    let mut report = ValidationReport::new();
    let today = Utc::now().date_naive();

    // 1. Required fields
    check_required_fields(draft, &mut report);

    // 2. Per-section confidence floors
    check_confidence_floors(&draft.confidence, &config.confidence_floors, &mut report);

    // 3. Header metadata
    check_metadata(&draft.metadata, today, config.max_future_days, &mut report);

    // 4. Parties
    check_issuer(&draft.issuer, &mut report);
    check_customer(&draft.customer, &mut report);

    // 5. Financial figures and their arithmetic
    check_financial(&draft.financial, config, &mut report);

    // 6. Line items
    check_line_items(&draft.line_items, &draft.financial, config, &mut report);
    check_duplicate_line_descriptions(&draft.line_items, &mut report);

    // 7. Payment terms
    check_payment_terms(&draft.financial, &mut report);

    // 8. Score, then the review decision derived from it
    apply_score(&mut report);
    apply_review_policy(&mut report);

    if !report.is_valid || report.requires_review {
        tracing::warn!(
            errors = report.errors.len(),
            violations = report.rule_violations.len(),
            quality_issues = report.quality_issues.len(),
            warnings = report.warnings.len(),
            score = report.confidence_score,
            "Validation flagged problems"
        );
    }

    report
}

// ---------------------------------------------------------------------------
// Required fields and confidence floors
// ---------------------------------------------------------------------------

fn check_required_fields(draft: &ExtractedInvoice, report: &mut ValidationReport) {
    if draft.metadata.invoice_number.value.is_empty() {
        report.push_error("Missing required field: metadata.invoice_number");
    }
    if draft.issuer.name.value.is_empty() {
        report.push_error("Missing required field: issuer.name");
    }
    let total_missing = draft
        .financial
        .total_amount
        .as_ref()
        .map_or(true, |total| total.is_zero());
    if total_missing {
        report.push_error("Missing required field: financial.total_amount");
    }
}

fn check_confidence_floors(
    confidence: &SectionConfidences,
    floors: &ConfidenceFloors,
    report: &mut ValidationReport,
) {
    let sections = [
        ("metadata", confidence.metadata, floors.metadata),
        ("issuer", confidence.issuer, floors.issuer),
        ("customer", confidence.customer, floors.customer),
        ("financial", confidence.financial, floors.financial),
        ("line_items", confidence.line_items, floors.line_items),
    ];

    for (section, score, floor) in sections {
        if score < floor {
            report.push_warning(format!("Low confidence in {section}: {score:.2} < {floor:.2}"));
            report.requires_review = true;
        }
    }
}

// ---------------------------------------------------------------------------
// Header metadata
// ---------------------------------------------------------------------------

fn check_metadata(
    metadata: &InvoiceMetadata,
    today: NaiveDate,
    max_future_days: i64,
    report: &mut ValidationReport,
) {
    let number = &metadata.invoice_number.value;
    if !number.is_empty() {
        if number.chars().count() < 3 {
            report.push_quality_issue("Invoice number appears too short");
        } else if !validators::is_valid_invoice_number(number) {
            report.push_quality_issue("Invoice number contains unusual characters");
        }
    }

    if let Some(invoice_date) = metadata.invoice_date.value {
        if invoice_date > today {
            let days_future = (invoice_date - today).num_days();
            if days_future > max_future_days {
                report.push_violation(format!(
                    "Invoice date is {days_future} days in the future (max: {max_future_days})"
                ));
            }
        }

        let two_years_ago = today
            .with_year(today.year() - 2)
            .unwrap_or_else(|| today - Duration::days(730));
        if invoice_date < two_years_ago {
            report.push_warning("Invoice date is more than 2 years old");
        }
    }

    if let (Some(due_date), Some(invoice_date)) =
        (metadata.due_date.value, metadata.invoice_date.value)
    {
        if due_date < invoice_date {
            report.push_error("Due date cannot be before invoice date");
        }
    }
}

// ---------------------------------------------------------------------------
// Parties
// ---------------------------------------------------------------------------

fn check_issuer(issuer: &IssuerDraft, report: &mut ValidationReport) {
    let name = &issuer.name.value;
    if !name.is_empty() {
        if name.chars().count() < 2 {
            report.push_quality_issue("Issuer name appears too short");
        }
        if is_shouting(name) && name.chars().count() > 10 {
            report.push_warning("Issuer name is all uppercase - possible OCR issue");
        }
    }

    let email = &issuer.email.value;
    if !email.is_empty() && !validators::is_valid_email(email) {
        report.push_quality_issue(format!("Invalid email format: {email}"));
    }

    let phone = &issuer.phone.value;
    if !phone.is_empty() && !validators::is_valid_phone(phone) {
        report.push_quality_issue(format!("Phone number appears invalid: {phone}"));
    }

    let address_parts = [
        &issuer.address_line1.value,
        &issuer.city.value,
        &issuer.postal_code.value,
    ];
    let present = address_parts.iter().filter(|part| !part.is_empty()).count();
    if present > 0 && present < address_parts.len() {
        report.push_quality_issue("Issuer address is incomplete");
    }

    let postal = &issuer.postal_code.value;
    if !postal.is_empty() && !validators::is_valid_postal_code(postal) {
        report.push_quality_issue(format!("Postal code appears invalid: {postal}"));
    }

    let tax_id = &issuer.tax_id.value;
    if !tax_id.is_empty() && !validators::is_valid_tax_id(tax_id) {
        report.push_quality_issue(format!("Tax ID appears invalid: {tax_id}"));
    }
}

fn check_customer(customer: &CustomerDraft, report: &mut ValidationReport) {
    let name = &customer.name.value;
    if !name.is_empty() && name.chars().count() < 2 {
        report.push_quality_issue("Customer name appears too short");
    }

    let email = &customer.email.value;
    if !email.is_empty() && !validators::is_valid_email(email) {
        report.push_quality_issue(format!("Invalid customer email format: {email}"));
    }
}

/// All cased characters uppercase, at least one of them. OCR engines drift
/// into this on low-contrast scans.
fn is_shouting(name: &str) -> bool {
    name.chars().any(|c| c.is_alphabetic()) && !name.chars().any(|c| c.is_lowercase())
}

// ---------------------------------------------------------------------------
// Financial figures
// ---------------------------------------------------------------------------

fn check_financial(financial: &FinancialSummary, config: &AppConfig, report: &mut ValidationReport) {
    let zero = BigDecimal::zero();

    let labelled = [
        ("subtotal_amount", &financial.subtotal_amount),
        ("tax_amount", &financial.tax_amount),
        ("total_amount", &financial.total_amount),
        ("discount_amount", &financial.discount_amount),
        ("shipping_amount", &financial.shipping_amount),
    ];
    for (field, amount) in labelled {
        if let Some(amount) = amount {
            if *amount < zero {
                report.push_error(format!("{field} cannot be negative: {amount}"));
            }
        }
    }

    let total = financial.total_amount.clone().unwrap_or_default();
    if total < config.min_total {
        report.push_violation(format!(
            "Total amount too small: ${} < ${}",
            money(&total),
            money(&config.min_total)
        ));
    }
    if total > config.max_total {
        report.push_violation(format!(
            "Total amount too large: ${} > ${}",
            money(&total),
            money(&config.max_total)
        ));
    }

    let tax_rate = financial.tax_rate.clone().unwrap_or_default();
    if tax_rate > config.max_tax_rate {
        report.push_violation(format!(
            "Tax rate too high: {}% > {}%",
            money(&tax_rate),
            money(&config.max_tax_rate)
        ));
    }
    if tax_rate < zero {
        report.push_error(format!("Tax rate cannot be negative: {}%", money(&tax_rate)));
    }

    check_financial_consistency(financial, &config.validation_tolerance, report);

    let currency = &financial.currency.value;
    if !currency.is_empty() && !COMMON_CURRENCIES.contains(&currency.as_str()) {
        report.push_warning(format!("Unusual currency detected: {currency}"));
    }
}

/// Recompute the total from its components and the tax from the rate; flag
/// figures further than `tolerance` from the stated values.
fn check_financial_consistency(
    financial: &FinancialSummary,
    tolerance: &BigDecimal,
    report: &mut ValidationReport,
) {
    let subtotal = financial.subtotal_amount.clone().unwrap_or_default();
    let tax = financial.tax_amount.clone().unwrap_or_default();
    let discount = financial.discount_amount.clone().unwrap_or_default();
    let shipping = financial.shipping_amount.clone().unwrap_or_default();
    let total = financial.total_amount.clone().unwrap_or_default();

    let calculated_total = &subtotal + &tax + &shipping - &discount;
    if (&total - &calculated_total).abs() > *tolerance {
        report.push_quality_issue(format!(
            "Total amount calculation inconsistent: Expected ${}, Found ${}",
            money(&calculated_total),
            money(&total)
        ));
        report.push_recommendation("Review financial calculations for accuracy");
    }

    if let Some(tax_rate) = financial.tax_rate.as_ref() {
        if *tax_rate > BigDecimal::zero() && subtotal > BigDecimal::zero() {
            let expected_tax = &subtotal * tax_rate / BigDecimal::from(100);
            if (&tax - &expected_tax).abs() > *tolerance {
                report.push_quality_issue(format!(
                    "Tax calculation inconsistent: Expected ${}, Found ${}",
                    money(&expected_tax),
                    money(&tax)
                ));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Line items
// ---------------------------------------------------------------------------

fn check_line_items(
    items: &[LineItem],
    financial: &FinancialSummary,
    config: &AppConfig,
    report: &mut ValidationReport,
) {
    if items.len() > config.max_line_items {
        report.push_violation(format!(
            "Too many line items: {} > {}",
            items.len(),
            config.max_line_items
        ));
    }

    for item in items {
        check_line_item(item, &config.validation_tolerance, report);
    }

    if items.is_empty() {
        return;
    }
    if let Some(subtotal) = financial.subtotal_amount.as_ref() {
        if *subtotal > BigDecimal::zero() {
            let line_total = items
                .iter()
                .fold(BigDecimal::zero(), |acc, item| acc + &item.total_price);
            if (&line_total - subtotal).abs() > config.validation_tolerance {
                report.push_quality_issue(format!(
                    "Line items total (${}) doesn't match invoice subtotal (${})",
                    money(&line_total),
                    money(subtotal)
                ));
            }
        }
    }
}

fn check_line_item(item: &LineItem, tolerance: &BigDecimal, report: &mut ValidationReport) {
    let zero = BigDecimal::zero();
    let line = item.line_number;

    if item.description.trim().is_empty() {
        report.push_quality_issue(format!("Line {line}: Missing description"));
    }

    if item.quantity <= zero {
        report.push_error(format!("Line {line}: Invalid quantity: {}", item.quantity));
    }

    if item.unit_price < zero {
        report.push_error(format!(
            "Line {line}: Negative unit price: ${}",
            money(&item.unit_price)
        ));
    }
    if item.total_price < zero {
        report.push_error(format!(
            "Line {line}: Negative total price: ${}",
            money(&item.total_price)
        ));
    }

    if item.quantity > zero && item.unit_price > zero {
        let expected_total = &item.quantity * &item.unit_price;
        if (&item.total_price - &expected_total).abs() > *tolerance {
            report.push_quality_issue(format!(
                "Line {line}: Price calculation inconsistent: Expected ${}, Found ${}",
                money(&expected_total),
                money(&item.total_price)
            ));
        }
    }
}

fn check_duplicate_line_descriptions(items: &[LineItem], report: &mut ValidationReport) {
    let mut seen = std::collections::HashSet::new();
    for item in items {
        let description = item.description.trim().to_lowercase();
        if description.is_empty() {
            continue;
        }
        if !seen.insert(description.clone()) {
            report.push_warning(format!("Possible duplicate line item: {description}"));
        }
    }
}

// ---------------------------------------------------------------------------
// Payment terms
// ---------------------------------------------------------------------------

fn check_payment_terms(financial: &FinancialSummary, report: &mut ValidationReport) {
    let terms = &financial.payment_terms.value;
    if terms.is_empty() {
        return;
    }
    if let Some(days) = first_number(terms) {
        if days > MAX_PAYMENT_TERMS_DAYS {
            report.push_warning(format!("Unusual payment terms: {terms}"));
        }
    }
}

/// First run of ascii digits in `text`, parsed.
fn first_number(text: &str) -> Option<i64> {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

// ---------------------------------------------------------------------------
// Scoring and review policy
// ---------------------------------------------------------------------------

fn apply_score(report: &mut ValidationReport) {
    let mut score = 1.0;
    score -= report.errors.len() as f64 * ERROR_DEDUCTION;
    score -= report.rule_violations.len() as f64 * VIOLATION_DEDUCTION;
    score -= report.quality_issues.len() as f64 * QUALITY_DEDUCTION;
    score -= report.warnings.len() as f64 * WARNING_DEDUCTION;
    report.confidence_score = score.clamp(0.0, 1.0);
}

/// Derive the review decision from the accumulated findings. Review is only
/// ever switched on here; a floor warning that already requested it stands.
fn apply_review_policy(report: &mut ValidationReport) {
    if !report.errors.is_empty() || !report.rule_violations.is_empty() {
        report.requires_review = true;
        report.push_recommendation("Manual review required due to validation errors");
    }

    if report.confidence_score < REVIEW_SCORE_FLOOR {
        report.requires_review = true;
        report.push_recommendation("Manual review recommended due to low confidence score");
    }

    if report.quality_issues.len() >= REVIEW_QUALITY_ISSUE_LIMIT {
        report.requires_review = true;
        report.push_recommendation("Manual review recommended due to data quality concerns");
    }

    if !report.requires_review {
        report.push_recommendation("Invoice data appears valid and ready for processing");
    }
}

/// Render an amount with two decimal places for report messages.
fn money(amount: &BigDecimal) -> String {
    amount.with_scale_round(2, RoundingMode::HalfUp).to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::models::ExtractedField;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    /// A draft that passes every check: consistent figures, plausible dates,
    /// section confidences above the default floors.
    fn make_clean_draft() -> ExtractedInvoice {
        let today = Utc::now().date_naive();
        let mut draft = ExtractedInvoice::default();

        draft.metadata.invoice_number = ExtractedField::new("INV-2024-001".into(), 0.9);
        draft.metadata.invoice_date = ExtractedField::new(Some(today - Duration::days(10)), 0.9);
        draft.metadata.due_date = ExtractedField::new(Some(today + Duration::days(20)), 0.9);

        draft.issuer.name = ExtractedField::new("Acme Corp".into(), 0.9);
        draft.issuer.email = ExtractedField::new("billing@acme.example".into(), 0.9);
        draft.customer.name = ExtractedField::new("Jane Doe".into(), 0.8);

        draft.financial.currency = ExtractedField::new("USD".into(), 0.9);
        draft.financial.subtotal_amount = Some(dec("20.00"));
        draft.financial.tax_amount = Some(dec("1.60"));
        draft.financial.tax_rate = Some(dec("8"));
        draft.financial.total_amount = Some(dec("21.60"));

        draft.line_items = vec![LineItem {
            line_number: 1,
            description: "Widget".into(),
            quantity: dec("2"),
            unit_price: dec("10.00"),
            total_price: dec("20.00"),
            confidence: 0.8,
            ..LineItem::default()
        }];

        draft.confidence = SectionConfidences {
            metadata: 0.9,
            issuer: 0.8,
            customer: 0.7,
            financial: 0.9,
            line_items: 0.8,
        };
        draft
    }

    fn has(messages: &[String], needle: &str) -> bool {
        messages.iter().any(|m| m.contains(needle))
    }

    // ── Clean pass ─────────────────────────────────────────────────────────

    #[test]
    fn clean_draft_passes_without_review() {
        let report = validate_invoice(&make_clean_draft(), &AppConfig::default());

        assert!(report.is_valid);
        assert!(!report.requires_review);
        assert!((report.confidence_score - 1.0).abs() < f64::EPSILON);
        assert!(has(&report.recommendations, "ready for processing"));
    }

    #[test]
    fn validation_is_deterministic() {
        let draft = make_clean_draft();
        let config = AppConfig::default();
        let first = validate_invoice(&draft, &config);
        let second = validate_invoice(&draft, &config);
        assert_eq!(
            serde_json::to_value(&first).unwrap(),
            serde_json::to_value(&second).unwrap()
        );
    }

    // ── Required fields and floors ─────────────────────────────────────────

    #[test]
    fn empty_draft_reports_all_required_fields() {
        let report = validate_invoice(&ExtractedInvoice::default(), &AppConfig::default());

        assert!(!report.is_valid);
        assert!(report.requires_review);
        assert_eq!(report.errors.len(), 3);
        assert!(has(&report.errors, "metadata.invoice_number"));
        assert!(has(&report.errors, "issuer.name"));
        assert!(has(&report.errors, "financial.total_amount"));
        // Three errors, the too-small violation and five floor warnings
        // exhaust the score.
        assert!(report.confidence_score.abs() < 1e-9);
    }

    #[test]
    fn zero_total_counts_as_missing() {
        let mut draft = make_clean_draft();
        draft.financial.total_amount = Some(dec("0"));
        let report = validate_invoice(&draft, &AppConfig::default());
        assert!(has(&report.errors, "financial.total_amount"));
    }

    #[test]
    fn section_below_floor_warns_and_forces_review() {
        let mut draft = make_clean_draft();
        draft.confidence.financial = 0.5;
        let report = validate_invoice(&draft, &AppConfig::default());

        assert!(report.is_valid);
        assert!(report.requires_review);
        assert!(has(&report.warnings, "Low confidence in financial: 0.50 < 0.70"));
    }

    // ── Metadata ───────────────────────────────────────────────────────────

    #[test]
    fn due_date_before_invoice_date_blocks() {
        let today = Utc::now().date_naive();
        let mut draft = make_clean_draft();
        draft.metadata.due_date = ExtractedField::new(Some(today - Duration::days(15)), 0.9);
        let report = validate_invoice(&draft, &AppConfig::default());

        assert!(!report.is_valid);
        assert!(report.requires_review);
        assert!(has(&report.errors, "Due date cannot be before invoice date"));
    }

    #[test]
    fn far_future_invoice_date_violates_policy() {
        let today = Utc::now().date_naive();
        let mut draft = make_clean_draft();
        draft.metadata.invoice_date = ExtractedField::new(Some(today + Duration::days(60)), 0.9);
        draft.metadata.due_date = ExtractedField::new(Some(today + Duration::days(90)), 0.9);
        let report = validate_invoice(&draft, &AppConfig::default());

        assert!(report.is_valid, "violations never invalidate");
        assert!(report.requires_review);
        assert!(has(&report.rule_violations, "Invoice date is 60 days in the future (max: 30)"));
    }

    #[test]
    fn stale_invoice_date_warns() {
        let today = Utc::now().date_naive();
        let mut draft = make_clean_draft();
        draft.metadata.invoice_date = ExtractedField::new(Some(today - Duration::days(800)), 0.9);
        draft.metadata.due_date = ExtractedField::new(Some(today - Duration::days(770)), 0.9);
        let report = validate_invoice(&draft, &AppConfig::default());

        assert!(has(&report.warnings, "more than 2 years old"));
    }

    #[test]
    fn odd_invoice_numbers_are_quality_issues() {
        let mut draft = make_clean_draft();
        draft.metadata.invoice_number = ExtractedField::new("IN".into(), 0.9);
        let report = validate_invoice(&draft, &AppConfig::default());
        assert!(has(&report.quality_issues, "Invoice number appears too short"));

        draft.metadata.invoice_number = ExtractedField::new("INV#12".into(), 0.9);
        let report = validate_invoice(&draft, &AppConfig::default());
        assert!(has(&report.quality_issues, "Invoice number contains unusual characters"));
    }

    // ── Parties ────────────────────────────────────────────────────────────

    #[test]
    fn uppercase_issuer_name_warns() {
        let mut draft = make_clean_draft();
        draft.issuer.name = ExtractedField::new("ACME INDUSTRIAL SUPPLY".into(), 0.9);
        let report = validate_invoice(&draft, &AppConfig::default());
        assert!(has(&report.warnings, "all uppercase"));
    }

    #[test]
    fn invalid_emails_are_quality_issues() {
        let mut draft = make_clean_draft();
        draft.issuer.email = ExtractedField::new("not-an-email".into(), 0.9);
        draft.customer.email = ExtractedField::new("missing@tld".into(), 0.8);
        let report = validate_invoice(&draft, &AppConfig::default());

        assert!(has(&report.quality_issues, "Invalid email format: not-an-email"));
        assert!(has(&report.quality_issues, "Invalid customer email format: missing@tld"));
    }

    #[test]
    fn partial_issuer_address_is_flagged() {
        let mut draft = make_clean_draft();
        draft.issuer.address_line1 = ExtractedField::new("100 Main Street".into(), 0.8);
        draft.issuer.city = ExtractedField::new("Springfield".into(), 0.8);
        let report = validate_invoice(&draft, &AppConfig::default());
        assert!(has(&report.quality_issues, "Issuer address is incomplete"));
    }

    #[test]
    fn implausible_phone_is_flagged() {
        let mut draft = make_clean_draft();
        draft.issuer.phone = ExtractedField::new("12345".into(), 0.8);
        let report = validate_invoice(&draft, &AppConfig::default());
        assert!(has(&report.quality_issues, "Phone number appears invalid: 12345"));
    }

    #[test]
    fn malformed_postal_code_is_flagged() {
        let mut draft = make_clean_draft();
        draft.issuer.address_line1 = ExtractedField::new("100 Main St".into(), 0.8);
        draft.issuer.city = ExtractedField::new("Springfield".into(), 0.8);
        draft.issuer.postal_code = ExtractedField::new("zz".into(), 0.8);
        let report = validate_invoice(&draft, &AppConfig::default());
        assert!(has(&report.quality_issues, "Postal code appears invalid: zz"));
    }

    #[test]
    fn malformed_tax_id_is_flagged() {
        let mut draft = make_clean_draft();
        draft.issuer.tax_id = ExtractedField::new("1!".into(), 0.8);
        let report = validate_invoice(&draft, &AppConfig::default());
        assert!(has(&report.quality_issues, "Tax ID appears invalid: 1!"));
    }

    // ── Financial figures ──────────────────────────────────────────────────

    #[test]
    fn oversized_total_flags_review_without_blocking() {
        let mut draft = make_clean_draft();
        draft.financial.subtotal_amount = Some(dec("2000000.00"));
        draft.financial.tax_amount = None;
        draft.financial.tax_rate = None;
        draft.financial.total_amount = Some(dec("2000000.00"));
        draft.line_items.clear();
        let report = validate_invoice(&draft, &AppConfig::default());

        assert!(report.is_valid);
        assert!(report.requires_review);
        assert!(has(
            &report.rule_violations,
            "Total amount too large: $2000000.00 > $1000000.00"
        ));
        assert!(has(&report.recommendations, "Manual review required due to validation errors"));
    }

    #[test]
    fn negative_amounts_block() {
        let mut draft = make_clean_draft();
        draft.financial.subtotal_amount = Some(dec("-5.00"));
        let report = validate_invoice(&draft, &AppConfig::default());

        assert!(!report.is_valid);
        assert!(has(&report.errors, "subtotal_amount cannot be negative: -5.00"));
    }

    #[test]
    fn excessive_tax_rate_violates_policy() {
        let mut draft = make_clean_draft();
        draft.financial.tax_rate = Some(dec("55"));
        let report = validate_invoice(&draft, &AppConfig::default());

        assert!(report.is_valid);
        assert!(has(&report.rule_violations, "Tax rate too high: 55.00% > 50.00%"));
    }

    #[test]
    fn inconsistent_total_is_a_quality_issue() {
        let mut draft = make_clean_draft();
        draft.financial.total_amount = Some(dec("25.00"));
        let report = validate_invoice(&draft, &AppConfig::default());

        assert!(report.is_valid);
        assert!(has(
            &report.quality_issues,
            "Total amount calculation inconsistent: Expected $21.60, Found $25.00"
        ));
        assert!(has(&report.recommendations, "Review financial calculations for accuracy"));
    }

    #[test]
    fn inconsistent_tax_is_a_quality_issue() {
        let mut draft = make_clean_draft();
        // 8% of 20.00 is 1.60, stated tax says otherwise
        draft.financial.tax_amount = Some(dec("3.00"));
        draft.financial.total_amount = Some(dec("23.00"));
        let report = validate_invoice(&draft, &AppConfig::default());

        assert!(has(
            &report.quality_issues,
            "Tax calculation inconsistent: Expected $1.60, Found $3.00"
        ));
    }

    #[test]
    fn unusual_currency_warns() {
        let mut draft = make_clean_draft();
        draft.financial.currency = ExtractedField::new("XTS".into(), 0.9);
        let report = validate_invoice(&draft, &AppConfig::default());
        assert!(has(&report.warnings, "Unusual currency detected: XTS"));
    }

    // ── Line items ─────────────────────────────────────────────────────────

    #[test]
    fn zero_quantity_blocks() {
        let mut draft = make_clean_draft();
        draft.line_items[0].quantity = dec("0");
        let report = validate_invoice(&draft, &AppConfig::default());

        assert!(!report.is_valid);
        assert!(has(&report.errors, "Line 1: Invalid quantity: 0"));
    }

    #[test]
    fn line_price_mismatch_is_quality_only() {
        let mut draft = make_clean_draft();
        draft.line_items[0].total_price = dec("25.00");
        let report = validate_invoice(&draft, &AppConfig::default());

        assert!(report.is_valid);
        assert!(has(
            &report.quality_issues,
            "Line 1: Price calculation inconsistent: Expected $20.00, Found $25.00"
        ));
        // The line sum now also disagrees with the subtotal.
        assert!(has(&report.quality_issues, "Line items total ($25.00)"));
        assert!(!report.requires_review, "two quality issues stay below the review limit");
    }

    #[test]
    fn too_many_line_items_violates_policy() {
        let mut config = AppConfig::default();
        config.max_line_items = 2;
        let mut draft = make_clean_draft();
        let item = draft.line_items[0].clone();
        for n in 2..=3 {
            let mut extra = item.clone();
            extra.line_number = n;
            extra.description = format!("Widget {n}");
            draft.line_items.push(extra);
        }
        draft.financial.subtotal_amount = Some(dec("60.00"));
        draft.financial.tax_amount = Some(dec("4.80"));
        draft.financial.total_amount = Some(dec("64.80"));

        let report = validate_invoice(&draft, &config);
        assert!(has(&report.rule_violations, "Too many line items: 3 > 2"));
    }

    #[test]
    fn repeated_descriptions_warn() {
        let mut draft = make_clean_draft();
        let mut second = draft.line_items[0].clone();
        second.line_number = 2;
        draft.line_items.push(second);
        draft.financial.subtotal_amount = Some(dec("40.00"));
        draft.financial.tax_amount = Some(dec("3.20"));
        draft.financial.total_amount = Some(dec("43.20"));

        let report = validate_invoice(&draft, &AppConfig::default());
        assert!(has(&report.warnings, "Possible duplicate line item: widget"));
    }

    // ── Payment terms and review policy ────────────────────────────────────

    #[test]
    fn payment_terms_over_a_year_warn() {
        let mut draft = make_clean_draft();
        draft.financial.payment_terms = ExtractedField::new("Net 400".into(), 0.8);
        let report = validate_invoice(&draft, &AppConfig::default());
        assert!(has(&report.warnings, "Unusual payment terms: Net 400"));

        draft.financial.payment_terms = ExtractedField::new("Net 30".into(), 0.8);
        let report = validate_invoice(&draft, &AppConfig::default());
        assert!(!has(&report.warnings, "Unusual payment terms"));
    }

    #[test]
    fn piled_up_quality_issues_force_review() {
        let mut draft = make_clean_draft();
        draft.metadata.invoice_number = ExtractedField::new("IN".into(), 0.9);
        draft.issuer.name = ExtractedField::new("B".into(), 0.9);
        draft.customer.name = ExtractedField::new("C".into(), 0.8);
        let report = validate_invoice(&draft, &AppConfig::default());

        assert!(report.is_valid);
        assert!(report.requires_review);
        assert_eq!(report.quality_issues.len(), 3);
        assert!(has(&report.recommendations, "data quality concerns"));
    }

    #[test]
    fn score_stays_in_unit_range() {
        let report = validate_invoice(&ExtractedInvoice::default(), &AppConfig::default());
        assert!(report.confidence_score >= 0.0);
        assert!(report.confidence_score <= 1.0);

        let report = validate_invoice(&make_clean_draft(), &AppConfig::default());
        assert!(report.confidence_score >= 0.0);
        assert!(report.confidence_score <= 1.0);
    }
}
