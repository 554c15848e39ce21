//! Financial reconciliation: recompute the document total from its
//! components and derive a missing tax rate. Decimal arithmetic throughout;
//! the comparison tolerance comes from configuration.

use bigdecimal::{BigDecimal, Zero};

use crate::models::{FinancialSummary, ReconciliationFlags};

/// Reconciles `summary` in place and reports which fields were derived.
///
/// The total is overridden with `subtotal + tax + shipping - discount`
/// when it is absent, zero, or further than `tolerance` from that sum.
/// The tax rate is derived from tax and subtotal when missing. Applying
/// this to already-reconciled data changes nothing.
pub fn reconcile(summary: &mut FinancialSummary, tolerance: &BigDecimal) -> ReconciliationFlags {
    let mut flags = ReconciliationFlags::default();

    let subtotal = summary.subtotal_amount.clone().unwrap_or_default();
    let tax = summary.tax_amount.clone().unwrap_or_default();
    let discount = summary.discount_amount.clone().unwrap_or_default();
    let shipping = summary.shipping_amount.clone().unwrap_or_default();

    let calculated_total = &subtotal + &tax + &shipping - &discount;

    let stated = summary.total_amount.clone().unwrap_or_default();
    if stated.is_zero() || (&stated - &calculated_total).abs() > *tolerance {
        summary.total_amount = Some(calculated_total);
        flags.calculated_total = true;
    }

    let rate_missing = summary
        .tax_rate
        .as_ref()
        .map_or(true, |rate| rate.is_zero());
    if rate_missing && subtotal > BigDecimal::zero() && tax > BigDecimal::zero() {
        summary.tax_rate = Some(&tax / &subtotal * BigDecimal::from(100));
        flags.calculated_tax_rate = true;
    }

    flags
}
