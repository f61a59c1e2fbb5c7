use rust_decimal::Decimal;

use crate::error::InvoiceError;
use crate::model::{InvoiceMeta, InvoiceReport};
use crate::present::Presented;
use crate::reconcile::{verify_presented, Reconciled};

/// Attach addressee and period to reconciled figures and round every
/// amount for presentation. The rounded report is checked again before it
/// is returned, so figures that only add up before rounding are refused.
pub fn assemble(
    meta: &InvoiceMeta,
    reconciled: Reconciled,
    tolerance: Decimal,
) -> Result<InvoiceReport, InvoiceError> {
    if meta.name.trim().is_empty() {
        return Err(InvoiceError::config("invoice name is required"));
    }
    if meta.period.trim().is_empty() {
        return Err(InvoiceError::config("invoice period is required"));
    }

    let report = InvoiceReport {
        name: meta.name.trim().to_string(),
        location: meta.location.trim().to_string(),
        period: meta.period.trim().to_string(),
        restaurants: reconciled.restaurants.iter().map(Presented::presented).collect(),
        totals: reconciled.totals.presented(),
        financials: reconciled.financials.presented(),
    };
    verify_presented(&report, tolerance)?;
    Ok(report)
}
