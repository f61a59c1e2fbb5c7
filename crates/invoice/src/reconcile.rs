//! Restaurant and invoice rollups, the aggregator fee, and the accounting
//! identity checks that gate report production.
//!
//! Every check compares two independent derivations of the same figure.
//! A disagreement is a defect in this crate, not in the data, so it is
//! returned as [`InvoiceError::Reconciliation`] and the run stops.

use rust_decimal::Decimal;

use crate::error::InvoiceError;
use crate::fee::FeeSchedule;
use crate::grouping::GroupingIndex;
use crate::model::{FinancialTotals, InvoiceReport, LedgerTotals, PlatformSummary, RestaurantSummary};

/// Unrounded output of reconciliation, ready for assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub restaurants: Vec<RestaurantSummary>,
    pub totals: LedgerTotals,
    pub financials: FinancialTotals,
}

/// Build restaurant summaries from per-group summaries and verify them
/// against the raw transactions held by `index`, then roll up.
///
/// `summaries[i]` must be the platform summaries of `index.restaurants[i]`,
/// in the same order, as produced by [`crate::aggregate::aggregate_index`].
pub fn reconcile(
    index: &GroupingIndex,
    summaries: Vec<Vec<PlatformSummary>>,
    fee: &dyn FeeSchedule,
    tolerance: Decimal,
) -> Result<Reconciled, InvoiceError> {
    if summaries.len() != index.restaurants.len() {
        return Err(mismatch(
            "restaurant count",
            Decimal::from(index.restaurants.len()),
            Decimal::from(summaries.len()),
            Decimal::ZERO,
        ));
    }

    let mut restaurants = Vec::with_capacity(summaries.len());
    for (group, platforms) in index.restaurants.iter().zip(summaries) {
        let totals = LedgerTotals::from_platforms(&platforms);

        let mut from_raw = LedgerTotals::default();
        let mut raw_count = 0usize;
        for t in group.transactions() {
            from_raw.add_transaction(t);
            raw_count += 1;
        }

        let summarized: usize = platforms.iter().map(|p| p.record_count).sum();
        if summarized != raw_count {
            return Err(mismatch(
                &format!("restaurant '{}' record count", group.name),
                Decimal::from(raw_count),
                Decimal::from(summarized),
                Decimal::ZERO,
            ));
        }
        compare_exact(&format!("restaurant '{}'", group.name), &from_raw, &totals)?;

        restaurants.push(RestaurantSummary {
            name: group.name.clone(),
            location: group.location.clone().unwrap_or_default(),
            platforms,
            totals,
        });
    }

    rollup(restaurants, fee, tolerance)
}

/// Derive invoice totals and financials from already-built restaurant
/// summaries. Running this again on its own output yields the same figures.
pub fn rollup(
    restaurants: Vec<RestaurantSummary>,
    fee: &dyn FeeSchedule,
    tolerance: Decimal,
) -> Result<Reconciled, InvoiceError> {
    // Top-down: restaurant totals -> invoice totals.
    let mut totals = LedgerTotals::default();
    for r in &restaurants {
        compare_exact(
            &format!("restaurant '{}' totals", r.name),
            &LedgerTotals::from_platforms(&r.platforms),
            &r.totals,
        )?;
        totals.add_totals(&r.totals);
    }

    let total_payout = totals.net_pay;
    let aggregator_fee = fee.fee(total_payout);
    if aggregator_fee > Decimal::ZERO {
        return Err(mismatch("aggregator_fee sign", Decimal::ZERO, aggregator_fee, Decimal::ZERO));
    }
    let final_net_payout = total_payout + aggregator_fee;

    // Bottom-up: every group's net pay, re-derived from its own columns.
    let mut bottom_up = Decimal::ZERO;
    for r in &restaurants {
        for p in &r.platforms {
            let subtotal = p.gross_pay + p.taxes_transferred + p.taxes_platform;
            let net = subtotal + p.error_charges;
            if net != p.net_pay || subtotal != p.subtotal {
                return Err(mismatch(
                    &format!("net_pay of '{}' / '{}'", r.name, p.platform),
                    net,
                    p.net_pay,
                    Decimal::ZERO,
                ));
            }
            bottom_up += net;
        }
    }
    within(
        "final_net_payout",
        bottom_up + aggregator_fee,
        final_net_payout,
        tolerance,
    )?;

    tracing::info!(
        restaurants = restaurants.len(),
        %total_payout,
        %aggregator_fee,
        %final_net_payout,
        "invoice reconciled"
    );

    Ok(Reconciled {
        restaurants,
        totals,
        financials: FinancialTotals {
            total_payout,
            aggregator_fee,
            final_net_payout,
            fee_policy: fee.describe(),
        },
    })
}

/// Re-check the identities on the figures a reader actually sees: each
/// restaurant's totals are the column sums of its platform rows, the invoice
/// totals are the sums of the restaurant totals, and the platform net pays
/// plus the fee come to the final net payout.
pub fn verify_presented(report: &InvoiceReport, tolerance: Decimal) -> Result<(), InvoiceError> {
    let mut totals = LedgerTotals::default();
    let mut net_pay_sum = Decimal::ZERO;
    for r in &report.restaurants {
        compare_exact(
            &format!("presented restaurant '{}' totals", r.name),
            &LedgerTotals::from_platforms(&r.platforms),
            &r.totals,
        )?;
        totals.add_totals(&r.totals);
        net_pay_sum += r.platforms.iter().map(|p| p.net_pay).sum::<Decimal>();
    }
    compare_exact("presented invoice totals", &totals, &report.totals)?;

    let f = &report.financials;
    if f.total_payout != report.totals.net_pay {
        return Err(mismatch(
            "presented total_payout",
            report.totals.net_pay,
            f.total_payout,
            Decimal::ZERO,
        ));
    }
    within(
        "presented final_net_payout",
        net_pay_sum + f.aggregator_fee,
        f.final_net_payout,
        tolerance,
    )
}

fn mismatch(check: &str, expected: Decimal, actual: Decimal, tolerance: Decimal) -> InvoiceError {
    InvoiceError::Reconciliation {
        check: check.to_string(),
        expected,
        actual,
        tolerance,
    }
}

fn within(check: &str, expected: Decimal, actual: Decimal, tolerance: Decimal) -> Result<(), InvoiceError> {
    if (expected - actual).abs() > tolerance {
        return Err(mismatch(check, expected, actual, tolerance));
    }
    Ok(())
}

fn compare_exact(label: &str, expected: &LedgerTotals, actual: &LedgerTotals) -> Result<(), InvoiceError> {
    let columns = [
        ("orders", Decimal::from(expected.orders), Decimal::from(actual.orders)),
        ("gross_pay", expected.gross_pay, actual.gross_pay),
        ("taxes_transferred", expected.taxes_transferred, actual.taxes_transferred),
        ("taxes_platform", expected.taxes_platform, actual.taxes_platform),
        ("subtotal", expected.subtotal, actual.subtotal),
        ("error_charges", expected.error_charges, actual.error_charges),
        ("net_pay", expected.net_pay, actual.net_pay),
    ];
    for (column, e, a) in columns {
        if e != a {
            return Err(mismatch(&format!("{label} {column}"), e, a, Decimal::ZERO));
        }
    }
    Ok(())
}
