//! Presentation boundary: computed figures are rounded for display here.

use num_format::{Locale, ToFormattedString as _};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::model::{FinancialTotals, LedgerTotals, PlatformSummary, RestaurantSummary};

/// Round to cents, half away from zero, with a fixed scale of 2.
/// Negative zero is normalized so it never prints as `-0.00`.
pub fn money(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    if rounded.is_zero() {
        rounded = Decimal::ZERO;
    }
    rounded.rescale(2);
    rounded
}

/// `$1,234.56`, `-$10.40`. Always en-locale grouping, two decimals.
pub fn format_currency(amount: Decimal) -> String {
    let rounded = money(amount);
    let sign = if rounded.is_sign_negative() { "-" } else { "" };
    let abs = rounded.abs();
    let whole = abs.trunc().to_u128().unwrap_or(0);
    let cents = (abs.fract() * Decimal::ONE_HUNDRED).to_u32().unwrap_or(0);
    format!("{sign}${}.{cents:02}", whole.to_formatted_string(&Locale::en))
}

/// Values rounded for the rendering boundary.
pub trait Presented {
    fn presented(&self) -> Self;
}

impl Presented for PlatformSummary {
    fn presented(&self) -> Self {
        Self {
            platform: self.platform.clone(),
            orders: self.orders,
            gross_pay: money(self.gross_pay),
            taxes_transferred: money(self.taxes_transferred),
            taxes_platform: money(self.taxes_platform),
            subtotal: money(self.subtotal),
            error_charges: money(self.error_charges),
            net_pay: money(self.net_pay),
            record_count: self.record_count,
            source_lines: self.source_lines.clone(),
        }
    }
}

impl Presented for LedgerTotals {
    fn presented(&self) -> Self {
        Self {
            orders: self.orders,
            gross_pay: money(self.gross_pay),
            taxes_transferred: money(self.taxes_transferred),
            taxes_platform: money(self.taxes_platform),
            subtotal: money(self.subtotal),
            error_charges: money(self.error_charges),
            net_pay: money(self.net_pay),
        }
    }
}

impl Presented for RestaurantSummary {
    fn presented(&self) -> Self {
        Self {
            name: self.name.clone(),
            location: self.location.clone(),
            platforms: self.platforms.iter().map(Presented::presented).collect(),
            totals: self.totals.presented(),
        }
    }
}

impl Presented for FinancialTotals {
    fn presented(&self) -> Self {
        Self {
            total_payout: money(self.total_payout),
            aggregator_fee: money(self.aggregator_fee),
            final_net_payout: money(self.final_net_payout),
            fee_policy: self.fee_policy.clone(),
        }
    }
}
