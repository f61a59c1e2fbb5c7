//! Aggregator fee policies.
//!
//! The reconciler only sees [`FeeSchedule`]; [`FeePolicy`] is the
//! config-driven implementation. Fees are returned as non-positive amounts
//! rounded to cents, since they are what actually gets charged.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;

use crate::error::InvoiceError;

pub trait FeeSchedule {
    /// Fee for the given pre-fee payout. Always <= 0.
    fn fee(&self, total_payout: Decimal) -> Decimal;

    /// Short human description, carried into the report.
    fn describe(&self) -> String;
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeePolicy {
    /// Fraction of the payout, e.g. `0.03` for 3%.
    Percentage { rate: Decimal },
    /// Marginal brackets: each tier's rate applies to the slice of payout
    /// between the previous bound and its own `up_to`.
    Tiered { tiers: Vec<FeeTier> },
    /// Fixed amount per invoice, never more than the payout.
    Flat { amount: Decimal },
    #[serde(rename = "none")]
    NoFee,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeeTier {
    /// Upper bound of this bracket; the last tier leaves it unset.
    #[serde(default)]
    pub up_to: Option<Decimal>,
    pub rate: Decimal,
}

impl FeePolicy {
    pub fn validate(&self) -> Result<(), InvoiceError> {
        match self {
            Self::Percentage { rate } => check_rate(*rate, "fee.rate"),
            Self::Flat { amount } => {
                if *amount < Decimal::ZERO {
                    return Err(InvoiceError::config(format!(
                        "fee.amount must be >= 0, got {amount}"
                    )));
                }
                Ok(())
            }
            Self::Tiered { tiers } => {
                if tiers.is_empty() {
                    return Err(InvoiceError::config("fee.tiers must not be empty"));
                }
                let mut previous = Decimal::ZERO;
                for (i, tier) in tiers.iter().enumerate() {
                    check_rate(tier.rate, &format!("fee.tiers[{i}].rate"))?;
                    let last = i + 1 == tiers.len();
                    match (tier.up_to, last) {
                        (Some(bound), false) => {
                            if bound <= previous {
                                return Err(InvoiceError::config(format!(
                                    "fee.tiers[{i}].up_to must be greater than {previous}, got {bound}"
                                )));
                            }
                            previous = bound;
                        }
                        (None, false) => {
                            return Err(InvoiceError::config(format!(
                                "fee.tiers[{i}] needs up_to; only the last tier is open-ended"
                            )));
                        }
                        (Some(_), true) => {
                            return Err(InvoiceError::config(
                                "the last fee tier must be open-ended (no up_to)",
                            ));
                        }
                        (None, true) => {}
                    }
                }
                Ok(())
            }
            Self::NoFee => Ok(()),
        }
    }

    /// Percentage policy, used for command-line rate overrides.
    pub fn with_rate(rate: Decimal) -> Self {
        Self::Percentage { rate }
    }
}

fn check_rate(rate: Decimal, field: &str) -> Result<(), InvoiceError> {
    if rate < Decimal::ZERO || rate > Decimal::ONE {
        return Err(InvoiceError::config(format!(
            "{field} must be between 0 and 1, got {rate}"
        )));
    }
    Ok(())
}

fn to_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

impl FeeSchedule for FeePolicy {
    fn fee(&self, total_payout: Decimal) -> Decimal {
        // Nothing to take a commission from.
        let base = total_payout.max(Decimal::ZERO);

        let charge = match self {
            Self::Percentage { rate } => base * rate,
            Self::Flat { amount } => (*amount).min(base),
            Self::Tiered { tiers } => {
                let mut charge = Decimal::ZERO;
                let mut lower = Decimal::ZERO;
                for tier in tiers {
                    let upper = tier.up_to.unwrap_or(base).min(base);
                    if upper > lower {
                        charge += (upper - lower) * tier.rate;
                    }
                    if upper >= base {
                        break;
                    }
                    lower = upper;
                }
                charge
            }
            Self::NoFee => Decimal::ZERO,
        };

        let charge = to_cents(charge);
        if charge.is_zero() {
            Decimal::ZERO
        } else {
            -charge
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Percentage { rate } => format!("{}% of total payout", rate * Decimal::ONE_HUNDRED),
            Self::Flat { amount } => format!("flat {amount}"),
            Self::Tiered { tiers } => format!("tiered ({} brackets)", tiers.len()),
            Self::NoFee => "no fee".to_string(),
        }
    }
}
