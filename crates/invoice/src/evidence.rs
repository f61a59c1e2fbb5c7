use std::collections::{BTreeMap, HashMap, HashSet};

use rust_decimal::Decimal;

use crate::model::{DataSummary, Transaction, ValidationSummary};
use crate::normalize::NormalizedBatch;

/// Count accepted, rejected and warned rows of a normalized batch.
pub fn compute_validation_summary(batch: &NormalizedBatch) -> ValidationSummary {
    let mut rejection_counts: BTreeMap<String, usize> = BTreeMap::new();
    for r in &batch.rejected {
        *rejection_counts.entry(r.error.kind().to_string()).or_insert(0) += 1;
    }

    let mut warning_counts: BTreeMap<String, usize> = BTreeMap::new();
    for w in &batch.warnings {
        *warning_counts.entry(w.kind.label().to_string()).or_insert(0) += 1;
    }

    ValidationSummary {
        total_rows: batch.total_rows(),
        accepted: batch.transactions.len(),
        rejected: batch.rejected.len(),
        warnings: batch.warnings.len(),
        rejection_counts,
        warning_counts,
    }
}

/// Shape of the accepted data: how many restaurants, which platforms.
///
/// Platform names are listed once each, as first seen; the breakdown is
/// keyed by that same display name.
pub fn compute_data_summary(transactions: &[Transaction]) -> DataSummary {
    let mut restaurants = HashSet::new();
    let mut platforms: Vec<String> = Vec::new();
    let mut platform_names: HashMap<String, usize> = HashMap::new();
    let mut platform_breakdown: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_orders = 0u64;
    let mut total_gross_pay = Decimal::ZERO;

    for t in transactions {
        restaurants.insert(t.restaurant_key());

        let pos = *platform_names.entry(t.platform_key()).or_insert_with(|| {
            platforms.push(t.platform.clone());
            platforms.len() - 1
        });
        *platform_breakdown.entry(platforms[pos].clone()).or_insert(0) += 1;

        total_orders += t.orders;
        total_gross_pay += t.gross_pay;
    }

    DataSummary {
        total_records: transactions.len(),
        restaurants: restaurants.len(),
        platforms,
        total_orders,
        total_gross_pay,
        platform_breakdown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RowValidationError;
    use crate::model::{RawRow, RejectedRow, RowWarning, WarningKind};

    fn txn(restaurant: &str, platform: &str, orders: u64, gross: i64) -> Transaction {
        Transaction {
            line: 1,
            restaurant_name: restaurant.into(),
            platform: platform.into(),
            location: None,
            orders,
            gross_pay: Decimal::new(gross, 2),
            taxes_transferred: Decimal::ZERO,
            taxes_platform: Decimal::ZERO,
            error_charges: Decimal::ZERO,
        }
    }

    #[test]
    fn validation_counts() {
        let batch = NormalizedBatch {
            transactions: vec![txn("Acme", "DoorDash", 1, 100)],
            rejected: vec![
                RejectedRow {
                    row: RawRow::new(2),
                    error: RowValidationError::MissingField {
                        line: 2,
                        field: "restaurant",
                    },
                },
                RejectedRow {
                    row: RawRow::new(3),
                    error: RowValidationError::MissingField {
                        line: 3,
                        field: "platform",
                    },
                },
            ],
            warnings: vec![RowWarning {
                line: 1,
                kind: WarningKind::UnknownPlatform {
                    platform: "DoorDash".into(),
                },
            }],
        };
        let summary = compute_validation_summary(&batch);
        assert_eq!(summary.total_rows, 3);
        assert_eq!(summary.accepted, 1);
        assert_eq!(summary.rejected, 2);
        assert_eq!(summary.rejection_counts["missing_field"], 2);
        assert_eq!(summary.warning_counts["unknown_platform"], 1);
    }

    #[test]
    fn data_summary_first_seen_platforms() {
        let txns = vec![
            txn("Acme", "UberEats", 3, 1000),
            txn("Bistro", "DoorDash", 2, 550),
            txn("acme", "ubereats", 1, 50),
        ];
        let summary = compute_data_summary(&txns);
        assert_eq!(summary.total_records, 3);
        assert_eq!(summary.restaurants, 2);
        assert_eq!(summary.platforms, vec!["UberEats", "DoorDash"]);
        assert_eq!(summary.platform_breakdown["UberEats"], 2);
        assert_eq!(summary.total_orders, 6);
        assert_eq!(summary.total_gross_pay, Decimal::new(1600, 2));
    }

    #[test]
    fn empty_input() {
        let summary = compute_data_summary(&[]);
        assert_eq!(summary, DataSummary::default());
    }
}
