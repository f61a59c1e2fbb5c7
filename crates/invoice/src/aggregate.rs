use rust_decimal::Decimal;

use crate::grouping::{GroupingIndex, PlatformGroup};
use crate::model::PlatformSummary;

/// Reduce one (restaurant, platform) group to its summary.
///
/// Source columns are summed; `subtotal` and `net_pay` are computed from
/// those sums, never summed from per-row values. No rounding here.
pub fn aggregate_group(group: &PlatformGroup) -> PlatformSummary {
    let mut orders = 0u64;
    let mut gross_pay = Decimal::ZERO;
    let mut taxes_transferred = Decimal::ZERO;
    let mut taxes_platform = Decimal::ZERO;
    let mut error_charges = Decimal::ZERO;
    let mut source_lines = Vec::with_capacity(group.transactions.len());

    for t in &group.transactions {
        orders += t.orders;
        gross_pay += t.gross_pay;
        taxes_transferred += t.taxes_transferred;
        taxes_platform += t.taxes_platform;
        error_charges += t.error_charges;
        source_lines.push(t.line);
    }

    let subtotal = gross_pay + taxes_transferred + taxes_platform;

    PlatformSummary {
        platform: group.name.clone(),
        orders,
        gross_pay,
        taxes_transferred,
        taxes_platform,
        subtotal,
        error_charges,
        net_pay: subtotal + error_charges,
        record_count: group.transactions.len(),
        source_lines,
    }
}

/// Aggregate every group, keeping restaurant and platform order.
pub fn aggregate_index(index: &GroupingIndex) -> Vec<Vec<PlatformSummary>> {
    index
        .restaurants
        .iter()
        .map(|r| {
            let summaries: Vec<_> = r.platforms.iter().map(aggregate_group).collect();
            for s in &summaries {
                tracing::debug!(
                    restaurant = %r.name,
                    platform = %s.platform,
                    records = s.record_count,
                    net_pay = %s.net_pay,
                    "group aggregated"
                );
            }
            summaries
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Transaction;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn txn(line: usize, orders: u64, gross: &str, transferred: &str, platform: &str, errors: &str) -> Transaction {
        Transaction {
            line,
            restaurant_name: "Acme".into(),
            platform: "DoorDash".into(),
            location: None,
            orders,
            gross_pay: d(gross),
            taxes_transferred: d(transferred),
            taxes_platform: d(platform),
            error_charges: d(errors),
        }
    }

    fn group(transactions: Vec<Transaction>) -> PlatformGroup {
        PlatformGroup {
            key: "doordash".into(),
            name: "DoorDash".into(),
            transactions,
        }
    }

    #[test]
    fn single_row_example() {
        let s = aggregate_group(&group(vec![txn(1, 10, "100.00", "5.00", "2.00", "-3.00")]));
        assert_eq!(s.orders, 10);
        assert_eq!(s.subtotal, d("107.00"));
        assert_eq!(s.net_pay, d("104.00"));
        assert_eq!(s.record_count, 1);
    }

    #[test]
    fn rows_with_same_key_merge() {
        let s = aggregate_group(&group(vec![
            txn(1, 10, "100.00", "5.00", "2.00", "-3.00"),
            txn(4, 7, "55.25", "1.10", "0.40", "0"),
        ]));
        assert_eq!(s.orders, 17);
        assert_eq!(s.gross_pay, d("155.25"));
        assert_eq!(s.taxes_transferred, d("6.10"));
        assert_eq!(s.taxes_platform, d("2.40"));
        assert_eq!(s.subtotal, d("163.75"));
        assert_eq!(s.net_pay, d("160.75"));
        assert_eq!(s.source_lines, vec![1, 4]);
    }

    #[test]
    fn no_intermediate_rounding() {
        // Sub-cent values accumulate exactly instead of rounding to zero per row.
        let rows = (1..=3).map(|i| txn(i, 1, "0.003333", "0", "0", "0")).collect();
        let s = aggregate_group(&group(rows));
        assert_eq!(s.gross_pay, d("0.009999"));
    }
}
