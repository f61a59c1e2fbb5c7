//! Row normalizer: raw sheet rows in, typed transactions out.
//!
//! Failures are per-row. A malformed row becomes a [`RejectedRow`] and the
//! rest of the batch is still processed.
//!
//! Accepted amounts are whole cents. Sub-cent input is rounded half away
//! from zero and flagged, so every downstream sum is exact in cents.

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::{ColumnMapping, ValidationRules};
use crate::error::RowValidationError;
use crate::model::{CellValue, RawRow, RejectedRow, RowWarning, Transaction, WarningKind};

/// Largest accepted magnitude for a single financial cell.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

/// Largest accepted order count for a single row.
pub const MAX_ORDERS: u64 = 1_000_000_000;

#[derive(Debug, Default)]
pub struct NormalizedBatch {
    pub transactions: Vec<Transaction>,
    pub rejected: Vec<RejectedRow>,
    pub warnings: Vec<RowWarning>,
}

impl NormalizedBatch {
    pub fn total_rows(&self) -> usize {
        self.transactions.len() + self.rejected.len()
    }
}

/// Grouping key for a display name: trimmed, inner whitespace collapsed,
/// lower-cased. "  Uber  Eats " and "uber eats" share a key.
pub fn normalize_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

pub fn normalize_rows(
    rows: &[RawRow],
    columns: &ColumnMapping,
    rules: &ValidationRules,
) -> NormalizedBatch {
    let known_platforms: Vec<String> = rules
        .valid_platforms
        .iter()
        .map(|p| normalize_key(p))
        .collect();

    let mut batch = NormalizedBatch::default();

    for row in rows {
        let mut row_warnings = Vec::new();
        match normalize_row(row, columns, &mut row_warnings) {
            Ok(txn) => {
                if !known_platforms.is_empty() && !known_platforms.contains(&txn.platform_key()) {
                    row_warnings.push(RowWarning {
                        line: row.line,
                        kind: WarningKind::UnknownPlatform {
                            platform: txn.platform.clone(),
                        },
                    });
                }
                if let Some(threshold) = rules.suspicious_payout_threshold {
                    if txn.gross_pay.abs() > threshold {
                        row_warnings.push(RowWarning {
                            line: row.line,
                            kind: WarningKind::SuspiciousPayout {
                                amount: txn.gross_pay,
                            },
                        });
                    }
                }
                for w in &row_warnings {
                    tracing::debug!(line = w.line, warning = w.kind.label(), "row accepted with warning");
                }
                batch.warnings.extend(row_warnings);
                batch.transactions.push(txn);
            }
            Err(error) => {
                tracing::warn!(line = row.line, %error, "row rejected");
                batch.rejected.push(RejectedRow {
                    row: row.clone(),
                    error,
                });
            }
        }
    }

    batch
}

fn normalize_row(
    row: &RawRow,
    columns: &ColumnMapping,
    warnings: &mut Vec<RowWarning>,
) -> Result<Transaction, RowValidationError> {
    let restaurant_name = required_text(row, &columns.restaurant, "restaurant")?;
    let platform = required_text(row, &columns.platform, "platform")?;
    let orders = orders_count(row, &columns.orders)?;

    let mut amount = |column: &str, field: &'static str| -> Result<Decimal, RowValidationError> {
        let value = match coerce_amount(row.get(column)) {
            Coerced::Value(v) => v,
            Coerced::Blank => return Ok(Decimal::ZERO),
            Coerced::Invalid(value) => {
                warnings.push(RowWarning {
                    line: row.line,
                    kind: WarningKind::CoercedToZero { field, value },
                });
                return Ok(Decimal::ZERO);
            }
        };
        if value.abs() > MAX_AMOUNT {
            return Err(RowValidationError::OutOfRange {
                line: row.line,
                field,
                value: value.to_string(),
                limit: MAX_AMOUNT.to_string(),
            });
        }
        let cents = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        if cents != value {
            warnings.push(RowWarning {
                line: row.line,
                kind: WarningKind::RoundedToCents { field, value },
            });
        }
        Ok(cents)
    };

    let gross_pay = amount(&columns.gross_pay, "gross_pay")?;
    let taxes_transferred = amount(&columns.taxes_transferred, "taxes_transferred")?;
    let taxes_platform = amount(&columns.taxes_platform, "taxes_platform")?;
    let error_charges = amount(&columns.error_charges, "error_charges")?;

    let location = row
        .get(&columns.location)
        .map(|c| c.as_text().trim().to_string())
        .filter(|s| !s.is_empty());

    Ok(Transaction {
        line: row.line,
        restaurant_name,
        platform,
        location,
        orders,
        gross_pay,
        taxes_transferred,
        taxes_platform,
        error_charges,
    })
}

fn required_text(
    row: &RawRow,
    column: &str,
    field: &'static str,
) -> Result<String, RowValidationError> {
    match row.get(column) {
        Some(cell) if !cell.is_blank() => Ok(cell.as_text().trim().to_string()),
        _ => Err(RowValidationError::MissingField {
            line: row.line,
            field,
        }),
    }
}

fn orders_count(row: &RawRow, column: &str) -> Result<u64, RowValidationError> {
    const FIELD: &str = "orders";
    let invalid = |value: String| RowValidationError::InvalidOrders {
        line: row.line,
        field: FIELD,
        value,
    };

    match coerce_amount(row.get(column)) {
        Coerced::Blank => Err(RowValidationError::MissingField {
            line: row.line,
            field: FIELD,
        }),
        Coerced::Invalid(value) => Err(invalid(value)),
        Coerced::Value(v) if v.is_sign_negative() && !v.is_zero() => {
            Err(RowValidationError::NegativeOrders {
                line: row.line,
                field: FIELD,
                value: v.to_string(),
            })
        }
        Coerced::Value(v) if !v.fract().is_zero() => Err(invalid(v.to_string())),
        Coerced::Value(v) => match v.to_u64() {
            Some(n) if n <= MAX_ORDERS => Ok(n),
            _ => Err(RowValidationError::OutOfRange {
                line: row.line,
                field: FIELD,
                value: v.to_string(),
                limit: MAX_ORDERS.to_string(),
            }),
        },
    }
}

// ---------------------------------------------------------------------------
// Coercion
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq)]
enum Coerced {
    Value(Decimal),
    Blank,
    Invalid(String),
}

fn coerce_amount(cell: Option<&CellValue>) -> Coerced {
    match cell {
        None | Some(CellValue::Empty) => Coerced::Blank,
        Some(CellValue::Integer(i)) => Coerced::Value(Decimal::from(*i)),
        // Shortest round-trip text, so 0.1 stays 0.1 rather than its binary expansion.
        Some(CellValue::Float(f)) if f.is_finite() => match Decimal::from_str(&f.to_string()) {
            Ok(v) => Coerced::Value(v),
            Err(_) => Coerced::Invalid(f.to_string()),
        },
        Some(CellValue::Float(f)) => Coerced::Invalid(f.to_string()),
        Some(CellValue::Bool(b)) => Coerced::Invalid(b.to_string()),
        Some(CellValue::Text(s)) if s.trim().is_empty() => Coerced::Blank,
        Some(CellValue::Text(s)) => match parse_amount(s) {
            Some(v) => Coerced::Value(v),
            None => Coerced::Invalid(s.trim().to_string()),
        },
    }
}

/// Parse a currency-ish cell: `1234.5`, `$1,234.50`, `-3`, `-$3.00`, `(3.00)`.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let mut s = raw.trim();
    let mut negative = false;

    if let Some(inner) = s.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
        negative = true;
        s = inner.trim();
    }
    if let Some(rest) = s.strip_prefix('-') {
        negative = !negative;
        s = rest.trim_start();
    } else if let Some(rest) = s.strip_prefix('+') {
        s = rest.trim_start();
    }
    let s = s.strip_prefix('$').unwrap_or(s);

    let digits: String = s.chars().filter(|c| *c != ',').collect();
    let well_formed = digits.chars().any(|c| c.is_ascii_digit())
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits.matches('.').count() <= 1;
    if !well_formed {
        return None;
    }

    let value = Decimal::from_str(&digits).ok()?;
    Some(if negative { -value } else { value })
}
