use std::borrow::Cow;
use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::RowValidationError;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A single spreadsheet cell as delivered by the data source.
///
/// CSV exports only ever produce `Text` / `Empty`; JSON exports from the
/// sheets API can carry typed numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Empty,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl CellValue {
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Textual view of the cell, as a user would read it in the sheet.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Empty => Cow::Borrowed(""),
            Self::Bool(b) => Cow::Owned(b.to_string()),
            Self::Integer(i) => Cow::Owned(i.to_string()),
            Self::Float(f) => Cow::Owned(f.to_string()),
            Self::Text(s) => Cow::Borrowed(s.as_str()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            Self::Empty
        } else {
            Self::Text(s.to_string())
        }
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for CellValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

/// One fetched ledger row, keyed by (trimmed) column name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    /// 1-based data row number (header excluded).
    pub line: usize,
    pub cells: BTreeMap<String, CellValue>,
}

impl RawRow {
    pub fn new(line: usize) -> Self {
        Self {
            line,
            cells: BTreeMap::new(),
        }
    }

    pub fn with(mut self, column: &str, value: impl Into<CellValue>) -> Self {
        self.cells.insert(column.to_string(), value.into());
        self
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells.get(column)
    }
}

// ---------------------------------------------------------------------------
// Normalized
// ---------------------------------------------------------------------------

/// A validated ledger row. Everything downstream of the normalizer works on
/// these and never re-checks field types.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub line: usize,
    pub restaurant_name: String,
    pub platform: String,
    pub location: Option<String>,
    pub orders: u64,
    pub gross_pay: Decimal,
    pub taxes_transferred: Decimal,
    pub taxes_platform: Decimal,
    pub error_charges: Decimal,
}

impl Transaction {
    pub fn subtotal(&self) -> Decimal {
        self.gross_pay + self.taxes_transferred + self.taxes_platform
    }

    pub fn net_pay(&self) -> Decimal {
        self.subtotal() + self.error_charges
    }

    pub fn restaurant_key(&self) -> String {
        crate::normalize::normalize_key(&self.restaurant_name)
    }

    pub fn platform_key(&self) -> String {
        crate::normalize::normalize_key(&self.platform)
    }
}

/// A row dropped by the normalizer, with the untouched original.
#[derive(Debug, Clone, Serialize)]
pub struct RejectedRow {
    pub row: RawRow,
    pub error: RowValidationError,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WarningKind {
    UnknownPlatform { platform: String },
    SuspiciousPayout { amount: Decimal },
    CoercedToZero { field: &'static str, value: String },
    /// Amount carried sub-cent digits; the row uses the cent-rounded value.
    RoundedToCents { field: &'static str, value: Decimal },
}

impl WarningKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::UnknownPlatform { .. } => "unknown_platform",
            Self::SuspiciousPayout { .. } => "suspicious_payout",
            Self::CoercedToZero { .. } => "coerced_to_zero",
            Self::RoundedToCents { .. } => "rounded_to_cents",
        }
    }
}

/// Non-fatal observation about an accepted row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowWarning {
    pub line: usize,
    #[serde(flatten)]
    pub kind: WarningKind,
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Figures for one (restaurant, platform) group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformSummary {
    pub platform: String,
    pub orders: u64,
    pub gross_pay: Decimal,
    pub taxes_transferred: Decimal,
    pub taxes_platform: Decimal,
    pub subtotal: Decimal,
    pub error_charges: Decimal,
    pub net_pay: Decimal,
    pub record_count: usize,
    pub source_lines: Vec<usize>,
}

/// Column-wise totals over platform summaries or raw transactions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerTotals {
    pub orders: u64,
    pub gross_pay: Decimal,
    pub taxes_transferred: Decimal,
    pub taxes_platform: Decimal,
    pub subtotal: Decimal,
    pub error_charges: Decimal,
    pub net_pay: Decimal,
}

impl LedgerTotals {
    pub fn add_platform(&mut self, p: &PlatformSummary) {
        self.orders += p.orders;
        self.gross_pay += p.gross_pay;
        self.taxes_transferred += p.taxes_transferred;
        self.taxes_platform += p.taxes_platform;
        self.subtotal += p.subtotal;
        self.error_charges += p.error_charges;
        self.net_pay += p.net_pay;
    }

    pub fn add_transaction(&mut self, t: &Transaction) {
        self.orders += t.orders;
        self.gross_pay += t.gross_pay;
        self.taxes_transferred += t.taxes_transferred;
        self.taxes_platform += t.taxes_platform;
        self.subtotal += t.subtotal();
        self.error_charges += t.error_charges;
        self.net_pay += t.net_pay();
    }

    pub fn add_totals(&mut self, other: &LedgerTotals) {
        self.orders += other.orders;
        self.gross_pay += other.gross_pay;
        self.taxes_transferred += other.taxes_transferred;
        self.taxes_platform += other.taxes_platform;
        self.subtotal += other.subtotal;
        self.error_charges += other.error_charges;
        self.net_pay += other.net_pay;
    }

    pub fn from_platforms<'a>(platforms: impl IntoIterator<Item = &'a PlatformSummary>) -> Self {
        let mut totals = Self::default();
        for p in platforms {
            totals.add_platform(p);
        }
        totals
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestaurantSummary {
    pub name: String,
    pub location: String,
    pub platforms: Vec<PlatformSummary>,
    pub totals: LedgerTotals,
}

/// Invoice-wide payout figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialTotals {
    /// Sum of every group's net pay, before the aggregator fee.
    pub total_payout: Decimal,
    /// Always <= 0.
    pub aggregator_fee: Decimal,
    pub final_net_payout: Decimal,
    pub fee_policy: String,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Addressee and period for one invoice, supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceMeta {
    pub name: String,
    pub location: String,
    pub period: String,
}

/// The finished, presentation-ready invoice handed to rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceReport {
    pub name: String,
    pub location: String,
    pub period: String,
    pub restaurants: Vec<RestaurantSummary>,
    pub totals: LedgerTotals,
    pub financials: FinancialTotals,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationSummary {
    pub total_rows: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub warnings: usize,
    pub rejection_counts: BTreeMap<String, usize>,
    pub warning_counts: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DataSummary {
    pub total_records: usize,
    pub restaurants: usize,
    pub platforms: Vec<String>,
    pub total_orders: u64,
    pub total_gross_pay: Decimal,
    pub platform_breakdown: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
}

/// Everything one engine run produces. Rejected rows and warnings travel
/// beside the report, never inside it.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceRun {
    pub meta: RunMeta,
    pub report: InvoiceReport,
    pub rejected: Vec<RejectedRow>,
    pub warnings: Vec<RowWarning>,
    pub validation: ValidationSummary,
    pub data: DataSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn txn(gross: i64, transferred: i64, platform: i64, errors: i64) -> Transaction {
        Transaction {
            line: 1,
            restaurant_name: "Acme".into(),
            platform: "DoorDash".into(),
            location: None,
            orders: 3,
            gross_pay: Decimal::new(gross, 2),
            taxes_transferred: Decimal::new(transferred, 2),
            taxes_platform: Decimal::new(platform, 2),
            error_charges: Decimal::new(errors, 2),
        }
    }

    #[test]
    fn subtotal_and_net_are_derived() {
        let t = txn(10000, 500, 200, -300);
        assert_eq!(t.subtotal(), Decimal::new(10700, 2));
        assert_eq!(t.net_pay(), Decimal::new(10400, 2));
    }

    #[test]
    fn totals_from_transactions_match_manual_sum() {
        let mut totals = LedgerTotals::default();
        totals.add_transaction(&txn(10000, 500, 200, -300));
        totals.add_transaction(&txn(5050, 0, 0, 0));
        assert_eq!(totals.orders, 6);
        assert_eq!(totals.gross_pay, Decimal::new(15050, 2));
        assert_eq!(totals.net_pay, Decimal::new(15450, 2));
    }

    #[test]
    fn cell_value_blankness() {
        assert!(CellValue::Empty.is_blank());
        assert!(CellValue::Text("   ".into()).is_blank());
        assert!(!CellValue::Integer(0).is_blank());
        assert_eq!(CellValue::from(""), CellValue::Empty);
    }

    #[test]
    fn json_cells_deserialize_to_typed_values() {
        let cells: BTreeMap<String, CellValue> =
            serde_json::from_str(r#"{"a": null, "b": 10, "c": 1.5, "d": "x", "e": true}"#).unwrap();
        assert_eq!(cells["a"], CellValue::Empty);
        assert_eq!(cells["b"], CellValue::Integer(10));
        assert_eq!(cells["c"], CellValue::Float(1.5));
        assert_eq!(cells["d"], CellValue::Text("x".into()));
        assert_eq!(cells["e"], CellValue::Bool(true));
    }
}
