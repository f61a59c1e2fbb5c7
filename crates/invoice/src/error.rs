use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

/// Run-level failures. Any of these aborts report production; no partial
/// report is ever returned alongside one.
#[derive(Debug, Error)]
pub enum InvoiceError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Required invoicing configuration absent or out of range.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Mandatory column absent from the input header.
    #[error("missing required column '{column}' (field '{field}')")]
    MissingColumn { field: &'static str, column: String },
    /// Input rows could not be read (CSV / JSON syntax).
    #[error("input error: {0}")]
    Input(String),
    /// Two independent derivations of the same figure disagree.
    #[error(
        "reconciliation failed ({check}): expected {expected}, got {actual} (tolerance {tolerance})"
    )]
    Reconciliation {
        check: String,
        expected: Decimal,
        actual: Decimal,
        tolerance: Decimal,
    },
}

impl InvoiceError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

/// Why a single row was rejected. Scoped to that row; the batch continues.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowValidationError {
    #[error("row {line}: {field} is blank")]
    MissingField { line: usize, field: &'static str },
    #[error("row {line}: {field} value '{value}' is not a whole number")]
    InvalidOrders {
        line: usize,
        field: &'static str,
        value: String,
    },
    #[error("row {line}: {field} cannot be negative (got {value})")]
    NegativeOrders {
        line: usize,
        field: &'static str,
        value: String,
    },
    #[error("row {line}: {field} value {value} exceeds the limit of {limit}")]
    OutOfRange {
        line: usize,
        field: &'static str,
        value: String,
        limit: String,
    },
}

impl RowValidationError {
    /// Stable kind label used for summary counts.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingField { .. } => "missing_field",
            Self::InvalidOrders { .. } => "invalid_orders",
            Self::NegativeOrders { .. } => "negative_orders",
            Self::OutOfRange { .. } => "out_of_range",
        }
    }

    pub fn line(&self) -> usize {
        match self {
            Self::MissingField { line, .. }
            | Self::InvalidOrders { line, .. }
            | Self::NegativeOrders { line, .. }
            | Self::OutOfRange { line, .. } => *line,
        }
    }
}
