//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: invoicing scripts branch on them.
//!
//! | Code | Meaning                                                   |
//! |------|-----------------------------------------------------------|
//! | 0    | Success                                                   |
//! | 1    | General error (unspecified)                               |
//! | 2    | CLI usage error (bad args, unreadable config file)        |
//! | 3    | Invalid invoice config (TOML syntax or validation)        |
//! | 4    | Ledger rows unreadable (I/O, CSV or JSON syntax)          |
//! | 5    | Mandatory ledger column missing                           |
//! | 6    | Reconciliation failed; no report produced                 |
//! | 7    | Rows were rejected (`run --strict`, `validate`)           |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into [`invoice_exit_code`] or the command's error handling

use platepay_invoice::InvoiceError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing or unreadable config file.
pub const EXIT_USAGE: u8 = 2;

/// Config file parsed badly or failed validation.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// Ledger rows could not be read or parsed.
pub const EXIT_INPUT: u8 = 4;

/// A mandatory column (restaurant, platform, orders) is absent.
pub const EXIT_MISSING_COLUMN: u8 = 5;

/// Totals failed an accounting identity check.
pub const EXIT_RECONCILIATION: u8 = 6;

/// The run completed but one or more rows were rejected.
pub const EXIT_ROWS_REJECTED: u8 = 7;

/// Map an engine error to its exit code.
pub fn invoice_exit_code(err: &InvoiceError) -> u8 {
    match err {
        InvoiceError::ConfigParse(_) | InvoiceError::Configuration(_) => EXIT_INVALID_CONFIG,
        InvoiceError::MissingColumn { .. } => EXIT_MISSING_COLUMN,
        InvoiceError::Input(_) => EXIT_INPUT,
        InvoiceError::Reconciliation { .. } => EXIT_RECONCILIATION,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn engine_errors_map_to_distinct_codes() {
        let codes = [
            invoice_exit_code(&InvoiceError::ConfigParse("x".into())),
            invoice_exit_code(&InvoiceError::Input("x".into())),
            invoice_exit_code(&InvoiceError::MissingColumn {
                field: "orders",
                column: "Sum of Order Count".into(),
            }),
            invoice_exit_code(&InvoiceError::Reconciliation {
                check: "final_net_payout".into(),
                expected: Decimal::ONE,
                actual: Decimal::ZERO,
                tolerance: Decimal::ZERO,
            }),
        ];
        assert_eq!(codes, [3, 4, 5, 6]);
        assert_eq!(
            invoice_exit_code(&InvoiceError::Configuration("x".into())),
            EXIT_INVALID_CONFIG
        );
    }
}
