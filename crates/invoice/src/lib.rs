//! `platepay-invoice`: sales-ledger aggregation and reconciliation engine.
//!
//! Pure engine crate: receives pre-fetched ledger rows, returns a reconciled,
//! presentation-ready invoice. No CLI, HTTP or rendering dependencies.

pub mod aggregate;
pub mod assemble;
pub mod config;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod fee;
pub mod grouping;
pub mod model;
pub mod normalize;
pub mod present;
pub mod reconcile;

pub use config::InvoiceConfig;
pub use engine::{inspect, load_csv_rows, load_json_rows, run};
pub use error::{InvoiceError, RowValidationError};
pub use fee::{FeePolicy, FeeSchedule};
pub use model::{InvoiceReport, InvoiceRun, RawRow};
