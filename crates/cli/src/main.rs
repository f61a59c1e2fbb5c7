// platepay CLI - produce platform payout invoices from sales-ledger exports

mod exit_codes;
mod invoice;

use std::process::ExitCode;

use clap::{ArgAction, Parser};
use tracing_subscriber::EnvFilter;

use exit_codes::{invoice_exit_code, EXIT_ERROR, EXIT_INPUT, EXIT_SUCCESS, EXIT_USAGE};
use invoice::InvoiceCommands;

#[derive(Parser)]
#[command(name = "platepay")]
#[command(about = "Aggregate sales-ledger rows into a reconciled payout invoice")]
#[command(version)]
struct Cli {
    /// Log more (-v info, -vv debug). PLATEPAY_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: InvoiceCommands,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env("PLATEPAY_LOG").unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match invoice::cmd_invoice(cli.command) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn input(msg: impl Into<String>) -> Self {
        Self { code: EXIT_INPUT, message: msg.into(), hint: None }
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Create error from an engine error with the matching exit code.
    pub fn invoice(err: platepay_invoice::InvoiceError) -> Self {
        use platepay_invoice::InvoiceError;

        let code = invoice_exit_code(&err);
        let hint = match &err {
            InvoiceError::MissingColumn { field, .. } => Some(format!(
                "map the header with `[columns] {field} = \"...\"` in the config"
            )),
            InvoiceError::ConfigParse(_) => {
                Some("check the TOML syntax and the [fee] kind".to_string())
            }
            InvoiceError::Reconciliation { .. } => {
                Some("this is an engine defect; re-run with -vv and keep the ledger file".to_string())
            }
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
