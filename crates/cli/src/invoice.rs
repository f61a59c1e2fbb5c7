//! `platepay run|validate|check`: config-driven invoice production.

use std::path::{Path, PathBuf};

use clap::{Subcommand, ValueEnum};
use rust_decimal::Decimal;

use platepay_invoice::engine::{inspect, load_csv_rows, load_json_rows, run};
use platepay_invoice::model::{InvoiceRun, RawRow, RejectedRow, RowWarning, ValidationSummary};
use platepay_invoice::present::format_currency;
use platepay_invoice::{FeePolicy, FeeSchedule, InvoiceConfig};

use crate::exit_codes::EXIT_ROWS_REJECTED;
use crate::CliError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum RowFormat {
    Csv,
    Json,
}

#[derive(Subcommand)]
pub enum InvoiceCommands {
    /// Produce an invoice from a TOML config and a ledger export
    #[command(after_help = "\
Examples:
  platepay run acme.invoice.toml
  platepay run acme.invoice.toml --rows week-02.csv --period '2024-01-08 to 2024-01-14'
  platepay run acme.invoice.toml --fee-rate 0.12 --json
  platepay run acme.invoice.toml --output invoice.json --strict")]
    Run {
        /// Path to the .invoice.toml config file
        config: PathBuf,

        /// Ledger rows file (overrides `rows` in the config)
        #[arg(long)]
        rows: Option<PathBuf>,

        /// Ledger format (default: from the file extension, else csv)
        #[arg(long, value_enum)]
        format: Option<RowFormat>,

        /// Invoice period (overrides `period` in the config)
        #[arg(long)]
        period: Option<String>,

        /// Percentage fee rate, e.g. 0.10 (replaces the config's [fee])
        #[arg(long)]
        fee_rate: Option<Decimal>,

        /// Print JSON to stdout (the human summary still goes to stderr)
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Exit 7 when any row was rejected (the report is still written)
        #[arg(long)]
        strict: bool,
    },

    /// Check ledger rows against a config without producing an invoice
    #[command(after_help = "\
Exits 7 when any row is rejected.

Examples:
  platepay validate acme.invoice.toml
  platepay validate acme.invoice.toml --rows export.json --json")]
    Validate {
        /// Path to the .invoice.toml config file
        config: PathBuf,

        /// Ledger rows file (overrides `rows` in the config)
        #[arg(long)]
        rows: Option<PathBuf>,

        /// Ledger format (default: from the file extension, else csv)
        #[arg(long, value_enum)]
        format: Option<RowFormat>,

        /// Print JSON to stdout (the human summary still goes to stderr)
        #[arg(long)]
        json: bool,
    },

    /// Validate a config file only
    #[command(after_help = "\
Examples:
  platepay check acme.invoice.toml")]
    Check {
        /// Path to the .invoice.toml config file
        config: PathBuf,
    },
}

pub fn cmd_invoice(cmd: InvoiceCommands) -> Result<(), CliError> {
    match cmd {
        InvoiceCommands::Run { config, rows, format, period, fee_rate, json, output, strict } => {
            cmd_run(config, rows, format, period, fee_rate, json, output, strict)
        }
        InvoiceCommands::Validate { config, rows, format, json } => {
            cmd_validate(config, rows, format, json)
        }
        InvoiceCommands::Check { config } => cmd_check(config),
    }
}

fn read_config(path: &Path) -> Result<InvoiceConfig, CliError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        CliError::usage(format!("cannot read config {}: {e}", path.display()))
    })?;
    InvoiceConfig::parse(&text).map_err(CliError::invoice)
}

/// Resolve the rows file (flag first, then config relative to its own
/// directory) and load it in the requested or inferred format.
fn read_rows(
    config_path: &Path,
    config: &InvoiceConfig,
    rows: Option<PathBuf>,
    format: Option<RowFormat>,
) -> Result<Vec<RawRow>, CliError> {
    let path = match (rows, config.rows.as_deref()) {
        (Some(p), _) => p,
        (None, Some(file)) => config_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(file),
        (None, None) => {
            return Err(CliError::usage("no ledger rows given")
                .with_hint("set `rows` in the config or pass --rows FILE"));
        }
    };

    let format = format.unwrap_or_else(|| {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => RowFormat::Json,
            _ => RowFormat::Csv,
        }
    });

    let data = std::fs::read_to_string(&path)
        .map_err(|e| CliError::input(format!("cannot read {}: {e}", path.display())))?;

    tracing::info!(path = %path.display(), ?format, "loading ledger rows");
    let loaded = match format {
        RowFormat::Csv => load_csv_rows(&data),
        RowFormat::Json => load_json_rows(&data),
    };
    loaded.map_err(|e| CliError::invoice(e).with_hint(format!("while reading {}", path.display())))
}

#[allow(clippy::too_many_arguments)]
fn cmd_run(
    config_path: PathBuf,
    rows: Option<PathBuf>,
    format: Option<RowFormat>,
    period: Option<String>,
    fee_rate: Option<Decimal>,
    json_output: bool,
    output_file: Option<PathBuf>,
    strict: bool,
) -> Result<(), CliError> {
    let mut config = read_config(&config_path)?;
    if let Some(period) = period {
        config.period = Some(period);
    }
    if let Some(rate) = fee_rate {
        config.fee = Some(FeePolicy::with_rate(rate));
    }
    config.validate().map_err(CliError::invoice)?;

    let rows = read_rows(&config_path, &config, rows, format)?;

    // Run engine
    let result = run(&config, &rows).map_err(CliError::invoice)?;

    // Output
    let json_str = serde_json::to_string_pretty(&result)
        .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;

    if let Some(ref path) = output_file {
        std::fs::write(path, &json_str)
            .map_err(|e| CliError::general(format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        println!("{json_str}");
    }

    // Human summary to stderr
    print_run_summary(&result);

    if strict && !result.rejected.is_empty() {
        return Err(CliError {
            code: EXIT_ROWS_REJECTED,
            message: format!("{} row(s) rejected", result.rejected.len()),
            hint: Some("fix the listed rows or drop --strict".into()),
        });
    }

    Ok(())
}

fn cmd_validate(
    config_path: PathBuf,
    rows: Option<PathBuf>,
    format: Option<RowFormat>,
    json_output: bool,
) -> Result<(), CliError> {
    let config = read_config(&config_path)?;
    config.validate().map_err(CliError::invoice)?;
    let rows = read_rows(&config_path, &config, rows, format)?;

    let inspection = inspect(&config, &rows).map_err(CliError::invoice)?;

    if json_output {
        let json_str = serde_json::to_string_pretty(&inspection)
            .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    }

    print_validation(&inspection.validation);
    print_row_findings(&inspection.rejected, &inspection.warnings);
    eprintln!(
        "data: {} restaurants, platforms [{}], {} orders, gross {}",
        inspection.data.restaurants,
        inspection.data.platforms.join(", "),
        inspection.data.total_orders,
        format_currency(inspection.data.total_gross_pay),
    );

    if !inspection.rejected.is_empty() {
        return Err(CliError {
            code: EXIT_ROWS_REJECTED,
            message: format!("{} row(s) rejected", inspection.rejected.len()),
            hint: None,
        });
    }
    Ok(())
}

fn cmd_check(config_path: PathBuf) -> Result<(), CliError> {
    let config = read_config(&config_path)?;
    config.validate().map_err(CliError::invoice)?;
    let meta = config.meta().map_err(CliError::invoice)?;
    let fee = config.fee_policy().map_err(CliError::invoice)?;

    println!("ok: {} ({})", meta.name, meta.period);
    println!("fee: {}", fee.describe());
    Ok(())
}

fn print_run_summary(result: &InvoiceRun) {
    let report = &result.report;
    eprintln!("invoice: {} ({})", report.name, report.period);
    for r in &report.restaurants {
        eprintln!(
            "  {}: {} platform(s), {} orders, net {}",
            r.name,
            r.platforms.len(),
            r.totals.orders,
            format_currency(r.totals.net_pay),
        );
    }
    print_validation(&result.validation);
    print_row_findings(&result.rejected, &result.warnings);

    let f = &report.financials;
    eprintln!("total payout:     {}", format_currency(f.total_payout));
    eprintln!("aggregator fee:   {} ({})", format_currency(f.aggregator_fee), f.fee_policy);
    eprintln!("final net payout: {}", format_currency(f.final_net_payout));
}

fn print_validation(v: &ValidationSummary) {
    eprintln!(
        "rows: {} total, {} accepted, {} rejected, {} warnings",
        v.total_rows, v.accepted, v.rejected, v.warnings,
    );
}

fn print_row_findings(rejected: &[RejectedRow], warnings: &[RowWarning]) {
    for r in rejected {
        eprintln!("  rejected: {}", r.error);
    }
    for w in warnings {
        eprintln!("  warning: row {}: {}", w.line, w.kind.label());
    }
}
