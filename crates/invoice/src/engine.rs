use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::aggregate::aggregate_index;
use crate::assemble::assemble;
use crate::config::{ColumnMapping, InvoiceConfig};
use crate::error::InvoiceError;
use crate::evidence::{compute_data_summary, compute_validation_summary};
use crate::grouping::GroupingIndex;
use crate::model::{
    CellValue, DataSummary, InvoiceRun, RawRow, RejectedRow, RowWarning, RunMeta, ValidationSummary,
};
use crate::normalize::normalize_rows;
use crate::reconcile::reconcile;

/// Produce one invoice from pre-fetched rows.
///
/// Configuration is checked before anything is aggregated. Row-level
/// problems are collected on the returned run; run-level ones abort it.
#[tracing::instrument(skip_all, fields(invoice = %config.display_name(), rows = rows.len()))]
pub fn run(config: &InvoiceConfig, rows: &[RawRow]) -> Result<InvoiceRun, InvoiceError> {
    config.validate()?;
    let meta = config.meta()?;
    let fee = config.fee_policy()?;
    check_columns(&row_headers(rows), &config.columns)?;

    let batch = normalize_rows(rows, &config.columns, &config.validation);
    let index = GroupingIndex::build(&batch.transactions);
    if index.transaction_count() != batch.transactions.len() {
        return Err(InvoiceError::Reconciliation {
            check: "grouped transaction count".into(),
            expected: batch.transactions.len().into(),
            actual: index.transaction_count().into(),
            tolerance: rust_decimal::Decimal::ZERO,
        });
    }

    let summaries = aggregate_index(&index);
    let reconciled = reconcile(&index, summaries, fee, config.tolerance.amount)?;
    let report = assemble(&meta, reconciled, config.tolerance.amount)?;

    let validation = compute_validation_summary(&batch);
    let data = compute_data_summary(&batch.transactions);

    tracing::info!(
        accepted = validation.accepted,
        rejected = validation.rejected,
        warnings = validation.warnings,
        restaurants = report.restaurants.len(),
        final_net_payout = %report.financials.final_net_payout,
        "invoice produced"
    );

    Ok(InvoiceRun {
        meta: RunMeta {
            config_name: meta.name,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        report,
        rejected: batch.rejected,
        warnings: batch.warnings,
        validation,
        data,
    })
}

/// Row-level findings without building a report.
#[derive(Debug, Clone, Serialize)]
pub struct Inspection {
    pub validation: ValidationSummary,
    pub data: DataSummary,
    pub rejected: Vec<RejectedRow>,
    pub warnings: Vec<RowWarning>,
}

/// Normalize and summarize rows only. Used to vet a ledger before invoicing.
pub fn inspect(config: &InvoiceConfig, rows: &[RawRow]) -> Result<Inspection, InvoiceError> {
    config.validate()?;
    check_columns(&row_headers(rows), &config.columns)?;

    let batch = normalize_rows(rows, &config.columns, &config.validation);
    Ok(Inspection {
        validation: compute_validation_summary(&batch),
        data: compute_data_summary(&batch.transactions),
        rejected: batch.rejected,
        warnings: batch.warnings,
    })
}

/// Every column name present in at least one row.
fn row_headers(rows: &[RawRow]) -> Vec<String> {
    let names: BTreeSet<&String> = rows.iter().flat_map(|r| r.cells.keys()).collect();
    names.into_iter().cloned().collect()
}

/// Fail the batch when a mandatory column is absent from the header.
///
/// An empty header (no rows at all) passes: there is nothing to misread.
pub fn check_columns(headers: &[String], columns: &ColumnMapping) -> Result<(), InvoiceError> {
    if headers.is_empty() {
        return Ok(());
    }
    for (field, column) in columns.mandatory() {
        if !headers.iter().any(|h| h == column) {
            return Err(InvoiceError::MissingColumn {
                field,
                column: column.to_string(),
            });
        }
    }
    Ok(())
}

/// Load a CSV export into raw rows. Header names are trimmed; short rows
/// simply lack the trailing cells.
pub fn load_csv_rows(csv_data: &str) -> Result<Vec<RawRow>, InvoiceError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| InvoiceError::Input(e.to_string()))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(InvoiceError::Input("CSV input has no header row".into()));
    }

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|e| InvoiceError::Input(e.to_string()))?;
        let mut row = RawRow::new(i + 1);
        for (h, val) in headers.iter().zip(record.iter()) {
            if h.is_empty() {
                continue;
            }
            row.cells.insert(h.clone(), CellValue::from(val));
        }
        rows.push(row);
    }

    Ok(rows)
}

/// Load a JSON array of row objects, as returned by the sheets API.
pub fn load_json_rows(json: &str) -> Result<Vec<RawRow>, InvoiceError> {
    let objects: Vec<BTreeMap<String, CellValue>> =
        serde_json::from_str(json).map_err(|e| InvoiceError::Input(e.to_string()))?;

    Ok(objects
        .into_iter()
        .enumerate()
        .map(|(i, cells)| RawRow {
            line: i + 1,
            cells: cells
                .into_iter()
                .map(|(k, v)| (k.trim().to_string(), v))
                .collect(),
        })
        .collect())
}
