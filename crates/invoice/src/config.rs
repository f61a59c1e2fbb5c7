use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::InvoiceError;
use crate::fee::FeePolicy;
use crate::model::InvoiceMeta;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// One invoicing run: who is billed, for which period, under which fee.
///
/// Every field is optional at the serde level so that absent values surface
/// as [`InvoiceError::Configuration`] from [`InvoiceConfig::validate`] with a
/// readable message, instead of a TOML type error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvoiceConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub period: Option<String>,
    /// Ledger rows file, resolved relative to the config file by the caller.
    #[serde(default)]
    pub rows: Option<String>,
    #[serde(default)]
    pub fee: Option<FeePolicy>,
    #[serde(default)]
    pub columns: ColumnMapping,
    #[serde(default)]
    pub validation: ValidationRules,
    #[serde(default)]
    pub tolerance: ToleranceConfig,
}

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

/// Sheet header for each ledger field. Defaults follow the payout export.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub restaurant: String,
    pub platform: String,
    pub orders: String,
    pub gross_pay: String,
    pub taxes_transferred: String,
    pub taxes_platform: String,
    pub error_charges: String,
    pub location: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            restaurant: "Restaurant".into(),
            platform: "Platform_x".into(),
            orders: "Sum of Order Count".into(),
            gross_pay: "Sum of Total payout".into(),
            taxes_transferred: "Sum of Passed on Tax".into(),
            taxes_platform: "Sum of Marketplace Facilitator Tax".into(),
            error_charges: "Error Charges".into(),
            location: "Location".into(),
        }
    }
}

impl ColumnMapping {
    /// (field, header) pairs that must be present in the input.
    pub fn mandatory(&self) -> [(&'static str, &str); 3] {
        [
            ("restaurant", self.restaurant.as_str()),
            ("platform", self.platform.as_str()),
            ("orders", self.orders.as_str()),
        ]
    }

    fn all(&self) -> [(&'static str, &str); 8] {
        [
            ("restaurant", self.restaurant.as_str()),
            ("platform", self.platform.as_str()),
            ("orders", self.orders.as_str()),
            ("gross_pay", self.gross_pay.as_str()),
            ("taxes_transferred", self.taxes_transferred.as_str()),
            ("taxes_platform", self.taxes_platform.as_str()),
            ("error_charges", self.error_charges.as_str()),
            ("location", self.location.as_str()),
        ]
    }
}

// ---------------------------------------------------------------------------
// Validation rules + tolerance
// ---------------------------------------------------------------------------

/// Warning thresholds. Breaching them never rejects a row.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValidationRules {
    /// Known platform names (case-insensitive). Empty disables the check.
    #[serde(default)]
    pub valid_platforms: Vec<String>,
    /// Absolute gross pay above which a row is flagged.
    #[serde(default)]
    pub suspicious_payout_threshold: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToleranceConfig {
    #[serde(default = "default_tolerance")]
    pub amount: Decimal,
}

fn default_tolerance() -> Decimal {
    Decimal::new(1, 2)
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            amount: default_tolerance(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl InvoiceConfig {
    pub fn from_toml(input: &str) -> Result<Self, InvoiceError> {
        let config = Self::parse(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse without validating, for callers that override fields first.
    pub fn parse(input: &str) -> Result<Self, InvoiceError> {
        toml::from_str(input).map_err(|e| InvoiceError::ConfigParse(e.to_string()))
    }

    /// Display name for logs; falls back when the addressee is absent.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }

    pub fn validate(&self) -> Result<(), InvoiceError> {
        self.meta()?;

        let fee = self
            .fee
            .as_ref()
            .ok_or_else(|| InvoiceError::config("fee policy is required ([fee] table)"))?;
        fee.validate()?;

        if self.tolerance.amount < Decimal::ZERO {
            return Err(InvoiceError::config(format!(
                "tolerance.amount must be >= 0, got {}",
                self.tolerance.amount
            )));
        }

        for (field, header) in self.columns.all() {
            if header.trim().is_empty() {
                return Err(InvoiceError::config(format!(
                    "columns.{field} must not be blank"
                )));
            }
        }

        if let Some(threshold) = self.validation.suspicious_payout_threshold {
            if threshold <= Decimal::ZERO {
                return Err(InvoiceError::config(format!(
                    "validation.suspicious_payout_threshold must be > 0, got {threshold}"
                )));
            }
        }

        Ok(())
    }

    /// Addressee metadata. Name and period are mandatory; location may be blank.
    pub fn meta(&self) -> Result<InvoiceMeta, InvoiceError> {
        let name = required(&self.name, "name")?;
        let period = required(&self.period, "period")?;
        Ok(InvoiceMeta {
            name,
            location: self.location.as_deref().unwrap_or("").trim().to_string(),
            period,
        })
    }

    pub fn fee_policy(&self) -> Result<&FeePolicy, InvoiceError> {
        self.fee
            .as_ref()
            .ok_or_else(|| InvoiceError::config("fee policy is required ([fee] table)"))
    }
}

fn required(value: &Option<String>, field: &str) -> Result<String, InvoiceError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(InvoiceError::config(format!("{field} is required"))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
