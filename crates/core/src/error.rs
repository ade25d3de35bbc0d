//! Error types for regdash.

use crate::metrics::Dimension;
use crate::normalize::SkippedSheet;
use regdash_sheet::SheetError;
use thiserror::Error;

/// Result type for regdash operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while loading, normalizing or exporting data.
///
/// Malformed cells and empty filter results are not errors; they are
/// coerced to zero and returned as empty results respectively.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Nothing could be loaded: no sheets, or every sheet was skipped.
    #[error("No data could be loaded ({} sheet(s) skipped)", .skipped.len())]
    NoData { skipped: Vec<SkippedSheet> },

    /// A period string could not be parsed.
    #[error("Invalid period: '{0}' (expected YYYY or YYYY-MM)")]
    InvalidPeriod(String),

    /// A dimension name could not be parsed.
    #[error("Unknown dimension: '{0}' (expected entity, category, period, year or quarter)")]
    UnknownDimension(String),

    /// Growth was requested along a dimension the aggregation lacks.
    #[error("Aggregation is not grouped by {0}")]
    MissingDimension(Dimension),

    /// Malformed delimited-text export.
    #[error("Export error at line {line}: {message}")]
    Export { line: u64, message: String },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Sheet loading error.
    #[error(transparent)]
    Sheet(#[from] SheetError),

    /// CSV error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Create an export error.
    pub fn export(line: u64, message: impl Into<String>) -> Self {
        Self::Export {
            line,
            message: message.into(),
        }
    }
}
