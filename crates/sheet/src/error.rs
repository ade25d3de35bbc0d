use thiserror::Error;

/// Errors that can occur while loading or accessing sheets
#[derive(Error, Debug)]
pub enum SheetError {
    #[error("Index out of bounds: row {row}, col {col} (sheet has {rows} rows)")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
    },

    #[error("Row index out of bounds: {index} (sheet has {count} rows)")]
    RowIndexOutOfBounds { index: usize, count: usize },

    #[error("Sheet not found: {name}")]
    SheetNotFound { name: String },

    #[error("Sheet already exists: {name}")]
    SheetAlreadyExists { name: String },

    #[error("Unsupported file format: '{extension}'. Supported: csv, tsv, xlsx, xlsm, xlsb, xls, ods")]
    UnsupportedFormat { extension: String },

    #[error("Workbook error in {path}: {message}")]
    Workbook { path: String, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SheetError {
    /// Create a workbook error for the given path.
    pub fn workbook(path: &std::path::Path, message: impl ToString) -> Self {
        Self::Workbook {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SheetError>;
