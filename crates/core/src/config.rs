//! Normalizer configuration.
//!
//! Everything has a default, so an empty JSON object is a valid
//! configuration:
//!
//! ```json
//! {
//!   "header_row": 0,
//!   "category_tokens": ["2WN", "LMV"],
//!   "columns": { "entity": "Manufacturer" },
//!   "sheets": {
//!     "2020": { "period": "Reg Year", "total": "Grand Total" }
//!   }
//! }
//! ```

use crate::error::{CoreError, CoreResult};
use crate::rules::{DetectionRules, DEFAULT_CATEGORY_TOKENS};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Explicit column names for some or all roles of a sheet.
///
/// Unset roles fall back to the heuristic detection rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnMapping {
    pub entity: Option<String>,
    pub categories: Option<Vec<String>>,
    pub period: Option<String>,
    pub total: Option<String>,
}

impl ColumnMapping {
    /// Whether the mapping pins no role at all.
    pub fn is_empty(&self) -> bool {
        self == &ColumnMapping::default()
    }
}

/// Options controlling how raw sheets are normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NormalizeOptions {
    /// Zero-based index of the header row in every sheet, counting only
    /// rows that are not entirely blank.
    pub header_row: usize,
    /// Substrings that mark a column as a vehicle category.
    pub category_tokens: Vec<String>,
    /// Column mapping applied to every sheet without its own entry.
    pub columns: ColumnMapping,
    /// Per-sheet column mappings, keyed by sheet name. A sheet entry replaces
    /// the default mapping rather than merging with it.
    pub sheets: IndexMap<String, ColumnMapping>,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            header_row: 0,
            category_tokens: DEFAULT_CATEGORY_TOKENS
                .iter()
                .map(|t| (*t).to_string())
                .collect(),
            columns: ColumnMapping::default(),
            sheets: IndexMap::new(),
        }
    }
}

impl NormalizeOptions {
    /// Parse options from a JSON string.
    pub fn from_json_str(json: &str) -> CoreResult<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Load options from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Set the header row index.
    #[must_use]
    pub fn with_header_row(mut self, header_row: usize) -> Self {
        self.header_row = header_row;
        self
    }

    /// Replace the category tokens.
    #[must_use]
    pub fn with_category_tokens<S: Into<String>>(mut self, tokens: impl IntoIterator<Item = S>) -> Self {
        self.category_tokens = tokens.into_iter().map(Into::into).collect();
        self
    }

    /// Set the default column mapping.
    #[must_use]
    pub fn with_columns(mut self, mapping: ColumnMapping) -> Self {
        self.columns = mapping;
        self
    }

    /// Set the column mapping for one sheet.
    #[must_use]
    pub fn with_sheet_columns(mut self, sheet: &str, mapping: ColumnMapping) -> Self {
        self.sheets.insert(sheet.to_string(), mapping);
        self
    }

    /// The column mapping that applies to a sheet.
    pub fn mapping_for(&self, sheet: &str) -> &ColumnMapping {
        self.sheets.get(sheet).unwrap_or(&self.columns)
    }

    /// The detection rules that apply to a sheet.
    pub fn rules_for(&self, sheet: &str) -> DetectionRules {
        DetectionRules::heuristic(&self.category_tokens).with_mapping(self.mapping_for(sheet))
    }

    fn validate(&self) -> CoreResult<()> {
        if let Some(token) = self.category_tokens.iter().find(|t| t.trim().is_empty()) {
            return Err(CoreError::Config(format!(
                "category token {token:?} is blank and would match every column"
            )));
        }
        Ok(())
    }
}
