//! Tabular command output.

use anyhow::Result;
use colored::Colorize;
use regdash_sheet::{CellValue, CsvOptions, Sheet};
use serde_json::Value as JsonValue;
use std::io::Write;

/// Output format for results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Aligned table output (default)
    #[default]
    Table,
}

/// A command result: named columns of JSON-typed cells.
///
/// `json` replaces the row-wise JSON rendering when a command has a more
/// natural structured form (e.g. growth series).
#[derive(Debug, Clone, Default)]
pub struct Report {
    pub title: Option<String>,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<JsonValue>>,
    pub json: Option<JsonValue>,
}

impl Report {
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn with_json(mut self, json: JsonValue) -> Self {
        self.json = Some(json);
        self
    }

    pub fn push(&mut self, row: Vec<JsonValue>) {
        self.rows.push(row);
    }

    /// Render the report to `out`.
    pub fn write<W: Write>(&self, format: OutputFormat, mut out: W) -> Result<()> {
        match format {
            OutputFormat::Table => self.write_table(&mut out),
            OutputFormat::Json => {
                let json = match &self.json {
                    Some(json) => json.clone(),
                    None => self.rows_as_json(),
                };
                writeln!(out, "{}", serde_json::to_string_pretty(&json)?)?;
                Ok(())
            }
            OutputFormat::Csv => {
                self.to_sheet().write_csv(out, &CsvOptions::default())?;
                Ok(())
            }
        }
    }

    fn rows_as_json(&self) -> JsonValue {
        JsonValue::Array(
            self.rows
                .iter()
                .map(|row| {
                    JsonValue::Object(
                        self.headers
                            .iter()
                            .cloned()
                            .zip(row.iter().cloned())
                            .collect(),
                    )
                })
                .collect(),
        )
    }

    fn to_sheet(&self) -> Sheet {
        let mut sheet = Sheet::new();
        sheet.row_append(self.headers.clone());
        for row in &self.rows {
            sheet.row_append(row.iter().map(json_to_cell).collect::<Vec<CellValue>>());
        }
        sheet
    }

    fn write_table<W: Write>(&self, out: &mut W) -> Result<()> {
        if let Some(title) = &self.title {
            writeln!(out, "{}", title.bold())?;
        }
        if self.rows.is_empty() {
            writeln!(out, "(no rows)")?;
            return Ok(());
        }

        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(format_cell).collect())
            .collect();
        let widths: Vec<usize> = self
            .headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                cells
                    .iter()
                    .filter_map(|row| row.get(i))
                    .map(String::len)
                    .chain(std::iter::once(header.len()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let header_line: Vec<String> = self
            .headers
            .iter()
            .zip(&widths)
            .map(|(header, &width)| format!("{header:<width$}"))
            .collect();
        writeln!(out, "{}", header_line.join("  ").cyan().bold())?;

        // Columns holding only numbers (or gaps) are right-aligned
        let numeric: Vec<bool> = (0..self.headers.len())
            .map(|i| {
                self.rows
                    .iter()
                    .filter_map(|row| row.get(i))
                    .all(|v| v.is_number() || v.is_null())
            })
            .collect();

        for row in &cells {
            let line: Vec<String> = row
                .iter()
                .zip(&widths)
                .zip(&numeric)
                .map(|((cell, &width), &numeric)| {
                    if numeric {
                        format!("{cell:>width$}")
                    } else {
                        format!("{cell:<width$}")
                    }
                })
                .collect();
            writeln!(out, "{}", line.join("  ").trim_end())?;
        }
        Ok(())
    }
}

/// Format a cell for table output: whole numbers without decimals, other
/// numbers to two places, missing values as `-`.
pub fn format_cell(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "-".to_string(),
        JsonValue::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{f:.0}"),
            Some(f) => format!("{f:.2}"),
            None => n.to_string(),
        },
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_to_cell(value: &JsonValue) -> CellValue {
    match value {
        JsonValue::Null => CellValue::Null,
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => CellValue::Int(i),
            None => n.as_f64().map_or(CellValue::Null, CellValue::Float),
        },
        JsonValue::String(s) => CellValue::String(s.clone()),
        other => CellValue::String(other.to_string()),
    }
}
