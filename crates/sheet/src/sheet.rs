use crate::cell::CellValue;
use crate::error::{Result, SheetError};

/// A sheet representing a 2D grid of cells (row-major storage).
///
/// Rows may be ragged: spreadsheet exports routinely drop trailing empty
/// cells, so a missing cell reads the same as [`CellValue::Null`].
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    name: String,
    data: Vec<Vec<CellValue>>,
}

impl Sheet {
    /// Create a new empty sheet
    #[must_use]
    pub fn new() -> Self {
        Self::with_name("Sheet1")
    }

    /// Create a new empty sheet with a name
    #[must_use]
    pub fn with_name(name: &str) -> Self {
        Sheet {
            name: name.to_string(),
            data: Vec::new(),
        }
    }

    /// Create a sheet from a 2D vector of values
    #[must_use]
    pub fn from_data<T: Into<CellValue>>(data: Vec<Vec<T>>) -> Self {
        let converted: Vec<Vec<CellValue>> = data
            .into_iter()
            .map(|row| row.into_iter().map(Into::into).collect())
            .collect();

        Sheet {
            name: "Sheet1".to_string(),
            data: converted,
        }
    }

    /// Get the sheet name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the sheet name
    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// Get the number of rows
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.data.len()
    }

    /// Get the number of columns (width of the widest row)
    #[must_use]
    pub fn col_count(&self) -> usize {
        self.data.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Check if the sheet has no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get a cell value by row and column index
    pub fn get(&self, row: usize, col: usize) -> Result<&CellValue> {
        self.data
            .get(row)
            .and_then(|r| r.get(col))
            .ok_or(SheetError::IndexOutOfBounds {
                row,
                col,
                rows: self.data.len(),
            })
    }

    /// Get a row by index
    pub fn row(&self, index: usize) -> Result<&Vec<CellValue>> {
        self.data.get(index).ok_or(SheetError::RowIndexOutOfBounds {
            index,
            count: self.data.len(),
        })
    }

    /// Append a row. Rows of differing width are allowed.
    pub fn row_append<T: Into<CellValue>>(&mut self, data: Vec<T>) {
        self.data.push(data.into_iter().map(Into::into).collect());
    }

    /// Read the given row as trimmed column names.
    ///
    /// Names are not required to be unique; callers resolve columns by
    /// position once they have matched a name.
    pub fn header(&self, row_index: usize) -> Result<Vec<String>> {
        Ok(self
            .row(row_index)?
            .iter()
            .map(|cell| cell.as_str().trim().to_string())
            .collect())
    }

    /// Iterate over the rows below the given header row.
    pub fn rows_after(&self, row_index: usize) -> impl Iterator<Item = &Vec<CellValue>> {
        self.data.iter().skip(row_index + 1)
    }

    /// Iterate over all rows
    pub fn rows(&self) -> impl Iterator<Item = &Vec<CellValue>> {
        self.data.iter()
    }

    /// Get the underlying data
    #[must_use]
    pub fn data(&self) -> &Vec<Vec<CellValue>> {
        &self.data
    }

    /// Get mutable access to the underlying data
    pub fn data_mut(&mut self) -> &mut Vec<Vec<CellValue>> {
        &mut self.data
    }

    /// Remove rows where every cell is blank. Both loaders call this, so row
    /// indices count the same way for workbooks and CSV files.
    pub fn remove_empty_rows(&mut self) -> usize {
        let before = self.data.len();
        self.data.retain(|row| !row.iter().all(CellValue::is_blank));
        before - self.data.len()
    }
}

impl Default for Sheet {
    fn default() -> Self {
        Self::new()
    }
}
