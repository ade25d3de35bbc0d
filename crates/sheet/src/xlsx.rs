use crate::book::Book;
use crate::cell::CellValue;
use crate::error::{Result, SheetError};
use crate::sheet::Sheet;
use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::Workbook;
use std::path::Path;
use tracing::debug;

/// Convert calamine Data to CellValue
fn data_to_cell_value(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Null,
        Data::Bool(b) => CellValue::Bool(*b),
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::String(s) => CellValue::String(s.clone()),
        // Excel stores dates as days since 1899-12-30
        Data::DateTime(dt) => CellValue::Float(dt.as_f64()),
        Data::DateTimeIso(s) => CellValue::String(s.clone()),
        Data::DurationIso(s) => CellValue::String(s.clone()),
        // Error cells (#N/A, #REF!) carry no measure
        Data::Error(_) => CellValue::Null,
    }
}

impl Book {
    /// Load every worksheet of a workbook (xlsx, xlsm, xlsb, xls or ods).
    ///
    /// Sheets keep their tab names, which later serve as the fallback source
    /// for the registration year.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be opened or a worksheet cannot be read.
    pub fn from_workbook<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut workbook = open_workbook_auto(path).map_err(|e| SheetError::workbook(path, e))?;

        let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
        let book_name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Book1");
        let mut book = Book::with_name(book_name);

        for sheet_name in sheet_names {
            let range = workbook
                .worksheet_range(&sheet_name)
                .map_err(|e| SheetError::workbook(path, e))?;

            let mut sheet = Sheet::with_name(&sheet_name);
            *sheet.data_mut() = range
                .rows()
                .map(|row| row.iter().map(data_to_cell_value).collect())
                .collect();
            let removed = sheet.remove_empty_rows();

            debug!(
                sheet = %sheet_name,
                rows = sheet.row_count(),
                empty_rows_removed = removed,
                "read worksheet"
            );
            book.add_sheet(&sheet_name, sheet)?;
        }

        Ok(book)
    }

    /// Save the book to an Excel file, one worksheet per sheet
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be created or written.
    pub fn save_as_xlsx<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut workbook = Workbook::new();

        for (name, sheet) in self.sheets() {
            let worksheet = workbook.add_worksheet();
            worksheet
                .set_name(name)
                .map_err(|e| SheetError::workbook(path, e))?;

            for (row_idx, row) in sheet.data().iter().enumerate() {
                let row_num = u32::try_from(row_idx)
                    .map_err(|_| SheetError::workbook(path, "Row index overflow"))?;
                for (col_idx, cell) in row.iter().enumerate() {
                    let col_num = u16::try_from(col_idx)
                        .map_err(|_| SheetError::workbook(path, "Column index overflow"))?;

                    let written = match cell {
                        CellValue::Null => continue,
                        CellValue::Bool(b) => worksheet.write_boolean(row_num, col_num, *b),
                        // Excel stores all numbers as f64, so integers > 2^53 may lose precision
                        CellValue::Int(i) => worksheet.write_number(row_num, col_num, *i as f64),
                        CellValue::Float(f) => worksheet.write_number(row_num, col_num, *f),
                        CellValue::String(s) => worksheet.write_string(row_num, col_num, s),
                    };
                    written.map_err(|e| SheetError::workbook(path, e))?;
                }
            }
        }

        workbook
            .save(path)
            .map_err(|e| SheetError::workbook(path, e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_book_xlsx_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("book.xlsx");

        let mut book = Book::new();
        book.add_sheet(
            "2021",
            Sheet::from_data(vec![
                vec![CellValue::from("Maker"), CellValue::from("Total")],
                vec![CellValue::from("Acme"), CellValue::Int(5)],
            ]),
        )
        .unwrap();
        book.add_sheet("Notes", Sheet::from_data(vec![vec!["free text"]]))
            .unwrap();

        book.save_as_xlsx(&path).unwrap();
        let loaded = Book::from_workbook(&path).unwrap();

        assert_eq!(loaded.name(), "book");
        assert_eq!(loaded.sheet_names(), vec!["2021", "Notes"]);
        let sheet = loaded.get_sheet("2021").unwrap();
        assert_eq!(sheet.name(), "2021");
        // Int becomes Float in Excel
        assert!(matches!(sheet.get(1, 1).unwrap(), CellValue::Float(f) if (*f - 5.0).abs() < 1e-9));
    }

    #[test]
    fn test_xlsx_blank_rows_dropped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gaps.xlsx");

        let mut book = Book::new();
        book.add_sheet(
            "Data",
            Sheet::from_data(vec![
                vec![CellValue::from("Maker")],
                vec![CellValue::Null],
                vec![CellValue::from("Acme")],
            ]),
        )
        .unwrap();
        book.save_as_xlsx(&path).unwrap();

        let loaded = Book::from_workbook(&path).unwrap();
        assert_eq!(loaded.get_sheet("Data").unwrap().row_count(), 2);
    }

    #[test]
    fn test_missing_workbook_is_an_error() {
        let dir = tempdir().unwrap();
        let err = Book::from_workbook(dir.path().join("missing.xlsx")).unwrap_err();
        assert!(matches!(err, SheetError::Workbook { .. }));
    }
}
