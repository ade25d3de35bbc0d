use crate::csv::CsvOptions;
use crate::error::{Result, SheetError};
use crate::sheet::Sheet;
use indexmap::IndexMap;
use std::path::Path;
use tracing::debug;

/// A book containing multiple sheets (preserves insertion order)
#[derive(Debug, Clone, Default)]
pub struct Book {
    name: String,
    sheets: IndexMap<String, Sheet>,
}

impl Book {
    /// Create a new empty book
    #[must_use]
    pub fn new() -> Self {
        Self::with_name("Book1")
    }

    /// Create a new empty book with a name
    #[must_use]
    pub fn with_name(name: &str) -> Self {
        Book {
            name: name.to_string(),
            sheets: IndexMap::new(),
        }
    }

    /// Get the book name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the number of sheets
    #[must_use]
    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    /// Check if the book is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    /// Get all sheet names in order
    #[must_use]
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.keys().map(String::as_str).collect()
    }

    /// Check if a sheet exists
    #[must_use]
    pub fn has_sheet(&self, name: &str) -> bool {
        self.sheets.contains_key(name)
    }

    /// Get a sheet by name
    pub fn get_sheet(&self, name: &str) -> Result<&Sheet> {
        self.sheets
            .get(name)
            .ok_or_else(|| SheetError::SheetNotFound {
                name: name.to_string(),
            })
    }

    /// Add a sheet to the book. The sheet takes the book-level name.
    pub fn add_sheet(&mut self, name: &str, mut sheet: Sheet) -> Result<()> {
        if self.sheets.contains_key(name) {
            return Err(SheetError::SheetAlreadyExists {
                name: name.to_string(),
            });
        }
        sheet.set_name(name);
        self.sheets.insert(name.to_string(), sheet);
        Ok(())
    }

    /// Move every sheet of `other` into this book, appending `_1`, `_2`, ...
    /// to names that already exist.
    pub fn merge(&mut self, other: Book) {
        for (name, sheet) in other {
            let final_name = get_unique_name(self, &name);
            // The name is unique, so insertion cannot fail.
            let _ = self.add_sheet(&final_name, sheet);
        }
    }

    // ===== Multi-File Loading =====

    /// Load one or more inputs into a single book.
    ///
    /// Workbook files contribute every worksheet, CSV/TSV files contribute one
    /// sheet named after the file stem, and directories contribute each CSV/TSV
    /// file they contain.
    ///
    /// # Example
    /// ```no_run
    /// use regdash_sheet::Book;
    ///
    /// let book = Book::from_paths(&["reportTable 2020 - 22.xlsx", "extra/"]).unwrap();
    /// ```
    pub fn from_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut book = Book::new();

        for path in paths {
            let path = path.as_ref();
            let loaded = if path.is_dir() {
                Book::from_csv_dir(path)?
            } else {
                load_by_extension(path)?
            };
            debug!(
                path = %path.display(),
                sheets = loaded.sheet_count(),
                "loaded input"
            );
            book.merge(loaded);
        }

        Ok(book)
    }

    // ===== Iteration =====

    /// Iterate over sheets
    pub fn sheets(&self) -> impl Iterator<Item = (&str, &Sheet)> {
        self.sheets.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Load a single file as a book by auto-detecting format from its extension
fn load_by_extension(path: &Path) -> Result<Book> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Book::from_workbook(path),
        "csv" | "tsv" => {
            let options = if ext == "tsv" {
                CsvOptions::tsv()
            } else {
                CsvOptions::default()
            };
            let sheet = Sheet::from_csv_with_options(path, options)?;
            let mut book = Book::new();
            book.add_sheet(&file_stem(path)?, sheet)?;
            Ok(book)
        }
        _ => Err(SheetError::UnsupportedFormat { extension: ext }),
    }
}

pub(crate) fn file_stem(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| SheetError::Parse(format!("Invalid filename: {}", path.display())))
}

/// Generate a unique sheet name by appending _1, _2, etc.
fn get_unique_name(book: &Book, base_name: &str) -> String {
    if !book.has_sheet(base_name) {
        return base_name.to_string();
    }
    let mut suffix = 1;
    loop {
        let new_name = format!("{base_name}_{suffix}");
        if !book.has_sheet(&new_name) {
            return new_name;
        }
        suffix += 1;
    }
}

impl IntoIterator for Book {
    type Item = (String, Sheet);
    type IntoIter = indexmap::map::IntoIter<String, Sheet>;

    fn into_iter(self) -> Self::IntoIter {
        self.sheets.into_iter()
    }
}
