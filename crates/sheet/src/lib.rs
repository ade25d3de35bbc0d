//! Sheet/Book layer for regdash
//!
//! Reads spreadsheet exports into untyped grids of [`CellValue`]s. Nothing
//! here knows about makers or vehicle categories: a [`Sheet`] is a named 2D
//! grid, a [`Book`] an ordered set of sheets loaded from one or more files.
//!
//! # Examples
//!
//! ## Creating a sheet from data
//!
//! ```
//! use regdash_sheet::{Sheet, CellValue};
//!
//! let sheet = Sheet::from_data(vec![
//!     vec!["Maker", "2WN", "Year", "Total"],
//!     vec!["Acme", "5", "2021", "5"],
//! ]);
//!
//! assert_eq!(sheet.row_count(), 2);
//! assert_eq!(sheet.header(0).unwrap()[0], "Maker");
//! ```
//!
//! ## Loading a workbook
//!
//! ```no_run
//! use regdash_sheet::Book;
//!
//! let book = Book::from_paths(&["reportTable 2020 - 22.xlsx"]).unwrap();
//! for (name, sheet) in book.sheets() {
//!     println!("{name}: {} rows", sheet.row_count());
//! }
//! ```

mod book;
mod cell;
mod csv;
mod error;
mod sheet;
mod xlsx;

/// Re-export book type.
pub use book::Book;
/// Re-export cell value type.
pub use cell::CellValue;
/// Re-export CSV options.
pub use csv::CsvOptions;
/// Re-export sheet error types.
pub use error::{Result, SheetError};
/// Re-export sheet type.
pub use sheet::Sheet;
