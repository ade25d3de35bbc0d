//! Sheet normalization.
//!
//! Turns raw spreadsheet grids into [`CanonicalRecord`]s. Every sheet is
//! classified by [`SheetLayout`], its columns are resolved with the
//! configured [`DetectionRules`](crate::rules::DetectionRules), and each
//! numeric cell becomes one record. Sheets that cannot be interpreted are
//! skipped with a warning rather than failing the whole batch.

use crate::config::NormalizeOptions;
use crate::error::{CoreError, CoreResult};
use crate::layout::{RowLabel, SheetLayout};
use crate::record::{
    CanonicalRecord, Period, ALL_MAKERS, MEASURE_CATEGORY_MONTHLY, MEASURE_MAKER_MONTHLY,
    MEASURE_REGISTRATIONS, MEASURE_TOTAL,
};
use indexmap::IndexSet;
use regdash_sheet::{Book, CellValue, Sheet};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;

/// Why a sheet produced no records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No header row, or no rows below it.
    EmptySheet,
    /// No column could be resolved as the entity.
    NoEntityColumn,
    /// Neither a usable year column nor a year in the sheet name.
    NoPeriod,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            SkipReason::EmptySheet => "sheet has no data rows",
            SkipReason::NoEntityColumn => "no maker column found",
            SkipReason::NoPeriod => "no year column and no year in the sheet name",
        };
        f.write_str(reason)
    }
}

/// A sheet left out of the normalized output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedSheet {
    pub sheet: String,
    pub reason: SkipReason,
}

impl fmt::Display for SkippedSheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.sheet, self.reason)
    }
}

/// The output of a normalization batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Normalized {
    /// Records in sheet order, then row order, then column order.
    pub records: Vec<CanonicalRecord>,
    /// Category names actually used by a record, in first-seen order.
    pub categories: IndexSet<String>,
    pub skipped: Vec<SkippedSheet>,
    /// Rows dropped for a blank entity or an unresolvable year.
    pub dropped_rows: usize,
}

/// Converts raw sheets into canonical records.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    options: NormalizeOptions,
}

impl Normalizer {
    /// Create a normalizer with the given options.
    pub fn new(options: NormalizeOptions) -> Self {
        Self { options }
    }

    /// The options in effect.
    pub fn options(&self) -> &NormalizeOptions {
        &self.options
    }

    /// Normalize a batch of sheets.
    ///
    /// Returns [`CoreError::NoData`] when no sheet produced a record.
    pub fn normalize<'a, I>(&self, sheets: I) -> CoreResult<Normalized>
    where
        I: IntoIterator<Item = &'a Sheet>,
    {
        let mut out = Normalized::default();
        let mut sheet_count = 0usize;

        for sheet in sheets {
            sheet_count += 1;
            let before = out.records.len();
            match self.normalize_sheet(sheet, &mut out) {
                Ok(()) => tracing::debug!(
                    "Sheet '{}' produced {} records",
                    sheet.name(),
                    out.records.len() - before
                ),
                Err(reason) => {
                    tracing::warn!("Skipping sheet '{}': {}", sheet.name(), reason);
                    out.skipped.push(SkippedSheet {
                        sheet: sheet.name().to_string(),
                        reason,
                    });
                }
            }
        }

        if out.records.is_empty() {
            return Err(CoreError::NoData {
                skipped: out.skipped,
            });
        }

        tracing::info!(
            "Normalized {} records from {} of {} sheets ({} rows dropped)",
            out.records.len(),
            sheet_count - out.skipped.len(),
            sheet_count,
            out.dropped_rows
        );
        Ok(out)
    }

    /// Normalize every sheet of a book, in book order.
    pub fn normalize_book(&self, book: &Book) -> CoreResult<Normalized> {
        self.normalize(book.sheets().map(|(_, sheet)| sheet))
    }

    fn normalize_sheet(&self, sheet: &Sheet, out: &mut Normalized) -> Result<(), SkipReason> {
        let header_row = self.options.header_row;
        let header = sheet.header(header_row).map_err(|_| SkipReason::EmptySheet)?;
        let rows: Vec<&Vec<CellValue>> = sheet
            .rows_after(header_row)
            .filter(|row| !row.iter().all(CellValue::is_blank))
            .collect();
        if rows.is_empty() {
            return Err(SkipReason::EmptySheet);
        }

        let layout = SheetLayout::detect(&header);
        tracing::debug!("Sheet '{}' detected as {}", sheet.name(), layout.kind());

        match layout {
            SheetLayout::Category => self.melt_categories(sheet, &header, &rows, out),
            SheetLayout::Monthly {
                months,
                label,
                year_column,
            } => {
                let label = label.ok_or(SkipReason::NoEntityColumn)?;
                let years = YearSource::resolve(sheet.name(), year_column, &rows)?;
                melt_months(&months, label, &years, &rows, out);
                Ok(())
            }
        }
    }

    fn melt_categories(
        &self,
        sheet: &Sheet,
        header: &[String],
        rows: &[&Vec<CellValue>],
        out: &mut Normalized,
    ) -> Result<(), SkipReason> {
        let layout = self.options.rules_for(sheet.name()).detect(header);
        let entity = layout.entity_column().ok_or(SkipReason::NoEntityColumn)?;
        let period = layout.period_column().filter(|&col| col != entity);
        let total = layout
            .total_column()
            .filter(|&col| col != entity && Some(col) != period);
        // A blank header cannot name a category
        let categories: Vec<usize> = layout
            .category_columns()
            .iter()
            .copied()
            .filter(|&col| header.get(col).is_some_and(|name| !name.trim().is_empty()))
            .collect();

        tracing::debug!(
            "Sheet '{}': entity={:?} categories={:?} period={:?} total={:?}",
            sheet.name(),
            header.get(entity),
            categories
                .iter()
                .filter_map(|&col| header.get(col))
                .collect::<Vec<_>>(),
            period.and_then(|col| header.get(col)),
            total.and_then(|col| header.get(col)),
        );

        let years = YearSource::resolve(sheet.name(), period, rows)?;

        for row in rows {
            let Some(name) = clean_entity(cell(row, entity)) else {
                out.dropped_rows += 1;
                continue;
            };
            let Some(year) = years.year_of(row) else {
                out.dropped_rows += 1;
                continue;
            };
            let period = Period::year(year);

            for &col in &categories {
                let category = header[col].trim().to_string();
                out.categories.insert(category.clone());
                out.records.push(CanonicalRecord::new(
                    name.clone(),
                    Some(category),
                    period,
                    MEASURE_REGISTRATIONS,
                    coerce_measure(cell(row, col)),
                ));
            }
            if let Some(col) = total {
                out.records.push(CanonicalRecord::new(
                    name,
                    None,
                    period,
                    MEASURE_TOTAL,
                    coerce_measure(cell(row, col)),
                ));
            }
        }
        Ok(())
    }
}

fn melt_months(
    months: &[(usize, u8)],
    label: RowLabel,
    years: &YearSource,
    rows: &[&Vec<CellValue>],
    out: &mut Normalized,
) {
    let measure = match label {
        RowLabel::Maker(_) => MEASURE_MAKER_MONTHLY,
        RowLabel::Category(_) => MEASURE_CATEGORY_MONTHLY,
    };
    for row in rows {
        let (entity, category) = match label {
            RowLabel::Maker(col) => (clean_entity(cell(row, col)), None),
            RowLabel::Category(col) => match clean_entity(cell(row, col)) {
                Some(category) => (Some(ALL_MAKERS.to_string()), Some(category)),
                None => (None, None),
            },
        };
        let (Some(entity), Some(year)) = (entity, years.year_of(row)) else {
            out.dropped_rows += 1;
            continue;
        };
        if let Some(category) = &category {
            out.categories.insert(category.clone());
        }

        for &(col, month) in months {
            let Some(period) = Period::monthly(year, month) else {
                continue;
            };
            out.records.push(CanonicalRecord::new(
                entity.clone(),
                category.clone(),
                period,
                measure,
                coerce_measure(cell(row, col)),
            ));
        }
    }
}

/// Where each row's year comes from.
struct YearSource {
    column: Option<usize>,
    sheet_year: Option<i32>,
}

impl YearSource {
    /// Use the column when at least one row carries a year in it, otherwise
    /// fall back to a year in the sheet name.
    fn resolve(
        sheet_name: &str,
        column: Option<usize>,
        rows: &[&Vec<CellValue>],
    ) -> Result<Self, SkipReason> {
        let column = column.filter(|&col| rows.iter().any(|row| cell_year(cell(row, col)).is_some()));
        let sheet_year = year_token(sheet_name);
        if column.is_none() && sheet_year.is_none() {
            return Err(SkipReason::NoPeriod);
        }
        Ok(Self { column, sheet_year })
    }

    fn year_of(&self, row: &[CellValue]) -> Option<i32> {
        self.column
            .and_then(|col| cell_year(cell(row, col)))
            .or(self.sheet_year)
    }
}

fn cell(row: &[CellValue], col: usize) -> &CellValue {
    static NULL: CellValue = CellValue::Null;
    row.get(col).unwrap_or(&NULL)
}

fn digits_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("valid regex"))
}

/// The first run of exactly four digits in `text`, e.g. `2020` in
/// `"reportTable 2020 - 22"`. Longer and shorter digit runs are ignored.
pub fn year_token(text: &str) -> Option<i32> {
    digits_regex()
        .find_iter(text)
        .find(|m| m.as_str().len() == 4)
        .and_then(|m| m.as_str().parse().ok())
}

/// Read a year from a cell: a four-digit integer (or integral float), or a
/// string containing a four-digit token such as `"FY 2021-22"`.
pub fn cell_year(value: &CellValue) -> Option<i32> {
    match value {
        CellValue::Int(_) | CellValue::Float(_) => value
            .as_int()
            .filter(|year| (1000..=9999).contains(year))
            .and_then(|year| i32::try_from(year).ok()),
        CellValue::String(s) => year_token(s),
        CellValue::Null | CellValue::Bool(_) => None,
    }
}

/// Clean an entity label: drop quote characters and surrounding whitespace.
/// Returns `None` when nothing is left.
pub fn clean_entity(value: &CellValue) -> Option<String> {
    let raw = value.as_str();
    let cleaned: String = raw.chars().filter(|c| !matches!(c, '"' | '\'')).collect();
    let cleaned = cleaned.trim();
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}

/// Coerce a measure cell to a number; anything non-numeric counts as zero.
pub fn coerce_measure(value: &CellValue) -> f64 {
    value.as_float().unwrap_or(0.0)
}

/// Normalize sheets with default options.
pub fn normalize<'a, I>(sheets: I) -> CoreResult<Normalized>
where
    I: IntoIterator<Item = &'a Sheet>,
{
    Normalizer::default().normalize(sheets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColumnMapping;
    use crate::export::{read_csv, write_csv};
    use crate::filter::select_measure;
    use crate::metrics::{aggregate, Dimension};
    use crate::record::preferred_measure;

    fn maker_sheet(name: &str, rows: Vec<Vec<CellValue>>) -> Sheet {
        let mut sheet = Sheet::with_name(name);
        sheet.row_append(vec!["Maker", "2WN", "3WT", "Year", "Total"]);
        for row in rows {
            sheet.row_append(row);
        }
        sheet
    }

    fn row(values: Vec<CellValue>) -> Vec<CellValue> {
        values
    }

    #[test]
    fn test_year_token_scan() {
        assert_eq!(year_token("reportTable 2020 - 22"), Some(2020));
        assert_eq!(year_token("FY21 data 2019"), Some(2019));
        assert_eq!(year_token("202122"), None);
        assert_eq!(year_token("Sheet1"), None);
        assert_eq!(year_token("2023"), Some(2023));
    }

    #[test]
    fn test_cell_year() {
        assert_eq!(cell_year(&CellValue::Int(2021)), Some(2021));
        assert_eq!(cell_year(&CellValue::Float(2021.0)), Some(2021));
        assert_eq!(cell_year(&CellValue::Float(2021.5)), None);
        assert_eq!(cell_year(&CellValue::Int(42)), None);
        assert_eq!(cell_year(&"FY 2021-22".into()), Some(2021));
        assert_eq!(cell_year(&CellValue::Null), None);
    }

    #[test]
    fn test_clean_entity() {
        assert_eq!(clean_entity(&"  \"Acme\" ".into()), Some("Acme".to_string()));
        assert_eq!(clean_entity(&"O'Neil".into()), Some("ONeil".to_string()));
        assert_eq!(clean_entity(&"'' ".into()), None);
        assert_eq!(clean_entity(&CellValue::Null), None);
    }

    #[test]
    fn test_coerce_measure() {
        assert_eq!(coerce_measure(&"12".into()), 12.0);
        assert_eq!(coerce_measure(&"n/a".into()), 0.0);
        assert_eq!(coerce_measure(&CellValue::Bool(true)), 0.0);
        assert_eq!(coerce_measure(&CellValue::Float(f64::NAN)), 0.0);
        assert_eq!(coerce_measure(&CellValue::Int(7)), 7.0);
    }

    #[test]
    fn test_maker_category_melt() {
        let sheet = maker_sheet(
            "2021",
            vec![row(vec!["A".into(), 3.into(), 2.into(), 2021.into(), 5.into()])],
        );
        let out = normalize([&sheet]).unwrap();

        assert_eq!(out.records.len(), 3);
        assert_eq!(out.records[0].category.as_deref(), Some("2WN"));
        assert_eq!(out.records[0].value, 3.0);
        assert_eq!(out.records[1].category.as_deref(), Some("3WT"));
        assert_eq!(out.records[2].measure, MEASURE_TOTAL);
        assert_eq!(out.records[2].category, None);
        assert_eq!(out.records[2].value, 5.0);
        assert_eq!(
            out.categories.iter().collect::<Vec<_>>(),
            vec!["2WN", "3WT"]
        );
    }

    #[test]
    fn test_blank_entity_rows_dropped() {
        let sheet = maker_sheet(
            "2021",
            vec![
                row(vec!["  ".into(), 1.into(), 1.into(), 2021.into(), 2.into()]),
                row(vec!["B".into(), 1.into(), 1.into(), 2021.into(), 2.into()]),
            ],
        );
        let out = normalize([&sheet]).unwrap();
        assert_eq!(out.dropped_rows, 1);
        assert!(out.records.iter().all(|r| r.entity == "B"));
    }

    #[test]
    fn test_malformed_cells_become_zero() {
        let sheet = maker_sheet(
            "2021",
            vec![row(vec!["A".into(), "-".into(), CellValue::Null, 2021.into(), "x".into()])],
        );
        let out = normalize([&sheet]).unwrap();
        assert!(out.records.iter().all(|r| r.value == 0.0));
    }

    #[test]
    fn test_sheet_name_year_fallback() {
        let mut sheet = Sheet::with_name("reportTable 2020 - 22");
        sheet.row_append(vec!["Maker", "LMV", "Total"]);
        sheet.row_append(vec![CellValue::from("A"), 4.into(), 4.into()]);

        let out = normalize([&sheet]).unwrap();
        assert!(out.records.iter().all(|r| r.period == Period::year(2020)));
    }

    #[test]
    fn test_missing_row_year_uses_sheet_name_year() {
        let sheet = maker_sheet(
            "Data 2019",
            vec![
                row(vec!["A".into(), 1.into(), 1.into(), 2021.into(), 2.into()]),
                row(vec!["B".into(), 1.into(), 1.into(), CellValue::Null, 2.into()]),
            ],
        );
        let out = normalize([&sheet]).unwrap();
        let b = out.records.iter().find(|r| r.entity == "B").unwrap();
        assert_eq!(b.period, Period::year(2019));
    }

    #[test]
    fn test_missing_row_year_without_fallback_drops_row() {
        let sheet = maker_sheet(
            "Sheet1",
            vec![
                row(vec!["A".into(), 1.into(), 1.into(), 2021.into(), 2.into()]),
                row(vec!["B".into(), 1.into(), 1.into(), CellValue::Null, 2.into()]),
            ],
        );
        let out = normalize([&sheet]).unwrap();
        assert_eq!(out.dropped_rows, 1);
        assert!(out.records.iter().all(|r| r.entity == "A"));
    }

    #[test]
    fn test_sheet_without_period_is_skipped() {
        let mut bad = Sheet::with_name("Summary");
        bad.row_append(vec!["Maker", "LMV", "Total"]);
        bad.row_append(vec![CellValue::from("A"), 4.into(), 4.into()]);
        let good = maker_sheet(
            "2021",
            vec![row(vec!["A".into(), 1.into(), 1.into(), 2021.into(), 2.into()])],
        );

        let out = normalize([&bad, &good]).unwrap();
        assert_eq!(
            out.skipped,
            vec![SkippedSheet {
                sheet: "Summary".to_string(),
                reason: SkipReason::NoPeriod,
            }]
        );
        assert_eq!(out.records.len(), 3);
    }

    #[test]
    fn test_no_data_is_an_error() {
        let empty = Sheet::with_name("2021");
        let err = normalize([&empty]).unwrap_err();
        match err {
            CoreError::NoData { skipped } => {
                assert_eq!(skipped[0].reason, SkipReason::EmptySheet);
            }
            other => panic!("unexpected error: {other}"),
        }

        let none: Vec<Sheet> = Vec::new();
        assert!(matches!(normalize(&none), Err(CoreError::NoData { .. })));
    }

    #[test]
    fn test_header_only_sheet_is_skipped() {
        let sheet = maker_sheet("2021", Vec::new());
        assert!(matches!(normalize([&sheet]), Err(CoreError::NoData { .. })));
    }

    #[test]
    fn test_maker_month_melt() {
        let mut sheet = Sheet::with_name("Maker Month 2020");
        sheet.row_append(vec!["S No", "Maker", "JAN", "FEB", "MAR", "TOTAL"]);
        sheet.row_append(vec![
            CellValue::from(1),
            "Acme".into(),
            1.into(),
            2.into(),
            3.into(),
            6.into(),
        ]);

        let out = normalize([&sheet]).unwrap();
        let periods: Vec<String> = out.records.iter().map(|r| r.period.to_string()).collect();
        assert_eq!(periods, vec!["2020-01", "2020-02", "2020-03"]);
        assert!(out.records.iter().all(|r| r.entity == "Acme" && r.category.is_none()));
        assert!(out.records.iter().all(|r| r.measure == MEASURE_MAKER_MONTHLY));
        assert_eq!(out.records.iter().map(|r| r.value).sum::<f64>(), 6.0);
        assert!(out.categories.is_empty());
    }

    #[test]
    fn test_category_month_melt() {
        let mut sheet = Sheet::with_name("month wise");
        sheet.row_append(vec!["Vehicle Category", "Year", "Jan", "Feb", "Mar"]);
        sheet.row_append(vec![
            CellValue::from("LMV"),
            2021.into(),
            10.into(),
            20.into(),
            30.into(),
        ]);

        let out = normalize([&sheet]).unwrap();
        assert_eq!(out.records.len(), 3);
        assert!(out
            .records
            .iter()
            .all(|r| r.entity == ALL_MAKERS && r.category.as_deref() == Some("LMV")));
        assert!(out.records.iter().all(|r| r.measure == MEASURE_CATEGORY_MONTHLY));
        assert_eq!(out.records[2].period, Period::monthly(2021, 3).unwrap());
        assert!(out.categories.contains("LMV"));
    }

    #[test]
    fn test_column_mapping_overrides_heuristics() {
        let mut sheet = Sheet::with_name("2022");
        sheet.row_append(vec!["Manufacturer", "Cars", "Reg Year", "Sum"]);
        sheet.row_append(vec![CellValue::from("Acme"), 7.into(), 2022.into(), 7.into()]);

        let options = NormalizeOptions::default().with_columns(ColumnMapping {
            entity: Some("Manufacturer".to_string()),
            categories: Some(vec!["Cars".to_string()]),
            period: Some("Reg Year".to_string()),
            total: Some("Sum".to_string()),
        });
        let out = Normalizer::new(options).normalize([&sheet]).unwrap();

        assert_eq!(out.records.len(), 2);
        assert_eq!(out.records[0].category.as_deref(), Some("Cars"));
        assert_eq!(out.records[1].measure, MEASURE_TOTAL);
    }

    #[test]
    fn test_header_row_option() {
        let mut sheet = Sheet::with_name("2021");
        sheet.row_append(vec!["Registrations by maker"]);
        sheet.row_append(vec!["Maker", "2WN", "Year", "Total"]);
        sheet.row_append(vec![CellValue::from("A"), 1.into(), 2021.into(), 1.into()]);

        let out = Normalizer::new(NormalizeOptions::default().with_header_row(1))
            .normalize([&sheet])
            .unwrap();
        assert_eq!(out.records.len(), 2);
    }

    #[test]
    fn test_mixed_layouts_keep_measures_apart() {
        let mut maker_month = Sheet::with_name("Maker Month 2020");
        maker_month.row_append(vec!["Maker", "JAN", "FEB", "MAR"]);
        maker_month.row_append(vec![CellValue::from("A"), 1.into(), 1.into(), 1.into()]);
        let mut category_month = Sheet::with_name("Category Month 2020");
        category_month.row_append(vec!["Vehicle Category", "JAN", "FEB", "MAR"]);
        category_month.row_append(vec![CellValue::from("LMV"), 1.into(), 1.into(), 1.into()]);

        let out = normalize([&maker_month, &category_month]).unwrap();
        let measure = preferred_measure(&out.records);
        assert_eq!(measure, MEASURE_MAKER_MONTHLY);
        let by_year = aggregate(select_measure(&out.records, measure), &[Dimension::Year]);
        assert_eq!(by_year.total(), 3.0);

        let mut maker_category = Sheet::with_name("2020");
        maker_category.row_append(vec!["Maker", "LMV", "Year"]);
        maker_category.row_append(vec![CellValue::from("A"), 3.into(), 2020.into()]);

        let out = normalize([&maker_month, &category_month, &maker_category]).unwrap();
        for measure in [preferred_measure(&out.records), MEASURE_REGISTRATIONS] {
            let by_year = aggregate(select_measure(&out.records, measure), &[Dimension::Year]);
            assert_eq!(by_year.total(), 3.0, "measure {measure}");
        }
    }

    #[test]
    fn test_blank_header_is_not_a_category() {
        let mut sheet = Sheet::with_name("2021");
        sheet.row_append(vec!["S No", "Name", "", "X", "Yr", "Sum"]);
        sheet.row_append(vec![
            CellValue::from(1),
            "A".into(),
            9.into(),
            2.into(),
            2021.into(),
            2.into(),
        ]);

        let out = normalize([&sheet]).unwrap();
        let categories: Vec<Option<&str>> =
            out.records.iter().map(|r| r.category.as_deref()).collect();
        assert_eq!(categories, vec![Some("X"), None]);
        assert_eq!(out.categories.iter().collect::<Vec<_>>(), vec!["X"]);

        let mut buf = Vec::new();
        write_csv(&out.records, &mut buf).unwrap();
        assert_eq!(read_csv(buf.as_slice()).unwrap(), out.records);
    }
}
