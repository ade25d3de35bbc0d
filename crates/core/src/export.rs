//! Delimited-text export of canonical records.
//!
//! The format is a plain CSV with the header
//! `entity,category,year,month,measure,value`; a missing category or month
//! is an empty field.

use crate::error::{CoreError, CoreResult};
use crate::record::{CanonicalRecord, Period};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Column names of the export format, in order.
pub const EXPORT_HEADER: [&str; 6] = ["entity", "category", "year", "month", "measure", "value"];

#[derive(Debug, Serialize, Deserialize)]
struct ExportRow {
    entity: String,
    category: Option<String>,
    year: i32,
    month: Option<u8>,
    measure: String,
    value: f64,
}

impl From<&CanonicalRecord> for ExportRow {
    fn from(record: &CanonicalRecord) -> Self {
        Self {
            entity: record.entity.clone(),
            category: record.category.clone(),
            year: record.period.year,
            month: record.period.month,
            measure: record.measure.clone(),
            value: record.value,
        }
    }
}

/// Write records as CSV. Returns the number of records written.
pub fn write_csv<'a, I, W>(records: I, writer: W) -> CoreResult<usize>
where
    I: IntoIterator<Item = &'a CanonicalRecord>,
    W: Write,
{
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv_writer.write_record(EXPORT_HEADER)?;

    let mut count = 0;
    for record in records {
        csv_writer.serialize(ExportRow::from(record))?;
        count += 1;
    }
    csv_writer.flush()?;
    Ok(count)
}

/// Read records back from the export format.
pub fn read_csv<R: Read>(reader: R) -> CoreResult<Vec<CanonicalRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?;
    if !headers.iter().map(str::trim).eq(EXPORT_HEADER) {
        return Err(CoreError::export(
            1,
            format!(
                "expected header '{}', found '{}'",
                EXPORT_HEADER.join(","),
                headers.iter().collect::<Vec<_>>().join(",")
            ),
        ));
    }

    let mut records = Vec::new();
    for result in csv_reader.deserialize::<ExportRow>() {
        let row = result.map_err(|e| {
            let line = e.position().map_or(0, csv::Position::line);
            CoreError::export(line, e.to_string())
        })?;
        let period = match row.month {
            Some(month) => Period::monthly(row.year, month).ok_or_else(|| {
                CoreError::export(
                    records.len() as u64 + 2,
                    format!("month {month} is out of range"),
                )
            })?,
            None => Period::year(row.year),
        };
        if row.entity.trim().is_empty() {
            return Err(CoreError::export(records.len() as u64 + 2, "entity is blank"));
        }
        records.push(CanonicalRecord::new(
            row.entity,
            row.category.filter(|c| !c.is_empty()),
            period,
            row.measure,
            row.value,
        ));
    }
    Ok(records)
}

/// Suggested file name for an export covering `records`:
/// `vehicle_registrations_{first year}_{last year}.csv`.
pub fn default_file_name<'a, I>(records: I) -> String
where
    I: IntoIterator<Item = &'a CanonicalRecord>,
{
    let (min, max) = records
        .into_iter()
        .map(|r| r.period.year)
        .fold((None, None), |(min, max): (Option<i32>, Option<i32>), year| {
            (
                Some(min.map_or(year, |m| m.min(year))),
                Some(max.map_or(year, |m| m.max(year))),
            )
        });
    match (min, max) {
        (Some(min), Some(max)) => format!("vehicle_registrations_{min}_{max}.csv"),
        _ => "vehicle_registrations.csv".to_string(),
    }
}
