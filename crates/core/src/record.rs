//! Canonical record types produced by the normalizer.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Measure name for maker x category registration counts.
pub const MEASURE_REGISTRATIONS: &str = "registrations";

/// Measure name for a row's total column.
pub const MEASURE_TOTAL: &str = "total";

/// Measure name for maker x month registration counts.
pub const MEASURE_MAKER_MONTHLY: &str = "maker_monthly";

/// Measure name for category x month counts (the `ALL MAKERS` rollup).
pub const MEASURE_CATEGORY_MONTHLY: &str = "category_monthly";

/// Every measure the normalizer emits, most preferred first.
///
/// Each one counts the same registrations from a different export, so only
/// one of them may be summed at a time.
pub const MEASURES: [&str; 4] = [
    MEASURE_TOTAL,
    MEASURE_REGISTRATIONS,
    MEASURE_MAKER_MONTHLY,
    MEASURE_CATEGORY_MONTHLY,
];

/// Entity label used for category x month sheets, which carry no maker.
pub const ALL_MAKERS: &str = "ALL MAKERS";

/// A registration period: a year, optionally refined to a month.
///
/// Ordered by year, then month, with the bare year sorting before its months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Period {
    pub year: i32,
    pub month: Option<u8>,
}

impl Period {
    /// A whole-year period.
    #[must_use]
    pub fn year(year: i32) -> Self {
        Self { year, month: None }
    }

    /// A monthly period; `None` unless `month` is in 1..=12.
    #[must_use]
    pub fn monthly(year: i32, month: u8) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self {
            year,
            month: Some(month),
        })
    }

    /// The calendar quarter of a monthly period.
    #[must_use]
    pub fn quarter(&self) -> Option<Quarter> {
        self.month.map(|month| Quarter {
            year: self.year,
            quarter: (month - 1) / 3 + 1,
        })
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.month {
            Some(month) => write!(f, "{}-{month:02}", self.year),
            None => write!(f, "{}", self.year),
        }
    }
}

impl FromStr for Period {
    type Err = CoreError;

    /// Parses `2021` or `2021-03`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidPeriod(s.to_string());
        let s = s.trim();
        match s.split_once('-') {
            Some((year, month)) => {
                let year = year.parse().map_err(|_| invalid())?;
                let month = month.parse().map_err(|_| invalid())?;
                Period::monthly(year, month).ok_or_else(invalid)
            }
            None => s.parse().map(Period::year).map_err(|_| invalid()),
        }
    }
}

/// A calendar quarter within one year. Quarters never span year boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Quarter {
    pub year: i32,
    pub quarter: u8,
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-Q{}", self.year, self.quarter)
    }
}

/// One normalized observation: how many registrations an entity had in a
/// category during a period.
///
/// `value` is always finite and `entity` is never blank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub entity: String,
    pub category: Option<String>,
    pub period: Period,
    pub measure: String,
    pub value: f64,
}

impl CanonicalRecord {
    /// Create a record, coercing a non-finite value to zero.
    pub fn new(
        entity: impl Into<String>,
        category: Option<String>,
        period: Period,
        measure: impl Into<String>,
        value: f64,
    ) -> Self {
        Self {
            entity: entity.into(),
            category,
            period,
            measure: measure.into(),
            value: if value.is_finite() { value } else { 0.0 },
        }
    }
}

/// Pick the single measure a caller most likely wants to sum: the first of
/// [`MEASURES`] present in `records`, or `registrations` when none is.
pub fn preferred_measure(records: &[CanonicalRecord]) -> &'static str {
    first_present(records, &MEASURES).unwrap_or(MEASURE_REGISTRATIONS)
}

/// Like [`preferred_measure`], restricted to measures with monthly periods.
pub fn preferred_monthly_measure(records: &[CanonicalRecord]) -> Option<&'static str> {
    first_present(records, &[MEASURE_MAKER_MONTHLY, MEASURE_CATEGORY_MONTHLY])
}

fn first_present(records: &[CanonicalRecord], measures: &[&'static str]) -> Option<&'static str> {
    measures
        .iter()
        .copied()
        .find(|&measure| records.iter().any(|r| r.measure == measure))
}
