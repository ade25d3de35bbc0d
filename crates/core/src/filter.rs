//! Record filtering.

use crate::record::{CanonicalRecord, Period};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// An inclusive period range.
///
/// A yearly bound compares at year granularity, so `2021..=2021` admits
/// every month of 2021.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodRange {
    pub min: Period,
    pub max: Period,
}

impl PeriodRange {
    /// Create a range from two bounds.
    pub fn new(min: Period, max: Period) -> Self {
        Self { min, max }
    }

    /// The range covering whole years `from..=to`.
    pub fn years(from: i32, to: i32) -> Self {
        Self::new(Period::year(from), Period::year(to))
    }

    /// Whether a period lies inside the range.
    pub fn contains(&self, period: Period) -> bool {
        let above_min = match self.min.month {
            None => period.year >= self.min.year,
            Some(_) => period >= self.min,
        };
        let below_max = match self.max.month {
            None => period.year <= self.max.year,
            Some(_) => period <= self.max,
        };
        above_min && below_max
    }
}

/// The user's current filter choices.
///
/// Both sets are explicit: an empty entity set excludes every record, and an
/// empty category set excludes every categorized record. Records without a
/// category (row totals, maker x month series) are constrained by period and
/// entity only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSelection {
    pub period_range: PeriodRange,
    pub entities: BTreeSet<String>,
    pub categories: BTreeSet<String>,
}

impl FilterSelection {
    /// An explicit selection.
    pub fn new(
        period_range: PeriodRange,
        entities: impl IntoIterator<Item = String>,
        categories: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            period_range,
            entities: entities.into_iter().collect(),
            categories: categories.into_iter().collect(),
        }
    }

    /// The selection that admits every record of `records`: every entity,
    /// every category and the full period range. `None` for no records.
    pub fn covering(records: &[CanonicalRecord]) -> Option<Self> {
        let min = records.iter().map(|r| r.period).min()?;
        let max = records.iter().map(|r| r.period).max()?;
        Some(Self {
            period_range: PeriodRange::new(Period::year(min.year), Period::year(max.year)),
            entities: records.iter().map(|r| r.entity.clone()).collect(),
            categories: records.iter().filter_map(|r| r.category.clone()).collect(),
        })
    }

    /// Replace the period range.
    #[must_use]
    pub fn with_period_range(mut self, range: PeriodRange) -> Self {
        self.period_range = range;
        self
    }

    /// Replace the entity set.
    #[must_use]
    pub fn with_entities<S: Into<String>>(mut self, entities: impl IntoIterator<Item = S>) -> Self {
        self.entities = entities.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the category set.
    #[must_use]
    pub fn with_categories<S: Into<String>>(
        mut self,
        categories: impl IntoIterator<Item = S>,
    ) -> Self {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    /// Whether a record passes the filter.
    pub fn matches(&self, record: &CanonicalRecord) -> bool {
        self.period_range.contains(record.period)
            && self.entities.contains(&record.entity)
            && record
                .category
                .as_ref()
                .map_or(true, |category| self.categories.contains(category))
    }
}

/// Keep the records matching `selection`, preserving their order.
pub fn apply_filter<'a>(
    records: &'a [CanonicalRecord],
    selection: &FilterSelection,
) -> Vec<&'a CanonicalRecord> {
    records.iter().filter(|r| selection.matches(r)).collect()
}

/// Keep the records of one measure, preserving their order.
///
/// Aggregating several measures together counts the same registrations
/// twice, so callers usually narrow to one measure before summing.
pub fn select_measure<'a, I>(records: I, measure: &str) -> Vec<&'a CanonicalRecord>
where
    I: IntoIterator<Item = &'a CanonicalRecord>,
{
    records.into_iter().filter(|r| r.measure == measure).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{MEASURE_MAKER_MONTHLY, MEASURE_REGISTRATIONS, MEASURE_TOTAL};

    fn records() -> Vec<CanonicalRecord> {
        vec![
            CanonicalRecord::new("A", Some("2WN".into()), Period::year(2021), MEASURE_REGISTRATIONS, 3.0),
            CanonicalRecord::new("A", None, Period::year(2021), MEASURE_TOTAL, 3.0),
            CanonicalRecord::new("B", Some("LMV".into()), Period::year(2022), MEASURE_REGISTRATIONS, 4.0),
            CanonicalRecord::new("B", None, Period::monthly(2022, 5).unwrap(), MEASURE_MAKER_MONTHLY, 1.0),
        ]
    }

    #[test]
    fn test_covering_admits_everything() {
        let records = records();
        let selection = FilterSelection::covering(&records).unwrap();
        assert_eq!(apply_filter(&records, &selection).len(), records.len());
        assert_eq!(selection.period_range, PeriodRange::years(2021, 2022));
        assert!(FilterSelection::covering(&[]).is_none());
    }

    #[test]
    fn test_empty_entity_set_excludes_all() {
        let records = records();
        let selection = FilterSelection::covering(&records)
            .unwrap()
            .with_entities(Vec::<String>::new());
        assert!(apply_filter(&records, &selection).is_empty());
    }

    #[test]
    fn test_empty_category_set_keeps_uncategorized() {
        let records = records();
        let selection = FilterSelection::covering(&records)
            .unwrap()
            .with_categories(Vec::<String>::new());
        let kept = apply_filter(&records, &selection);
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|r| r.category.is_none()));
    }

    #[test]
    fn test_filter_preserves_order_and_subsets() {
        let records = records();
        let selection = FilterSelection::covering(&records)
            .unwrap()
            .with_entities(["B"]);
        let kept = apply_filter(&records, &selection);
        assert_eq!(kept, vec![&records[2], &records[3]]);
    }

    #[test]
    fn test_yearly_bounds_admit_months() {
        let range = PeriodRange::years(2022, 2022);
        assert!(range.contains(Period::monthly(2022, 12).unwrap()));
        assert!(range.contains(Period::year(2022)));
        assert!(!range.contains(Period::monthly(2021, 12).unwrap()));
    }

    #[test]
    fn test_monthly_bounds() {
        let range = PeriodRange::new(
            Period::monthly(2021, 3).unwrap(),
            Period::monthly(2021, 6).unwrap(),
        );
        assert!(range.contains(Period::monthly(2021, 3).unwrap()));
        assert!(range.contains(Period::monthly(2021, 6).unwrap()));
        assert!(!range.contains(Period::monthly(2021, 7).unwrap()));
        assert!(!range.contains(Period::monthly(2021, 2).unwrap()));
        // A whole-year record is not inside a part-year range
        assert!(!range.contains(Period::year(2021)));
    }

    #[test]
    fn test_select_measure() {
        let records = records();
        let totals = select_measure(&records, MEASURE_TOTAL);
        assert_eq!(totals, vec![&records[1]]);
        assert_eq!(select_measure(&records, MEASURE_REGISTRATIONS).len(), 2);
        assert_eq!(select_measure(&records, MEASURE_MAKER_MONTHLY), vec![&records[3]]);
    }

    #[test]
    fn test_period_range_excludes_years() {
        let records = records();
        let selection = FilterSelection::covering(&records)
            .unwrap()
            .with_period_range(PeriodRange::years(2022, 2023));
        assert!(apply_filter(&records, &selection)
            .iter()
            .all(|r| r.period.year == 2022));
    }
}
