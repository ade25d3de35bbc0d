//! Aggregations over canonical records.
//!
//! Every function here is a pure computation over an already-filtered record
//! set; nothing is cached between calls.

use crate::error::{CoreError, CoreResult};
use crate::filter::PeriodRange;
use crate::record::{CanonicalRecord, Period, Quarter};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// A grouping axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Entity,
    Category,
    Period,
    Year,
    Quarter,
}

impl Dimension {
    /// The key part of a record along this dimension.
    pub fn key_of(self, record: &CanonicalRecord) -> KeyPart {
        match self {
            Dimension::Entity => KeyPart::Entity(record.entity.clone()),
            Dimension::Category => KeyPart::Category(record.category.clone()),
            Dimension::Period => KeyPart::Period(record.period),
            Dimension::Year => KeyPart::Year(record.period.year),
            Dimension::Quarter => KeyPart::Quarter(record.period.quarter()),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dimension::Entity => "entity",
            Dimension::Category => "category",
            Dimension::Period => "period",
            Dimension::Year => "year",
            Dimension::Quarter => "quarter",
        };
        f.write_str(name)
    }
}

impl FromStr for Dimension {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "entity" | "maker" => Ok(Dimension::Entity),
            "category" => Ok(Dimension::Category),
            "period" => Ok(Dimension::Period),
            "year" => Ok(Dimension::Year),
            "quarter" => Ok(Dimension::Quarter),
            _ => Err(CoreError::UnknownDimension(s.to_string())),
        }
    }
}

/// One component of a group key. `None` marks a record that lacks the
/// dimension (no category, or no quarter for a whole-year period).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum KeyPart {
    Entity(String),
    Category(Option<String>),
    Period(Period),
    Year(i32),
    Quarter(Option<Quarter>),
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::Entity(entity) => f.write_str(entity),
            KeyPart::Category(Some(category)) => f.write_str(category),
            KeyPart::Period(period) => write!(f, "{period}"),
            KeyPart::Year(year) => write!(f, "{year}"),
            KeyPart::Quarter(Some(quarter)) => write!(f, "{quarter}"),
            KeyPart::Category(None) | KeyPart::Quarter(None) => f.write_str("-"),
        }
    }
}

/// A group key: one part per requested dimension, in request order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct GroupKey(pub Vec<KeyPart>);

impl GroupKey {
    /// The key parts.
    pub fn parts(&self) -> &[KeyPart] {
        &self.0
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" / ")?;
            }
            write!(f, "{part}")?;
        }
        Ok(())
    }
}

/// Grouped sums, ordered by key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregation {
    pub dimensions: Vec<Dimension>,
    pub groups: BTreeMap<GroupKey, f64>,
}

impl Aggregation {
    /// Number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether there are no groups.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Sum over every group.
    pub fn total(&self) -> f64 {
        self.groups.values().sum()
    }

    /// The value of one group.
    pub fn get(&self, key: &GroupKey) -> Option<f64> {
        self.groups.get(key).copied()
    }

    /// Iterate groups in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&GroupKey, f64)> {
        self.groups.iter().map(|(key, value)| (key, *value))
    }
}

/// Sum record values grouped by `dimensions`.
///
/// With no dimensions every record lands in a single group with an empty key.
pub fn aggregate<'a, I>(records: I, dimensions: &[Dimension]) -> Aggregation
where
    I: IntoIterator<Item = &'a CanonicalRecord>,
{
    let mut groups = BTreeMap::new();
    for record in records {
        let key = GroupKey(dimensions.iter().map(|d| d.key_of(record)).collect());
        *groups.entry(key).or_insert(0.0) += record.value;
    }
    Aggregation {
        dimensions: dimensions.to_vec(),
        groups,
    }
}

/// One point of a growth series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthPoint {
    /// Position along the series dimension.
    pub at: KeyPart,
    pub value: f64,
    /// Change from the previous point; `None` for the first point.
    pub absolute_delta: Option<f64>,
    /// Percent change from the previous point; `None` for the first point
    /// and whenever the previous value is zero.
    pub percent_delta: Option<f64>,
}

/// A growth series for one combination of the non-series dimensions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthSeries {
    pub key: GroupKey,
    pub points: Vec<GrowthPoint>,
}

/// Change between two consecutive values: `(absolute, percent)`.
pub fn change(previous: f64, current: f64) -> (f64, Option<f64>) {
    let absolute = current - previous;
    let percent = (previous != 0.0).then(|| absolute / previous * 100.0);
    (absolute, percent)
}

/// Period-over-period growth along `series`.
///
/// Groups are formed by the remaining dimensions of the aggregation and
/// ordered by the series dimension. Along [`Dimension::Quarter`], groups of
/// whole-year records have no quarter and are left out of the series. Fails
/// with
/// [`CoreError::MissingDimension`] when the aggregation is not grouped by
/// `series`.
pub fn growth(aggregation: &Aggregation, series: Dimension) -> CoreResult<Vec<GrowthSeries>> {
    let index = aggregation
        .dimensions
        .iter()
        .position(|&d| d == series)
        .ok_or(CoreError::MissingDimension(series))?;

    let mut grouped: BTreeMap<GroupKey, Vec<(KeyPart, f64)>> = BTreeMap::new();
    for (key, value) in aggregation.iter() {
        let mut rest = key.0.clone();
        let at = rest.remove(index);
        if at == KeyPart::Quarter(None) {
            continue;
        }
        grouped.entry(GroupKey(rest)).or_default().push((at, value));
    }

    Ok(grouped
        .into_iter()
        .map(|(key, mut values)| {
            values.sort_by(|a, b| a.0.cmp(&b.0));
            let mut previous: Option<f64> = None;
            let points = values
                .into_iter()
                .map(|(at, value)| {
                    let (absolute_delta, percent_delta) = match previous {
                        Some(prev) => {
                            let (absolute, percent) = change(prev, value);
                            (Some(absolute), percent)
                        }
                        None => (None, None),
                    };
                    previous = Some(value);
                    GrowthPoint {
                        at,
                        value,
                        absolute_delta,
                        percent_delta,
                    }
                })
                .collect();
            GrowthSeries { key, points }
        })
        .collect())
}

/// One entity's share of a period's total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Share {
    pub entity: String,
    pub value: f64,
    /// Percentage of the selected entities' combined value; `None` when that
    /// combined value is zero.
    pub share: Option<f64>,
}

/// Market share of each selected entity within `period`.
///
/// A whole-year period includes that year's monthly records. Entities with
/// no records in the period get a zero value. Results are ordered by
/// descending value, ties by entity name.
pub fn market_share<'a, I>(records: I, period: Period, entities: &BTreeSet<String>) -> Vec<Share>
where
    I: IntoIterator<Item = &'a CanonicalRecord>,
{
    let range = PeriodRange::new(period, period);
    let mut values: BTreeMap<&str, f64> = entities.iter().map(|e| (e.as_str(), 0.0)).collect();
    for record in records {
        if !range.contains(record.period) {
            continue;
        }
        if let Some(value) = values.get_mut(record.entity.as_str()) {
            *value += record.value;
        }
    }

    let total: f64 = values.values().sum();
    let mut shares: Vec<Share> = values
        .into_iter()
        .map(|(entity, value)| Share {
            entity: entity.to_string(),
            value,
            share: (total != 0.0).then(|| value / total * 100.0),
        })
        .collect();
    shares.sort_by(|a, b| b.value.total_cmp(&a.value).then_with(|| a.entity.cmp(&b.entity)));
    shares
}

/// The `n` largest groups, by descending value with ties broken by
/// ascending key. Asking for more than exist returns them all.
pub fn top_n(aggregation: &Aggregation, n: usize) -> Vec<(GroupKey, f64)> {
    let mut ranked: Vec<(GroupKey, f64)> = aggregation
        .iter()
        .map(|(key, value)| (key.clone(), value))
        .collect();
    ranked.sort_by(|a, b| match b.1.total_cmp(&a.1) {
        Ordering::Equal => a.0.cmp(&b.0),
        other => other,
    });
    ranked.truncate(n);
    ranked
}

/// Headline figures for a record set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub total: f64,
    pub records: usize,
    pub entities: usize,
    pub years: Vec<i32>,
    pub average_per_year: Option<f64>,
    pub latest_year: Option<i32>,
    pub latest_total: Option<f64>,
    /// Change of the latest year versus the previous year present.
    pub latest_absolute_delta: Option<f64>,
    pub latest_percent_delta: Option<f64>,
}

/// Compute headline figures. Empty input yields zeros and `None`s.
pub fn summarize<'a, I>(records: I) -> Summary
where
    I: IntoIterator<Item = &'a CanonicalRecord>,
{
    let mut summary = Summary::default();
    let mut entities = BTreeSet::new();
    let mut by_year: BTreeMap<i32, f64> = BTreeMap::new();

    for record in records {
        summary.total += record.value;
        summary.records += 1;
        entities.insert(record.entity.as_str());
        *by_year.entry(record.period.year).or_insert(0.0) += record.value;
    }

    summary.entities = entities.len();
    summary.years = by_year.keys().copied().collect();
    if !by_year.is_empty() {
        summary.average_per_year = Some(summary.total / by_year.len() as f64);
    }

    let mut latest = by_year.iter().rev();
    if let Some((&year, &total)) = latest.next() {
        summary.latest_year = Some(year);
        summary.latest_total = Some(total);
        if let Some((_, &previous)) = latest.next() {
            let (absolute, percent) = change(previous, total);
            summary.latest_absolute_delta = Some(absolute);
            summary.latest_percent_delta = percent;
        }
    }
    summary
}
