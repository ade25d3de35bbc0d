//! # regdash-core
//!
//! Normalization and metrics for vehicle-registration spreadsheets.
//!
//! This crate provides:
//! - the [`Normalizer`], which turns raw sheets into [`CanonicalRecord`]s
//! - filtering, aggregation, growth, market share and top-N over records
//! - a CSV export of the canonical record set
//!
//! ```
//! use regdash_core::{aggregate, apply_filter, Dimension, FilterSelection, Normalizer};
//! use regdash_sheet::Sheet;
//!
//! let sheet = Sheet::from_data(vec![
//!     vec!["Maker", "2WN", "3WT", "Year", "Total"],
//!     vec!["A", "3", "2", "2021", "5"],
//! ]);
//! let normalized = Normalizer::default().normalize([&sheet]).unwrap();
//!
//! let selection = FilterSelection::covering(&normalized.records).unwrap();
//! let filtered = apply_filter(&normalized.records, &selection);
//! let by_category = aggregate(filtered, &[Dimension::Category]);
//! assert_eq!(by_category.len(), 3);
//! ```

/// Normalizer configuration.
pub mod config;
/// Error types and result aliases.
pub mod error;
/// Delimited-text export.
pub mod export;
/// Record filtering.
pub mod filter;
/// Sheet layout classification.
pub mod layout;
/// Aggregation, growth, share and ranking.
pub mod metrics;
/// Sheet normalization.
pub mod normalize;
/// Canonical record types.
pub mod record;
/// Column-role detection rules.
pub mod rules;

pub use config::{ColumnMapping, NormalizeOptions};
pub use error::{CoreError, CoreResult};
pub use export::{default_file_name, read_csv, write_csv};
pub use filter::{apply_filter, select_measure, FilterSelection, PeriodRange};
pub use metrics::{
    aggregate, growth, market_share, summarize, top_n, Aggregation, Dimension, GroupKey,
    GrowthPoint, GrowthSeries, KeyPart, Share, Summary,
};
pub use normalize::{Normalized, Normalizer, SkipReason, SkippedSheet};
pub use record::{
    preferred_measure, preferred_monthly_measure, CanonicalRecord, Period, Quarter, ALL_MAKERS,
    MEASURES, MEASURE_CATEGORY_MONTHLY, MEASURE_MAKER_MONTHLY, MEASURE_REGISTRATIONS,
    MEASURE_TOTAL,
};
pub use rules::{ColumnRole, DetectionRule, DetectionRules};
