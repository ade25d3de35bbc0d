//! Column-role detection.
//!
//! Source spreadsheets name their columns inconsistently from year to year,
//! so each role (entity, category, period, total) is resolved by an ordered
//! list of [`DetectionRule`]s. Rules are tried in order and the first one that
//! matches any column wins; later rules are fallbacks.
//!
//! The default rule set reproduces the historical heuristics:
//!
//! | role     | rules, in priority order                                        |
//! |----------|-----------------------------------------------------------------|
//! | entity   | name contains `maker`; second column                             |
//! | category | name contains a known category token; columns between the entity column and the last two |
//! | period   | name contains `year`; second-to-last column                     |
//! | total    | name contains `total`; last column                              |

use crate::config::ColumnMapping;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Vehicle-class codes recognised as category columns by default.
pub const DEFAULT_CATEGORY_TOKENS: &[&str] = &[
    "2WN", "2WT", "3WN", "3WT", "3WH", "LMV", "HMV", "LGV", "LPV", "MCV", "MMV", "MPV", "OTH",
];

/// The role a column plays in a maker x category sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    Entity,
    Category,
    Period,
    Total,
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnRole::Entity => "entity",
            ColumnRole::Category => "category",
            ColumnRole::Period => "period",
            ColumnRole::Total => "total",
        };
        f.write_str(name)
    }
}

/// A single way of locating columns in a header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectionRule {
    /// Columns whose trimmed name equals one of these names
    /// (case-insensitive), in the order the names are listed.
    Named(Vec<String>),
    /// The first column whose name contains the needle (case-insensitive).
    NameContains(String),
    /// Every column whose name contains any of the tokens (case-insensitive),
    /// in header order.
    NameContainsAny(Vec<String>),
    /// The column at this zero-based position.
    FromStart(usize),
    /// The column at this position counted from the end; 1 is the last column.
    FromEnd(usize),
    /// Every column strictly between the entity column and the last `n` columns.
    BetweenEntityAndLast(usize),
}

impl DetectionRule {
    /// Evaluate the rule against a header row.
    ///
    /// `entity` is the already-resolved entity column, needed by
    /// [`DetectionRule::BetweenEntityAndLast`].
    pub fn evaluate(&self, header: &[String], entity: Option<usize>) -> Vec<usize> {
        match self {
            DetectionRule::Named(names) => names
                .iter()
                .filter_map(|name| {
                    header
                        .iter()
                        .position(|column| column.trim().eq_ignore_ascii_case(name.trim()))
                })
                .collect(),
            DetectionRule::NameContains(needle) => {
                let needle = needle.to_lowercase();
                header
                    .iter()
                    .position(|column| column.to_lowercase().contains(&needle))
                    .into_iter()
                    .collect()
            }
            DetectionRule::NameContainsAny(tokens) => {
                let tokens: Vec<String> = tokens.iter().map(|t| t.to_uppercase()).collect();
                header
                    .iter()
                    .enumerate()
                    .filter(|(_, column)| {
                        let column = column.to_uppercase();
                        tokens.iter().any(|token| column.contains(token.as_str()))
                    })
                    .map(|(index, _)| index)
                    .collect()
            }
            DetectionRule::FromStart(index) => {
                (*index < header.len()).then_some(*index).into_iter().collect()
            }
            DetectionRule::FromEnd(offset) => header
                .len()
                .checked_sub(*offset)
                .filter(|_| *offset > 0)
                .into_iter()
                .collect(),
            DetectionRule::BetweenEntityAndLast(n) => match entity {
                Some(entity) => {
                    let end = header.len().saturating_sub(*n);
                    (entity + 1..end).collect()
                }
                None => Vec::new(),
            },
        }
    }
}

impl fmt::Display for DetectionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectionRule::Named(names) => write!(f, "named {}", names.join("|")),
            DetectionRule::NameContains(needle) => write!(f, "name contains '{needle}'"),
            DetectionRule::NameContainsAny(tokens) => {
                write!(f, "name contains any of {} tokens", tokens.len())
            }
            DetectionRule::FromStart(index) => write!(f, "column #{}", index + 1),
            DetectionRule::FromEnd(offset) => write!(f, "column #{offset} from the end"),
            DetectionRule::BetweenEntityAndLast(n) => {
                write!(f, "columns between entity and last {n}")
            }
        }
    }
}

/// Columns resolved for one role, with the rule that found them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleMatch {
    pub columns: Vec<usize>,
    pub rule: DetectionRule,
}

/// The result of running a [`DetectionRules`] set over one header row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnLayout {
    pub entity: Option<RoleMatch>,
    pub categories: Option<RoleMatch>,
    pub period: Option<RoleMatch>,
    pub total: Option<RoleMatch>,
}

impl ColumnLayout {
    /// The entity column.
    pub fn entity_column(&self) -> Option<usize> {
        first_column(self.entity.as_ref())
    }

    /// The category columns (possibly empty).
    pub fn category_columns(&self) -> &[usize] {
        self.categories
            .as_ref()
            .map(|m| m.columns.as_slice())
            .unwrap_or_default()
    }

    /// The period column.
    pub fn period_column(&self) -> Option<usize> {
        first_column(self.period.as_ref())
    }

    /// The total column.
    pub fn total_column(&self) -> Option<usize> {
        first_column(self.total.as_ref())
    }
}

fn first_column(role: Option<&RoleMatch>) -> Option<usize> {
    role.and_then(|m| m.columns.first().copied())
}

/// Ordered detection rules for every column role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionRules {
    entity: Vec<DetectionRule>,
    category: Vec<DetectionRule>,
    period: Vec<DetectionRule>,
    total: Vec<DetectionRule>,
}

impl DetectionRules {
    /// The default heuristic rules with the given category tokens.
    pub fn heuristic<S: AsRef<str>>(category_tokens: &[S]) -> Self {
        let tokens = category_tokens
            .iter()
            .map(|t| t.as_ref().to_string())
            .collect();
        Self {
            entity: vec![
                DetectionRule::NameContains("maker".to_string()),
                DetectionRule::FromStart(1),
            ],
            category: vec![
                DetectionRule::NameContainsAny(tokens),
                DetectionRule::BetweenEntityAndLast(2),
            ],
            period: vec![
                DetectionRule::NameContains("year".to_string()),
                DetectionRule::FromEnd(2),
            ],
            total: vec![
                DetectionRule::NameContains("total".to_string()),
                DetectionRule::FromEnd(1),
            ],
        }
    }

    /// Pin roles to explicit column names. Pinned roles replace the heuristic
    /// entirely; roles left unset in the mapping keep their default rules.
    #[must_use]
    pub fn with_mapping(mut self, mapping: &ColumnMapping) -> Self {
        if let Some(entity) = &mapping.entity {
            self.entity = vec![DetectionRule::Named(vec![entity.clone()])];
        }
        if let Some(categories) = &mapping.categories {
            self.category = vec![DetectionRule::Named(categories.clone())];
        }
        if let Some(period) = &mapping.period {
            self.period = vec![DetectionRule::Named(vec![period.clone()])];
        }
        if let Some(total) = &mapping.total {
            self.total = vec![DetectionRule::Named(vec![total.clone()])];
        }
        self
    }

    /// The rules for a role, in priority order.
    pub fn rules_for(&self, role: ColumnRole) -> &[DetectionRule] {
        match role {
            ColumnRole::Entity => &self.entity,
            ColumnRole::Category => &self.category,
            ColumnRole::Period => &self.period,
            ColumnRole::Total => &self.total,
        }
    }

    /// Resolve a single role: the first rule that matches any column wins.
    pub fn detect_role(
        &self,
        role: ColumnRole,
        header: &[String],
        entity: Option<usize>,
    ) -> Option<RoleMatch> {
        self.rules_for(role).iter().find_map(|rule| {
            let columns = rule.evaluate(header, entity);
            (!columns.is_empty()).then(|| RoleMatch {
                columns,
                rule: rule.clone(),
            })
        })
    }

    /// Resolve every role for a header row. The entity is resolved first
    /// because the positional category fallback is relative to it.
    pub fn detect(&self, header: &[String]) -> ColumnLayout {
        let entity = self.detect_role(ColumnRole::Entity, header, None);
        let entity_column = first_column(entity.as_ref());
        ColumnLayout {
            categories: self.detect_role(ColumnRole::Category, header, entity_column),
            period: self.detect_role(ColumnRole::Period, header, entity_column),
            total: self.detect_role(ColumnRole::Total, header, entity_column),
            entity,
        }
    }
}

impl Default for DetectionRules {
    fn default() -> Self {
        Self::heuristic(DEFAULT_CATEGORY_TOKENS)
    }
}
