use super::graph::{JoinEdge, QueryChange};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Everything the SQL generator needs to render one query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VisualQueryConfig {
    pub tables: Vec<String>,
    pub columns: Vec<SelectedColumn>,
    pub joins: Vec<JoinEdge>,
    pub filters: FilterGroup,
    pub aggregations: Vec<Aggregation>,
    pub group_by: Vec<ColumnRef>,
    pub having: HavingGroup,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(table: &str, column: &str) -> Self {
        Self {
            table: table.to_string(),
            column: column.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedColumn {
    pub table: String,
    pub column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Logic {
    #[default]
    And,
    Or,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterGroup {
    pub logic: Logic,
    pub conditions: Vec<FilterCondition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub table: String,
    pub column: String,
    pub predicate: Predicate,
}

/// Comparison applied by a WHERE or HAVING condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operator", content = "value", rename_all = "snake_case")]
pub enum Predicate {
    Equals(Value),
    NotEquals(Value),
    GreaterThan(Value),
    GreaterOrEqual(Value),
    LessThan(Value),
    LessOrEqual(Value),
    Like(String),
    In(Vec<Value>),
    Between(Value, Value),
    IsNull,
    IsNotNull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AggregateFn {
    Count,
    CountDistinct,
    Sum,
    Avg,
    Min,
    Max,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    pub function: AggregateFn,
    pub table: String,
    pub column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HavingGroup {
    pub logic: Logic,
    pub conditions: Vec<HavingCondition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HavingCondition {
    pub function: AggregateFn,
    pub table: String,
    pub column: String,
    pub predicate: Predicate,
}

/// Badge shown next to the SQL preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

impl Complexity {
    pub fn label(&self) -> &'static str {
        match self {
            Complexity::Simple => "Simple",
            Complexity::Moderate => "Moderate",
            Complexity::Complex => "Complex",
        }
    }
}

impl VisualQueryConfig {
    /// One point per feature in use: multiple tables, joins, filters,
    /// aggregations, grouping, having.
    pub fn complexity_score(&self) -> u8 {
        [
            self.tables.len() > 1,
            !self.joins.is_empty(),
            !self.filters.conditions.is_empty(),
            !self.aggregations.is_empty(),
            !self.group_by.is_empty(),
            !self.having.conditions.is_empty(),
        ]
        .iter()
        .filter(|used| **used)
        .count() as u8
    }

    /// `None` means no badge.
    pub fn complexity(&self) -> Option<Complexity> {
        match self.complexity_score() {
            0 => None,
            1..=2 => Some(Complexity::Simple),
            3..=4 => Some(Complexity::Moderate),
            _ => Some(Complexity::Complex),
        }
    }

    /// Take tables and joins from the canvas. Columns, filters, grouping
    /// and aggregations that point at tables no longer on the canvas are
    /// dropped.
    pub fn apply_change(&mut self, change: &QueryChange) {
        self.tables = change.tables.clone();
        self.joins = change.joins.clone();

        let present: HashSet<&str> = self.tables.iter().map(String::as_str).collect();
        self.columns.retain(|c| present.contains(c.table.as_str()));
        self.filters
            .conditions
            .retain(|c| present.contains(c.table.as_str()));
        self.aggregations
            .retain(|a| present.contains(a.table.as_str()));
        self.group_by.retain(|g| present.contains(g.table.as_str()));
        self.having
            .conditions
            .retain(|h| present.contains(h.table.as_str()));
    }

    pub fn summary(&self) -> ConfigSummary {
        ConfigSummary {
            tables: self.tables.len(),
            columns: self.columns.len(),
            joins: self.joins.len(),
            filters: self.filters.conditions.len(),
            aggregations: self.aggregations.len(),
            group_by: self.group_by.len(),
            having: self.having.conditions.len(),
            limit: self.limit,
        }
    }
}

/// Counts shown in the expanded row of the load dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSummary {
    pub tables: usize,
    pub columns: usize,
    pub joins: usize,
    pub filters: usize,
    pub aggregations: usize,
    pub group_by: usize,
    pub having: usize,
    pub limit: Option<u64>,
}
