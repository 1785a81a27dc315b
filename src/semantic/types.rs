use crate::builder::AggregateFn;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    #[serde(default)]
    pub id: String,
    pub name: String,
    /// SQL expression over the base table, e.g. `amount - discount`.
    pub expression: String,
    pub aggregation: AggregateFn,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Display format hint such as `currency` or `percent`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DimensionType {
    Categorical,
    Temporal,
    Numeric,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dimension {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub table: String,
    pub column: String,
    pub dimension_type: DimensionType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    #[serde(default)]
    pub id: String,
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
    pub relationship_type: RelationshipType,
    /// Declared by a user rather than backed by a foreign key.
    #[serde(default)]
    pub is_virtual: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticModel {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub base_table: String,
    #[serde(default)]
    pub metrics: Vec<Metric>,
    #[serde(default)]
    pub dimensions: Vec<Dimension>,
}

fn required(errors: &mut Vec<String>, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.push(format!("{} is required", field));
    }
}

impl Metric {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        required(&mut errors, "Metric name", &self.name);
        required(&mut errors, "Metric expression", &self.expression);
        errors
    }
}

impl Dimension {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        required(&mut errors, "Dimension name", &self.name);
        required(&mut errors, "Dimension table", &self.table);
        required(&mut errors, "Dimension column", &self.column);
        errors
    }
}

impl Relationship {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        required(&mut errors, "From table", &self.from_table);
        required(&mut errors, "From column", &self.from_column);
        required(&mut errors, "To table", &self.to_table);
        required(&mut errors, "To column", &self.to_column);
        if self.from_table == self.to_table && self.from_column == self.to_column {
            errors.push("A relationship cannot join a column to itself".to_string());
        }
        errors
    }
}

impl SemanticModel {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        required(&mut errors, "Model name", &self.name);
        required(&mut errors, "Base table", &self.base_table);
        for metric in &self.metrics {
            errors.extend(metric.validate());
        }
        for dimension in &self.dimensions {
            errors.extend(dimension.validate());
        }
        let mut names: Vec<&str> = self.metrics.iter().map(|m| m.name.as_str()).collect();
        names.sort_unstable();
        for pair in names.windows(2) {
            if pair[0] == pair[1] {
                errors.push(format!("Metric \"{}\" is defined more than once", pair[0]));
            }
        }
        errors
    }
}
