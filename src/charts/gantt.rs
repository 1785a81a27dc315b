use super::{ChartAdapter, ValidationResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

/// A task boundary: either a calendar date (`2024-01-01`) or an RFC 3339
/// timestamp (`2024-01-01T09:00:00Z`). Dates compare as midnight UTC.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskTime {
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
}

impl TaskTime {
    pub fn instant(&self) -> NaiveDateTime {
        match self {
            TaskTime::Date(date) => date.and_time(NaiveTime::MIN),
            TaskTime::DateTime(at) => at.naive_utc(),
        }
    }
}

impl PartialEq for TaskTime {
    fn eq(&self, other: &Self) -> bool {
        self.instant() == other.instant()
    }
}

impl Eq for TaskTime {}

impl PartialOrd for TaskTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TaskTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.instant().cmp(&other.instant())
    }
}

impl fmt::Display for TaskTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskTime::Date(date) => write!(f, "{}", date),
            TaskTime::DateTime(at) => {
                write!(f, "{}", at.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
        }
    }
}

impl From<NaiveDate> for TaskTime {
    fn from(date: NaiveDate) -> Self {
        TaskTime::Date(date)
    }
}

impl From<DateTime<Utc>> for TaskTime {
    fn from(at: DateTime<Utc>) -> Self {
        TaskTime::DateTime(at)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GanttTask {
    pub id: String,
    pub name: String,
    pub start: TaskTime,
    pub end: TaskTime,
    /// Percent complete, 0..=100.
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GanttData {
    pub tasks: Vec<GanttTask>,
}

pub struct GanttChart;

impl ChartAdapter for GanttChart {
    type Data = GanttData;

    const EMPTY_MESSAGE: &'static str = "No tasks to display";

    fn validate(data: &GanttData) -> ValidationResult {
        let ids: HashSet<&str> = data.tasks.iter().map(|t| t.id.as_str()).collect();
        let mut errors = Vec::new();

        for task in &data.tasks {
            if task.start > task.end {
                errors.push(format!(
                    "Task \"{}\": start date {} is after end date {}",
                    task.name, task.start, task.end
                ));
            }
            if let Some(progress) = task.progress {
                if !(0.0..=100.0).contains(&progress) {
                    errors.push(format!(
                        "Task \"{}\": progress must be between 0 and 100, got {}",
                        task.name, progress
                    ));
                }
            }
            for dep in &task.dependencies {
                if !ids.contains(dep.as_str()) {
                    errors.push(format!(
                        "Task \"{}\": depends on unknown task \"{}\"",
                        task.name, dep
                    ));
                }
            }
        }

        ValidationResult::from_errors(errors)
    }

    fn is_empty(data: &GanttData) -> bool {
        data.tasks.is_empty()
    }

    fn build_option(data: &GanttData) -> Value {
        let names: Vec<&str> = data.tasks.iter().map(|t| t.name.as_str()).collect();
        let rows: Vec<Value> = data
            .tasks
            .iter()
            .enumerate()
            .map(|(i, t)| {
                json!({
                    "name": t.name,
                    "value": [i, t.start.to_string(), t.end.to_string(), t.progress.unwrap_or(0.0)],
                })
            })
            .collect();
        let min = data.tasks.iter().map(|t| t.start).min();
        let max = data.tasks.iter().map(|t| t.end).max();

        json!({
            "tooltip": { "trigger": "item" },
            "xAxis": {
                "type": "time",
                "min": min.map(|d| d.to_string()),
                "max": max.map(|d| d.to_string()),
            },
            "yAxis": { "type": "category", "data": names, "inverse": true },
            "series": [{
                "type": "custom",
                "renderItem": "gantt",
                "encode": { "x": [1, 2], "y": 0 },
                "data": rows,
            }]
        })
    }
}
