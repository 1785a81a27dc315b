use super::{ChartAdapter, ValidationResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapPoint {
    pub x: String,
    pub y: String,
    /// Left untyped so non-numeric or missing input can be reported
    /// instead of failing to decode.
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatmapData {
    pub points: Vec<HeatmapPoint>,
}

pub struct HeatmapChart;

/// Categories in order of first appearance.
fn categories<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut out: Vec<&str> = Vec::new();
    for v in values {
        if !out.contains(&v) {
            out.push(v);
        }
    }
    out
}

impl ChartAdapter for HeatmapChart {
    type Data = HeatmapData;

    fn validate(data: &HeatmapData) -> ValidationResult {
        let errors = data
            .points
            .iter()
            .filter(|p| p.value.as_f64().is_none())
            .map(|p| format!("Point ({}, {}): value must be numeric, got {}", p.x, p.y, p.value))
            .collect();
        ValidationResult::from_errors(errors)
    }

    fn is_empty(data: &HeatmapData) -> bool {
        data.points.is_empty()
    }

    fn build_option(data: &HeatmapData) -> Value {
        let xs = categories(data.points.iter().map(|p| p.x.as_str()));
        let ys = categories(data.points.iter().map(|p| p.y.as_str()));

        let values: Vec<f64> = data.points.iter().filter_map(|p| p.value.as_f64()).collect();
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let cells: Vec<Value> = data
            .points
            .iter()
            .filter_map(|p| {
                let xi = xs.iter().position(|x| *x == p.x)?;
                let yi = ys.iter().position(|y| *y == p.y)?;
                Some(json!([xi, yi, p.value.as_f64()?]))
            })
            .collect();

        json!({
            "tooltip": { "position": "top" },
            "xAxis": { "type": "category", "data": xs, "splitArea": { "show": true } },
            "yAxis": { "type": "category", "data": ys, "splitArea": { "show": true } },
            "visualMap": { "min": min, "max": max, "calculable": true, "orient": "horizontal", "left": "center" },
            "series": [{ "type": "heatmap", "data": cells, "label": { "show": true } }]
        })
    }
}
