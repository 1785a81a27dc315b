use super::{ChartAdapter, ValidationResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelStage {
    pub name: String,
    /// Checked by `validate`; decoding accepts any JSON value.
    #[serde(default)]
    pub value: Value,
}

impl FunnelStage {
    /// Numeric value, or 0 when it is not a number.
    pub fn amount(&self) -> f64 {
        self.value.as_f64().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FunnelData {
    pub stages: Vec<FunnelStage>,
}

/// Percent of the first stage reached by each stage. The first stage is
/// 100, or every stage is 0 when the first stage is 0.
pub fn conversion_rates(stages: &[FunnelStage]) -> Vec<f64> {
    let Some(first) = stages.first().map(FunnelStage::amount) else {
        return Vec::new();
    };
    stages
        .iter()
        .map(|s| if first == 0.0 { 0.0 } else { s.amount() / first * 100.0 })
        .collect()
}

/// Percent lost between each stage and the one before it. The first stage
/// has no drop-off.
pub fn drop_off_rates(stages: &[FunnelStage]) -> Vec<f64> {
    stages
        .iter()
        .enumerate()
        .map(|(i, s)| {
            if i == 0 {
                return 0.0;
            }
            let prev = stages[i - 1].amount();
            if prev == 0.0 {
                0.0
            } else {
                (prev - s.amount()) / prev * 100.0
            }
        })
        .collect()
}

pub struct FunnelChart;

impl ChartAdapter for FunnelChart {
    type Data = FunnelData;

    fn validate(data: &FunnelData) -> ValidationResult {
        let errors = data
            .stages
            .iter()
            .filter_map(|s| match s.value.as_f64() {
                Some(v) if v < 0.0 => Some(format!(
                    "Stage \"{}\": value must not be negative, got {}",
                    s.name, v
                )),
                Some(_) => None,
                None => Some(format!(
                    "Stage \"{}\": value must be a number, got {}",
                    s.name, s.value
                )),
            })
            .collect();
        ValidationResult::from_errors(errors)
    }

    fn is_empty(data: &FunnelData) -> bool {
        data.stages.is_empty()
    }

    fn build_option(data: &FunnelData) -> Value {
        let rates = conversion_rates(&data.stages);
        let drops = drop_off_rates(&data.stages);
        let max = data.stages.iter().map(FunnelStage::amount).fold(0.0, f64::max);

        let rows: Vec<Value> = data
            .stages
            .iter()
            .zip(rates.iter().zip(drops.iter()))
            .map(|(s, (rate, drop))| {
                json!({
                    "name": s.name,
                    "value": s.amount(),
                    "conversionRate": round2(*rate),
                    "dropOff": round2(*drop),
                })
            })
            .collect();

        json!({
            "tooltip": { "trigger": "item" },
            "series": [{
                "type": "funnel",
                "sort": "none",
                "min": 0,
                "max": max,
                "gap": 2,
                "label": { "show": true, "position": "inside" },
                "data": rows,
            }]
        })
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
