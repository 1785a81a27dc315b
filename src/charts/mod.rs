//! Chart adapters: validate input rows, then build a declarative option
//! object for the charting library.

mod funnel;
mod gantt;
mod heatmap;
mod map;
mod sankey;
mod treemap;

pub use funnel::*;
pub use gantt::*;
pub use heatmap::*;
pub use map::*;
pub use sankey::*;
pub use treemap::*;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

/// What the wrapper should show.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum ChartView {
    /// Error panel listing every validation message.
    Invalid { errors: Vec<String> },
    /// Empty-state placeholder.
    Empty { message: String },
    /// Option object for the charting library.
    Ready { option: Value },
}

pub trait ChartAdapter {
    type Data;

    const EMPTY_MESSAGE: &'static str = "No data to display";

    fn validate(data: &Self::Data) -> ValidationResult;

    fn is_empty(data: &Self::Data) -> bool;

    /// Only called with valid, non-empty data.
    fn build_option(data: &Self::Data) -> Value;

    fn render(data: &Self::Data) -> ChartView {
        let validation = Self::validate(data);
        if !validation.is_valid {
            return ChartView::Invalid {
                errors: validation.errors,
            };
        }
        if Self::is_empty(data) {
            return ChartView::Empty {
                message: Self::EMPTY_MESSAGE.to_string(),
            };
        }
        ChartView::Ready {
            option: Self::build_option(data),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Sankey,
    Gantt,
    Heatmap,
    Treemap,
    Funnel,
    Map,
}

impl std::str::FromStr for ChartKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sankey" => Ok(ChartKind::Sankey),
            "gantt" => Ok(ChartKind::Gantt),
            "heatmap" => Ok(ChartKind::Heatmap),
            "treemap" => Ok(ChartKind::Treemap),
            "funnel" => Ok(ChartKind::Funnel),
            "map" => Ok(ChartKind::Map),
            other => Err(format!("unknown chart kind: {}", other)),
        }
    }
}

/// Decode `data` as the given chart kind and render it. Malformed input is
/// reported as an `Invalid` view rather than an error.
pub fn render_json(kind: ChartKind, data: Value) -> ChartView {
    fn go<C: ChartAdapter>(data: Value) -> ChartView
    where
        C::Data: serde::de::DeserializeOwned,
    {
        match serde_json::from_value::<C::Data>(data) {
            Ok(parsed) => C::render(&parsed),
            Err(e) => ChartView::Invalid {
                errors: vec![format!("Malformed chart data: {}", e)],
            },
        }
    }

    match kind {
        ChartKind::Sankey => go::<SankeyChart>(data),
        ChartKind::Gantt => go::<GanttChart>(data),
        ChartKind::Heatmap => go::<HeatmapChart>(data),
        ChartKind::Treemap => go::<TreemapChart>(data),
        ChartKind::Funnel => go::<FunnelChart>(data),
        ChartKind::Map => go::<MapChart>(data),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_malformed_json_is_invalid_view() {
        let view = render_json(ChartKind::Funnel, json!({"stages": "nope"}));
        assert!(matches!(view, ChartView::Invalid { errors } if errors.len() == 1));
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("Sankey".parse::<ChartKind>(), Ok(ChartKind::Sankey));
        assert!("pie".parse::<ChartKind>().is_err());
    }

    #[test]
    fn test_view_serializes_with_state_tag() {
        let view = ChartView::Empty {
            message: "No data to display".into(),
        };
        assert_eq!(
            serde_json::to_value(view).unwrap(),
            json!({"state": "empty", "message": "No data to display"})
        );
    }
}
