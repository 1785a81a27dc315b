use super::{ChartAdapter, ValidationResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SankeyNode {
    pub name: String,
}

/// Fields decode leniently so one bad link is reported alongside the others
/// instead of rejecting the whole payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SankeyLink {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SankeyData {
    pub nodes: Vec<SankeyNode>,
    pub links: Vec<SankeyLink>,
}

pub struct SankeyChart;

impl ChartAdapter for SankeyChart {
    type Data = SankeyData;

    fn validate(data: &SankeyData) -> ValidationResult {
        let mut errors = Vec::new();
        let mut names = HashSet::new();

        for node in &data.nodes {
            if !names.insert(node.name.as_str()) {
                errors.push(format!("Duplicate node name \"{}\"", node.name));
            }
        }

        for (i, link) in data.links.iter().enumerate() {
            for (end, name) in [("source", &link.source), ("target", &link.target)] {
                if name.is_empty() {
                    errors.push(format!("Link {}: {} is missing", i + 1, end));
                } else if !names.contains(name.as_str()) {
                    errors.push(format!(
                        "Link {}: {} \"{}\" is not a declared node",
                        i + 1,
                        end,
                        name
                    ));
                }
            }
            match link.value.as_f64() {
                Some(value) if value > 0.0 => {}
                Some(value) => errors.push(format!(
                    "Link {} ({} -> {}): value must be positive, got {}",
                    i + 1,
                    link.source,
                    link.target,
                    value
                )),
                None => errors.push(format!(
                    "Link {} ({} -> {}): value must be a number, got {}",
                    i + 1,
                    link.source,
                    link.target,
                    link.value
                )),
            }
        }

        ValidationResult::from_errors(errors)
    }

    fn is_empty(data: &SankeyData) -> bool {
        data.nodes.is_empty() || data.links.is_empty()
    }

    fn build_option(data: &SankeyData) -> Value {
        json!({
            "tooltip": { "trigger": "item", "triggerOn": "mousemove" },
            "series": [{
                "type": "sankey",
                "emphasis": { "focus": "adjacency" },
                "data": data.nodes.iter().map(|n| json!({ "name": n.name })).collect::<Vec<_>>(),
                "links": data.links,
                "lineStyle": { "color": "gradient", "curveness": 0.5 },
            }]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::ChartView;

    fn node(name: &str) -> SankeyNode {
        SankeyNode { name: name.into() }
    }

    fn link(source: &str, target: &str, value: f64) -> SankeyLink {
        SankeyLink {
            source: source.into(),
            target: target.into(),
            value: json!(value),
        }
    }

    #[test]
    fn test_one_error_per_unknown_endpoint() {
        let data = SankeyData {
            nodes: vec![node("a"), node("b")],
            links: vec![link("a", "x", 1.0), link("y", "z", 2.0)],
        };
        let result = SankeyChart::validate(&data);
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 3);
        assert!(result.errors[0].contains("\"x\""));
        assert!(result.errors[1].contains("\"y\""));
        assert!(result.errors[2].contains("\"z\""));
    }

    #[test]
    fn test_one_error_per_non_positive_value() {
        let data = SankeyData {
            nodes: vec![node("a"), node("b")],
            links: vec![link("a", "b", 0.0), link("b", "a", -3.0), link("a", "b", 2.0)],
        };
        let result = SankeyChart::validate(&data);
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors.iter().all(|e| e.contains("must be positive")));
    }

    #[test]
    fn test_loosely_typed_links_report_every_problem() {
        let view = crate::charts::render_json(
            crate::charts::ChartKind::Sankey,
            json!({
                "nodes": [{"name": "a"}, {"name": "b"}],
                "links": [
                    {"source": "a", "target": "b", "value": "10"},
                    {"source": "a", "target": "zz", "value": 4}
                ]
            }),
        );
        let ChartView::Invalid { errors } = view else {
            panic!("expected validation errors");
        };
        assert_eq!(
            errors,
            vec![
                "Link 1 (a -> b): value must be a number, got \"10\"",
                "Link 2: target \"zz\" is not a declared node",
            ]
        );
    }

    #[test]
    fn test_missing_link_fields_are_reported() {
        let data: SankeyData = serde_json::from_value(json!({
            "nodes": [{"name": "a"}],
            "links": [{"value": "10"}, {"target": "zz"}]
        }))
        .unwrap();
        let errors = SankeyChart::validate(&data).errors;
        assert_eq!(errors.len(), 6);
        assert!(errors.contains(&"Link 1: source is missing".to_string()));
        assert!(errors.contains(&"Link 2: target \"zz\" is not a declared node".to_string()));
        assert!(errors[5].contains("got null"));
    }

    #[test]
    fn test_duplicate_nodes_flagged() {
        let data = SankeyData {
            nodes: vec![node("a"), node("a")],
            links: vec![],
        };
        assert_eq!(SankeyChart::validate(&data).errors, vec!["Duplicate node name \"a\""]);
    }

    #[test]
    fn test_render_states() {
        assert!(matches!(
            SankeyChart::render(&SankeyData::default()),
            ChartView::Empty { .. }
        ));

        let data = SankeyData {
            nodes: vec![node("visit"), node("signup")],
            links: vec![link("visit", "signup", 40.0)],
        };
        let ChartView::Ready { option } = SankeyChart::render(&data) else {
            panic!("expected a ready chart");
        };
        assert_eq!(option["series"][0]["type"], "sankey");
        assert_eq!(option["series"][0]["links"][0]["value"], 40.0);
        assert_eq!(option["series"][0]["data"][1]["name"], "signup");
    }
}
