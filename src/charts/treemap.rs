use super::{ChartAdapter, ValidationResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreemapNode {
    pub name: String,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub children: Vec<TreemapNode>,
}

impl TreemapNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Leaf value, or the sum of the children for branches.
    pub fn total(&self) -> f64 {
        if self.is_leaf() {
            self.value.unwrap_or(0.0)
        } else {
            self.children.iter().map(TreemapNode::total).sum()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreemapData {
    pub nodes: Vec<TreemapNode>,
}

pub struct TreemapChart;

fn check_leaves(node: &TreemapNode, path: &mut Vec<String>, errors: &mut Vec<String>) {
    path.push(node.name.clone());
    if node.is_leaf() {
        match node.value {
            Some(v) if v > 0.0 => {}
            Some(v) => errors.push(format!(
                "Leaf \"{}\": value must be positive, got {}",
                path.join(" / "),
                v
            )),
            None => errors.push(format!("Leaf \"{}\" has no value", path.join(" / "))),
        }
    } else {
        for child in &node.children {
            check_leaves(child, path, errors);
        }
    }
    path.pop();
}

fn to_series_node(node: &TreemapNode) -> Value {
    if node.is_leaf() {
        json!({ "name": node.name, "value": node.total() })
    } else {
        json!({
            "name": node.name,
            "value": node.total(),
            "children": node.children.iter().map(to_series_node).collect::<Vec<_>>(),
        })
    }
}

impl ChartAdapter for TreemapChart {
    type Data = TreemapData;

    fn validate(data: &TreemapData) -> ValidationResult {
        let mut errors = Vec::new();
        let mut path = Vec::new();
        for node in &data.nodes {
            check_leaves(node, &mut path, &mut errors);
        }
        ValidationResult::from_errors(errors)
    }

    fn is_empty(data: &TreemapData) -> bool {
        data.nodes.is_empty()
    }

    fn build_option(data: &TreemapData) -> Value {
        json!({
            "tooltip": { "formatter": "{b}: {c}" },
            "series": [{
                "type": "treemap",
                "roam": false,
                "breadcrumb": { "show": true },
                "data": data.nodes.iter().map(to_series_node).collect::<Vec<_>>(),
            }]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::ChartView;

    fn leaf(name: &str, value: Option<f64>) -> TreemapNode {
        TreemapNode {
            name: name.into(),
            value,
            children: vec![],
        }
    }

    fn branch(name: &str, children: Vec<TreemapNode>) -> TreemapNode {
        TreemapNode {
            name: name.into(),
            value: None,
            children,
        }
    }

    #[test]
    fn test_leaves_need_positive_values() {
        let data = TreemapData {
            nodes: vec![branch(
                "Sales",
                vec![leaf("EMEA", Some(10.0)), leaf("APAC", Some(0.0)), leaf("LATAM", None)],
            )],
        };
        let result = TreemapChart::validate(&data);
        assert_eq!(
            result.errors,
            vec![
                "Leaf \"Sales / APAC\": value must be positive, got 0",
                "Leaf \"Sales / LATAM\" has no value",
            ]
        );
    }

    #[test]
    fn test_branch_values_are_summed() {
        let data = TreemapData {
            nodes: vec![branch("Sales", vec![leaf("EMEA", Some(10.0)), leaf("APAC", Some(5.5))])],
        };
        let ChartView::Ready { option } = TreemapChart::render(&data) else {
            panic!("expected a ready chart");
        };
        assert_eq!(option["series"][0]["data"][0]["value"], 15.5);
        assert_eq!(option["series"][0]["data"][0]["children"][1]["name"], "APAC");
    }
}
