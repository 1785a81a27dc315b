use super::{ChartAdapter, ValidationResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapPoint {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapData {
    pub points: Vec<MapPoint>,
}

pub struct MapChart;

impl ChartAdapter for MapChart {
    type Data = MapData;

    const EMPTY_MESSAGE: &'static str = "No locations to display";

    fn validate(data: &MapData) -> ValidationResult {
        let mut errors = Vec::new();
        for p in &data.points {
            if !(-90.0..=90.0).contains(&p.lat) {
                errors.push(format!("Point \"{}\": latitude {} is out of range", p.name, p.lat));
            }
            if !(-180.0..=180.0).contains(&p.lng) {
                errors.push(format!("Point \"{}\": longitude {} is out of range", p.name, p.lng));
            }
            if let Some(value) = p.value.filter(|v| *v < 0.0) {
                errors.push(format!("Point \"{}\": value must not be negative, got {}", p.name, value));
            }
        }
        ValidationResult::from_errors(errors)
    }

    fn is_empty(data: &MapData) -> bool {
        data.points.is_empty()
    }

    fn build_option(data: &MapData) -> Value {
        let (mut min_lat, mut max_lat) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut min_lng, mut max_lng) = (f64::INFINITY, f64::NEG_INFINITY);
        for p in &data.points {
            min_lat = min_lat.min(p.lat);
            max_lat = max_lat.max(p.lat);
            min_lng = min_lng.min(p.lng);
            max_lng = max_lng.max(p.lng);
        }
        let max_value = data.points.iter().filter_map(|p| p.value).fold(0.0, f64::max);

        let markers: Vec<Value> = data
            .points
            .iter()
            .map(|p| {
                // Marker radius scales with value relative to the largest one.
                let radius = match p.value {
                    Some(v) if max_value > 0.0 => 4.0 + 16.0 * (v / max_value),
                    _ => 6.0,
                };
                json!({
                    "name": p.name,
                    "position": [p.lat, p.lng],
                    "value": p.value,
                    "radius": radius,
                })
            })
            .collect();

        json!({
            "center": [(min_lat + max_lat) / 2.0, (min_lng + max_lng) / 2.0],
            "bounds": [[min_lat, min_lng], [max_lat, max_lng]],
            "tileLayer": "openstreetmap",
            "markers": markers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::ChartView;

    fn point(name: &str, lat: f64, lng: f64, value: Option<f64>) -> MapPoint {
        MapPoint {
            name: name.into(),
            lat,
            lng,
            value,
        }
    }

    #[test]
    fn test_coordinates_range_checked() {
        let data = MapData {
            points: vec![point("nowhere", 95.0, -200.0, None), point("Lisbon", 38.7, -9.1, None)],
        };
        assert_eq!(MapChart::validate(&data).errors.len(), 2);
    }

    #[test]
    fn test_negative_value_rejected_before_sizing_markers() {
        let data = MapData {
            points: vec![point("Porto", 41.1, -8.6, Some(-5.0)), point("Faro", 37.0, -7.9, Some(10.0))],
        };
        assert_eq!(
            MapChart::render(&data),
            ChartView::Invalid {
                errors: vec!["Point \"Porto\": value must not be negative, got -5".into()]
            }
        );

        let data = MapData {
            points: vec![point("Porto", 41.1, -8.6, Some(0.0)), point("Faro", 37.0, -7.9, Some(10.0))],
        };
        let ChartView::Ready { option } = MapChart::render(&data) else {
            panic!("expected a ready chart");
        };
        assert_eq!(option["markers"][0]["radius"], 4.0);
    }

    #[test]
    fn test_bounds_and_center() {
        let data = MapData {
            points: vec![point("a", 10.0, 20.0, Some(5.0)), point("b", 30.0, 40.0, Some(10.0))],
        };
        let ChartView::Ready { option } = MapChart::render(&data) else {
            panic!("expected a ready chart");
        };
        assert_eq!(option["center"], json!([20.0, 30.0]));
        assert_eq!(option["bounds"], json!([[10.0, 20.0], [30.0, 40.0]]));
        assert_eq!(option["markers"][1]["radius"], 20.0);
    }
}
