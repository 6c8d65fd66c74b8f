//! Transit-line catalog decoded from the bus-line GeoJSON.
//!
//! Features share a `Layer` per direction of a route; their paths are
//! grouped so a single line can be highlighted as a unit.

use geo::line_measures::LengthMeasurable;
use geo::{Geometry, Haversine, LineString};
use geojson::{Feature, GeoJson};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, warn};

#[derive(thiserror::Error, Debug)]
pub enum LineError {
    #[error("failed to read bus-line GeoJSON: {0}")]
    Parse(#[from] geojson::Error),
    #[error("bus-line GeoJSON must be a FeatureCollection")]
    NotACollection,
}

/// Descriptive properties of one route direction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineInfo {
    #[serde(rename = "BusName")]
    pub bus_name: String,
    #[serde(rename = "Dir_Name")]
    pub dir_name: String,
    #[serde(rename = "S_Station", default)]
    pub start_station: String,
    #[serde(rename = "E_Station", default)]
    pub end_station: String,
    /// Length in meters as recorded in the source data.
    #[serde(default)]
    pub length: f64,
    #[serde(rename = "Layer")]
    pub layer: String,
}

impl LineInfo {
    /// The route whose adjustment the survey asks about.
    pub fn survey_default() -> Self {
        LineInfo {
            bus_name: "浦东59路".to_string(),
            dir_name: "浦东59路(宣夏路宣兰路--大川公路拱乐路)".to_string(),
            start_station: "宣夏路宣兰路".to_string(),
            end_station: "大川公路拱乐路".to_string(),
            length: 16135.387947233279,
            layer: "浦东59路(宣夏路宣兰路--大川公路拱乐路)".to_string(),
        }
    }
}

/// A route direction with all of its path segments.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitLine {
    pub info: LineInfo,
    pub paths: Vec<LineString<f64>>,
}

impl TransitLine {
    /// Geodesic length of all segments, in meters.
    pub fn measured_length(&self) -> f64 {
        self.paths.iter().map(|p| p.length(&Haversine)).sum()
    }
}

/// Lines keyed by layer, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineCatalog {
    lines: Vec<TransitLine>,
}

impl LineCatalog {
    pub fn from_geojson_str(text: &str) -> Result<Self, LineError> {
        let collection = match GeoJson::from_str(text)? {
            GeoJson::FeatureCollection(collection) => collection,
            _ => return Err(LineError::NotACollection),
        };

        let mut catalog = LineCatalog::default();
        for (index, feature) in collection.features.into_iter().enumerate() {
            catalog.insert_feature(index, feature);
        }
        debug!(lines = catalog.lines.len(), "Bus-line catalog decoded");
        Ok(catalog)
    }

    fn insert_feature(&mut self, index: usize, feature: Feature) {
        let info: LineInfo = match &feature.properties {
            Some(props) => match serde_json::from_value(serde_json::Value::Object(props.clone())) {
                Ok(info) => info,
                Err(e) => {
                    warn!(feature = index, error = %e, "Bus-line feature has unusable properties, skipping");
                    return;
                }
            },
            None => {
                warn!(feature = index, "Bus-line feature has no properties, skipping");
                return;
            }
        };

        let paths = match feature.geometry.map(Geometry::<f64>::try_from) {
            Some(Ok(Geometry::LineString(line))) => vec![line],
            Some(Ok(Geometry::MultiLineString(multi))) => multi.0,
            _ => {
                warn!(feature = index, layer = %info.layer, "Bus-line feature is not a line, skipping");
                return;
            }
        };

        match self.lines.iter_mut().find(|l| l.info.layer == info.layer) {
            Some(line) => line.paths.extend(paths),
            None => self.lines.push(TransitLine { info, paths }),
        }
    }

    pub fn lines(&self) -> &[TransitLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn by_layer(&self, layer: &str) -> Option<&TransitLine> {
        self.lines.iter().find(|l| l.info.layer == layer)
    }

    /// Every direction of the named bus route.
    pub fn by_bus_name<'a>(&'a self, bus_name: &'a str) -> impl Iterator<Item = &'a TransitLine> {
        self.lines.iter().filter(move |l| l.info.bus_name == bus_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "BusName": "浦东59路", "Layer": "59-up", "Dir_Name": "59 up", "length": 100.0 },
                "geometry": { "type": "MultiLineString", "coordinates": [[[121.50,31.20],[121.51,31.20]]] }
            },
            {
                "type": "Feature",
                "properties": { "BusName": "浦东59路", "Layer": "59-down", "Dir_Name": "59 down" },
                "geometry": { "type": "LineString", "coordinates": [[121.51,31.20],[121.50,31.20]] }
            },
            {
                "type": "Feature",
                "properties": { "BusName": "浦东59路", "Layer": "59-up", "Dir_Name": "59 up" },
                "geometry": { "type": "LineString", "coordinates": [[121.51,31.20],[121.52,31.20]] }
            },
            {
                "type": "Feature",
                "properties": { "BusName": "站点", "Layer": "stop", "Dir_Name": "" },
                "geometry": { "type": "Point", "coordinates": [121.5, 31.2] }
            }
        ]
    }"#;

    #[test]
    fn test_features_are_grouped_by_layer() {
        let catalog = LineCatalog::from_geojson_str(LINES).unwrap();

        assert_eq!(catalog.len(), 2);
        let up = catalog.by_layer("59-up").unwrap();
        assert_eq!(up.paths.len(), 2);
        assert_eq!(up.info.length, 100.0);
        assert!(catalog.by_layer("stop").is_none());
    }

    #[test]
    fn test_by_bus_name() {
        let catalog = LineCatalog::from_geojson_str(LINES).unwrap();
        assert_eq!(catalog.by_bus_name("浦东59路").count(), 2);
        assert_eq!(catalog.by_bus_name("1路").count(), 0);
    }

    #[test]
    fn test_measured_length() {
        let catalog = LineCatalog::from_geojson_str(LINES).unwrap();
        let down = catalog.by_layer("59-down").unwrap();
        // 0.01 degrees of longitude at 31.2N is roughly 950 m
        let meters = down.measured_length();
        assert!(meters > 900.0 && meters < 1000.0, "{meters}");
    }

    #[test]
    fn test_survey_default() {
        let info = LineInfo::survey_default();
        assert_eq!(info.bus_name, "浦东59路");
        assert_eq!(info.start_station, "宣夏路宣兰路");
    }

    #[test]
    fn test_non_collection_is_rejected() {
        let text = r#"{"type": "Point", "coordinates": [0, 0]}"#;
        assert!(matches!(
            LineCatalog::from_geojson_str(text),
            Err(LineError::NotACollection)
        ));
    }
}
