//! Decoding of the administrative-area GeoJSON.

use geo::{Geometry, MultiPolygon};
use geojson::{Feature, FeatureCollection, GeoJson};
use std::str::FromStr;
use tracing::{debug, warn};

#[derive(thiserror::Error, Debug)]
pub enum AreaError {
    #[error("failed to read area GeoJSON: {0}")]
    Parse(#[from] geojson::Error),
    #[error("area GeoJSON must be a FeatureCollection but found a single '{0}'")]
    NotACollection(&'static str),
}

/// A named administrative area (a town or street office).
#[derive(Debug, Clone, PartialEq)]
pub struct Area {
    pub name: String,
    pub geometry: MultiPolygon<f64>,
}

/// Areas in file order. Order decides tie-breaks and boundary ownership.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AreaCollection {
    areas: Vec<Area>,
}

impl AreaCollection {
    pub fn new(areas: Vec<Area>) -> Self {
        Self { areas }
    }

    /// Parses a GeoJSON FeatureCollection of Polygon/MultiPolygon features
    /// named by `properties.Name`.
    ///
    /// Features without polygonal geometry are skipped with a warning.
    pub fn from_geojson_str(text: &str) -> Result<Self, AreaError> {
        match GeoJson::from_str(text)? {
            GeoJson::FeatureCollection(collection) => Ok(Self::from_feature_collection(collection)),
            GeoJson::Feature(_) => Err(AreaError::NotACollection("Feature")),
            GeoJson::Geometry(_) => Err(AreaError::NotACollection("Geometry")),
        }
    }

    pub fn from_feature_collection(collection: FeatureCollection) -> Self {
        let areas: Vec<Area> = collection
            .features
            .into_iter()
            .enumerate()
            .filter_map(|(index, feature)| feature_to_area(index, feature))
            .collect();
        debug!(areas = areas.len(), "Area collection decoded");
        Self { areas }
    }

    pub fn areas(&self) -> &[Area] {
        &self.areas
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }
}

fn feature_to_area(index: usize, feature: Feature) -> Option<Area> {
    let name = match feature.property("Name").and_then(|v| v.as_str()) {
        Some(name) => name.to_string(),
        None => {
            warn!(feature = index, "Area feature has no Name property");
            String::new()
        }
    };

    let Some(geometry) = feature.geometry else {
        warn!(feature = index, name = %name, "Area feature has no geometry, skipping");
        return None;
    };

    let geometry = match Geometry::<f64>::try_from(geometry) {
        Ok(geometry) => geometry,
        Err(e) => {
            warn!(feature = index, name = %name, error = %e, "Failed to decode area geometry, skipping");
            return None;
        }
    };

    let geometry = match geometry {
        Geometry::Polygon(polygon) => MultiPolygon::new(vec![polygon]),
        Geometry::MultiPolygon(multi) => multi,
        _ => {
            warn!(feature = index, name = %name, "Area geometry is not polygonal, skipping");
            return None;
        }
    };

    Some(Area { name, geometry })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_AREAS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "Name": "West" },
                "geometry": { "type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]] }
            },
            {
                "type": "Feature",
                "properties": { "Name": "East" },
                "geometry": { "type": "MultiPolygon", "coordinates": [
                    [[[1,0],[2,0],[2,1],[1,1],[1,0]]],
                    [[[5,5],[6,5],[6,6],[5,6],[5,5]]]
                ] }
            },
            {
                "type": "Feature",
                "properties": { "Name": "Road" },
                "geometry": { "type": "LineString", "coordinates": [[0,0],[1,1]] }
            }
        ]
    }"#;

    #[test]
    fn test_polygon_and_multipolygon_are_decoded() {
        let areas = AreaCollection::from_geojson_str(TWO_AREAS).unwrap();

        assert_eq!(areas.len(), 2);
        assert_eq!(areas.areas()[0].name, "West");
        assert_eq!(areas.areas()[0].geometry.0.len(), 1);
        assert_eq!(areas.areas()[1].name, "East");
        assert_eq!(areas.areas()[1].geometry.0.len(), 2);
    }

    #[test]
    fn test_single_feature_is_rejected() {
        let text = r#"{"type": "Feature", "properties": {"Name": "x"}, "geometry": null}"#;
        assert!(matches!(
            AreaCollection::from_geojson_str(text),
            Err(AreaError::NotACollection("Feature"))
        ));
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(matches!(
            AreaCollection::from_geojson_str("{not json"),
            Err(AreaError::Parse(_))
        ));
    }

    #[test]
    fn test_empty_collection() {
        let areas =
            AreaCollection::from_geojson_str(r#"{"type": "FeatureCollection", "features": []}"#)
                .unwrap();
        assert!(areas.is_empty());
    }
}
