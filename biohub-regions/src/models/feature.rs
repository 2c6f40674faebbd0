//! GeoJSON input features and their validation
//!
//! Features arrive from the caller as GeoJSON `Feature` objects. Validation
//! runs before any resolution work so a malformed batch never opens a
//! transaction or reaches a remote service.

use crate::error::RegionError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// One coordinate tuple: `[x, y]` or `[x, y, z]`
pub type Position = Vec<f64>;

/// GeoJSON geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: Position },
    MultiPoint { coordinates: Vec<Position> },
    LineString { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
    GeometryCollection { geometries: Vec<Geometry> },
}

/// GeoJSON feature id (string or number)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureId {
    Text(String),
    Number(serde_json::Number),
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureId::Text(text) => f.write_str(text),
            FeatureId::Number(number) => write!(f, "{}", number),
        }
    }
}

fn feature_type() -> String {
    "Feature".to_string()
}

/// A geometry plus optional provenance id and property bag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputFeature {
    #[serde(rename = "type", default = "feature_type")]
    pub kind: String,

    /// Provenance identifier; features drawn from a known layer carry the
    /// layer's type name in here (e.g. `WHSE_ADMIN_BOUNDARIES.ADM_NR_REGIONS_SPG.12`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<FeatureId>,

    pub geometry: Geometry,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Map<String, Value>>,
}

impl InputFeature {
    /// Untagged feature with no properties
    pub fn new(geometry: Geometry) -> Self {
        Self {
            kind: feature_type(),
            id: None,
            geometry,
            properties: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(FeatureId::Text(id.into()));
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    /// Provenance id as text, if any
    pub fn provenance(&self) -> Option<String> {
        self.id.as_ref().map(|id| id.to_string())
    }

    /// Non-empty textual value of a property
    ///
    /// Numbers are accepted and rendered as text (wildlife management unit
    /// ids sometimes arrive numeric). Blank strings count as absent.
    pub fn property_text(&self, key: &str) -> Option<String> {
        match self.properties.as_ref()?.get(key)? {
            Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        }
    }

    /// Structural validation of the feature and its geometry
    pub fn validate(&self) -> Result<(), RegionError> {
        if self.kind != "Feature" {
            return Err(RegionError::Validation(format!(
                "expected type 'Feature', found '{}'",
                self.kind
            )));
        }
        self.geometry.validate()
    }
}

/// Validate a whole batch, naming the first offending feature
pub fn validate_features(features: &[InputFeature]) -> Result<(), RegionError> {
    for (index, feature) in features.iter().enumerate() {
        feature.validate().map_err(|e| match e {
            RegionError::Validation(msg) => {
                RegionError::Validation(format!("feature {}: {}", index, msg))
            }
            other => other,
        })?;
    }
    Ok(())
}

impl Geometry {
    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point { .. } => "Point",
            Geometry::MultiPoint { .. } => "MultiPoint",
            Geometry::LineString { .. } => "LineString",
            Geometry::MultiLineString { .. } => "MultiLineString",
            Geometry::Polygon { .. } => "Polygon",
            Geometry::MultiPolygon { .. } => "MultiPolygon",
            Geometry::GeometryCollection { .. } => "GeometryCollection",
        }
    }

    /// GeoJSON text for handing to the spatial database
    pub fn to_geojson(&self) -> Result<String, RegionError> {
        serde_json::to_string(self)
            .map_err(|e| RegionError::Validation(format!("geometry not serialisable: {}", e)))
    }

    pub fn validate(&self) -> Result<(), RegionError> {
        match self {
            Geometry::Point { coordinates } => validate_position(coordinates),
            Geometry::MultiPoint { coordinates } => {
                non_empty(coordinates, self.type_name())?;
                coordinates.iter().try_for_each(|p| validate_position(p))
            }
            Geometry::LineString { coordinates } => validate_line(coordinates),
            Geometry::MultiLineString { coordinates } => {
                non_empty(coordinates, self.type_name())?;
                coordinates.iter().try_for_each(|line| validate_line(line))
            }
            Geometry::Polygon { coordinates } => validate_polygon(coordinates),
            Geometry::MultiPolygon { coordinates } => {
                non_empty(coordinates, self.type_name())?;
                coordinates.iter().try_for_each(|polygon| validate_polygon(polygon))
            }
            Geometry::GeometryCollection { geometries } => {
                non_empty(geometries, self.type_name())?;
                geometries.iter().try_for_each(Geometry::validate)
            }
        }
    }
}

fn non_empty<T>(items: &[T], type_name: &str) -> Result<(), RegionError> {
    if items.is_empty() {
        return Err(RegionError::Validation(format!("{} has no members", type_name)));
    }
    Ok(())
}

fn validate_position(position: &[f64]) -> Result<(), RegionError> {
    if position.len() < 2 {
        return Err(RegionError::Validation(format!(
            "position needs at least 2 ordinates, found {}",
            position.len()
        )));
    }
    if position.iter().any(|ordinate| !ordinate.is_finite()) {
        return Err(RegionError::Validation(
            "position contains a non-finite ordinate".to_string(),
        ));
    }
    Ok(())
}

fn validate_line(line: &[Position]) -> Result<(), RegionError> {
    if line.len() < 2 {
        return Err(RegionError::Validation(format!(
            "LineString needs at least 2 positions, found {}",
            line.len()
        )));
    }
    line.iter().try_for_each(|p| validate_position(p))
}

fn validate_polygon(rings: &[Vec<Position>]) -> Result<(), RegionError> {
    non_empty(rings, "Polygon")?;
    for ring in rings {
        if ring.len() < 4 {
            return Err(RegionError::Validation(format!(
                "polygon ring needs at least 4 positions, found {}",
                ring.len()
            )));
        }
        ring.iter().try_for_each(|p| validate_position(p))?;

        // len >= 4 checked above
        let (first, last) = (&ring[0], &ring[ring.len() - 1]);
        if first[..2] != last[..2] {
            return Err(RegionError::Validation(
                "polygon ring is not closed".to_string(),
            ));
        }
    }
    Ok(())
}
