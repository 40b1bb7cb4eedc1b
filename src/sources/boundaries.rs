//! GeoJSON boundary layer.
//!
//! Each feature carries an area code property and a Polygon or MultiPolygon
//! geometry. Positions may carry a third (height) ordinate, which is ignored.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{Result, SynthError};
use crate::geometry::{Boundary, Point, Polygon, Ring};
use crate::schema::Nation;

/// The boundary of one area.
#[derive(Clone, Debug)]
pub struct AreaBoundary {
    pub code: String,
    pub boundary: Boundary,
}

#[derive(Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    geometry: Option<Geometry>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    Polygon { coordinates: Vec<Vec<Vec<f64>>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Vec<f64>>>> },
}

/// Load the boundaries of one nation, in layer order.
pub fn load_boundaries(path: &Path, code_field: &str, nation: Nation) -> Result<Vec<AreaBoundary>> {
    let text = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SynthError::MissingSource(path.to_path_buf())
        } else {
            SynthError::io(path, e)
        }
    })?;
    parse_boundaries(&text, code_field, nation)
}

/// Parse a GeoJSON FeatureCollection, keeping features owned by `nation`.
pub fn parse_boundaries(text: &str, code_field: &str, nation: Nation) -> Result<Vec<AreaBoundary>> {
    let collection: FeatureCollection = serde_json::from_str(text)?;

    let mut areas = Vec::new();
    for (i, feature) in collection.features.into_iter().enumerate() {
        let code = feature
            .properties
            .as_ref()
            .and_then(|props| props.get(code_field))
            .and_then(Value::as_str)
            .ok_or_else(|| SynthError::Invalid {
                what: "boundary feature",
                detail: format!("feature {} has no string property {}", i, code_field),
            })?
            .to_string();

        if !nation.owns_code(&code) {
            continue;
        }

        let geometry = feature.geometry.ok_or_else(|| SynthError::Invalid {
            what: "boundary feature",
            detail: format!("area {} has no geometry", code),
        })?;

        let parts = match geometry {
            Geometry::Polygon { coordinates } => vec![to_polygon(coordinates, &code)?],
            Geometry::MultiPolygon { coordinates } => coordinates
                .into_iter()
                .map(|poly| to_polygon(poly, &code))
                .collect::<Result<Vec<_>>>()?,
        };

        areas.push(AreaBoundary {
            code,
            boundary: Boundary::new(parts),
        });
    }

    Ok(areas)
}

fn to_polygon(rings: Vec<Vec<Vec<f64>>>, code: &str) -> Result<Polygon> {
    let mut rings = rings
        .into_iter()
        .map(|ring| to_ring(ring, code))
        .collect::<Result<Vec<_>>>()?;
    if rings.is_empty() {
        return Err(SynthError::Invalid {
            what: "boundary geometry",
            detail: format!("area {} has a polygon with no rings", code),
        });
    }
    let exterior = rings.remove(0);
    Ok(Polygon::new(exterior, rings))
}

fn to_ring(positions: Vec<Vec<f64>>, code: &str) -> Result<Ring> {
    positions
        .into_iter()
        .map(|pos| match pos.as_slice() {
            [x, y, ..] => Ok(Point::new(*x, *y)),
            _ => Err(SynthError::Invalid {
                what: "boundary geometry",
                detail: format!("area {} has a position with fewer than 2 ordinates", code),
            }),
        })
        .collect::<Result<Vec<_>>>()
        .map(Ring::new)
}
