//! GeoJSON state features, projected and prepared for painting.

use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use geo::{BoundingRect, Coord, InteriorPoint, LineString, MultiPolygon, Polygon, Rect, TriangulateEarcut};
use rayon::prelude::*;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::density::{classify_opt, ColorBucket};
use crate::map::map_tile::lon_lat_to_mercator;

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureProperties {
    pub name: String,
    /// `None` when the source omits the value or it is not a number.
    pub density: Option<f64>,
}

impl FeatureProperties {
    pub fn bucket(&self) -> ColorBucket {
        classify_opt(self.density)
    }
}

/// One state polygon. Coordinates are stored in Web Mercator meters.
#[derive(Debug)]
pub struct Feature {
    pub id: String,
    pub properties: FeatureProperties,
    pub geometry: MultiPolygon<f64>,
    pub bounds: Rect<f64>,
    /// Fill triangles, computed once at load.
    pub triangles: Vec<[Coord<f64>; 3]>,
    /// Anchor for the name label, always inside the geometry.
    pub label_anchor: Coord<f64>,
}

impl Feature {
    /// Build a feature from a lon/lat geometry. Returns `None` for an empty
    /// geometry, which has neither bounds nor a label anchor.
    pub fn from_lon_lat(id: String, properties: FeatureProperties, geometry: &MultiPolygon<f64>) -> Option<Self> {
        let geometry: MultiPolygon<f64> = geometry.iter().map(project_polygon).collect();
        let bounds = geometry.bounding_rect()?;
        let label_anchor = geometry.interior_point()?.0;
        let triangles = geometry.iter()
            .flat_map(|polygon| polygon.earcut_triangles())
            .map(|triangle| triangle.to_array())
            .collect();

        Some(Self { id, properties, geometry, bounds, triangles, label_anchor })
    }
}

fn project_polygon(polygon: &Polygon<f64>) -> Polygon<f64> {
    let project = |ring: &LineString<f64>| -> LineString<f64> {
        ring.coords().map(|c| lon_lat_to_mercator(c.x, c.y)).collect()
    };
    Polygon::new(project(polygon.exterior()), polygon.interiors().iter().map(project).collect())
}

/// Ordered, immutable set of features. Cloning is cheap and derived
/// collections share the `Arc<Feature>` handles of their source.
#[derive(Debug, Clone, Default)]
pub struct FeatureCollection {
    features: Arc<Vec<Arc<Feature>>>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Arc<Feature>>) -> Self {
        Self { features: Arc::new(features) }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<Feature>> {
        self.features.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arc<Feature>> {
        self.features.iter()
    }

    /// Parse a GeoJSON `FeatureCollection` with `{name, density}` properties.
    ///
    /// Features whose geometry is missing, empty, or not a (multi)polygon are
    /// skipped with a warning rather than failing the whole dataset.
    pub fn from_geojson(bytes: &[u8]) -> Result<Self> {
        let raw: RawCollection = serde_json::from_slice(bytes).context("parsing GeoJSON")?;
        if raw.kind != "FeatureCollection" {
            bail!("expected a FeatureCollection, got {}", raw.kind);
        }

        let features: Vec<Arc<Feature>> = raw.features
            .into_par_iter()
            .enumerate()
            .filter_map(|(index, raw)| {
                let id = raw.id.as_ref().map(id_string).unwrap_or_else(|| format!("#{}", index));
                let properties = raw.properties();
                let geometry = match raw.geometry.as_ref().map(parse_geometry) {
                    Some(Ok(geometry)) => geometry,
                    Some(Err(e)) => {
                        log::warn!("Skipping feature {} ({}): {:#}", id, properties.name, e);
                        return None;
                    }
                    None => {
                        log::warn!("Skipping feature {} ({}): no geometry", id, properties.name);
                        return None;
                    }
                };
                let feature = Feature::from_lon_lat(id.clone(), properties, &geometry);
                if feature.is_none() {
                    log::warn!("Skipping feature {}: empty geometry", id);
                }
                feature.map(Arc::new)
            })
            .collect();

        log::info!("Loaded {} features", features.len());
        Ok(Self::new(features))
    }
}

impl FromIterator<Arc<Feature>> for FeatureCollection {
    fn from_iter<I: IntoIterator<Item = Arc<Feature>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a FeatureCollection {
    type Item = &'a Arc<Feature>;
    type IntoIter = std::slice::Iter<'a, Arc<Feature>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Deserialize)]
struct RawCollection {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    features: Vec<RawFeature>,
}

#[derive(Deserialize)]
struct RawFeature {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    #[serde(default)]
    geometry: Option<Value>,
}

impl RawFeature {
    fn properties(&self) -> FeatureProperties {
        let get = |key: &str| self.properties.as_ref().and_then(|p| p.get(key));
        FeatureProperties {
            name: get("name").and_then(Value::as_str).unwrap_or_default().to_string(),
            density: get("density").and_then(Value::as_f64),
        }
    }
}

fn id_string(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

type Ring = Vec<Vec<f64>>;

fn parse_geometry(geometry: &Value) -> Result<MultiPolygon<f64>> {
    let kind = geometry.get("type").and_then(Value::as_str)
        .ok_or_else(|| anyhow!("geometry without a type"))?;
    let coordinates = geometry.get("coordinates").cloned()
        .ok_or_else(|| anyhow!("{} without coordinates", kind))?;

    match kind {
        "Polygon" => {
            let rings: Vec<Ring> = serde_json::from_value(coordinates).context("polygon coordinates")?;
            Ok(MultiPolygon::new(vec![polygon_from_rings(rings)?]))
        }
        "MultiPolygon" => {
            let polygons: Vec<Vec<Ring>> = serde_json::from_value(coordinates).context("multipolygon coordinates")?;
            Ok(MultiPolygon::new(polygons.into_iter().map(polygon_from_rings).collect::<Result<_>>()?))
        }
        other => bail!("unsupported geometry type {}", other),
    }
}

fn polygon_from_rings(rings: Vec<Ring>) -> Result<Polygon<f64>> {
    let mut rings = rings.into_iter().map(|ring| {
        ring.into_iter()
            .map(|position| match position[..] {
                [x, y, ..] => Ok(Coord { x, y }),
                _ => Err(anyhow!("position with fewer than two values")),
            })
            .collect::<Result<LineString<f64>>>()
    });
    let exterior = rings.next().ok_or_else(|| anyhow!("polygon without rings"))??;
    Ok(Polygon::new(exterior, rings.collect::<Result<_>>()?))
}
