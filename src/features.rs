//! GeoJSON features for grid cells.
//!
//! Every grid index gets one feature, either the cell footprint as a polygon
//! or its centroid as a point. Properties are attached afterwards from the
//! KPI pass and features left without properties are dropped. Feature ids
//! are the linear cell indices and are never renumbered.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::crs::{to_geojson, Reproject};
use crate::error::Result;
use crate::geo::Local2Geo;
use crate::table::{BuildingAttributes, GridTable};

/// Which geometry, if any, a deployment emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Default)]
#[serde(rename_all = "lowercase")]
pub enum GeometryMode {
    /// KPI totals only
    #[default]
    None,
    /// Cell footprints
    Polygon,
    /// Cell centroids
    Point,
}

impl GeometryMode {
    pub fn shape(self) -> Option<FeatureShape> {
        match self {
            GeometryMode::None => None,
            GeometryMode::Polygon => Some(FeatureShape::Polygon),
            GeometryMode::Point => Some(FeatureShape::Point),
        }
    }
}

/// Geometry built for each cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureShape {
    Polygon,
    Point,
}

/// A GeoJSON geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Polygon(Vec<Vec<[f64; 2]>>),
    Point([f64; 2]),
}

/// A GeoJSON feature for one grid cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct Feature {
    pub id: usize,
    pub geometry: Geometry,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// A GeoJSON feature collection
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Attach building attributes to the features with matching ids
    pub fn attach_properties(
        &mut self,
        properties: &BTreeMap<usize, BuildingAttributes>,
    ) -> Result<()> {
        for feature in &mut self.features {
            if let Some(attributes) = properties.get(&feature.id) {
                if let Value::Object(map) = serde_json::to_value(attributes)? {
                    feature.properties = map;
                }
            }
        }
        Ok(())
    }

    /// Drop features whose properties are empty
    pub fn retain_populated(&mut self) {
        self.features.retain(|f| !f.properties.is_empty());
    }

    pub fn into_features(self) -> Vec<Feature> {
        self.features
    }
}

/// Builds cell features in the output CRS
pub struct FeatureBuilder<'a, R: Reproject> {
    table: &'a GridTable,
    mapper: Local2Geo,
    to_output: &'a R,
}

impl<'a, R: Reproject> FeatureBuilder<'a, R> {
    /// Fails when the table carries no origin
    pub fn new(table: &'a GridTable, to_output: &'a R) -> Result<Self> {
        let origin = table.require_origin()?;
        Ok(Self {
            table,
            mapper: Local2Geo::for_table(table, origin),
            to_output,
        })
    }

    /// Position of a local grid coordinate in the output CRS, in GeoJSON order
    fn position(&self, x: f64, y: f64) -> Result<[f64; 2]> {
        let compute = self.mapper.local_to_geo(x, y);
        Ok(to_geojson(self.to_output.reproject(compute)?))
    }

    /// Closed footprint ring of the cell at `index`
    pub fn polygon(&self, index: usize) -> Result<Feature> {
        let (col, row) = self.table.position(index);
        let (x, y) = (col as f64, row as f64);

        let mut ring = Vec::with_capacity(5);
        for (cx, cy) in [(x, y), (x + 1.0, y), (x + 1.0, y + 1.0), (x, y + 1.0)] {
            ring.push(self.position(cx, cy)?);
        }
        ring.push(ring[0]);

        Ok(Feature {
            id: index,
            geometry: Geometry::Polygon(vec![ring]),
            properties: Map::new(),
        })
    }

    /// Centroid of the cell at `index`
    pub fn point(&self, index: usize) -> Result<Feature> {
        let (col, row) = self.table.position(index);
        let centroid = self.position(col as f64 + 0.5, row as f64 + 0.5)?;

        Ok(Feature {
            id: index,
            geometry: Geometry::Point(centroid),
            properties: Map::new(),
        })
    }

    fn feature(&self, shape: FeatureShape, index: usize) -> Result<Feature> {
        match shape {
            FeatureShape::Polygon => self.polygon(index),
            FeatureShape::Point => self.point(index),
        }
    }

    /// One property-less feature per grid index, in index order
    pub fn build(&self, shape: FeatureShape) -> Result<FeatureCollection> {
        let features = (0..self.table.len())
            .map(|index| self.feature(shape, index))
            .collect::<Result<Vec<_>>>()?;
        Ok(FeatureCollection { features })
    }

    /// Rebuild the full collection from a filtered one.
    ///
    /// Features present in `filtered` keep their properties; every other
    /// index comes back with empty properties.
    pub fn expand(
        &self,
        shape: FeatureShape,
        filtered: &FeatureCollection,
    ) -> Result<FeatureCollection> {
        let mut full = self.build(shape)?;
        for feature in &filtered.features {
            if let Some(slot) = full.features.get_mut(feature.id) {
                slot.properties = feature.properties.clone();
            }
        }
        Ok(full)
    }
}
