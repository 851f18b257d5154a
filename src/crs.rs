//! Coordinate reference systems and reprojection.
//!
//! The projection math itself is delegated to `proj4rs`. This module only
//! resolves CRS identifiers to projection definitions, wraps the pair of
//! projections used for one transform, and owns the axis-order conversions
//! at the edges of the pipeline.

use proj4rs::proj::Proj;
use proj4rs::transform::transform;
use std::fmt;
use std::str::FromStr;

use crate::error::{KpiError, Result};

/// A coordinate in internal axis order.
///
/// `x` is longitude or easting, `y` is latitude or northing, whatever the
/// authority axis order of the CRS is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

impl Coord {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Build a coordinate from a (latitude, longitude) pair as found in a table header.
    ///
    /// For projected CRSs the header's latitude is the northing and its
    /// longitude the easting.
    pub fn from_lat_lon(lat: f64, lon: f64) -> Self {
        Self { x: lon, y: lat }
    }
}

/// Convert a coordinate in an output CRS into a GeoJSON position (`[lon, lat]`).
///
/// Both geometry modes go through this function; nothing else in the crate
/// orders axes for serialization.
pub fn to_geojson(coord: Coord) -> [f64; 2] {
    [coord.x, coord.y]
}

/// A parsed coordinate reference system
#[derive(Debug, Clone, PartialEq)]
pub struct Crs {
    label: String,
    definition: String,
    geographic: bool,
}

impl Crs {
    /// Parse a CRS identifier.
    ///
    /// Accepts `EPSG:<code>` (case-insensitive), `CRS:84` and raw
    /// `+proj=...` definition strings.
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();

        if trimmed.starts_with("+proj=") {
            return Ok(Self {
                label: trimmed.to_string(),
                definition: trimmed.to_string(),
                geographic: trimmed.contains("+proj=longlat") || trimmed.contains("+proj=latlong"),
            });
        }

        let normalized = trimmed.to_uppercase();
        let code = match normalized.as_str() {
            "CRS:84" => 4326,
            _ => normalized
                .strip_prefix("EPSG:")
                .and_then(|c| c.parse::<u32>().ok())
                .ok_or_else(|| KpiError::UnsupportedCrs {
                    crs: s.to_string(),
                })?,
        };

        let definition = epsg_definition(code).ok_or_else(|| KpiError::UnsupportedCrs {
            crs: s.to_string(),
        })?;

        Ok(Self {
            label: format!("EPSG:{}", code),
            definition,
            geographic: is_geographic_epsg(code),
        })
    }

    /// The normalized identifier
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The proj definition string
    pub fn definition(&self) -> &str {
        &self.definition
    }

    /// Whether coordinates in this CRS are expressed in degrees
    pub fn is_geographic(&self) -> bool {
        self.geographic
    }
}

impl FromStr for Crs {
    type Err = KpiError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Crs::parse(s)
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

fn is_geographic_epsg(code: u32) -> bool {
    matches!(code, 4326 | 4258)
}

/// Proj definition for the EPSG codes this crate knows about
fn epsg_definition(code: u32) -> Option<String> {
    match code {
        4326 => Some("+proj=longlat +datum=WGS84 +no_defs".to_string()),
        4258 => Some("+proj=longlat +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +no_defs".to_string()),
        3857 => Some(
            concat!(
                "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 ",
                "+x_0=0 +y_0=0 +k=1 +units=m +no_defs"
            )
            .to_string(),
        ),
        // ETRS89 / UTM zones 28N..38N
        25828..=25838 => Some(format!(
            "+proj=utm +zone={} +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs",
            code - 25800
        )),
        // WGS 84 / UTM zones 1N..60N
        32601..=32660 => Some(format!(
            "+proj=utm +zone={} +datum=WGS84 +units=m +no_defs",
            code - 32600
        )),
        // WGS 84 / UTM zones 1S..60S
        32701..=32760 => Some(format!(
            "+proj=utm +zone={} +south +datum=WGS84 +units=m +no_defs",
            code - 32700
        )),
        _ => None,
    }
}

/// A reprojection capability: maps a coordinate from one CRS to another.
pub trait Reproject {
    fn reproject(&self, coord: Coord) -> Result<Coord>;
}

enum Strategy {
    Identity,
    Proj { source: Box<Proj>, target: Box<Proj> },
}

/// Reprojection between two CRSs backed by `proj4rs`
pub struct CrsTransform {
    source: Crs,
    target: Crs,
    strategy: Strategy,
}

impl fmt::Debug for CrsTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrsTransform")
            .field("source", &self.source.label)
            .field("target", &self.target.label)
            .field("identity", &matches!(self.strategy, Strategy::Identity))
            .finish()
    }
}

impl CrsTransform {
    /// Build a transform from `source` to `target`
    pub fn new(source: &Crs, target: &Crs) -> Result<Self> {
        let strategy = if source.definition == target.definition {
            Strategy::Identity
        } else {
            let source_proj = Proj::from_proj_string(&source.definition).map_err(|e| {
                KpiError::Reprojection {
                    message: format!("Invalid source projection {}: {:?}", source.label, e),
                }
            })?;
            let target_proj = Proj::from_proj_string(&target.definition).map_err(|e| {
                KpiError::Reprojection {
                    message: format!("Invalid target projection {}: {:?}", target.label, e),
                }
            })?;
            Strategy::Proj {
                source: Box::new(source_proj),
                target: Box::new(target_proj),
            }
        };

        Ok(Self {
            source: source.clone(),
            target: target.clone(),
            strategy,
        })
    }
}

impl Reproject for CrsTransform {
    fn reproject(&self, coord: Coord) -> Result<Coord> {
        let (source, target) = match &self.strategy {
            Strategy::Identity => return Ok(coord),
            Strategy::Proj { source, target } => (source, target),
        };

        let mut point = if self.source.geographic {
            (coord.x.to_radians(), coord.y.to_radians(), 0.0)
        } else {
            (coord.x, coord.y, 0.0)
        };

        transform(source, target, &mut point).map_err(|e| KpiError::Reprojection {
            message: format!(
                "{} -> {} failed for ({}, {}): {:?}",
                self.source.label, self.target.label, coord.x, coord.y, e
            ),
        })?;

        let out = if self.target.geographic {
            Coord::new(point.0.to_degrees(), point.1.to_degrees())
        } else {
            Coord::new(point.0, point.1)
        };

        if !out.x.is_finite() || !out.y.is_finite() {
            return Err(KpiError::Reprojection {
                message: format!(
                    "{} -> {} produced a non-finite coordinate for ({}, {})",
                    self.source.label, self.target.label, coord.x, coord.y
                ),
            });
        }

        Ok(out)
    }
}
