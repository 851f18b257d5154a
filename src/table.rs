//! Grid table description parsed from a cityIO header.
//!
//! A [`GridTable`] is rebuilt from scratch for every evaluation cycle. It
//! carries the physical geometry of the grid (cell size, shape, rotation,
//! origin) and the type mapping that gives meaning to each cell's type-index.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::debug;

use crate::crs::{Coord, Reproject};
use crate::error::{KpiError, Result};

/// One grid cell: an attribute tuple, or `None` for an unoccupied position
pub type Cell = Option<Vec<Value>>;

/// Resolved attributes of a type-index
#[derive(Debug, Clone, PartialEq)]
pub enum TypeAttributes {
    Building(BuildingAttributes),
    OpenSpace { os_type: Option<String> },
    /// A `type` value this crate does not classify
    Other(String),
}

/// Attributes of a building type, serialized as feature properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingAttributes {
    #[serde(rename = "bld_useGround", default, deserialize_with = "deserialize_code")]
    pub use_ground: Option<String>,
    #[serde(rename = "bld_useUpper", default, deserialize_with = "deserialize_code")]
    pub use_upper: Option<String>,
    #[serde(
        rename = "bld_numLevels",
        default,
        deserialize_with = "deserialize_levels"
    )]
    pub num_levels: i64,
}

/// Non-string use-codes match no category
fn deserialize_code<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(code)) => Some(code),
        Some(other) => {
            debug!(code = %other, "Ignoring non-string use-code");
            None
        }
        None => None,
    })
}

/// Accept integer or integral float level counts; `null` counts as zero
fn deserialize_levels<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?;
    match value {
        None => Ok(0),
        Some(v) if v.fract() == 0.0 && v.is_finite() => Ok(v as i64),
        Some(v) => Err(serde::de::Error::custom(format!(
            "bld_numLevels must be integral, got {}",
            v
        ))),
    }
}

#[derive(Deserialize)]
struct OpenSpaceEntry {
    #[serde(default)]
    os_type: Option<String>,
}

impl TypeAttributes {
    /// Parse one entry of `mapping.type`.
    ///
    /// Returns `None` when the entry has no `type` field or its fields have
    /// the wrong shape.
    fn from_entry(entry: &Value) -> Option<Self> {
        let kind = entry.get("type")?.as_str()?;
        match kind {
            "building" => serde_json::from_value::<BuildingAttributes>(entry.clone())
                .map(TypeAttributes::Building)
                .map_err(|e| debug!(error = %e, "Skipping malformed building type entry"))
                .ok(),
            "open_space" => serde_json::from_value::<OpenSpaceEntry>(entry.clone())
                .map(|e| TypeAttributes::OpenSpace { os_type: e.os_type })
                .map_err(|e| debug!(error = %e, "Skipping malformed open space type entry"))
                .ok(),
            other => Some(TypeAttributes::Other(other.to_string())),
        }
    }
}

/// Immutable description of a cityIO grid
#[derive(Debug, Clone)]
pub struct GridTable {
    cell_size: f64,
    ncols: usize,
    nrows: usize,
    len: usize,
    rotation: f64,
    origin: Option<Coord>,
    type_mapping: HashMap<i64, TypeAttributes>,
    type_index_position: usize,
}

impl GridTable {
    /// Parse a header payload.
    ///
    /// `to_compute` reprojects the header's latitude/longitude from the input
    /// CRS into the compute CRS; the result is the table's origin.
    pub fn from_header<R: Reproject>(header: &Value, to_compute: &R) -> Result<Self> {
        let spatial = header
            .get("spatial")
            .and_then(Value::as_object)
            .ok_or_else(|| malformed("missing object 'spatial'"))?;

        let cell_size = required_f64(spatial, "cellSize")?;
        if cell_size <= 0.0 || !cell_size.is_finite() {
            return Err(malformed(format!(
                "spatial.cellSize must be positive, got {}",
                cell_size
            )));
        }
        let ncols = required_dimension(spatial, "ncols")?;
        let nrows = required_dimension(spatial, "nrows")?;
        let len = ncols.checked_mul(nrows).ok_or_else(|| {
            malformed(format!("grid of {}x{} cells is too large", ncols, nrows))
        })?;

        let rotation = match spatial.get("rotation") {
            None | Some(Value::Null) => 0.0,
            Some(v) => v
                .as_f64()
                .ok_or_else(|| malformed("spatial.rotation must be a number"))?,
        };

        let origin = match (spatial.get("latitude"), spatial.get("longitude")) {
            (Some(lat), Some(lon)) if !lat.is_null() && !lon.is_null() => {
                let lat = lat
                    .as_f64()
                    .ok_or_else(|| malformed("spatial.latitude must be a number"))?;
                let lon = lon
                    .as_f64()
                    .ok_or_else(|| malformed("spatial.longitude must be a number"))?;
                Some(to_compute.reproject(Coord::from_lat_lon(lat, lon))?)
            }
            _ => None,
        };

        let mapping = header
            .get("mapping")
            .and_then(|m| m.get("type"))
            .ok_or_else(|| malformed("missing 'mapping.type'"))?;
        let type_mapping = parse_type_mapping(mapping)?;

        let type_index_position = header
            .get("block")
            .and_then(Value::as_array)
            .ok_or_else(|| malformed("missing array 'block'"))?
            .iter()
            .position(|name| name.as_str() == Some("type"))
            .ok_or_else(|| malformed("'block' has no \"type\" entry"))?;

        debug!(
            cell_size,
            ncols,
            nrows,
            rotation,
            types = type_mapping.len(),
            type_index_position,
            "Parsed grid table header"
        );

        Ok(Self {
            cell_size,
            ncols,
            nrows,
            len,
            rotation,
            origin,
            type_mapping,
            type_index_position,
        })
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Area of one cell in squared grid units
    pub fn cell_area(&self) -> f64 {
        self.cell_size * self.cell_size
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Number of cells, `ncols * nrows`
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rotation (bearing) in degrees
    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    /// Origin in the compute CRS, when the header carries latitude/longitude
    pub fn origin(&self) -> Option<Coord> {
        self.origin
    }

    /// Origin, or a header error when geometry is requested without one
    pub fn require_origin(&self) -> Result<Coord> {
        self.origin.ok_or_else(|| {
            malformed("spatial.latitude and spatial.longitude are required for geometry")
        })
    }

    pub fn type_index_position(&self) -> usize {
        self.type_index_position
    }

    /// Grid position of a linear index as `(column, row)`
    pub fn position(&self, index: usize) -> (usize, usize) {
        (index % self.ncols, index / self.ncols)
    }

    /// Check that a grid payload matches this table's shape
    pub fn check_grid(&self, grid: &[Cell]) -> Result<()> {
        if grid.len() != self.len() {
            return Err(KpiError::MalformedGrid {
                message: format!(
                    "expected {} cells ({}x{}), got {}",
                    self.len(),
                    self.ncols,
                    self.nrows,
                    grid.len()
                ),
            });
        }
        Ok(())
    }

    /// Resolve a cell to its type attributes.
    ///
    /// `None` for unoccupied cells, cells too short to carry a type-index,
    /// non-integral type-indices and indices missing from the mapping.
    pub fn resolve(&self, cell: &Cell) -> Option<&TypeAttributes> {
        let attributes = cell.as_ref()?;
        let raw = attributes.get(self.type_index_position)?;
        let index = as_type_index(raw)?;
        self.type_mapping.get(&index)
    }
}

/// Parse a grid payload (array of `null` or attribute arrays)
pub fn parse_grid(grid: &Value) -> Result<Vec<Cell>> {
    let cells = grid.as_array().ok_or_else(|| KpiError::MalformedGrid {
        message: "grid payload is not an array".to_string(),
    })?;

    cells
        .iter()
        .enumerate()
        .map(|(i, cell)| match cell {
            Value::Null => Ok(None),
            Value::Array(values) => Ok(Some(values.clone())),
            _ => Err(KpiError::MalformedGrid {
                message: format!("cell {} is neither null nor an array", i),
            }),
        })
        .collect()
}

fn parse_type_mapping(mapping: &Value) -> Result<HashMap<i64, TypeAttributes>> {
    let mut types = HashMap::new();
    match mapping {
        Value::Array(entries) => {
            for (i, entry) in entries.iter().enumerate() {
                if let Some(attrs) = TypeAttributes::from_entry(entry) {
                    types.insert(i as i64, attrs);
                }
            }
        }
        Value::Object(entries) => {
            for (key, entry) in entries {
                let Ok(index) = key.trim().parse::<i64>() else {
                    debug!(key = %key, "Skipping non-integer type mapping key");
                    continue;
                };
                if let Some(attrs) = TypeAttributes::from_entry(entry) {
                    types.insert(index, attrs);
                }
            }
        }
        _ => return Err(malformed("'mapping.type' must be an array or an object")),
    }
    Ok(types)
}

fn as_type_index(value: &Value) -> Option<i64> {
    if let Some(i) = value.as_i64() {
        return Some(i);
    }
    value
        .as_f64()
        .filter(|f| f.fract() == 0.0 && f.is_finite())
        .map(|f| f as i64)
}

fn required_f64(spatial: &Map<String, Value>, key: &str) -> Result<f64> {
    spatial
        .get(key)
        .and_then(Value::as_f64)
        .ok_or_else(|| malformed(format!("missing or non-numeric 'spatial.{}'", key)))
}

fn required_dimension(spatial: &Map<String, Value>, key: &str) -> Result<usize> {
    match spatial.get(key).and_then(Value::as_u64) {
        Some(n) if n > 0 => usize::try_from(n).map_err(|_| {
            malformed(format!("'spatial.{}' is too large: {}", key, n))
        }),
        _ => Err(malformed(format!(
            "'spatial.{}' must be a positive integer",
            key
        ))),
    }
}

fn malformed(message: impl Into<String>) -> KpiError {
    KpiError::MalformedHeader {
        message: message.into(),
    }
}
