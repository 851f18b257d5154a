//! Test data for the integration tests.
//!
//! Builds small cityIO table snapshots and a typedefs catalog on disk.

use serde_json::{json, Value};
use std::path::{Path, PathBuf};

/// Cell edge length of the sample table, in metres
pub const CELL_SIZE: f64 = 10.0;

/// Header of a 2x2 table near Hamburg with one building and two open-space types
pub fn sample_header() -> Value {
    json!({
        "spatial": {
            "cellSize": CELL_SIZE,
            "ncols": 2,
            "nrows": 2,
            "rotation": 0,
            "latitude": 53.5366,
            "longitude": 10.0104
        },
        "mapping": {
            "type": [
                {
                    "type": "building",
                    "bld_useGround": "residential",
                    "bld_useUpper": "office",
                    "bld_numLevels": 3
                },
                {"type": "open_space", "os_type": "park"},
                {"type": "open_space", "os_type": "playground"}
            ]
        },
        "block": ["type", "height"]
    })
}

/// Grid for [`sample_header`]: building, park, empty, playground
pub fn sample_grid() -> Value {
    json!([[0, 1], [1, 0], null, [2, 0]])
}

/// Header without the spatial section
pub fn malformed_header() -> Value {
    json!({"mapping": {"type": []}, "block": ["type"]})
}

/// Catalog matching the sample table
pub fn sample_typedefs() -> Value {
    json!({
        "buildinguses": {
            "living": ["residential"],
            "commerce": ["office", "retail"],
            "special": ["school"]
        },
        "openspacetypes": {
            "green": ["park", "playground"],
            "sports": ["field"],
            "playgrounds": ["playground"]
        }
    })
}

/// Write [`sample_typedefs`] into `dir` and return its path
pub fn write_typedefs(dir: &Path) -> PathBuf {
    let path = dir.join("typedefs.json");
    let content = serde_json::to_string_pretty(&sample_typedefs()).expect("serialize typedefs");
    std::fs::write(&path, content).expect("write typedefs");
    path
}
