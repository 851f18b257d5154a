//! # cityio-kpi
//!
//! Land-use KPIs and cell geometry for cityIO simulation tables.
//!
//! A table snapshot is an abstract typed grid: every cell carries a
//! type-index into a mapping of building and open-space attributes. This
//! crate interprets that grid as physical space and reduces it to six area
//! totals, optionally emitting every building cell as a GeoJSON polygon or
//! point in a configurable output CRS.
//!
//! ## Architecture
//!
//! - **Grid table** ([`table`]): header parsing, type mapping, cell resolution
//! - **Coordinates** ([`crs`], [`geo`]): local grid → compute CRS → output CRS
//! - **Features** ([`features`]): cell polygons or centroids as GeoJSON
//! - **KPIs** ([`kpi`]): single-pass category aggregation against a typedefs catalog
//! - **Driver** ([`pipeline`], [`cityio`], [`handlers`]): one fetch/evaluate/post
//!   cycle against cityIO, or an HTTP endpoint evaluating posted snapshots

pub mod cityio;
pub mod config;
pub mod crs;
pub mod error;
pub mod features;
pub mod geo;
pub mod handlers;
pub mod kpi;
pub mod logging;
pub mod pipeline;
pub mod state;
pub mod table;

pub use config::Config;
pub use crs::{to_geojson, Coord, Crs, CrsTransform, Reproject};
pub use error::{KpiError, Result};
pub use features::{
    Feature, FeatureBuilder, FeatureCollection, FeatureShape, Geometry, GeometryMode,
};
pub use geo::Local2Geo;
pub use kpi::{aggregate, Category, KpiReport, KpiTotals, TypeDefs};
pub use logging::{
    create_http_trace_layer, generate_request_id, init_tracing, log_cycle_stats, log_error,
    log_operation_end, log_operation_start, log_request_error, log_timed_operation,
};
pub use pipeline::{evaluate, run_cycle, CycleSummary, Evaluation, KpiResult};
pub use state::AppState;
pub use table::{BuildingAttributes, Cell, GridTable, TypeAttributes};
