//! One evaluation cycle.
//!
//! [`evaluate`] is the synchronous core: header → grid table → KPI pass →
//! optional features → result record. [`run_cycle`] wraps it with the cityIO
//! fetch and post.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;
use tracing::info;

use crate::cityio::CityIoClient;
use crate::config::{Config, OutputForm, ProcessingConfig};
use crate::crs::CrsTransform;
use crate::error::{KpiError, Result};
use crate::features::{Feature, FeatureBuilder, FeatureCollection};
use crate::kpi::{aggregate, AggregationStats, Category, KpiTotals, TypeDefs};
use crate::logging::{
    generate_request_id, log_cycle_stats, log_error, log_operation_end, log_operation_start,
    log_timed_operation,
};
use crate::table::{parse_grid, GridTable};

/// Result record posted downstream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiResult {
    pub living: f64,
    pub living_expected: f64,
    pub commerce: f64,
    pub commerce_expected: f64,
    pub special: f64,
    pub special_expected: f64,
    pub green: f64,
    pub green_expected: f64,
    pub sports: f64,
    pub sports_expected: f64,
    pub playgrounds: f64,
    pub playgrounds_expected: f64,
    pub grid_hash: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<Feature>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geojson: Option<FeatureCollection>,
}

impl KpiResult {
    /// Totals with their targets, without geometry
    pub fn new(totals: &KpiTotals, grid_hash: Value) -> Self {
        Self {
            living: totals.get(Category::Living),
            living_expected: Category::Living.expected(),
            commerce: totals.get(Category::Commerce),
            commerce_expected: Category::Commerce.expected(),
            special: totals.get(Category::Special),
            special_expected: Category::Special.expected(),
            green: totals.get(Category::Green),
            green_expected: Category::Green.expected(),
            sports: totals.get(Category::Sports),
            sports_expected: Category::Sports.expected(),
            playgrounds: totals.get(Category::Playgrounds),
            playgrounds_expected: Category::Playgrounds.expected(),
            grid_hash,
            features: None,
            geojson: None,
        }
    }

    /// Place features in the record according to the output form
    pub fn with_features(mut self, collection: FeatureCollection, form: OutputForm) -> Self {
        match form {
            OutputForm::Features => self.features = Some(collection.into_features()),
            OutputForm::Geojson => self.geojson = Some(collection),
        }
        self
    }
}

/// Summary of an evaluation, kept for the heartbeat endpoint and the logs
#[derive(Debug, Clone, Serialize)]
pub struct CycleSummary {
    pub cycle_id: String,
    pub finished_at: DateTime<Utc>,
    pub grid_hash: Value,
    pub stats: AggregationStats,
    pub feature_count: Option<usize>,
    pub duration_ms: f64,
}

/// Output of [`evaluate`]
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub result: KpiResult,
    pub summary: CycleSummary,
}

/// Evaluate one table snapshot.
///
/// Reprojection transforms are built here for every call, so a changed CRS
/// configuration takes effect on the next evaluation.
pub fn evaluate(
    header: &Value,
    grid: &Value,
    grid_hash: Value,
    typedefs: &TypeDefs,
    processing: &ProcessingConfig,
) -> Result<Evaluation> {
    let cycle_id = generate_request_id();
    let start = Instant::now();

    let (input_crs, compute_crs, output_crs) = processing.crs_chain()?;
    let to_compute = CrsTransform::new(&input_crs, &compute_crs)?;

    let table = GridTable::from_header(header, &to_compute)?;
    let cells = parse_grid(grid)?;
    table.check_grid(&cells)?;

    let report = aggregate(&table, &cells, typedefs);
    let mut result = KpiResult::new(&report.totals, grid_hash.clone());

    let mut feature_count = None;
    if let Some(shape) = processing.geometry.shape() {
        let to_output = CrsTransform::new(&compute_crs, &output_crs)?;
        let builder = FeatureBuilder::new(&table, &to_output)?;

        let mut collection = log_timed_operation("build_features", || builder.build(shape))?;
        collection.attach_properties(&report.building_properties)?;
        collection.retain_populated();

        feature_count = Some(collection.len());
        result = result.with_features(collection, processing.output_form);
    }

    let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
    log_cycle_stats(
        &cycle_id,
        &report.stats,
        &report.totals,
        feature_count,
        duration_ms,
    );

    Ok(Evaluation {
        result,
        summary: CycleSummary {
            cycle_id,
            finished_at: Utc::now(),
            grid_hash,
            stats: report.stats,
            feature_count,
            duration_ms,
        },
    })
}

/// Fetch the table, evaluate it and post the result
pub async fn run_cycle(client: &CityIoClient, config: &Config) -> Result<CycleSummary> {
    let start = Instant::now();
    let source = client.topic_url("");
    log_operation_start("cycle", Some(source.as_str()));

    let outcome = async {
        let header = client.fetch_header().await?;
        let grid = client.fetch_grid().await?;
        let grid_hash = client.fetch_grid_hash().await?;

        let typedefs = TypeDefs::load(&config.processing.typedefs_path)?;

        let evaluation = evaluate(&header, &grid, grid_hash, &typedefs, &config.processing)?;
        client.post_result(&evaluation.result).await?;
        Ok::<_, KpiError>(evaluation.summary)
    }
    .await;

    log_operation_end("cycle", start, outcome.is_ok());
    match &outcome {
        Ok(summary) => info!(
            cycle_id = %summary.cycle_id,
            grid_hash = %summary.grid_hash,
            "Cycle finished"
        ),
        Err(e) => log_error(e, "cycle"),
    }
    outcome
}
