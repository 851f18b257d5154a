//! Criterion benchmarks for one evaluation of a 100x100 table.
//!
//! Benchmarks:
//!   - KPI aggregation alone
//!   - polygon and point feature generation with WGS 84 output
//!
//! Run with: cargo bench --bench feature_builder

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::{json, Value};

use cityio_kpi::table::parse_grid;
use cityio_kpi::{aggregate, Crs, CrsTransform, FeatureBuilder, FeatureShape, GridTable, TypeDefs};

const SIDE: usize = 100;

fn header() -> Value {
    json!({
        "spatial": {
            "cellSize": 16, "ncols": SIDE, "nrows": SIDE,
            "rotation": 12.5, "latitude": 53.5366, "longitude": 10.0104
        },
        "mapping": {"type": [
            {
                "type": "building",
                "bld_useGround": "residential", "bld_useUpper": "office", "bld_numLevels": 4
            },
            {"type": "open_space", "os_type": "park"}
        ]},
        "block": ["type"]
    })
}

// Alternating buildings, parks and empty cells
fn grid() -> Value {
    let cells: Vec<Value> = (0..SIDE * SIDE)
        .map(|i| match i % 3 {
            0 => json!([0]),
            1 => json!([1]),
            _ => Value::Null,
        })
        .collect();
    Value::Array(cells)
}

fn typedefs() -> TypeDefs {
    TypeDefs::from_value(&json!({
        "buildinguses": {"living": ["residential"], "commerce": ["office"], "special": []},
        "openspacetypes": {"green": ["park"], "sports": [], "playgrounds": []}
    }))
}

fn bench_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluation_100x100");
    group.sample_size(20);

    let wgs84 = Crs::parse("EPSG:4326").expect("wgs84");
    let utm = Crs::parse("EPSG:25832").expect("utm");
    let to_compute = CrsTransform::new(&wgs84, &utm).expect("input transform");
    let to_output = CrsTransform::new(&utm, &wgs84).expect("output transform");

    let table = GridTable::from_header(&header(), &to_compute).expect("table");
    let cells = parse_grid(&grid()).expect("grid");
    let typedefs = typedefs();

    group.bench_function("aggregate", |b| {
        b.iter(|| black_box(aggregate(&table, black_box(&cells), &typedefs)));
    });

    let builder = FeatureBuilder::new(&table, &to_output).expect("builder");

    group.bench_function("polygons", |b| {
        b.iter(|| black_box(builder.build(FeatureShape::Polygon).expect("polygons")));
    });

    group.bench_function("points", |b| {
        b.iter(|| black_box(builder.build(FeatureShape::Point).expect("points")));
    });

    group.finish();
}

criterion_group!(benches, bench_evaluation);
criterion_main!(benches);
