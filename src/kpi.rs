//! Land-use KPI aggregation.
//!
//! A single index-ascending pass over the grid classifies every occupied
//! cell and accumulates six area totals. Category membership is
//! non-exclusive: a use-code listed in several categories adds its area to
//! each of them.

use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::Result;
use crate::table::{BuildingAttributes, Cell, GridTable, TypeAttributes};

/// The six KPI categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Living,
    Commerce,
    Special,
    Green,
    Sports,
    Playgrounds,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Living,
        Category::Commerce,
        Category::Special,
        Category::Green,
        Category::Sports,
        Category::Playgrounds,
    ];

    /// Building-use categories, matched against ground and upper floor use-codes
    pub const BUILDING: [Category; 3] = [Category::Living, Category::Commerce, Category::Special];

    /// Open-space categories, matched against `os_type`
    pub const OPEN_SPACE: [Category; 3] =
        [Category::Green, Category::Sports, Category::Playgrounds];

    /// Name used in the typedefs catalog and in the result record
    pub fn name(self) -> &'static str {
        match self {
            Category::Living => "living",
            Category::Commerce => "commerce",
            Category::Special => "special",
            Category::Green => "green",
            Category::Sports => "sports",
            Category::Playgrounds => "playgrounds",
        }
    }

    /// Fixed target area reported next to each total
    pub fn expected(self) -> f64 {
        match self {
            Category::Living => 400_000.0,
            Category::Commerce => 550_000.0,
            Category::Special => 30_000.0,
            Category::Green => 80_000.0,
            Category::Sports => 10_000.0,
            Category::Playgrounds => 10_000.0,
        }
    }

    fn catalog_section(self) -> &'static str {
        match self {
            Category::Living | Category::Commerce | Category::Special => "buildinguses",
            Category::Green | Category::Sports | Category::Playgrounds => "openspacetypes",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Category catalog: which use-codes belong to which category.
///
/// Missing or malformed catalog entries become empty sets.
#[derive(Debug, Clone, Default)]
pub struct TypeDefs {
    sets: [HashSet<String>; 6],
}

impl TypeDefs {
    /// Build a catalog from its JSON form
    /// (`{buildinguses: {living: [...], ...}, openspacetypes: {green: [...], ...}}`)
    pub fn from_value(value: &Value) -> Self {
        let mut defs = TypeDefs::default();
        for category in Category::ALL {
            let entry = value
                .get(category.catalog_section())
                .and_then(|section| section.get(category.name()));
            match entry.and_then(Value::as_array) {
                Some(codes) => {
                    for code in codes.iter().filter_map(Value::as_str) {
                        defs.insert(category, code);
                    }
                }
                None => warn!(
                    category = category.name(),
                    section = category.catalog_section(),
                    "Typedefs entry missing or not an array; category matches nothing"
                ),
            }
        }
        defs
    }

    /// Read and parse a catalog file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&content)?;
        Ok(Self::from_value(&value))
    }

    /// Whether `code` belongs to `category`
    pub fn contains(&self, category: Category, code: &str) -> bool {
        self.sets[category.slot()].contains(code)
    }

    fn insert(&mut self, category: Category, code: impl Into<String>) {
        self.sets[category.slot()].insert(code.into());
    }
}

/// Area totals per category, in squared grid units
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct KpiTotals {
    areas: [f64; 6],
}

impl KpiTotals {
    pub fn get(&self, category: Category) -> f64 {
        self.areas[category.slot()]
    }

    fn add(&mut self, category: Category, area: f64) {
        self.areas[category.slot()] += area;
    }

    /// `(category, actual, expected)` for every category
    pub fn iter(&self) -> impl Iterator<Item = (Category, f64, f64)> + '_ {
        Category::ALL
            .into_iter()
            .map(move |c| (c, self.get(c), c.expected()))
    }
}

/// Counters describing one aggregation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AggregationStats {
    pub cells: usize,
    pub occupied: usize,
    pub unresolved: usize,
    pub buildings: usize,
    pub open_spaces: usize,
    /// Use-codes that matched no category
    pub category_misses: usize,
}

/// Outcome of one aggregation pass
#[derive(Debug, Clone, Default)]
pub struct KpiReport {
    pub totals: KpiTotals,
    /// Building attributes keyed by linear cell index, to be attached as feature properties
    pub building_properties: BTreeMap<usize, BuildingAttributes>,
    pub stats: AggregationStats,
}

/// Walk the grid once and accumulate the category totals
pub fn aggregate(table: &GridTable, grid: &[Cell], typedefs: &TypeDefs) -> KpiReport {
    let area = table.cell_area();
    let mut report = KpiReport::default();
    report.stats.cells = grid.len();

    for (index, cell) in grid.iter().enumerate() {
        if cell.is_none() {
            continue;
        }
        report.stats.occupied += 1;

        let Some(attributes) = table.resolve(cell) else {
            debug!(index, "Cell type could not be resolved");
            report.stats.unresolved += 1;
            continue;
        };

        match attributes {
            TypeAttributes::Building(building) => {
                report.stats.buildings += 1;
                add_building(&mut report, building, area, typedefs);
                report.building_properties.insert(index, building.clone());
            }
            TypeAttributes::OpenSpace { os_type } => {
                report.stats.open_spaces += 1;
                if let Some(code) = os_type.as_deref() {
                    let matched = add_matching(
                        &mut report.totals,
                        &Category::OPEN_SPACE,
                        code,
                        area,
                        typedefs,
                    );
                    if !matched {
                        report.stats.category_misses += 1;
                    }
                }
            }
            TypeAttributes::Other(kind) => {
                debug!(index, kind = %kind, "Ignoring unclassified cell type");
            }
        }
    }

    report
}

fn add_building(
    report: &mut KpiReport,
    building: &BuildingAttributes,
    area: f64,
    typedefs: &TypeDefs,
) {
    let levels = building.num_levels;

    if let Some(ground) = truthy(&building.use_ground) {
        if levels > 0 {
            let matched =
                add_matching(&mut report.totals, &Category::BUILDING, ground, area, typedefs);
            if !matched {
                report.stats.category_misses += 1;
            }
        }
    }

    if let Some(upper) = truthy(&building.use_upper) {
        if levels > 1 {
            let upper_area = area * (levels - 1) as f64;
            let matched =
                add_matching(&mut report.totals, &Category::BUILDING, upper, upper_area, typedefs);
            if !matched {
                report.stats.category_misses += 1;
            }
        }
    }
}

/// Add `area` to every category in `candidates` that lists `code`
fn add_matching(
    totals: &mut KpiTotals,
    candidates: &[Category],
    code: &str,
    area: f64,
    typedefs: &TypeDefs,
) -> bool {
    let mut matched = false;
    for &category in candidates {
        if typedefs.contains(category, code) {
            totals.add(category, area);
            matched = true;
        }
    }
    matched
}

fn truthy(code: &Option<String>) -> Option<&str> {
    code.as_deref().filter(|c| !c.is_empty())
}
