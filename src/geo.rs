//! Local grid coordinates to compute-CRS coordinates.
//!
//! The grid's row axis grows southward while northing grows northward, so
//! the row coordinate is negated before rotation.

use crate::crs::Coord;
use crate::table::GridTable;

/// Maps local `(column, row)` grid coordinates into the compute CRS
#[derive(Debug, Clone, Copy)]
pub struct Local2Geo {
    cell_size: f64,
    cos: f64,
    sin: f64,
    origin: Coord,
}

impl Local2Geo {
    /// Create a mapper for a cell size, a rotation in degrees (counter-clockwise
    /// positive) and an origin in the compute CRS
    pub fn new(cell_size: f64, rotation_deg: f64, origin: Coord) -> Self {
        let theta = rotation_deg.to_radians();
        Self {
            cell_size,
            cos: theta.cos(),
            sin: theta.sin(),
            origin,
        }
    }

    /// Mapper for a table whose origin is known
    pub fn for_table(table: &GridTable, origin: Coord) -> Self {
        Self::new(table.cell_size(), table.rotation(), origin)
    }

    /// Scale, rotate, then translate a local coordinate.
    ///
    /// `x` and `y` may be fractional (cell corners and centroids).
    pub fn local_to_geo(&self, x: f64, y: f64) -> Coord {
        let sx = x * self.cell_size;
        let sy = -y * self.cell_size;

        let nx = sx * self.cos - sy * self.sin;
        let ny = sx * self.sin + sy * self.cos;

        Coord::new(nx + self.origin.x, ny + self.origin.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn assert_coord(actual: Coord, x: f64, y: f64) {
        assert!(
            (actual.x - x).abs() < EPS && (actual.y - y).abs() < EPS,
            "expected ({}, {}), got ({}, {})",
            x,
            y,
            actual.x,
            actual.y
        );
    }

    #[test]
    fn test_no_rotation_is_scale_and_translate() {
        let origin = Coord::new(566_000.0, 5_933_000.0);
        let mapper = Local2Geo::new(16.0, 0.0, origin);
        for (x, y) in [(0.0, 0.0), (1.0, 0.0), (3.0, 7.0), (2.5, 0.5), (100.0, 42.0)] {
            assert_coord(
                mapper.local_to_geo(x, y),
                x * 16.0 + origin.x,
                -y * 16.0 + origin.y,
            );
        }
    }

    #[test]
    fn test_quarter_turn() {
        let mapper = Local2Geo::new(10.0, 90.0, Coord::new(0.0, 0.0));
        // (10, 0) rotated counter-clockwise by 90° lands on (0, 10)
        assert_coord(mapper.local_to_geo(1.0, 0.0), 0.0, 10.0);
        // (0, -10) lands on (10, 0)
        assert_coord(mapper.local_to_geo(0.0, 1.0), 10.0, 0.0);
    }

    #[test]
    fn test_rotation_preserves_distance() {
        let origin = Coord::new(12.0, -4.0);
        let pairs = [((0.0, 0.0), (3.0, 4.0)), ((1.5, 2.0), (-2.0, 7.5)), ((5.0, 5.0), (5.0, 6.0))];

        for rotation in [0.0, 17.3, 45.0, 90.0, 183.0, -60.0, 359.9] {
            let mapper = Local2Geo::new(16.0, rotation, origin);
            for ((x1, y1), (x2, y2)) in pairs {
                let a = mapper.local_to_geo(x1, y1);
                let b = mapper.local_to_geo(x2, y2);
                let actual = ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt();
                let expected = 16.0 * ((x1 - x2).powi(2) + (y1 - y2).powi(2)).sqrt();
                assert!(
                    (actual - expected).abs() < 1e-6,
                    "rotation {}: {} != {}",
                    rotation,
                    actual,
                    expected
                );
            }
        }
    }

    #[test]
    fn test_origin_maps_to_origin() {
        let origin = Coord::new(1.0, 2.0);
        let mapper = Local2Geo::new(10.0, 33.0, origin);
        assert_coord(mapper.local_to_geo(0.0, 0.0), 1.0, 2.0);
    }
}
