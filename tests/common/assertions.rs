//! Assertion utilities for testing.
//!
//! Helpers for comparing coordinates and KPI values with a tolerance.

/// Default epsilon for floating-point comparisons
pub const DEFAULT_EPSILON: f64 = 1e-9;

/// Assert that two floating-point values are approximately equal.
///
/// # Panics
///
/// Panics if the absolute difference between `actual` and `expected` is greater than `epsilon`.
pub fn assert_approx_eq(actual: f64, expected: f64, epsilon: Option<f64>) {
    let epsilon = epsilon.unwrap_or(DEFAULT_EPSILON);
    let diff = (actual - expected).abs();

    assert!(
        diff <= epsilon,
        "Values not approximately equal: actual = {}, expected = {}, diff = {}, epsilon = {}",
        actual,
        expected,
        diff,
        epsilon
    );
}

/// Assert that two GeoJSON rings are approximately equal point by point.
///
/// # Panics
///
/// Panics if the rings have different lengths or any coordinate differs by more than `epsilon`.
pub fn assert_ring_approx_eq(actual: &[[f64; 2]], expected: &[[f64; 2]], epsilon: Option<f64>) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "Rings have different lengths: actual = {}, expected = {}",
        actual.len(),
        expected.len()
    );

    let eps = epsilon.unwrap_or(DEFAULT_EPSILON);
    for (i, (a, e)) in actual.iter().zip(expected.iter()).enumerate() {
        assert!(
            (a[0] - e[0]).abs() <= eps && (a[1] - e[1]).abs() <= eps,
            "Rings differ at vertex {}: actual = {:?}, expected = {:?}, epsilon = {}",
            i,
            a,
            e,
            eps
        );
    }
}

/// Assert that a ring is closed (first vertex repeated last)
pub fn assert_ring_closed(ring: &[[f64; 2]]) {
    assert!(ring.len() >= 4, "Ring too short: {:?}", ring);
    assert_eq!(ring.first(), ring.last(), "Ring is not closed: {:?}", ring);
}

/// Assert that a value lies within `[min, max]`
pub fn assert_in_range(actual: f64, min: f64, max: f64) {
    assert!(
        actual >= min && actual <= max,
        "Value not in range: actual = {}, min = {}, max = {}",
        actual,
        min,
        max
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assert_approx_eq() {
        assert_approx_eq(1.0, 1.0, None);
        assert_approx_eq(1.0, 1.001, Some(0.01));
    }

    #[test]
    fn test_assert_ring_helpers() {
        let ring = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]];
        assert_ring_closed(&ring);
        assert_ring_approx_eq(&ring, &ring, None);
    }

    #[test]
    fn test_assert_in_range() {
        assert_in_range(5.0, 0.0, 10.0);
        assert_in_range(10.0, 0.0, 10.0);
    }
}
