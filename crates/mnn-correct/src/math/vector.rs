//! Slice geometry used for kernel distances and projections.
//!
//! All helpers assume equal-length inputs; callers check shapes up front.

#[inline]
pub fn dot(lhs: &[f64], rhs: &[f64]) -> f64 {
    debug_assert_eq!(lhs.len(), rhs.len(), "dot requires equal length vectors");
    lhs.iter().zip(rhs.iter()).map(|(a, b)| a * b).sum()
}

/// Squared Euclidean distance between two points.
#[inline]
pub fn squared_distance(lhs: &[f64], rhs: &[f64]) -> f64 {
    lhs.iter()
        .zip(rhs.iter())
        .map(|(a, b)| {
            let d = a - b;
            d * d
        })
        .sum()
}

#[inline]
pub fn l2_norm(values: &[f64]) -> f64 {
    values.iter().map(|v| v * v).sum::<f64>().sqrt()
}

/// Squared distance from `point` to the line through `origin` along `direction`.
///
/// `direction` must already have unit length. `working` is scratch space of the
/// same length as the inputs; its contents on return are the perpendicular
/// residual vector.
pub fn squared_distance_to_line(
    origin: &[f64],
    direction: &[f64],
    point: &[f64],
    working: &mut [f64],
) -> f64 {
    for ((w, o), p) in working.iter_mut().zip(origin).zip(point) {
        *w = o - p;
    }

    let scale = dot(working, direction);
    let mut dist = 0.0;
    for (w, d) in working.iter_mut().zip(direction) {
        *w -= scale * d;
        dist += *w * *w;
    }
    dist
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_to_line_ignores_parallel_component() {
        let origin = [0.0, 0.0];
        let direction = [1.0, 0.0];
        let point = [5.0, 2.0];
        let mut working = [0.0; 2];
        let d = squared_distance_to_line(&origin, &direction, &point, &mut working);
        assert!((d - 4.0).abs() < 1e-12);
        assert_eq!(working, [0.0, -2.0]);
    }

    #[test]
    fn norms_and_distances() {
        assert!((l2_norm(&[3.0, 4.0]) - 5.0).abs() < 1e-12);
        assert!((squared_distance(&[1.0, 2.0, 3.0], &[4.0, 6.0, 8.0]) - 50.0).abs() < 1e-12);
        assert!((dot(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]) - 32.0).abs() < 1e-12);
    }
}
