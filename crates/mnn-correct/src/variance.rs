//! Variance adjustment by quantile matching along correction directions.
//!
//! For each query sample the correction direction defines a line through the
//! sample. Both populations are projected onto that line and weighted by a
//! Gaussian kernel on their perpendicular distance to it. The sample's weighted
//! cumulative probability within its own population is then matched against the
//! reference population, and the gap between the two projections is returned as
//! a multiple of the original (non-unit) direction vector.
use std::cmp::Ordering;

use ndarray::Array1;
use rayon::prelude::*;

use crate::config::validate_sigma;
use crate::error::{CorrectionError, Result};
use crate::math::{dot, l2_norm, squared_distance_to_line, MatrixAccessor};

#[derive(Debug, Clone, Copy)]
pub struct VarianceAdjuster {
    sigma: f64,
    parallel: bool,
}

/// Per-sample buffers, reused across the outer loop.
struct Workspace {
    current: Vec<f64>,
    grad: Vec<f64>,
    other: Vec<f64>,
    working: Vec<f64>,
    /// (projection, weight) for every reference sample.
    distance1: Vec<(f64, f64)>,
}

impl Workspace {
    fn new(ngenes: usize, ncells1: usize) -> Self {
        Self {
            current: vec![0.0; ngenes],
            grad: vec![0.0; ngenes],
            other: vec![0.0; ngenes],
            working: vec![0.0; ngenes],
            distance1: vec![(0.0, 0.0); ncells1],
        }
    }
}

impl VarianceAdjuster {
    /// Fails with `InvalidArgument` unless `sigma` is finite and positive.
    pub fn new(sigma: f64) -> Result<Self> {
        validate_sigma(sigma)?;
        Ok(Self {
            sigma,
            parallel: false,
        })
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Compute one scale factor per query sample.
    ///
    /// `reference` is F x N1, `query` is F x N2 and `gradients` is N2 x F with
    /// one raw direction per query sample. A zero-length direction or an empty
    /// reference population yields `NaN` for the affected sample.
    pub fn adjust<R, Q, V>(&self, reference: &R, query: &Q, gradients: &V) -> Result<Array1<f64>>
    where
        R: MatrixAccessor + ?Sized,
        Q: MatrixAccessor + ?Sized,
        V: MatrixAccessor + ?Sized,
    {
        let (ngenes, ncells1) = reference.dimensions();
        let (query_genes, ncells2) = query.dimensions();
        let (grad_rows, grad_genes) = gradients.dimensions();

        if query_genes != ngenes {
            return Err(CorrectionError::DimensionMismatch {
                what: "query features vs reference features",
                expected: ngenes,
                got: query_genes,
            });
        }
        if grad_genes != ngenes {
            return Err(CorrectionError::DimensionMismatch {
                what: "gradient length vs reference features",
                expected: ngenes,
                got: grad_genes,
            });
        }
        if grad_rows != ncells2 {
            return Err(CorrectionError::DimensionMismatch {
                what: "gradient rows vs query samples",
                expected: ncells2,
                got: grad_rows,
            });
        }

        log::debug!(
            "Adjusting variance for {} query samples against {} reference samples ({} features, sigma={})",
            ncells2,
            ncells1,
            ngenes,
            self.sigma
        );

        let output: Vec<f64> = if self.parallel {
            (0..ncells2)
                .into_par_iter()
                .map_init(
                    || Workspace::new(ngenes, ncells1),
                    |ws, cell| self.adjust_cell(reference, query, gradients, cell, ws),
                )
                .collect()
        } else {
            let mut ws = Workspace::new(ngenes, ncells1);
            (0..ncells2)
                .map(|cell| self.adjust_cell(reference, query, gradients, cell, &mut ws))
                .collect()
        };

        let degenerate = output.iter().filter(|v| !v.is_finite()).count();
        if degenerate > 0 {
            log::warn!(
                "{} of {} query samples have an undefined scale factor (zero-length direction or empty reference)",
                degenerate,
                ncells2
            );
        }

        Ok(Array1::from_vec(output))
    }

    fn adjust_cell<R, Q, V>(
        &self,
        reference: &R,
        query: &Q,
        gradients: &V,
        cell: usize,
        ws: &mut Workspace,
    ) -> f64
    where
        R: MatrixAccessor + ?Sized,
        Q: MatrixAccessor + ?Sized,
        V: MatrixAccessor + ?Sized,
    {
        query.read_column(cell, &mut ws.current);
        gradients.read_row(cell, &mut ws.grad);

        let l2norm = l2_norm(&ws.grad);
        if !(l2norm > 0.0) || !l2norm.is_finite() {
            return f64::NAN;
        }
        ws.grad.iter_mut().for_each(|g| *g /= l2norm);

        let curproj = dot(&ws.grad, &ws.current);

        // Weighted cumulative probability of this sample within its own batch.
        // The sample itself sits on its own line and counts with weight 1.
        let mut prob2 = 0.0;
        let mut totalprob2 = 0.0;
        for same in 0..query.ncols() {
            if same == cell {
                prob2 += 1.0;
                totalprob2 += 1.0;
                continue;
            }
            query.read_column(same, &mut ws.other);
            let sameproj = dot(&ws.grad, &ws.other);
            let samedist =
                squared_distance_to_line(&ws.current, &ws.grad, &ws.other, &mut ws.working);
            let sameprob = (-samedist / self.sigma).exp();
            if sameproj <= curproj {
                prob2 += sameprob;
            }
            totalprob2 += sameprob;
        }
        prob2 /= totalprob2;

        if ws.distance1.is_empty() {
            return f64::NAN;
        }

        let mut totalprob1 = 0.0;
        for (other, slot) in ws.distance1.iter_mut().enumerate() {
            reference.read_column(other, &mut ws.other);
            let proj = dot(&ws.grad, &ws.other);
            let dist = squared_distance_to_line(&ws.current, &ws.grad, &ws.other, &mut ws.working);
            let weight = (-dist / self.sigma).exp();
            totalprob1 += weight;
            *slot = (proj, weight);
        }
        ws.distance1.sort_unstable_by(|a, b| match a.0.total_cmp(&b.0) {
            Ordering::Equal => a.1.total_cmp(&b.1),
            ord => ord,
        });

        let ref_quan = matched_quantile(&ws.distance1, prob2 * totalprob1);
        (ref_quan - curproj) / l2norm
    }
}

/// First projection at which the cumulative weight reaches `target`.
///
/// `sorted` must be ordered by projection. Falls back to the largest projection
/// when rounding keeps the running sum below `target`, and to `NaN` when empty.
fn matched_quantile(sorted: &[(f64, f64)], target: f64) -> f64 {
    let mut cumulative = 0.0;
    for &(proj, weight) in sorted {
        cumulative += weight;
        if cumulative >= target {
            return proj;
        }
    }
    sorted.last().map(|&(proj, _)| proj).unwrap_or(f64::NAN)
}

/// Quantile-matched scale factor for every query sample.
///
/// Single-threaded; use [`VarianceAdjuster::with_parallel`] to spread query
/// samples over rayon.
pub fn adjust_shift_variance<R, Q, V>(
    reference: &R,
    query: &Q,
    gradients: &V,
    sigma: f64,
) -> Result<Array1<f64>>
where
    R: MatrixAccessor + ?Sized,
    Q: MatrixAccessor + ?Sized,
    V: MatrixAccessor + ?Sized,
{
    VarianceAdjuster::new(sigma)?.adjust(reference, query, gradients)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matched_quantile_walks_cumulative_weight() {
        let sorted = [(-1.0, 1.0), (0.0, 2.0), (3.0, 1.0)];
        assert_eq!(matched_quantile(&sorted, 0.5), -1.0);
        assert_eq!(matched_quantile(&sorted, 3.0), 0.0);
        assert_eq!(matched_quantile(&sorted, 3.5), 3.0);
        // overshoot from rounding falls back to the last projection
        assert_eq!(matched_quantile(&sorted, 4.0 + 1e-12), 3.0);
        assert!(matched_quantile(&[], 1.0).is_nan());
    }
}
