//! End-to-end correction of a query batch towards a reference batch.
//!
//! Given anchor pairs (reference sample, query sample), the pipeline forms one
//! correction vector per pair, smooths them into a per-sample correction field
//! over the query batch, optionally rescales each vector by quantile matching
//! and finally adds the field onto the query matrix.
use ndarray::{Array1, Array2, ArrayView2, Axis, Zip};

use crate::config::CorrectionConfig;
use crate::error::{CorrectionError, Result};
use crate::smoothing::KernelSmoother;
use crate::variance::VarianceAdjuster;

/// Outputs of [`correct_batch`].
#[derive(Debug, Clone)]
pub struct BatchCorrection {
    /// Query matrix plus correction field (F x N2).
    pub corrected: Array2<f64>,
    /// Correction field after any variance scaling (F x N2).
    pub correction: Array2<f64>,
    /// Clamped scale factors, one per query sample, when `var_adj` is set.
    pub scaling: Option<Array1<f64>>,
}

/// Correction vectors `reference[:, r] - query[:, q]` for every pair, plus the
/// query-side anchor index of each row.
pub fn pair_corrections(
    reference: ArrayView2<'_, f64>,
    query: ArrayView2<'_, f64>,
    pairs: &[(usize, usize)],
) -> Result<(Array2<f64>, Vec<usize>)> {
    let ngenes = reference.nrows();
    if query.nrows() != ngenes {
        return Err(CorrectionError::DimensionMismatch {
            what: "query features vs reference features",
            expected: ngenes,
            got: query.nrows(),
        });
    }

    let mut vectors = Array2::<f64>::zeros((pairs.len(), ngenes));
    let mut index = Vec::with_capacity(pairs.len());
    for (mut row, &(r, q)) in vectors.outer_iter_mut().zip(pairs) {
        if r >= reference.ncols() {
            return Err(CorrectionError::IndexOutOfBounds {
                what: "reference sample",
                index: r,
                len: reference.ncols(),
            });
        }
        if q >= query.ncols() {
            return Err(CorrectionError::IndexOutOfBounds {
                what: "query sample",
                index: q,
                len: query.ncols(),
            });
        }
        Zip::from(&mut row)
            .and(reference.column(r))
            .and(query.column(q))
            .for_each(|v, &a, &b| *v = a - b);
        index.push(q);
    }

    Ok((vectors, index))
}

/// Correct `query` (F x N2) towards `reference` (F x N1) using anchor `pairs`.
pub fn correct_batch(
    reference: ArrayView2<'_, f64>,
    query: ArrayView2<'_, f64>,
    pairs: &[(usize, usize)],
    config: &CorrectionConfig,
) -> Result<BatchCorrection> {
    config.validate()?;
    if pairs.is_empty() {
        return Err(CorrectionError::InvalidArgument(
            "at least one anchor pair is required".to_string(),
        ));
    }

    let (vectors, index) = pair_corrections(reference, query, pairs)?;
    log::info!(
        "Correcting {} query samples against {} reference samples using {} pairs",
        query.ncols(),
        reference.ncols(),
        pairs.len()
    );

    let smoother = KernelSmoother::new(config.sigma)?.with_parallel(config.parallel);
    let mut correction = smoother.smooth(&vectors, &index, &query)?;

    let scaling = if config.var_adj {
        let adjuster = VarianceAdjuster::new(config.sigma)?.with_parallel(config.parallel);
        let mut scaling = adjuster.adjust(&reference, &query, &correction.t())?;
        scaling.mapv_inplace(|s| if s.is_finite() { s.max(config.min_scale) } else { s });

        for (mut column, &scale) in correction.axis_iter_mut(Axis(1)).zip(scaling.iter()) {
            column.mapv_inplace(|v| v * scale);
        }
        Some(scaling)
    } else {
        None
    };

    let corrected = &query + &correction;

    Ok(BatchCorrection {
        corrected,
        correction,
        scaling,
    })
}
