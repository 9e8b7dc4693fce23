//! Gaussian-kernel smoothing of per-anchor correction vectors.
//!
//! Every anchor spreads its mean correction vector to all samples with weight
//! `exp(-d2(a, s) / sigma - density(a))`, where `density(a)` is the log-sum of
//! the anchor's kernel values over all anchors. Dividing by the density keeps
//! tight clusters of anchors from dominating the field. The weighted sums are
//! normalised per sample by the total weight that reached it.
use ndarray::{Array1, Array2};
use rayon::prelude::*;

use crate::averages::AverageMap;
use crate::config::validate_sigma;
use crate::error::{CorrectionError, Result};
use crate::math::{logspace_add, squared_distance, MatrixAccessor};

#[derive(Debug, Clone, Copy)]
pub struct KernelSmoother {
    sigma: f64,
    parallel: bool,
}

/// Running sums for a subset of anchors plus reusable read buffers.
struct Partial {
    /// samples x genes; transposed on output.
    field: Array2<f64>,
    total: Array1<f64>,
    anchor_cell: Vec<f64>,
    other_cell: Vec<f64>,
    logprob: Vec<f64>,
}

impl Partial {
    fn new(ncells: usize, ngenes: usize, ngenes_for_dist: usize) -> Self {
        Self {
            field: Array2::zeros((ncells, ngenes)),
            total: Array1::zeros(ncells),
            anchor_cell: vec![0.0; ngenes_for_dist],
            other_cell: vec![0.0; ngenes_for_dist],
            logprob: vec![0.0; ncells],
        }
    }

    fn merge(mut self, other: Partial) -> Partial {
        self.field += &other.field;
        self.total += &other.total;
        self
    }
}

impl KernelSmoother {
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

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Average `vectors` by `index`, then smooth over the samples of `data`.
    ///
    /// `vectors` is npairs x G, `index` has one anchor id per row and `data` is
    /// F x N. Returns the G x N smoothed field. Anchor ids at or beyond N are
    /// rejected before anything is allocated.
    pub fn smooth<V, D>(&self, vectors: &V, index: &[usize], data: &D) -> Result<Array2<f64>>
    where
        V: MatrixAccessor + ?Sized,
        D: MatrixAccessor + ?Sized,
    {
        let averages = AverageMap::build(vectors, index, Some(data.ncols()))?;
        self.smooth_averages(&averages, data)
    }

    /// Smooth precomputed anchor averages over the samples of `data` (F x N).
    pub fn smooth_averages<D>(&self, averages: &AverageMap, data: &D) -> Result<Array2<f64>>
    where
        D: MatrixAccessor + ?Sized,
    {
        let (ngenes_for_dist, ncells) = data.dimensions();
        let ngenes = averages.ngenes();
        let anchors = averages.anchors();

        if anchors.is_empty() {
            return Err(CorrectionError::InvalidArgument(
                "at least one correction vector is required for smoothing".to_string(),
            ));
        }
        if let Some(&last) = anchors.last() {
            if last >= ncells {
                return Err(CorrectionError::IndexOutOfBounds {
                    what: "anchor",
                    index: last,
                    len: ncells,
                });
            }
        }

        log::debug!(
            "Smoothing {} anchors over {} samples ({} distance features, {} output features, sigma={})",
            anchors.len(),
            ncells,
            ngenes_for_dist,
            ngenes,
            self.sigma
        );

        let partial = if self.parallel {
            anchors
                .par_iter()
                .fold(
                    || Partial::new(ncells, ngenes, ngenes_for_dist),
                    |mut partial, &anchor| {
                        self.accumulate_anchor(averages, data, anchor, &mut partial);
                        partial
                    },
                )
                .reduce(
                    || Partial::new(ncells, ngenes, 0),
                    Partial::merge,
                )
        } else {
            let mut partial = Partial::new(ncells, ngenes, ngenes_for_dist);
            for &anchor in anchors {
                self.accumulate_anchor(averages, data, anchor, &mut partial);
            }
            partial
        };

        let Partial {
            mut field, total, ..
        } = partial;

        for (cell, (mut row, &weight)) in field.outer_iter_mut().zip(total.iter()).enumerate() {
            if !(weight > 0.0) {
                return Err(CorrectionError::DegenerateWeights { sample: cell });
            }
            row.mapv_inplace(|v| v / weight);
        }

        Ok(field.reversed_axes())
    }

    /// Log-kernel values `-d2(anchor, s) / sigma` for every sample `s`.
    fn log_kernel<D>(&self, data: &D, anchor: usize, partial: &mut Partial)
    where
        D: MatrixAccessor + ?Sized,
    {
        data.read_column(anchor, &mut partial.anchor_cell);
        for (other, logprob) in partial.logprob.iter_mut().enumerate() {
            data.read_column(other, &mut partial.other_cell);
            *logprob = -squared_distance(&partial.anchor_cell, &partial.other_cell) / self.sigma;
        }
    }

    fn accumulate_anchor<D>(
        &self,
        averages: &AverageMap,
        data: &D,
        anchor: usize,
        partial: &mut Partial,
    ) where
        D: MatrixAccessor + ?Sized,
    {
        self.log_kernel(data, anchor, partial);

        let density = averages
            .anchors()
            .iter()
            .fold(f64::NEG_INFINITY, |acc, &other| {
                logspace_add(acc, partial.logprob[other])
            });
        log::trace!("anchor {}: log-density {}", anchor, density);

        let correction = averages.row(anchor);

        for ((mut row, total), &logprob) in partial
            .field
            .outer_iter_mut()
            .zip(partial.total.iter_mut())
            .zip(partial.logprob.iter())
        {
            let mult = (logprob - density).exp();
            *total += mult;
            row.scaled_add(mult, &correction);
        }
    }
}

/// Smooth per-pair correction vectors into a per-sample correction field.
///
/// `vectors` is npairs x G, `index` holds the anchor sample of each row, and
/// `data` is the F x N matrix distances are computed on. Single-threaded; use
/// [`KernelSmoother::with_parallel`] to spread anchors over rayon.
pub fn smooth_gaussian_kernel<V, D>(
    vectors: &V,
    index: &[usize],
    data: &D,
    sigma: f64,
) -> Result<Array2<f64>>
where
    V: MatrixAccessor + ?Sized,
    D: MatrixAccessor + ?Sized,
{
    KernelSmoother::new(sigma)?.smooth(vectors, index, data)
}
