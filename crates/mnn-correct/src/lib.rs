//! mnn-correct: kernel smoothing and variance adjustment of correction vectors
//! for batch-effect removal in high-dimensional sample data.
//!
//! The two core operations are [`smooth_gaussian_kernel`], which spreads
//! per-anchor correction vectors over all samples with density-weighted
//! Gaussian kernels, and [`adjust_shift_variance`], which derives per-sample
//! scale factors by matching weighted quantiles along each correction
//! direction. Both read their inputs through [`MatrixAccessor`], so dense
//! `ndarray` arrays and `sprs` sparse matrices can be passed interchangeably.
//!
//! [`correct_batch`] composes the two for a reference/query pair of batches.
pub mod averages;
pub mod config;
pub mod error;
pub mod math;
pub mod pipeline;
pub mod smoothing;
pub mod variance;

pub use averages::AverageMap;
pub use config::CorrectionConfig;
pub use error::{CorrectionError, Result};
pub use math::MatrixAccessor;
pub use pipeline::{correct_batch, pair_corrections, BatchCorrection};
pub use smoothing::{smooth_gaussian_kernel, KernelSmoother};
pub use variance::{adjust_shift_variance, VarianceAdjuster};
