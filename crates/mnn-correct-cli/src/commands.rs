//! Subcommand bodies: load inputs, run the core, write outputs.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use mnn_correct::{
    correct_batch, BatchCorrection, CorrectionConfig, KernelSmoother, VarianceAdjuster,
};

use crate::io::{read_index, read_matrix, read_pairs, write_matrix, write_vector};
use crate::util::validate_tsv_or_csv_file;

/// Load a correction configuration from a JSON file.
///
/// Missing fields fall back to their defaults.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CorrectionConfig> {
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
    let config: CorrectionConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.as_ref().display()))?;
    Ok(config)
}

/// Inputs and outputs of the `correct` subcommand.
#[derive(Debug, Clone)]
pub struct CorrectJob {
    pub reference: PathBuf,
    pub query: PathBuf,
    pub pairs: PathBuf,
    pub output: PathBuf,
    pub scaling_output: Option<PathBuf>,
    pub config: CorrectionConfig,
}

pub fn run_correct(job: &CorrectJob) -> Result<BatchCorrection> {
    for input in [&job.reference, &job.query, &job.pairs] {
        validate_tsv_or_csv_file(&input.to_string_lossy())?;
    }

    let reference = read_matrix(&job.reference)?;
    let query = read_matrix(&job.query)?;
    let pairs = read_pairs(&job.pairs)?;
    log::info!(
        "Loaded reference {:?}, query {:?} and {} anchor pairs",
        reference.dim(),
        query.dim(),
        pairs.len()
    );

    let result = correct_batch(reference.view(), query.view(), &pairs, &job.config)
        .context("Batch correction failed")?;

    write_matrix(&job.output, result.corrected.view())?;
    log::info!("Corrected matrix written to {}", job.output.display());

    if let Some(path) = &job.scaling_output {
        match &result.scaling {
            Some(scaling) => write_vector(path, scaling)?,
            None => log::warn!(
                "Variance adjustment disabled; not writing scale factors to {}",
                path.display()
            ),
        }
    }

    Ok(result)
}

/// Inputs and outputs of the `smooth` subcommand.
#[derive(Debug, Clone)]
pub struct SmoothJob {
    pub vectors: PathBuf,
    pub index: PathBuf,
    pub data: PathBuf,
    pub output: PathBuf,
    pub sigma: f64,
    pub parallel: bool,
}

pub fn run_smooth(job: &SmoothJob) -> Result<()> {
    for input in [&job.vectors, &job.data] {
        validate_tsv_or_csv_file(&input.to_string_lossy())?;
    }

    let vectors = read_matrix(&job.vectors)?;
    let index = read_index(&job.index)?;
    let data = read_matrix(&job.data)?;

    let field = KernelSmoother::new(job.sigma)?
        .with_parallel(job.parallel)
        .smooth(&vectors, &index, &data)
        .context("Kernel smoothing failed")?;

    write_matrix(&job.output, field.view())?;
    log::info!(
        "Smoothed {} x {} correction field written to {}",
        field.nrows(),
        field.ncols(),
        job.output.display()
    );
    Ok(())
}

/// Inputs and outputs of the `adjust` subcommand.
#[derive(Debug, Clone)]
pub struct AdjustJob {
    pub reference: PathBuf,
    pub query: PathBuf,
    pub gradients: PathBuf,
    pub output: PathBuf,
    pub sigma: f64,
    pub parallel: bool,
}

pub fn run_adjust(job: &AdjustJob) -> Result<()> {
    for input in [&job.reference, &job.query, &job.gradients] {
        validate_tsv_or_csv_file(&input.to_string_lossy())?;
    }

    let reference = read_matrix(&job.reference)?;
    let query = read_matrix(&job.query)?;
    let gradients = read_matrix(&job.gradients)?;

    let scaling = VarianceAdjuster::new(job.sigma)?
        .with_parallel(job.parallel)
        .adjust(&reference, &query, &gradients)
        .context("Variance adjustment failed")?;

    write_vector(&job.output, &scaling)?;
    log::info!(
        "{} scale factors written to {}",
        scaling.len(),
        job.output.display()
    );
    Ok(())
}
