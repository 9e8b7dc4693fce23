//! Delimited-text readers and writers for matrices, anchor pairs and vectors.
//!
//! Matrices are headerless numeric tables. Anchor pairs carry a
//! `reference,query` header with 0-based indices.
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use ndarray::{Array1, Array2, ArrayView2};
use serde::Deserialize;

use crate::util::Delimited;

#[derive(Debug, Deserialize)]
struct PairRecord {
    reference: usize,
    query: usize,
}

/// Read a headerless numeric table into a dense matrix.
pub fn read_matrix<P: AsRef<Path>>(path: P) -> Result<Array2<f64>> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(Delimited::from_path(path).delimiter())
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open matrix: {}", path.display()))?;

    let mut data = Vec::new();
    let mut ncols: Option<usize> = None;
    let mut nrows = 0usize;

    for (row_idx, record) in reader.records().enumerate() {
        let record = record
            .with_context(|| format!("Failed to read row {} of {}", row_idx + 1, path.display()))?;
        match ncols {
            None => ncols = Some(record.len()),
            Some(n) if n != record.len() => anyhow::bail!(
                "Row {} of {} has {} columns, expected {}",
                row_idx + 1,
                path.display(),
                record.len(),
                n
            ),
            _ => {}
        }
        for (col_idx, field) in record.iter().enumerate() {
            let value: f64 = field.parse().with_context(|| {
                format!(
                    "Invalid number '{}' at row {}, column {} of {}",
                    field,
                    row_idx + 1,
                    col_idx + 1,
                    path.display()
                )
            })?;
            data.push(value);
        }
        nrows += 1;
    }

    let ncols = ncols.unwrap_or(0);
    let matrix = Array2::from_shape_vec((nrows, ncols), data)
        .with_context(|| format!("Inconsistent matrix shape in {}", path.display()))?;
    log::debug!("Read {} x {} matrix from {}", nrows, ncols, path.display());
    Ok(matrix)
}

/// Read `(reference, query)` anchor pairs.
pub fn read_pairs<P: AsRef<Path>>(path: P) -> Result<Vec<(usize, usize)>> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(Delimited::from_path(path).delimiter())
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open pairs: {}", path.display()))?;

    let mut pairs = Vec::new();
    for (row_idx, record) in reader.deserialize::<PairRecord>().enumerate() {
        let record = record.with_context(|| {
            format!("Invalid pair at row {} of {}", row_idx + 1, path.display())
        })?;
        pairs.push((record.reference, record.query));
    }
    Ok(pairs)
}

/// Read one non-negative integer per line, skipping blank lines.
pub fn read_index<P: AsRef<Path>>(path: P) -> Result<Vec<usize>> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open index: {}", path.display()))?;

    let mut index = Vec::new();
    for (line_idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read {}", path.display()))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let value: usize = trimmed.parse().with_context(|| {
            format!(
                "Invalid anchor index '{}' at line {} of {}",
                trimmed,
                line_idx + 1,
                path.display()
            )
        })?;
        index.push(value);
    }
    Ok(index)
}

pub fn write_matrix<P: AsRef<Path>>(path: P, matrix: ArrayView2<'_, f64>) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .delimiter(Delimited::from_path(path).delimiter())
        .from_path(path)
        .with_context(|| format!("Failed to create output: {}", path.display()))?;

    for row in matrix.outer_iter() {
        writer
            .write_record(row.iter().map(|v| v.to_string()))
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    writer.flush()?;
    Ok(())
}

/// Write one value per line; non-finite sentinels are written as `NaN`.
pub fn write_vector<P: AsRef<Path>>(path: P, values: &Array1<f64>) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)
        .with_context(|| format!("Failed to create output: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for v in values.iter() {
        if v.is_finite() {
            writeln!(writer, "{}", v)?;
        } else {
            writeln!(writer, "NaN")?;
        }
    }
    writer.flush()?;
    Ok(())
}
