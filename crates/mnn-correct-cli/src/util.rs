use anyhow::Result;
use std::path::{Path, PathBuf};

/// Delimited formats accepted for matrix inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimited {
    Csv,
    Tsv,
}

impl Delimited {
    pub fn delimiter(self) -> u8 {
        match self {
            Delimited::Csv => b',',
            Delimited::Tsv => b'\t',
        }
    }

    /// Infer the format from the file extension, defaulting to CSV.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        match extension(path.as_ref()).as_deref() {
            Some("tsv") => Delimited::Tsv,
            _ => Delimited::Csv,
        }
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase())
}

pub fn validate_tsv_or_csv_file(path: &str) -> Result<()> {
    let pb = PathBuf::from(path);

    match extension(&pb).as_deref() {
        Some("tsv") | Some("csv") => {}
        _ => anyhow::bail!("File must have a .tsv or .csv extension: {}", path),
    }

    if !pb.exists() {
        anyhow::bail!("File does not exist: {}", path);
    }

    Ok(())
}
