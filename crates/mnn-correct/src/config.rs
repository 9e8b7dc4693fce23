use serde::{Deserialize, Serialize};

use crate::error::{CorrectionError, Result};

/// Central configuration for a batch-correction call.
///
/// `sigma` is the kernel variance: weights are computed as `exp(-d2 / sigma)`
/// where `d2` is a squared Euclidean distance.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CorrectionConfig {
    pub sigma: f64,

    /// Rescale smoothed correction vectors by quantile matching.
    pub var_adj: bool,

    /// Lower clamp applied to finite variance scale factors.
    pub min_scale: f64,

    /// Spread the outer loops over the rayon thread pool.
    pub parallel: bool,
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            sigma: 0.1,
            var_adj: true,
            min_scale: 1.0,
            parallel: true,
        }
    }
}

impl CorrectionConfig {
    pub fn new(sigma: f64) -> Self {
        Self {
            sigma,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_sigma(self.sigma)?;
        if !self.min_scale.is_finite() {
            return Err(CorrectionError::InvalidArgument(format!(
                "min_scale must be finite, got {}",
                self.min_scale
            )));
        }
        Ok(())
    }
}

/// Check that the kernel variance is a finite, strictly positive number.
pub fn validate_sigma(sigma: f64) -> Result<()> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(CorrectionError::InvalidArgument(format!(
            "sigma must be a positive finite number, got {}",
            sigma
        )));
    }
    Ok(())
}
