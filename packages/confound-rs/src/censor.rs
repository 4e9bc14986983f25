//! Motion censoring
//!
//! High-motion volumes are not dropped from the time axis. Each flagged
//! volume instead contributes an indicator ("spike") regressor that is 1 at
//! that volume and 0 elsewhere, so regression gives it its own parameter and
//! its value no longer influences any other fit.

use crate::error::{CleanError, Result};
use crate::matrix::SignalMatrix;
use serde::{Deserialize, Serialize};

/// Per-volume censoring flags, `true` = censored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CensorMask {
    flags: Vec<bool>,
}

impl CensorMask {
    /// Flag every volume whose displacement strictly exceeds `threshold`
    ///
    /// A value equal to the threshold is kept. `NaN` displacement is never
    /// censored.
    pub fn from_displacement(displacement: &[f64], threshold: f64) -> Result<Self> {
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(CleanError::InvalidParameter(format!(
                "censoring threshold must be positive, got {}",
                threshold
            )));
        }

        let flags: Vec<bool> = displacement.iter().map(|&d| d > threshold).collect();
        log::debug!(
            "Censor mask: {} of {} volumes above {}",
            flags.iter().filter(|&&f| f).count(),
            flags.len(),
            threshold
        );
        Ok(Self { flags })
    }

    pub fn from_flags(flags: Vec<bool>) -> Self {
        Self { flags }
    }

    pub fn flags(&self) -> &[bool] {
        &self.flags
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn n_censored(&self) -> usize {
        self.flags.iter().filter(|&&f| f).count()
    }

    /// Indices of censored volumes, ascending
    pub fn censored_indices(&self) -> Vec<usize> {
        self.flags
            .iter()
            .enumerate()
            .filter_map(|(i, &f)| f.then_some(i))
            .collect()
    }

    /// Indices of retained volumes, ascending
    pub fn retained_indices(&self) -> Vec<usize> {
        self.flags
            .iter()
            .enumerate()
            .filter_map(|(i, &f)| (!f).then_some(i))
            .collect()
    }

    /// Also flag up to `before` volumes preceding and `after` volumes
    /// following every flagged volume
    pub fn expand(&self, before: usize, after: usize) -> CensorMask {
        let last = self.flags.len().saturating_sub(1);
        let mut flags = self.flags.clone();
        for idx in self.censored_indices() {
            let start = idx.saturating_sub(before);
            let end = idx.saturating_add(after).min(last);
            for flag in &mut flags[start..=end] {
                *flag = true;
            }
        }
        CensorMask { flags }
    }

    /// One indicator column per censored volume, in ascending volume order
    pub fn indicator_regressors(&self) -> Result<SignalMatrix> {
        let censored = self.censored_indices();
        let mut matrix = vec![0.0; self.flags.len() * censored.len()];
        for (col, &t) in censored.iter().enumerate() {
            matrix[t * censored.len() + col] = 1.0;
        }
        SignalMatrix::new(self.flags.len(), censored.len(), matrix)
    }

    /// Labels for `indicator_regressors`, e.g. `censor_0012`
    pub fn indicator_labels(&self) -> Vec<String> {
        self.censored_indices()
            .into_iter()
            .map(|t| format!("censor_{:04}", t))
            .collect()
    }

    /// Append the indicator columns after the existing regressors
    ///
    /// Returns the regressors unchanged when nothing is censored.
    pub fn append_to(&self, regressors: &SignalMatrix) -> Result<SignalMatrix> {
        if regressors.n_times() != self.flags.len() {
            return Err(CleanError::DimensionMismatch {
                what: "regressor set".to_string(),
                expected: self.flags.len(),
                actual: regressors.n_times(),
            });
        }
        if self.n_censored() == 0 {
            return Ok(regressors.clone());
        }
        regressors.hstack(&self.indicator_regressors()?)
    }
}
