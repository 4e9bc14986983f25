//! Nuisance design matrix
//!
//! Collects every column the cleaner regresses out in one combined step:
//! caller-supplied regressors, an intercept, polynomial trends, and a
//! discrete cosine basis implementing the high-pass filter.

use crate::error::{CleanError, Result};
use crate::matrix::SignalMatrix;
use crate::types::FilterConfig;
use std::f64::consts::PI;

/// Nuisance design with one label per column
#[derive(Debug, Clone, PartialEq)]
pub struct NuisanceDesign {
    matrix: SignalMatrix,
    labels: Vec<String>,
}

impl NuisanceDesign {
    /// Assemble the design for a run of `n_times` samples
    ///
    /// Column order: regressors, constant, trends, cosines. Regressors
    /// without a label are named `regressor_NN`.
    pub fn build(
        n_times: usize,
        config: &FilterConfig,
        regressors: Option<&SignalMatrix>,
        regressor_labels: Option<&[String]>,
    ) -> Result<Self> {
        let mut columns: Vec<Vec<f64>> = Vec::new();
        let mut labels: Vec<String> = Vec::new();

        if let Some(regressors) = regressors {
            if regressors.n_times() != n_times {
                return Err(CleanError::DimensionMismatch {
                    what: "regressor set".to_string(),
                    expected: n_times,
                    actual: regressors.n_times(),
                });
            }
            for c in 0..regressors.n_channels() {
                columns.push(regressors.column(c));
                labels.push(
                    regressor_labels
                        .and_then(|l| l.get(c))
                        .cloned()
                        .unwrap_or_else(|| format!("regressor_{:02}", c)),
                );
            }
        }

        if config.includes_constant() {
            columns.push(vec![1.0; n_times]);
            labels.push("constant".to_string());
        }

        if config.detrend {
            for (degree, trend) in polynomial_trends(n_times, config.detrend_order)
                .into_iter()
                .enumerate()
            {
                columns.push(trend);
                labels.push(format!("trend_{}", degree + 1));
            }
        }

        if let Some(cutoff_hz) = config.high_pass_hz {
            let drift = cosine_drift(n_times, config.t_r, cutoff_hz);
            log::debug!(
                "High-pass {:.4} Hz at TR {} s: {} cosine regressors",
                cutoff_hz,
                config.t_r,
                drift.len()
            );
            for (k, cosine) in drift.into_iter().enumerate() {
                columns.push(cosine);
                labels.push(format!("cosine_{:02}", k + 1));
            }
        }

        let matrix = if columns.is_empty() {
            SignalMatrix::empty(n_times)
        } else {
            SignalMatrix::from_columns(&columns)?
        };

        Ok(Self { matrix, labels })
    }

    pub fn matrix(&self) -> &SignalMatrix {
        &self.matrix
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn n_columns(&self) -> usize {
        self.matrix.n_channels()
    }

    pub fn into_labels(self) -> Vec<String> {
        self.labels
    }
}

/// Polynomial trends of degree `1..=order` over a time axis scaled to [-1, 1]
pub fn polynomial_trends(n_times: usize, order: usize) -> Vec<Vec<f64>> {
    let axis: Vec<f64> = if n_times > 1 {
        let half = (n_times - 1) as f64 / 2.0;
        (0..n_times).map(|t| (t as f64 - half) / half).collect()
    } else {
        vec![0.0; n_times]
    };

    (1..=order)
        .map(|degree| axis.iter().map(|x| x.powi(degree as i32)).collect())
        .collect()
}

/// Discrete cosine basis removing frequencies below `cutoff_hz`
///
/// `floor(2 · n · cutoff · t_r)` basis functions (at most `n - 1`), each
/// `sqrt(2/n) · cos(π/n · (t + 0.5) · k)`. The constant term is not included.
pub fn cosine_drift(n_times: usize, t_r: f64, cutoff_hz: f64) -> Vec<Vec<f64>> {
    if n_times == 0 {
        return Vec::new();
    }

    let n = n_times as f64;
    let order = ((2.0 * n * cutoff_hz * t_r).floor() as usize).min(n_times - 1);
    let normalizer = (2.0 / n).sqrt();

    (1..=order)
        .map(|k| {
            (0..n_times)
                .map(|t| normalizer * (PI / n * (t as f64 + 0.5) * k as f64).cos())
                .collect()
        })
        .collect()
}
