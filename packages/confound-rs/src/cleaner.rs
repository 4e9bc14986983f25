//! Signal cleaning
//!
//! Detrending, high-pass filtering and nuisance regression are applied as a
//! single least-squares projection: every channel is projected onto the
//! orthogonal complement of the span of the combined nuisance design. Doing
//! them as separate passes would let a later pass reintroduce variance that
//! an earlier one removed.
//!
//! The cleaner holds no state besides its configuration; repeated calls are
//! independent.

use crate::censor::CensorMask;
use crate::confounds::{expand_motion, expanded_labels, framewise_displacement, ConfoundTable};
use crate::design::NuisanceDesign;
use crate::error::{CleanError, Result};
use crate::matrix::SignalMatrix;
use crate::types::{ConfoundStrategy, DisplacementSource, FilterConfig, Standardize};
use nalgebra::{DMatrix, DVector, SVD};
use serde::{Deserialize, Serialize};

/// Relative size, against the channel's largest magnitude, below which a
/// channel mean (PSC) or residual standard deviation (zscore) counts as zero
const DEGENERATE_MEAN_TOLERANCE: f64 = 1e-8;

/// Result of a cleaning run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanOutcome {
    /// Cleaned signal, same shape as the input
    pub cleaned: SignalMatrix,
    /// Label of every nuisance design column that was regressed out
    pub design_columns: Vec<String>,
    /// Censoring applied, if any
    pub censor_mask: Option<CensorMask>,
}

/// Confound regression and temporal filtering for one configuration
#[derive(Debug, Clone)]
pub struct SignalCleaner {
    config: FilterConfig,
}

impl SignalCleaner {
    /// Create a cleaner, validating the filter configuration
    pub fn new(config: FilterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Clean `signal`, regressing out `regressors` jointly with the filter
    pub fn clean(&self, signal: &SignalMatrix, regressors: Option<&SignalMatrix>) -> Result<SignalMatrix> {
        self.clean_labeled(signal, regressors, None)
            .map(|outcome| outcome.cleaned)
    }

    /// Like `clean`, naming the regressor columns in the returned outcome
    pub fn clean_labeled(
        &self,
        signal: &SignalMatrix,
        regressors: Option<&SignalMatrix>,
        regressor_labels: Option<&[String]>,
    ) -> Result<CleanOutcome> {
        validate_signal(signal)?;
        let n_times = signal.n_times();

        if let Some(regressors) = regressors {
            if regressors.n_times() != n_times {
                return Err(CleanError::DimensionMismatch {
                    what: "regressor set".to_string(),
                    expected: n_times,
                    actual: regressors.n_times(),
                });
            }
            if let Some((t, c)) = regressors.first_non_finite() {
                return Err(CleanError::InvalidParameter(format!(
                    "regressor column {} has a non-finite value at sample {}",
                    c, t
                )));
            }
        }

        let means = signal.channel_means();
        let scales = channel_scales(signal);
        if self.config.standardize == Standardize::Psc {
            check_psc_means(&means, &scales)?;
        }

        let design = NuisanceDesign::build(n_times, &self.config, regressors, regressor_labels)?;
        log::debug!(
            "Cleaning {} samples × {} channels against {} nuisance columns",
            n_times,
            signal.n_channels(),
            design.n_columns()
        );

        let residual = project_out(signal, design.matrix())?;
        let cleaned = match self.config.standardize {
            Standardize::Off => residual,
            Standardize::Psc => percent_signal_change(&residual, &means),
            Standardize::Zscore => zscore(&residual, &scales),
        };

        Ok(CleanOutcome {
            cleaned,
            design_columns: design.into_labels(),
            censor_mask: None,
        })
    }

    /// Full pipeline from a confounds table
    ///
    /// Fills missing confound values, selects and expands the strategy's
    /// columns, builds the censor mask from the configured displacement
    /// source, appends its indicator regressors, then cleans.
    pub fn clean_with_confounds(
        &self,
        signal: &SignalMatrix,
        table: &ConfoundTable,
        strategy: &ConfoundStrategy,
    ) -> Result<CleanOutcome> {
        if table.n_rows() != signal.n_times() {
            return Err(CleanError::DimensionMismatch {
                what: "confound table".to_string(),
                expected: signal.n_times(),
                actual: table.n_rows(),
            });
        }

        let table = match strategy.fill_missing {
            Some(value) => table.fill_missing(value),
            None => table.clone(),
        };

        let selected = table.select(&strategy.columns)?;
        let mut regressors = expand_motion(&selected, strategy.derivatives, strategy.squares)?;
        let mut labels = expanded_labels(&strategy.columns, strategy.derivatives, strategy.squares);

        let censor_mask = match &strategy.censor {
            Some(censor) => {
                let displacement = match &censor.source {
                    DisplacementSource::Column { name } => table
                        .column(name)
                        .map(|col| col.to_vec())
                        .ok_or_else(|| CleanError::MissingColumn(name.clone()))?,
                    DisplacementSource::Motion {
                        columns,
                        head_radius_mm,
                    } => framewise_displacement(&table.select(columns)?, *head_radius_mm)?,
                };

                let mask = CensorMask::from_displacement(&displacement, censor.threshold)?
                    .expand(censor.before, censor.after);
                log::info!(
                    "Censoring {} of {} volumes (threshold {})",
                    mask.n_censored(),
                    mask.len(),
                    censor.threshold
                );

                regressors = mask.append_to(&regressors)?;
                labels.extend(mask.indicator_labels());
                Some(mask)
            }
            None => None,
        };

        let mut outcome = self.clean_labeled(signal, Some(&regressors), Some(&labels))?;
        outcome.censor_mask = censor_mask;
        Ok(outcome)
    }
}

/// Clean with a one-off configuration
pub fn clean_signal(
    signal: &SignalMatrix,
    regressors: Option<&SignalMatrix>,
    config: &FilterConfig,
) -> Result<SignalMatrix> {
    SignalCleaner::new(config.clone())?.clean(signal, regressors)
}

/// Ordinary least-squares residual of every channel of `signal` against
/// the columns of `design`
///
/// The column space is taken from an SVD of the design, so rank-deficient
/// designs (collinear regressors, a censored volume coinciding with a trend)
/// are handled without error.
pub fn project_out(signal: &SignalMatrix, design: &SignalMatrix) -> Result<SignalMatrix> {
    if design.n_times() != signal.n_times() {
        return Err(CleanError::DimensionMismatch {
            what: "nuisance design".to_string(),
            expected: signal.n_times(),
            actual: design.n_times(),
        });
    }
    if design.n_channels() == 0 || signal.is_empty() {
        return Ok(signal.clone());
    }

    let basis = match orthonormal_basis(design.to_dmatrix())? {
        Some(basis) => basis,
        None => return Ok(signal.clone()),
    };

    let y = signal.to_dmatrix();
    let fitted = &basis * (basis.transpose() * &y);
    Ok(SignalMatrix::from_dmatrix(&(y - fitted)))
}

/// Orthonormal basis for the column space of `design`, `None` if it is zero
fn orthonormal_basis(design: DMatrix<f64>) -> Result<Option<DMatrix<f64>>> {
    let (n_rows, n_cols) = design.shape();
    let svd = SVD::new(design, true, false);
    let u = svd
        .u
        .ok_or_else(|| CleanError::InvalidParameter("SVD of the nuisance design failed".to_string()))?;

    let largest = svd.singular_values.iter().copied().fold(0.0_f64, f64::max);
    let tolerance = largest * n_rows.max(n_cols) as f64 * f64::EPSILON;

    let columns: Vec<DVector<f64>> = svd
        .singular_values
        .iter()
        .enumerate()
        .filter(|(_, sv)| **sv > tolerance)
        .map(|(i, _)| u.column(i).into_owned())
        .collect();

    if columns.is_empty() {
        return Ok(None);
    }
    if columns.len() < n_cols {
        log::debug!(
            "Nuisance design is rank deficient: rank {} of {} columns",
            columns.len(),
            n_cols
        );
    }

    Ok(Some(DMatrix::from_columns(&columns)))
}

fn validate_signal(signal: &SignalMatrix) -> Result<()> {
    if signal.n_times() == 0 || signal.n_channels() == 0 {
        return Err(CleanError::InvalidParameter(
            "signal matrix is empty".to_string(),
        ));
    }
    if let Some((t, c)) = signal.first_non_finite() {
        return Err(CleanError::InvalidParameter(format!(
            "signal channel {} has a non-finite value at sample {}",
            c, t
        )));
    }
    Ok(())
}

/// Largest absolute value of every channel
fn channel_scales(signal: &SignalMatrix) -> Vec<f64> {
    (0..signal.n_channels())
        .map(|c| {
            (0..signal.n_times())
                .map(|t| signal.get(t, c).abs())
                .fold(0.0_f64, f64::max)
        })
        .collect()
}

fn check_psc_means(means: &[f64], scales: &[f64]) -> Result<()> {
    for (channel, (&mean, &scale)) in means.iter().zip(scales).enumerate() {
        if mean.abs() <= DEGENERATE_MEAN_TOLERANCE * scale {
            return Err(CleanError::DegenerateChannel { channel, mean });
        }
    }
    Ok(())
}

fn percent_signal_change(residual: &SignalMatrix, means: &[f64]) -> SignalMatrix {
    residual.map_channels(|c, v| v / means[c].abs() * 100.0)
}

/// Center and scale each residual channel to unit population variance
///
/// `scales` holds each channel's magnitude before cleaning. A residual whose
/// deviation is negligible against it is rounding left over from the
/// projection and comes out as zeros.
fn zscore(residual: &SignalMatrix, scales: &[f64]) -> SignalMatrix {
    let n = residual.n_times() as f64;
    let centers = residual.channel_means();
    let stds: Vec<Option<f64>> = (0..residual.n_channels())
        .map(|c| {
            let var = (0..residual.n_times())
                .map(|t| (residual.get(t, c) - centers[c]).powi(2))
                .sum::<f64>()
                / n;
            let std = var.sqrt();
            (std > DEGENERATE_MEAN_TOLERANCE * scales[c] && std > 0.0).then_some(std)
        })
        .collect();

    residual.map_channels(|c, v| match stds[c] {
        Some(std) => (v - centers[c]) / std,
        None => 0.0,
    })
}
