//! Confound tables and motion-derived regressors
//!
//! A `ConfoundTable` holds named per-volume nuisance series, typically the
//! `*_desc-confounds_timeseries.tsv` written by fMRIPrep. Regressors are
//! projected out of it by name; motion parameters can be expanded with
//! derivatives and squares, or reduced to framewise displacement.

use crate::error::{CleanError, Result};
use crate::matrix::SignalMatrix;
use std::collections::HashSet;

/// Rigid-body realignment parameters in fMRIPrep order
pub const MOTION_PARAMETERS: [&str; 6] = ["trans_x", "trans_y", "trans_z", "rot_x", "rot_y", "rot_z"];

/// Sphere radius used to convert rotations to displacement (Power et al., 2012)
pub const DEFAULT_HEAD_RADIUS_MM: f64 = 50.0;

/// Named numeric columns sharing one time axis
#[derive(Debug, Clone, PartialEq)]
pub struct ConfoundTable {
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
    n_rows: usize,
}

impl ConfoundTable {
    pub fn new(names: Vec<String>, columns: Vec<Vec<f64>>) -> Result<Self> {
        if names.len() != columns.len() {
            return Err(CleanError::InvalidParameter(format!(
                "{} column names for {} columns",
                names.len(),
                columns.len()
            )));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = names.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(CleanError::InvalidParameter(format!(
                "duplicate column name '{}'",
                dup
            )));
        }

        let n_rows = columns.first().map(|c| c.len()).unwrap_or(0);
        for (name, column) in names.iter().zip(&columns) {
            if column.len() != n_rows {
                return Err(CleanError::DimensionMismatch {
                    what: format!("column '{}'", name),
                    expected: n_rows,
                    actual: column.len(),
                });
            }
        }

        Ok(Self {
            names,
            columns,
            n_rows,
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| self.columns[idx].as_slice())
    }

    /// Number of missing (`NaN`) entries per column
    pub fn missing_counts(&self) -> Vec<(String, usize)> {
        self.names
            .iter()
            .zip(&self.columns)
            .map(|(name, col)| (name.clone(), col.iter().filter(|v| v.is_nan()).count()))
            .collect()
    }

    /// Copy of the table with every `NaN` replaced by `value`
    pub fn fill_missing(&self, value: f64) -> ConfoundTable {
        let columns = self
            .columns
            .iter()
            .map(|col| {
                col.iter()
                    .map(|&v| if v.is_nan() { value } else { v })
                    .collect()
            })
            .collect();
        ConfoundTable {
            names: self.names.clone(),
            columns,
            n_rows: self.n_rows,
        }
    }

    /// Project the named columns, in the requested order, into a matrix
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<SignalMatrix> {
        select_columns(self, names)
    }
}

/// Build a regressor matrix from exactly the named columns, in order
///
/// Fails with `MissingColumn` on the first name the table does not have.
pub fn select_columns<S: AsRef<str>>(table: &ConfoundTable, names: &[S]) -> Result<SignalMatrix> {
    if names.is_empty() {
        return Ok(SignalMatrix::empty(table.n_rows()));
    }

    let columns = names
        .iter()
        .map(|name| {
            table
                .column(name.as_ref())
                .map(|col| col.to_vec())
                .ok_or_else(|| CleanError::MissingColumn(name.as_ref().to_string()))
        })
        .collect::<Result<Vec<Vec<f64>>>>()?;

    SignalMatrix::from_columns(&columns)
}

/// Backward difference of every channel; the first sample is 0
pub fn temporal_derivative(params: &SignalMatrix) -> Result<SignalMatrix> {
    let (n_times, n_channels) = params.shape();
    let mut rows = Vec::with_capacity(n_times);
    for t in 0..n_times {
        if t == 0 {
            rows.push(vec![0.0; n_channels]);
        } else {
            rows.push(
                params
                    .row(t)
                    .iter()
                    .zip(params.row(t - 1))
                    .map(|(cur, prev)| cur - prev)
                    .collect(),
            );
        }
    }
    SignalMatrix::from_rows(rows)
}

/// Expand regressors as `[params, d(params), params², d(params)²]`
///
/// Derivative blocks appear only with `derivatives`, square blocks only with
/// `squares`. With both, six motion parameters become the 24-parameter model.
pub fn expand_motion(params: &SignalMatrix, derivatives: bool, squares: bool) -> Result<SignalMatrix> {
    let mut blocks = vec![params.clone()];
    if derivatives {
        blocks.push(temporal_derivative(params)?);
    }
    if squares {
        let squared: Vec<SignalMatrix> = blocks.iter().map(|b| b.map_channels(|_, v| v * v)).collect();
        blocks.extend(squared);
    }

    let mut expanded = SignalMatrix::empty(params.n_times());
    for block in &blocks {
        expanded = expanded.hstack(block)?;
    }
    Ok(expanded)
}

/// Column labels matching `expand_motion`, using fMRIPrep suffixes
pub fn expanded_labels<S: AsRef<str>>(names: &[S], derivatives: bool, squares: bool) -> Vec<String> {
    let mut labels: Vec<String> = names.iter().map(|n| n.as_ref().to_string()).collect();
    if derivatives {
        labels.extend(names.iter().map(|n| format!("{}_derivative1", n.as_ref())));
    }
    if squares {
        let squared: Vec<String> = labels.iter().map(|l| format!("{}_power2", l)).collect();
        labels.extend(squared);
    }
    labels
}

/// Framewise displacement from six rigid-body parameters (Power et al., 2012)
///
/// Columns are three translations in mm followed by three rotations in
/// radians. Rotations are converted to arc length on a sphere of
/// `head_radius_mm`. The first volume has no predecessor and gets 0.
pub fn framewise_displacement(motion: &SignalMatrix, head_radius_mm: f64) -> Result<Vec<f64>> {
    if motion.n_channels() != 6 {
        return Err(CleanError::InvalidParameter(format!(
            "framewise displacement needs 6 motion parameters, got {}",
            motion.n_channels()
        )));
    }
    if !head_radius_mm.is_finite() || head_radius_mm <= 0.0 {
        return Err(CleanError::InvalidParameter(format!(
            "head radius must be positive, got {}",
            head_radius_mm
        )));
    }

    let deltas = temporal_derivative(motion)?;
    let fd = (0..motion.n_times())
        .map(|t| {
            let row = deltas.row(t);
            let translation: f64 = row[..3].iter().map(|v| v.abs()).sum();
            let rotation: f64 = row[3..].iter().map(|v| v.abs()).sum();
            translation + head_radius_mm * rotation
        })
        .collect();

    Ok(fd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn motion_table() -> ConfoundTable {
        let names = MOTION_PARAMETERS.iter().map(|s| s.to_string()).collect();
        let columns = vec![
            vec![0.0, 1.0, 1.0, 1.0],
            vec![0.0, 0.0, 0.0, 0.5],
            vec![0.0; 4],
            vec![0.0; 4],
            vec![0.0; 4],
            vec![0.0, 0.0, 0.01, 0.01],
        ];
        ConfoundTable::new(names, columns).unwrap()
    }

    #[test]
    fn test_select_preserves_requested_order() {
        let table = motion_table();
        let m = table.select(&["trans_y", "trans_x"]).unwrap();
        assert_eq!(m.shape(), (4, 2));
        assert_eq!(m.column(0), vec![0.0, 0.0, 0.0, 0.5]);
        assert_eq!(m.column(1), vec![0.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_select_missing_column() {
        let table = motion_table();
        let result = select_columns(&table, &["trans_x", "csf", "white_matter"]);
        assert!(matches!(result, Err(CleanError::MissingColumn(name)) if name == "csf"));
    }

    #[test]
    fn test_select_nothing_gives_empty_regressors() {
        let table = motion_table();
        let names: [&str; 0] = [];
        assert_eq!(table.select(&names).unwrap().shape(), (4, 0));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = ConfoundTable::new(
            vec!["a".into(), "a".into()],
            vec![vec![1.0], vec![2.0]],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_fill_missing() {
        let table = ConfoundTable::new(vec!["fd".into()], vec![vec![f64::NAN, 0.2]]).unwrap();
        assert_eq!(table.missing_counts(), vec![("fd".to_string(), 1)]);
        let filled = table.fill_missing(0.0);
        assert_eq!(filled.column("fd").unwrap(), &[0.0, 0.2]);
    }

    #[test]
    fn test_expand_motion_24() {
        let table = motion_table();
        let params = table.select(&MOTION_PARAMETERS).unwrap();
        let expanded = expand_motion(&params, true, true).unwrap();
        assert_eq!(expanded.shape(), (4, 24));

        // trans_x derivative block and its square
        assert_eq!(expanded.column(6), vec![0.0, 1.0, 0.0, 0.0]);
        assert_eq!(expanded.column(18), vec![0.0, 1.0, 0.0, 0.0]);
        // trans_y squared
        assert_eq!(expanded.column(13), vec![0.0, 0.0, 0.0, 0.25]);

        let labels = expanded_labels(&MOTION_PARAMETERS, true, true);
        assert_eq!(labels.len(), 24);
        assert_eq!(labels[6], "trans_x_derivative1");
        assert_eq!(labels[12], "trans_x_power2");
        assert_eq!(labels[18], "trans_x_derivative1_power2");
    }

    #[test]
    fn test_framewise_displacement() {
        let table = motion_table();
        let params = table.select(&MOTION_PARAMETERS).unwrap();
        let fd = framewise_displacement(&params, DEFAULT_HEAD_RADIUS_MM).unwrap();

        assert_eq!(fd.len(), 4);
        assert_abs_diff_eq!(fd[0], 0.0);
        assert_abs_diff_eq!(fd[1], 1.0);
        assert_abs_diff_eq!(fd[2], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(fd[3], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_framewise_displacement_needs_six_columns() {
        let params = SignalMatrix::zeros(3, 5);
        assert!(framewise_displacement(&params, 50.0).is_err());
        assert!(framewise_displacement(&SignalMatrix::zeros(3, 6), 0.0).is_err());
    }
}
