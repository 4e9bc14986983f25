//! Time × channel sample matrix
//!
//! `SignalMatrix` is the value type every pipeline stage consumes and
//! produces: rows are time samples, columns are channels (voxels, motion
//! parameters, nuisance regressors). Samples are stored row-major.

use crate::error::{CleanError, Result};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Dense time × channel matrix of `f64` samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<f64>>", into = "Vec<Vec<f64>>")]
pub struct SignalMatrix {
    n_times: usize,
    n_channels: usize,
    data: Vec<f64>,
}

impl SignalMatrix {
    /// Build a matrix from row-major samples
    pub fn new(n_times: usize, n_channels: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != n_times * n_channels {
            return Err(CleanError::InvalidParameter(format!(
                "expected {} samples for a {}x{} matrix, got {}",
                n_times * n_channels,
                n_times,
                n_channels,
                data.len()
            )));
        }
        Ok(Self {
            n_times,
            n_channels,
            data,
        })
    }

    /// All-zero matrix
    pub fn zeros(n_times: usize, n_channels: usize) -> Self {
        Self {
            n_times,
            n_channels,
            data: vec![0.0; n_times * n_channels],
        }
    }

    /// Matrix with `n_times` rows and no channels (an empty regressor set)
    pub fn empty(n_times: usize) -> Self {
        Self::zeros(n_times, 0)
    }

    /// Build a matrix from time samples, each a row of channel values
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let n_times = rows.len();
        let n_channels = rows.first().map(|r| r.len()).unwrap_or(0);

        let mut data = Vec::with_capacity(n_times * n_channels);
        for (t, row) in rows.into_iter().enumerate() {
            if row.len() != n_channels {
                return Err(CleanError::InvalidParameter(format!(
                    "row {} has {} values, expected {}",
                    t,
                    row.len(),
                    n_channels
                )));
            }
            data.extend(row);
        }

        Ok(Self {
            n_times,
            n_channels,
            data,
        })
    }

    /// Build a matrix from per-channel time series of equal length
    pub fn from_columns(columns: &[Vec<f64>]) -> Result<Self> {
        let n_times = columns.first().map(|c| c.len()).unwrap_or(0);
        if let Some((idx, col)) = columns
            .iter()
            .enumerate()
            .find(|(_, c)| c.len() != n_times)
        {
            return Err(CleanError::DimensionMismatch {
                what: format!("column {}", idx),
                expected: n_times,
                actual: col.len(),
            });
        }

        let n_channels = columns.len();
        let mut data = Vec::with_capacity(n_times * n_channels);
        for t in 0..n_times {
            data.extend(columns.iter().map(|c| c[t]));
        }

        Ok(Self {
            n_times,
            n_channels,
            data,
        })
    }

    pub fn n_times(&self) -> usize {
        self.n_times
    }

    pub fn n_channels(&self) -> usize {
        self.n_channels
    }

    /// `(n_times, n_channels)`
    pub fn shape(&self) -> (usize, usize) {
        (self.n_times, self.n_channels)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn get(&self, t: usize, channel: usize) -> f64 {
        self.data[t * self.n_channels + channel]
    }

    pub fn row(&self, t: usize) -> &[f64] {
        let start = t * self.n_channels;
        &self.data[start..start + self.n_channels]
    }

    pub fn column(&self, channel: usize) -> Vec<f64> {
        (0..self.n_times).map(|t| self.get(t, channel)).collect()
    }

    pub fn columns(&self) -> Vec<Vec<f64>> {
        (0..self.n_channels).map(|c| self.column(c)).collect()
    }

    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        (0..self.n_times).map(|t| self.row(t).to_vec()).collect()
    }

    /// Row-major samples
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Per-channel arithmetic mean
    pub fn channel_means(&self) -> Vec<f64> {
        if self.n_times == 0 {
            return vec![0.0; self.n_channels];
        }
        let mut sums = vec![0.0; self.n_channels];
        for t in 0..self.n_times {
            for (sum, &v) in sums.iter_mut().zip(self.row(t)) {
                *sum += v;
            }
        }
        sums.into_iter().map(|s| s / self.n_times as f64).collect()
    }

    /// First `(row, column)` holding a NaN or infinite sample
    pub fn first_non_finite(&self) -> Option<(usize, usize)> {
        self.data.iter().position(|v| !v.is_finite()).map(|i| {
            if self.n_channels == 0 {
                (0, 0)
            } else {
                (i / self.n_channels, i % self.n_channels)
            }
        })
    }

    /// Concatenate the channels of `other` after the channels of `self`
    pub fn hstack(&self, other: &SignalMatrix) -> Result<SignalMatrix> {
        if other.n_times != self.n_times {
            return Err(CleanError::DimensionMismatch {
                what: "appended matrix".to_string(),
                expected: self.n_times,
                actual: other.n_times,
            });
        }

        let n_channels = self.n_channels + other.n_channels;
        let mut data = Vec::with_capacity(self.n_times * n_channels);
        for t in 0..self.n_times {
            data.extend_from_slice(self.row(t));
            data.extend_from_slice(other.row(t));
        }

        Ok(SignalMatrix {
            n_times: self.n_times,
            n_channels,
            data,
        })
    }

    /// Apply `f(channel, value)` to every sample, producing a new matrix
    pub fn map_channels<F>(&self, mut f: F) -> SignalMatrix
    where
        F: FnMut(usize, f64) -> f64,
    {
        let data = self
            .data
            .iter()
            .enumerate()
            .map(|(i, &v)| f(i % self.n_channels.max(1), v))
            .collect();
        SignalMatrix {
            n_times: self.n_times,
            n_channels: self.n_channels,
            data,
        }
    }

    pub(crate) fn to_dmatrix(&self) -> DMatrix<f64> {
        DMatrix::from_row_slice(self.n_times, self.n_channels, &self.data)
    }

    pub(crate) fn from_dmatrix(matrix: &DMatrix<f64>) -> SignalMatrix {
        let (n_times, n_channels) = matrix.shape();
        let mut data = Vec::with_capacity(n_times * n_channels);
        for t in 0..n_times {
            data.extend(matrix.row(t).iter().copied());
        }
        SignalMatrix {
            n_times,
            n_channels,
            data,
        }
    }
}

impl TryFrom<Vec<Vec<f64>>> for SignalMatrix {
    type Error = CleanError;

    fn try_from(rows: Vec<Vec<f64>>) -> Result<Self> {
        SignalMatrix::from_rows(rows)
    }
}

impl From<SignalMatrix> for Vec<Vec<f64>> {
    fn from(matrix: SignalMatrix) -> Self {
        matrix.to_rows()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows_and_columns_agree() {
        let by_rows = SignalMatrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]])
            .unwrap();
        let by_cols = SignalMatrix::from_columns(&[vec![1.0, 3.0, 5.0], vec![2.0, 4.0, 6.0]]).unwrap();

        assert_eq!(by_rows, by_cols);
        assert_eq!(by_rows.shape(), (3, 2));
        assert_eq!(by_rows.column(1), vec![2.0, 4.0, 6.0]);
        assert_eq!(by_rows.row(2), &[5.0, 6.0]);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let result = SignalMatrix::from_rows(vec![vec![1.0, 2.0], vec![3.0]]);
        assert!(matches!(result, Err(CleanError::InvalidParameter(_))));
    }

    #[test]
    fn test_hstack_requires_equal_rows() {
        let a = SignalMatrix::zeros(4, 1);
        let b = SignalMatrix::zeros(3, 2);
        assert!(matches!(
            a.hstack(&b),
            Err(CleanError::DimensionMismatch { expected: 4, actual: 3, .. })
        ));

        let c = SignalMatrix::empty(4);
        let stacked = a.hstack(&c).unwrap();
        assert_eq!(stacked.shape(), (4, 1));
    }

    #[test]
    fn test_first_non_finite() {
        let m = SignalMatrix::from_rows(vec![vec![1.0, 2.0], vec![f64::NAN, 4.0]]).unwrap();
        assert_eq!(m.first_non_finite(), Some((1, 0)));
    }

    #[test]
    fn test_serde_as_rows() {
        let m = SignalMatrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, "[[1.0,2.0],[3.0,4.0]]");

        let back: SignalMatrix = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
        assert!(serde_json::from_str::<SignalMatrix>("[[1.0],[2.0,3.0]]").is_err());
    }

    #[test]
    fn test_dmatrix_conversion_preserves_layout() {
        let m = SignalMatrix::from_rows(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        let d = m.to_dmatrix();
        assert_eq!(d[(1, 0)], 4.0);
        assert_eq!(SignalMatrix::from_dmatrix(&d), m);
    }
}
