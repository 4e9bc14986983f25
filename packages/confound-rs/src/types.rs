use crate::error::{CleanError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Per-channel rescaling applied after nuisance regression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Standardize {
    #[default]
    Off,
    /// Percent signal change relative to the original channel mean
    Psc,
    /// Unit variance
    Zscore,
}

/// Temporal filtering parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Repetition time (sampling period) in seconds
    pub t_r: f64,

    /// High-pass cutoff in Hz (1 / period in seconds)
    #[serde(default)]
    pub high_pass_hz: Option<f64>,

    /// Remove polynomial trends
    #[serde(default = "default_detrend")]
    pub detrend: bool,

    /// Highest polynomial degree removed when detrending
    #[serde(default = "default_detrend_order")]
    pub detrend_order: usize,

    #[serde(default)]
    pub standardize: Standardize,
}

fn default_detrend() -> bool {
    true
}
fn default_detrend_order() -> usize {
    1
}

impl FilterConfig {
    /// Linear detrending only, no high-pass, no standardization
    pub fn new(t_r: f64) -> Self {
        Self {
            t_r,
            high_pass_hz: None,
            detrend: true,
            detrend_order: 1,
            standardize: Standardize::Off,
        }
    }

    /// Typical BOLD preprocessing: linear detrend plus a 1/128 Hz cosine high-pass
    pub fn standard_bold(t_r: f64) -> Self {
        Self {
            high_pass_hz: Some(1.0 / 128.0),
            ..Self::new(t_r)
        }
    }

    pub fn with_high_pass(mut self, cutoff_hz: f64) -> Self {
        self.high_pass_hz = Some(cutoff_hz);
        self
    }

    pub fn with_detrend(mut self, detrend: bool) -> Self {
        self.detrend = detrend;
        self
    }

    pub fn with_detrend_order(mut self, order: usize) -> Self {
        self.detrend_order = order;
        self
    }

    pub fn with_standardize(mut self, standardize: Standardize) -> Self {
        self.standardize = standardize;
        self
    }

    /// Nyquist frequency of the sampling grid in Hz
    pub fn nyquist_hz(&self) -> f64 {
        1.0 / (2.0 * self.t_r)
    }

    /// Whether the nuisance design carries an intercept column
    pub fn includes_constant(&self) -> bool {
        self.detrend || self.high_pass_hz.is_some() || self.standardize != Standardize::Off
    }

    pub fn validate(&self) -> Result<()> {
        if !self.t_r.is_finite() || self.t_r <= 0.0 {
            return Err(CleanError::InvalidParameter(format!(
                "repetition time must be positive, got {}",
                self.t_r
            )));
        }

        if self.detrend && self.detrend_order == 0 {
            return Err(CleanError::InvalidParameter(
                "detrend order must be at least 1".to_string(),
            ));
        }

        if let Some(cutoff_hz) = self.high_pass_hz {
            let nyquist_hz = self.nyquist_hz();
            if !cutoff_hz.is_finite() || cutoff_hz <= 0.0 || cutoff_hz >= nyquist_hz {
                return Err(CleanError::InvalidCutoff {
                    cutoff_hz,
                    nyquist_hz,
                });
            }
        }

        Ok(())
    }
}

/// Where the per-volume displacement used for censoring comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DisplacementSource {
    /// A precomputed column of the confounds table
    Column {
        #[serde(default = "default_fd_column")]
        name: String,
    },
    /// Framewise displacement computed from six rigid-body parameters
    Motion {
        #[serde(default = "default_motion_columns")]
        columns: Vec<String>,
        #[serde(default = "default_head_radius_mm")]
        head_radius_mm: f64,
    },
}

fn default_fd_column() -> String {
    "framewise_displacement".to_string()
}
fn default_head_radius_mm() -> f64 {
    crate::confounds::DEFAULT_HEAD_RADIUS_MM
}
fn default_motion_columns() -> Vec<String> {
    crate::confounds::MOTION_PARAMETERS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for DisplacementSource {
    fn default() -> Self {
        DisplacementSource::Column {
            name: default_fd_column(),
        }
    }
}

/// Motion censoring (scrubbing) parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CensorConfig {
    #[serde(default)]
    pub source: DisplacementSource,

    /// Volumes with displacement strictly above this value are censored
    pub threshold: f64,

    /// Also censor this many volumes before each flagged volume
    #[serde(default)]
    pub before: usize,

    /// Also censor this many volumes after each flagged volume
    #[serde(default)]
    pub after: usize,
}

impl CensorConfig {
    pub fn framewise_displacement(threshold: f64) -> Self {
        Self {
            source: DisplacementSource::default(),
            threshold,
            before: 0,
            after: 0,
        }
    }
}

/// Which confounds become nuisance regressors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfoundStrategy {
    /// Confound table columns, in order
    #[serde(default)]
    pub columns: Vec<String>,

    /// Append backward-difference temporal derivatives
    #[serde(default)]
    pub derivatives: bool,

    /// Append squared terms
    #[serde(default)]
    pub squares: bool,

    /// Replacement for missing (`n/a`) confound values
    #[serde(default = "default_fill_missing")]
    pub fill_missing: Option<f64>,

    #[serde(default)]
    pub censor: Option<CensorConfig>,
}

fn default_fill_missing() -> Option<f64> {
    Some(0.0)
}

impl Default for ConfoundStrategy {
    fn default() -> Self {
        Self {
            columns: Vec::new(),
            derivatives: false,
            squares: false,
            fill_missing: default_fill_missing(),
            censor: None,
        }
    }
}

impl ConfoundStrategy {
    /// The six rigid-body motion parameters
    pub fn motion_6() -> Self {
        Self {
            columns: default_motion_columns(),
            ..Default::default()
        }
    }

    /// Six motion parameters, their derivatives, and the squares of both
    pub fn motion_24() -> Self {
        Self {
            derivatives: true,
            squares: true,
            ..Self::motion_6()
        }
    }

    pub fn with_censor(mut self, censor: CensorConfig) -> Self {
        self.censor = Some(censor);
        self
    }
}

/// Complete cleaning configuration as stored in a JSON file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanConfig {
    pub filter: FilterConfig,
    #[serde(default)]
    pub confounds: ConfoundStrategy,
}

impl CleanConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: CleanConfig = serde_json::from_str(json)
            .map_err(|e| CleanError::InvalidParameter(format!("invalid configuration: {}", e)))?;
        config.filter.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        log::debug!("Loaded configuration from {}", path.as_ref().display());
        Self::from_json_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cutoff_at_nyquist_rejected() {
        // TR 2 s -> Nyquist 0.25 Hz
        let config = FilterConfig::new(2.0).with_high_pass(0.25);
        assert!(matches!(
            config.validate(),
            Err(CleanError::InvalidCutoff { nyquist_hz, .. }) if (nyquist_hz - 0.25).abs() < 1e-12
        ));

        assert!(FilterConfig::new(2.0).with_high_pass(0.2499).validate().is_ok());
        assert!(FilterConfig::new(2.0).with_high_pass(0.0).validate().is_err());
    }

    #[test]
    fn test_invalid_repetition_time() {
        assert!(matches!(
            FilterConfig::new(0.0).validate(),
            Err(CleanError::InvalidParameter(_))
        ));
        assert!(FilterConfig::new(f64::NAN).validate().is_err());
    }

    #[test]
    fn test_constant_inclusion() {
        let plain = FilterConfig::new(2.0).with_detrend(false);
        assert!(!plain.includes_constant());
        assert!(plain.clone().with_standardize(Standardize::Psc).includes_constant());
        assert!(plain.with_high_pass(0.01).includes_constant());
    }

    #[test]
    fn test_config_json_defaults() {
        let config = CleanConfig::from_json_str(
            r#"{
                "filter": { "t_r": 2.0, "high_pass_hz": 0.01, "standardize": "psc" },
                "confounds": {
                    "columns": ["trans_x", "rot_z"],
                    "censor": { "threshold": 0.5 }
                }
            }"#,
        )
        .unwrap();

        assert!(config.filter.detrend);
        assert_eq!(config.filter.detrend_order, 1);
        assert_eq!(config.filter.standardize, Standardize::Psc);
        assert_eq!(config.confounds.fill_missing, Some(0.0));

        let censor = config.confounds.censor.unwrap();
        assert_eq!(censor.source, DisplacementSource::default());
        assert_eq!(censor.before, 0);
    }

    #[test]
    fn test_config_rejects_bad_cutoff() {
        let result = CleanConfig::from_json_str(r#"{ "filter": { "t_r": 1.0, "high_pass_hz": 0.6 } }"#);
        assert!(matches!(result, Err(CleanError::InvalidCutoff { .. })));
    }

    #[test]
    fn test_motion_source_defaults() {
        let source: DisplacementSource = serde_json::from_str(r#"{ "kind": "motion" }"#).unwrap();
        match source {
            DisplacementSource::Motion {
                columns,
                head_radius_mm,
            } => {
                assert_eq!(columns.len(), 6);
                assert_eq!(head_radius_mm, 50.0);
            }
            other => panic!("unexpected source {:?}", other),
        }
    }

    #[test]
    fn test_motion_24_preset() {
        let strategy = ConfoundStrategy::motion_24();
        assert_eq!(strategy.columns[0], "trans_x");
        assert!(strategy.derivatives && strategy.squares);
    }
}
