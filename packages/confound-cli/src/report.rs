use confound_rs::{CleanConfig, CleanOutcome, SignalMatrix};
use serde::Serialize;

/// JSON document written by `clean` and `batch`
#[derive(Debug, Serialize)]
pub struct CleanReport {
    pub id: String,
    /// RFC 3339
    pub created_at: String,
    pub signal_file: String,
    pub confounds_file: Option<String>,
    pub n_times: usize,
    pub n_channels: usize,
    pub config: CleanConfig,
    pub design_columns: Vec<String>,
    /// Censored volume indices, empty when censoring was not requested
    pub censored_volumes: Vec<usize>,
    pub cleaned: SignalMatrix,
}

impl CleanReport {
    pub fn new(
        signal_file: &str,
        confounds_file: Option<&str>,
        config: CleanConfig,
        outcome: CleanOutcome,
    ) -> Self {
        let (n_times, n_channels) = outcome.cleaned.shape();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            signal_file: signal_file.to_string(),
            confounds_file: confounds_file.map(str::to_string),
            n_times,
            n_channels,
            config,
            design_columns: outcome.design_columns,
            censored_volumes: outcome
                .censor_mask
                .map(|mask| mask.censored_indices())
                .unwrap_or_default(),
            cleaned: outcome.cleaned,
        }
    }
}
