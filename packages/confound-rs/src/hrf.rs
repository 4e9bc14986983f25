//! Hemodynamic response simulation
//!
//! Predicts the BOLD response to an experimental design by convolving a
//! neural event series with a canonical hemodynamic response kernel.
//!
//! # Canonical kernels
//!
//! Both models are a difference of two gamma densities: a main response
//! peaking around 5 s and a smaller, later undershoot.
//!
//! - SPM: delay 6 s, undershoot 16 s, dispersion 1, undershoot ratio 1/6
//! - Glover: delay 6 s, undershoot 12 s, dispersion 0.9, undershoot ratio 0.35

use crate::error::{CleanError, Result};
use serde::{Deserialize, Serialize};
use statrs::function::gamma::ln_gamma;

/// Default kernel length in seconds
pub const DEFAULT_HRF_LENGTH_S: f64 = 32.0;

/// Full discrete convolution of `events` with `kernel`
///
/// The result has `events.len() + kernel.len() - 1` samples, or none if
/// either input is empty.
pub fn convolve(events: &[f64], kernel: &[f64]) -> Vec<f64> {
    if events.is_empty() || kernel.is_empty() {
        return Vec::new();
    }

    let mut result = vec![0.0; events.len() + kernel.len() - 1];
    for (i, &e) in events.iter().enumerate() {
        if e == 0.0 {
            continue;
        }
        for (j, &k) in kernel.iter().enumerate() {
            result[i + j] += e * k;
        }
    }
    result
}

/// Convolution truncated to the causal prefix aligned with `events`
pub fn convolve_truncated(events: &[f64], kernel: &[f64]) -> Vec<f64> {
    let mut full = convolve(events, kernel);
    full.truncate(events.len());
    full
}

/// Difference-of-gammas hemodynamic response
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GammaDifferenceHrf {
    /// Main response shape parameter times dispersion, in seconds
    pub delay: f64,
    /// Undershoot shape parameter times dispersion, in seconds
    pub undershoot: f64,
    /// Scale of the main response
    pub dispersion: f64,
    /// Scale of the undershoot
    pub undershoot_dispersion: f64,
    /// Undershoot amplitude relative to the main response
    pub ratio: f64,
    /// Response onset in seconds
    #[serde(default)]
    pub onset: f64,
}

impl GammaDifferenceHrf {
    #[must_use]
    pub fn spm() -> Self {
        Self {
            delay: 6.0,
            undershoot: 16.0,
            dispersion: 1.0,
            undershoot_dispersion: 1.0,
            ratio: 0.167,
            onset: 0.0,
        }
    }

    #[must_use]
    pub fn glover() -> Self {
        Self {
            delay: 6.0,
            undershoot: 12.0,
            dispersion: 0.9,
            undershoot_dispersion: 0.9,
            ratio: 0.35,
            onset: 0.0,
        }
    }

    /// Unnormalized response at `t` seconds after the event
    pub fn evaluate(&self, t: f64) -> f64 {
        let t = t - self.onset;
        gamma_pdf(t, self.delay / self.dispersion, self.dispersion)
            - self.ratio * gamma_pdf(t, self.undershoot / self.undershoot_dispersion, self.undershoot_dispersion)
    }

    /// Kernel sampled every `t_r / oversampling` seconds over `time_length`
    /// seconds, normalized to unit sum
    pub fn kernel(&self, t_r: f64, oversampling: usize, time_length: f64) -> Result<Vec<f64>> {
        if !t_r.is_finite() || t_r <= 0.0 {
            return Err(CleanError::InvalidParameter(format!(
                "repetition time must be positive, got {}",
                t_r
            )));
        }
        if oversampling == 0 {
            return Err(CleanError::InvalidParameter(
                "oversampling must be at least 1".to_string(),
            ));
        }
        if !time_length.is_finite() || time_length <= 0.0 {
            return Err(CleanError::InvalidParameter(format!(
                "kernel length must be positive, got {}",
                time_length
            )));
        }

        let dt = t_r / oversampling as f64;
        let n_samples = ((time_length / dt).round() as usize).max(1);
        let samples: Vec<f64> = (0..n_samples).map(|k| self.evaluate(k as f64 * dt)).collect();

        let total: f64 = samples.iter().sum();
        if total.abs() < f64::EPSILON {
            return Err(CleanError::InvalidParameter(
                "hemodynamic kernel sums to zero; increase its length".to_string(),
            ));
        }

        Ok(samples.into_iter().map(|v| v / total).collect())
    }
}

/// Canonical kernel choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HrfModel {
    #[default]
    Spm,
    Glover,
}

impl HrfModel {
    pub fn parameters(self) -> GammaDifferenceHrf {
        match self {
            HrfModel::Spm => GammaDifferenceHrf::spm(),
            HrfModel::Glover => GammaDifferenceHrf::glover(),
        }
    }

    /// Kernel sampled at the scan rate over the default length
    pub fn kernel(self, t_r: f64) -> Result<Vec<f64>> {
        self.parameters().kernel(t_r, 1, DEFAULT_HRF_LENGTH_S)
    }
}

/// One experimental event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Seconds from the start of the run
    pub onset: f64,
    /// Seconds; 0 marks an instantaneous event
    #[serde(default)]
    pub duration: f64,
    #[serde(default = "default_amplitude")]
    pub amplitude: f64,
}

fn default_amplitude() -> f64 {
    1.0
}

impl Event {
    pub fn impulse(onset: f64) -> Self {
        Self {
            onset,
            duration: 0.0,
            amplitude: 1.0,
        }
    }

    pub fn block(onset: f64, duration: f64) -> Self {
        Self {
            onset,
            duration,
            amplitude: 1.0,
        }
    }
}

/// Neural event series sampled once per scan
///
/// Instantaneous events become an impulse at the nearest scan; events with a
/// duration become a boxcar over the scans they cover. Overlapping events
/// add. Events extending past the run are clipped.
pub fn event_series(events: &[Event], n_scans: usize, t_r: f64) -> Result<Vec<f64>> {
    if !t_r.is_finite() || t_r <= 0.0 {
        return Err(CleanError::InvalidParameter(format!(
            "repetition time must be positive, got {}",
            t_r
        )));
    }

    let mut series = vec![0.0; n_scans];
    for (idx, event) in events.iter().enumerate() {
        if !event.onset.is_finite() || event.onset < 0.0 {
            return Err(CleanError::InvalidParameter(format!(
                "event {} has invalid onset {}",
                idx, event.onset
            )));
        }
        if !event.duration.is_finite() || event.duration < 0.0 {
            return Err(CleanError::InvalidParameter(format!(
                "event {} has invalid duration {}",
                idx, event.duration
            )));
        }
        if !event.amplitude.is_finite() {
            return Err(CleanError::InvalidParameter(format!(
                "event {} has invalid amplitude {}",
                idx, event.amplitude
            )));
        }

        // float-to-usize casts saturate, so far-off onsets land past the run
        let start = (event.onset / t_r).round() as usize;
        if start >= n_scans {
            continue;
        }
        let end = if event.duration == 0.0 {
            start + 1
        } else {
            (((event.onset + event.duration) / t_r).round() as usize).max(start + 1)
        };

        for sample in series.iter_mut().take(end).skip(start) {
            *sample += event.amplitude;
        }
    }

    Ok(series)
}

/// Predicted BOLD response to `events` over a run of `n_scans` volumes
pub fn predicted_response(events: &[Event], n_scans: usize, t_r: f64, model: HrfModel) -> Result<Vec<f64>> {
    let series = event_series(events, n_scans, t_r)?;
    let kernel = model.kernel(t_r)?;
    Ok(convolve_truncated(&series, &kernel))
}

fn gamma_pdf(t: f64, shape: f64, scale: f64) -> f64 {
    if t <= 0.0 {
        return 0.0;
    }
    ((shape - 1.0) * t.ln() - t / scale - ln_gamma(shape) - shape * scale.ln()).exp()
}
