//! Confound regression and signal cleaning for fMRI time series
//!
//! Signals are `SignalMatrix` values (rows = volumes, columns = channels).
//! A `SignalCleaner` removes polynomial drift, low-frequency cosine drift,
//! nuisance regressors and motion-censored volumes in one least-squares
//! projection, optionally rescaling to percent signal change or z-scores.
//! The `hrf` module simulates predicted responses for block and
//! event-related designs.

pub mod censor;
pub mod cleaner;
pub mod confounds;
pub mod design;
pub mod error;
pub mod hrf;
pub mod matrix;
pub mod parser;
pub mod types;

pub use censor::CensorMask;
pub use cleaner::{clean_signal, project_out, CleanOutcome, SignalCleaner};
pub use confounds::{
    expand_motion, framewise_displacement, select_columns, ConfoundTable, DEFAULT_HEAD_RADIUS_MM,
    MOTION_PARAMETERS,
};
pub use design::NuisanceDesign;
pub use error::{CleanError, Result};
pub use hrf::{convolve, convolve_truncated, event_series, Event, GammaDifferenceHrf, HrfModel};
pub use matrix::SignalMatrix;
pub use parser::{parse_matrix, parse_table, read_matrix, read_table};
pub use types::*;
