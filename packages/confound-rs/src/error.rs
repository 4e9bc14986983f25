use thiserror::Error;

#[derive(Error, Debug)]
pub enum CleanError {
    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Dimension mismatch: {what} has {actual} rows, expected {expected}")]
    DimensionMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid high-pass cutoff {cutoff_hz} Hz: must lie in (0, {nyquist_hz}) Hz")]
    InvalidCutoff { cutoff_hz: f64, nyquist_hz: f64 },

    #[error("Channel {channel} has a near-zero mean ({mean:e}); percent signal change is undefined")]
    DegenerateChannel { channel: usize, mean: f64 },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Failed to parse table: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CleanError>;
