use confound_rs::CleanError;

pub const SUCCESS: i32 = 0;
pub const EXECUTION_ERROR: i32 = 1;
pub const INPUT_ERROR: i32 = 2;
pub const PARTIAL_FAILURE: i32 = 3;

/// Exit code for a library error
///
/// A degenerate channel only shows up once the data is processed; every
/// other error means the inputs or parameters were unusable.
pub fn for_error(error: &CleanError) -> i32 {
    match error {
        CleanError::DegenerateChannel { .. } => EXECUTION_ERROR,
        _ => INPUT_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        assert_eq!(for_error(&CleanError::MissingColumn("csf".into())), INPUT_ERROR);
        assert_eq!(
            for_error(&CleanError::InvalidCutoff {
                cutoff_hz: 0.3,
                nyquist_hz: 0.25
            }),
            INPUT_ERROR
        );
        assert_eq!(
            for_error(&CleanError::DegenerateChannel { channel: 0, mean: 0.0 }),
            EXECUTION_ERROR
        );
    }
}
