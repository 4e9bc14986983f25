use crate::cli::{ConfoundArgs, DisplacementArgs, FilterArgs};
use crate::exit_codes;
use confound_rs::{
    CensorConfig, CleanConfig, CleanError, CleanOutcome, ConfoundStrategy, ConfoundTable,
    DisplacementSource, FilterConfig, SignalCleaner, SignalMatrix, MOTION_PARAMETERS,
};
use std::path::Path;

/// Validate a single file path: existence and being a regular file.
pub fn validate_file(file_path: &str) -> Result<(), String> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("Input file not found: {}", file_path));
    }
    if !path.is_file() {
        return Err(format!("Input path is not a file: {}", file_path));
    }
    Ok(())
}

/// Displacement source selected by the `--fd-*` flags.
pub fn displacement_source(args: &DisplacementArgs) -> DisplacementSource {
    if args.fd_from_motion {
        DisplacementSource::Motion {
            columns: MOTION_PARAMETERS.iter().map(|s| s.to_string()).collect(),
            head_radius_mm: args.head_radius,
        }
    } else {
        DisplacementSource::Column {
            name: args.fd_column.clone(),
        }
    }
}

/// Confound strategy from the selection and censoring flags.
pub fn build_strategy(args: &ConfoundArgs) -> ConfoundStrategy {
    let mut columns: Vec<String> = Vec::new();
    if args.motion {
        columns.extend(MOTION_PARAMETERS.iter().map(|s| s.to_string()));
    }
    for name in &args.columns {
        let name = name.trim();
        if !name.is_empty() && !columns.iter().any(|c| c == name) {
            columns.push(name.to_string());
        }
    }

    let censor = args.fd_threshold.map(|threshold| CensorConfig {
        source: displacement_source(&args.displacement),
        threshold,
        before: args.censor_before,
        after: args.censor_after,
    });

    ConfoundStrategy {
        columns,
        derivatives: args.derivatives,
        squares: args.squares,
        fill_missing: Some(args.fill_value),
        censor,
    }
}

/// Assemble the cleaning configuration from flags or a `--config` file.
pub fn build_config(filter: &FilterArgs, confound: &ConfoundArgs) -> Result<CleanConfig, String> {
    if let Some(ref path) = filter.config {
        return CleanConfig::load(path).map_err(|e| format!("{}: {}", path, e));
    }

    let t_r = filter
        .tr
        .ok_or_else(|| "--tr is required unless --config is given".to_string())?;

    let mut config = FilterConfig::new(t_r).with_detrend(!filter.no_detrend);
    if let Some(order) = filter.detrend_order {
        config = config.with_detrend_order(order);
    }
    if let Some(cutoff) = filter.high_pass {
        config = config.with_high_pass(cutoff);
    }
    if let Some(standardize) = filter.standardize {
        config = config.with_standardize(standardize.into());
    }
    config.validate().map_err(|e| e.to_string())?;

    Ok(CleanConfig {
        filter: config,
        confounds: build_strategy(confound),
    })
}

/// Whether the strategy needs a confounds table at all.
pub fn needs_confounds(strategy: &ConfoundStrategy) -> bool {
    !strategy.columns.is_empty() || strategy.censor.is_some()
}

/// Clean one signal with an optional confounds table.
pub fn run_clean(
    signal: &SignalMatrix,
    table: Option<&ConfoundTable>,
    config: &CleanConfig,
) -> Result<CleanOutcome, CleanError> {
    let cleaner = SignalCleaner::new(config.filter.clone())?;
    match table {
        Some(table) => cleaner.clean_with_confounds(signal, table, &config.confounds),
        None if needs_confounds(&config.confounds) => Err(CleanError::InvalidParameter(
            "confound columns or censoring require --confounds".to_string(),
        )),
        None => cleaner.clean_labeled(signal, None, None),
    }
}

/// Read the signal and optional confounds, mapping failures to an exit code.
pub fn load_inputs(
    signal_path: &str,
    confounds_path: Option<&str>,
) -> Result<(SignalMatrix, Option<ConfoundTable>), (i32, String)> {
    validate_file(signal_path).map_err(|msg| (exit_codes::INPUT_ERROR, msg))?;
    let signal = confound_rs::read_matrix(signal_path)
        .map_err(|e| (exit_codes::INPUT_ERROR, format!("{}: {}", signal_path, e)))?;

    let table = match confounds_path {
        Some(path) => {
            validate_file(path).map_err(|msg| (exit_codes::INPUT_ERROR, msg))?;
            let table = confound_rs::read_table(path)
                .map_err(|e| (exit_codes::INPUT_ERROR, format!("{}: {}", path, e)))?;
            Some(table)
        }
        None => None,
    };

    Ok((signal, table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::StandardizeArg;
    use confound_rs::Standardize;

    fn filter_args() -> FilterArgs {
        FilterArgs {
            tr: Some(2.0),
            high_pass: None,
            no_detrend: false,
            detrend_order: None,
            standardize: None,
            config: None,
        }
    }

    fn confound_args() -> ConfoundArgs {
        ConfoundArgs {
            columns: Vec::new(),
            motion: false,
            derivatives: false,
            squares: false,
            fill_value: 0.0,
            fd_threshold: None,
            displacement: DisplacementArgs {
                fd_column: "framewise_displacement".to_string(),
                fd_from_motion: false,
                head_radius: 50.0,
            },
            censor_before: 0,
            censor_after: 0,
        }
    }

    #[test]
    fn test_build_config_defaults() {
        let config = build_config(&filter_args(), &confound_args()).unwrap();
        assert_eq!(config.filter, FilterConfig::new(2.0));
        assert!(config.confounds.columns.is_empty());
        assert!(config.confounds.censor.is_none());
    }

    #[test]
    fn test_build_config_filter_flags() {
        let mut filter = filter_args();
        filter.high_pass = Some(0.01);
        filter.detrend_order = Some(2);
        filter.standardize = Some(StandardizeArg::Zscore);

        let config = build_config(&filter, &confound_args()).unwrap();
        assert_eq!(config.filter.high_pass_hz, Some(0.01));
        assert_eq!(config.filter.detrend_order, 2);
        assert_eq!(config.filter.standardize, Standardize::Zscore);
    }

    #[test]
    fn test_build_config_rejects_cutoff_above_nyquist() {
        let mut filter = filter_args();
        filter.high_pass = Some(0.3);
        let err = build_config(&filter, &confound_args()).unwrap_err();
        assert!(err.contains("Invalid high-pass cutoff"));
    }

    #[test]
    fn test_build_strategy_motion_and_columns() {
        let mut args = confound_args();
        args.motion = true;
        args.columns = vec!["csf".to_string(), "trans_x".to_string(), " ".to_string()];
        args.fd_threshold = Some(0.5);
        args.displacement.fd_from_motion = true;
        args.censor_after = 1;

        let strategy = build_strategy(&args);
        assert_eq!(strategy.columns.len(), 7);
        assert_eq!(strategy.columns[6], "csf");

        let censor = strategy.censor.unwrap();
        assert_eq!(censor.threshold, 0.5);
        assert_eq!(censor.after, 1);
        assert!(matches!(censor.source, DisplacementSource::Motion { head_radius_mm, .. } if head_radius_mm == 50.0));
    }

    #[test]
    fn test_run_clean_requires_table_for_columns() {
        let mut args = confound_args();
        args.columns = vec!["csf".to_string()];
        let config = build_config(&filter_args(), &args).unwrap();
        let signal = SignalMatrix::from_columns(&[vec![1.0, 2.0, 4.0]]).unwrap();

        assert!(matches!(
            run_clean(&signal, None, &config),
            Err(CleanError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_validate_file_missing() {
        assert!(validate_file("/nonexistent_dir_12345/bold.txt").is_err());
    }
}
