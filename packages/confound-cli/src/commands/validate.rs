use crate::clean_params;
use crate::cli::ValidateArgs;
use crate::exit_codes;
use crate::output;
use serde::Serialize;

#[derive(Serialize, Default)]
struct ValidateOutput {
    signal_file: String,
    n_times: Option<usize>,
    n_channels: Option<usize>,
    confounds_file: Option<String>,
    n_rows: Option<usize>,
    n_columns: Option<usize>,
    /// Confound columns containing missing values
    columns_with_missing: Vec<String>,
    rows_match: Option<bool>,
    error: Option<String>,
}

pub fn execute(args: ValidateArgs) -> i32 {
    let mut result = ValidateOutput {
        signal_file: args.signal.clone(),
        confounds_file: args.confounds.clone(),
        ..Default::default()
    };

    let error = check(&args, &mut result).err();
    result.error = error;

    if args.json {
        match output::to_json(&result, false) {
            Ok(json) => {
                if let Err(e) = output::write_output(&json, None) {
                    eprintln!("Error: {}", e);
                    return exit_codes::EXECUTION_ERROR;
                }
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                return exit_codes::EXECUTION_ERROR;
            }
        }
    } else if let Some(ref err) = result.error {
        eprintln!("Error: {}", err);
    } else {
        println!(
            "Signal '{}' is valid ({} samples x {} channels)",
            args.signal,
            result.n_times.unwrap_or(0),
            result.n_channels.unwrap_or(0)
        );
        if let Some(ref confounds) = args.confounds {
            println!(
                "Confounds '{}' is valid ({} rows x {} columns)",
                confounds,
                result.n_rows.unwrap_or(0),
                result.n_columns.unwrap_or(0)
            );
            if !result.columns_with_missing.is_empty() {
                println!("  Missing values in: {}", result.columns_with_missing.join(", "));
            }
        }
    }

    if result.error.is_some() {
        exit_codes::INPUT_ERROR
    } else {
        exit_codes::SUCCESS
    }
}

fn check(args: &ValidateArgs, result: &mut ValidateOutput) -> Result<(), String> {
    clean_params::validate_file(&args.signal)?;
    let signal = confound_rs::read_matrix(&args.signal).map_err(|e| format!("{}: {}", args.signal, e))?;
    result.n_times = Some(signal.n_times());
    result.n_channels = Some(signal.n_channels());

    if let Some((t, c)) = signal.first_non_finite() {
        return Err(format!(
            "{}: non-finite value at sample {}, channel {}",
            args.signal, t, c
        ));
    }

    let Some(ref confounds) = args.confounds else {
        return Ok(());
    };

    clean_params::validate_file(confounds)?;
    let table = confound_rs::read_table(confounds).map_err(|e| format!("{}: {}", confounds, e))?;
    result.n_rows = Some(table.n_rows());
    result.n_columns = Some(table.n_columns());
    result.columns_with_missing = table
        .missing_counts()
        .into_iter()
        .filter(|(_, missing)| *missing > 0)
        .map(|(name, _)| name)
        .collect();

    let rows_match = table.n_rows() == signal.n_times();
    result.rows_match = Some(rows_match);
    if !rows_match {
        return Err(format!(
            "Confounds table has {} rows but the signal has {} samples",
            table.n_rows(),
            signal.n_times()
        ));
    }

    Ok(())
}
