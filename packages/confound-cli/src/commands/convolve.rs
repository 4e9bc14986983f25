use crate::clean_params;
use crate::cli::{ConvolveArgs, OutputFormat};
use crate::exit_codes;
use crate::output;
use confound_rs::{convolve, convolve_truncated, event_series, CleanError, ConfoundTable, Event, HrfModel};
use serde::Serialize;

#[derive(Serialize)]
struct ConvolveOutput {
    n_events: usize,
    kernel_length: usize,
    full: bool,
    hrf: Option<HrfModel>,
    response: Vec<f64>,
}

pub fn execute(args: ConvolveArgs) -> i32 {
    let events = match load_events(&args) {
        Ok(e) => e,
        Err((code, msg)) => {
            eprintln!("Error: {}", msg);
            return code;
        }
    };

    let kernel = match load_kernel(&args) {
        Ok(k) => k,
        Err((code, msg)) => {
            eprintln!("Error: {}", msg);
            return code;
        }
    };

    let response = if args.full {
        convolve(&events, &kernel)
    } else {
        convolve_truncated(&events, &kernel)
    };
    log::info!(
        "Convolved {} events with a {}-sample kernel -> {} samples",
        events.len(),
        kernel.len(),
        response.len()
    );

    let rendered = match args.format {
        OutputFormat::Tsv => Ok(output::series_to_lines(&response)),
        OutputFormat::Json => output::to_json(
            &ConvolveOutput {
                n_events: events.len(),
                kernel_length: kernel.len(),
                full: args.full,
                hrf: args.hrf.map(HrfModel::from),
                response,
            },
            args.compact,
        ),
    };

    match rendered {
        Ok(content) => match output::write_output(&content, args.output.as_deref()) {
            Ok(()) => exit_codes::SUCCESS,
            Err(e) => {
                eprintln!("Error: {}", e);
                exit_codes::EXECUTION_ERROR
            }
        },
        Err(e) => {
            eprintln!("Error serializing result: {}", e);
            exit_codes::EXECUTION_ERROR
        }
    }
}

fn load_events(args: &ConvolveArgs) -> Result<Vec<f64>, (i32, String)> {
    if let Some(ref path) = args.events {
        return read_series(path);
    }

    let path = args
        .events_table
        .as_deref()
        .ok_or_else(|| (exit_codes::INPUT_ERROR, "--events or --events-table is required".to_string()))?;
    let (n_scans, t_r) = match (args.n_scans, args.tr) {
        (Some(n), Some(tr)) => (n, tr),
        _ => {
            return Err((
                exit_codes::INPUT_ERROR,
                "--events-table requires --n-scans and --tr".to_string(),
            ))
        }
    };

    clean_params::validate_file(path).map_err(|msg| (exit_codes::INPUT_ERROR, msg))?;
    let table = confound_rs::read_table(path)
        .map_err(|e| (exit_codes::INPUT_ERROR, format!("{}: {}", path, e)))?;
    let events = events_from_table(&table).map_err(|e| (exit_codes::for_error(&e), e.to_string()))?;
    event_series(&events, n_scans, t_r).map_err(|e| (exit_codes::for_error(&e), e.to_string()))
}

fn load_kernel(args: &ConvolveArgs) -> Result<Vec<f64>, (i32, String)> {
    if let Some(ref path) = args.kernel {
        return read_series(path);
    }

    match (args.hrf, args.tr) {
        (Some(hrf), Some(t_r)) => HrfModel::from(hrf)
            .kernel(t_r)
            .map_err(|e| (exit_codes::for_error(&e), e.to_string())),
        _ => Err((
            exit_codes::INPUT_ERROR,
            "--kernel or --hrf with --tr is required".to_string(),
        )),
    }
}

/// Single-column numeric file as a series
fn read_series(path: &str) -> Result<Vec<f64>, (i32, String)> {
    clean_params::validate_file(path).map_err(|msg| (exit_codes::INPUT_ERROR, msg))?;
    let matrix = confound_rs::read_matrix(path)
        .map_err(|e| (exit_codes::INPUT_ERROR, format!("{}: {}", path, e)))?;
    if matrix.n_channels() != 1 {
        return Err((
            exit_codes::INPUT_ERROR,
            format!("{}: expected one value per line, found {} columns", path, matrix.n_channels()),
        ));
    }
    if let Some((t, _)) = matrix.first_non_finite() {
        return Err((
            exit_codes::INPUT_ERROR,
            format!("{}: non-finite value at sample {}", path, t),
        ));
    }
    Ok(matrix.column(0))
}

/// Events from `onset` and `duration` columns, with an optional `amplitude`
fn events_from_table(table: &ConfoundTable) -> Result<Vec<Event>, CleanError> {
    let onsets = table
        .column("onset")
        .ok_or_else(|| CleanError::MissingColumn("onset".to_string()))?;
    let durations = table
        .column("duration")
        .ok_or_else(|| CleanError::MissingColumn("duration".to_string()))?;
    let amplitudes = table.column("amplitude");

    Ok((0..table.n_rows())
        .map(|i| Event {
            onset: onsets[i],
            duration: durations[i],
            amplitude: amplitudes.map(|a| a[i]).unwrap_or(1.0),
        })
        .collect())
}
