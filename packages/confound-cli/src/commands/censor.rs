use crate::clean_params;
use crate::cli::CensorArgs;
use crate::exit_codes;
use crate::output;
use confound_rs::{framewise_displacement, CensorMask, CleanError, ConfoundTable, DisplacementSource};
use serde::Serialize;

#[derive(Serialize)]
struct CensorOutput {
    file: String,
    source: DisplacementSource,
    threshold: f64,
    n_volumes: usize,
    n_censored: usize,
    censored: Vec<usize>,
    displacement: Vec<f64>,
}

pub fn execute(args: CensorArgs) -> i32 {
    if let Err(msg) = clean_params::validate_file(&args.confounds) {
        eprintln!("Error: {}", msg);
        return exit_codes::INPUT_ERROR;
    }

    let table = match confound_rs::read_table(&args.confounds) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: {}: {}", args.confounds, e);
            return exit_codes::INPUT_ERROR;
        }
    };

    let source = clean_params::displacement_source(&args.displacement);
    let displacement = match compute_displacement(&table, &source) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::for_error(&e);
        }
    };

    let mask = match CensorMask::from_displacement(&displacement, args.threshold) {
        Ok(m) => m.expand(args.before, args.after),
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::for_error(&e);
        }
    };

    let result = CensorOutput {
        file: args.confounds.clone(),
        source,
        threshold: args.threshold,
        n_volumes: mask.len(),
        n_censored: mask.n_censored(),
        censored: mask.censored_indices(),
        displacement,
    };

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
    } else {
        println!(
            "Censored {} of {} volumes (threshold {})",
            result.n_censored, result.n_volumes, result.threshold
        );
        if !result.censored.is_empty() {
            let indices: Vec<String> = result.censored.iter().map(|i| i.to_string()).collect();
            println!("{}", indices.join(" "));
        }
    }

    exit_codes::SUCCESS
}

/// Missing displacement values stay `NaN` so they are never censored.
fn compute_displacement(table: &ConfoundTable, source: &DisplacementSource) -> Result<Vec<f64>, CleanError> {
    match source {
        DisplacementSource::Column { name } => table
            .column(name)
            .map(|col| col.to_vec())
            .ok_or_else(|| CleanError::MissingColumn(name.clone())),
        DisplacementSource::Motion {
            columns,
            head_radius_mm,
        } => {
            let motion = table.fill_missing(0.0).select(columns)?;
            framewise_displacement(&motion, *head_radius_mm)
        }
    }
}
