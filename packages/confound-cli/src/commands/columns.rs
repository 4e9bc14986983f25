use crate::clean_params;
use crate::cli::ColumnsArgs;
use crate::exit_codes;
use crate::output;
use serde::Serialize;

#[derive(Serialize)]
struct ColumnInfo {
    name: String,
    missing: usize,
}

#[derive(Serialize)]
struct ColumnsOutput {
    file: String,
    n_rows: usize,
    columns: Vec<ColumnInfo>,
}

pub fn execute(args: ColumnsArgs) -> i32 {
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

    let result = ColumnsOutput {
        file: args.confounds.clone(),
        n_rows: table.n_rows(),
        columns: table
            .missing_counts()
            .into_iter()
            .map(|(name, missing)| ColumnInfo { name, missing })
            .collect(),
    };

    if args.json {
        return match output::to_json(&result, false) {
            Ok(json) => match output::write_output(&json, None) {
                Ok(()) => exit_codes::SUCCESS,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    exit_codes::EXECUTION_ERROR
                }
            },
            Err(e) => {
                eprintln!("Error: {}", e);
                exit_codes::EXECUTION_ERROR
            }
        };
    }

    let width = result
        .columns
        .iter()
        .map(|c| c.name.len())
        .max()
        .unwrap_or(0)
        .max("Column".len());

    println!("{:<width$}  Missing", "Column", width = width);
    println!("{}", "-".repeat(width + 9));
    for column in &result.columns {
        println!("{:<width$}  {:>7}", column.name, column.missing, width = width);
    }
    println!();
    println!("{} columns, {} rows", result.columns.len(), result.n_rows);

    exit_codes::SUCCESS
}
