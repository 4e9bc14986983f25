use crate::clean_params;
use crate::cli::{CleanArgs, OutputFormat};
use crate::exit_codes;
use crate::output;
use crate::report::CleanReport;

pub fn execute(args: CleanArgs) -> i32 {
    let config = match clean_params::build_config(&args.filter, &args.confound) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    let (signal, table) = match clean_params::load_inputs(&args.signal, args.confounds.as_deref()) {
        Ok(inputs) => inputs,
        Err((code, msg)) => {
            eprintln!("Error: {}", msg);
            return code;
        }
    };

    if !args.quiet {
        eprintln!("Cleaning {}...", args.signal);
        eprintln!(
            "  Signal: {} samples x {} channels, TR {} s",
            signal.n_times(),
            signal.n_channels(),
            config.filter.t_r
        );
        if !config.confounds.columns.is_empty() {
            eprintln!("  Confounds: {}", config.confounds.columns.join(", "));
        }
    }

    let outcome = match clean_params::run_clean(&signal, table.as_ref(), &config) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::for_error(&e);
        }
    };

    if !args.quiet {
        eprintln!("  Regressed out {} nuisance columns", outcome.design_columns.len());
        if let Some(ref mask) = outcome.censor_mask {
            eprintln!("  Censored {} of {} volumes", mask.n_censored(), mask.len());
        }
    }

    let rendered = match args.format {
        OutputFormat::Tsv => output::to_tsv(&outcome.cleaned),
        OutputFormat::Json => {
            let report = CleanReport::new(&args.signal, args.confounds.as_deref(), config, outcome);
            output::to_json(&report, args.compact)
        }
    };

    match rendered {
        Ok(content) => {
            if let Err(e) = output::write_output(&content, args.output.as_deref()) {
                eprintln!("Error: {}", e);
                return exit_codes::EXECUTION_ERROR;
            }
            if !args.quiet {
                if let Some(ref path) = args.output {
                    eprintln!("Results written to {}", path);
                }
            }
            exit_codes::SUCCESS
        }
        Err(e) => {
            eprintln!("Error serializing result: {}", e);
            exit_codes::EXECUTION_ERROR
        }
    }
}
