use crate::clean_params;
use crate::cli::{BatchArgs, OutputFormat};
use crate::exit_codes;
use crate::output;
use crate::report::CleanReport;
use confound_rs::CleanConfig;
use rayon::prelude::*;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// One signal file and the confounds table paired with it
#[derive(Debug, Clone, PartialEq)]
struct BatchItem {
    signal: String,
    confounds: Option<String>,
}

enum ItemStatus {
    /// Rendered report for stdout, or the file it was written to
    Done(String),
    Failed(String),
    /// Not attempted because an earlier file failed
    Skipped,
}

pub fn execute(args: BatchArgs) -> i32 {
    let files = match resolve_files(&args) {
        Ok(f) => f,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    if files.is_empty() {
        eprintln!("Error: No matching files found");
        return exit_codes::INPUT_ERROR;
    }

    let items = pair_confounds(&files, args.confounds_template.as_deref());

    if args.dry_run {
        for item in &items {
            match item.confounds {
                Some(ref confounds) => println!("{}\t{}", item.signal, confounds),
                None => println!("{}", item.signal),
            }
        }
        if !args.quiet {
            eprintln!("Found {} file(s)", items.len());
        }
        return exit_codes::SUCCESS;
    }

    let config = match clean_params::build_config(&args.filter, &args.confound) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    if let Some(ref dir) = args.output_dir {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("Error: Failed to create output directory '{}': {}", dir, e);
            return exit_codes::EXECUTION_ERROR;
        }
    }

    let pool = match args.jobs {
        Some(n) => match rayon::ThreadPoolBuilder::new().num_threads(n).build() {
            Ok(pool) => Some(pool),
            Err(e) => {
                eprintln!("Error: Failed to start worker pool: {}", e);
                return exit_codes::EXECUTION_ERROR;
            }
        },
        None => None,
    };

    let total = items.len();
    let start_time = Instant::now();
    let stop = AtomicBool::new(false);

    let run_all = || -> Vec<ItemStatus> {
        items
            .par_iter()
            .map(|item| {
                if stop.load(Ordering::Relaxed) {
                    return ItemStatus::Skipped;
                }
                match process_item(item, &config, &args) {
                    Ok(done) => ItemStatus::Done(done),
                    Err(msg) => {
                        if !args.continue_on_error {
                            stop.store(true, Ordering::Relaxed);
                        }
                        ItemStatus::Failed(msg)
                    }
                }
            })
            .collect()
    };
    let statuses = match pool {
        Some(pool) => pool.install(run_all),
        None => run_all(),
    };

    let mut succeeded = 0usize;
    let mut failed = 0usize;
    let mut skipped = 0usize;

    for (i, (item, status)) in items.iter().zip(statuses).enumerate() {
        match status {
            ItemStatus::Done(done) => {
                succeeded += 1;
                if args.output_dir.is_some() {
                    if !args.quiet {
                        eprintln!("[{}/{}] {} -> {}", i + 1, total, item.signal, done);
                    }
                } else if let Err(e) = output::write_output(&done, None) {
                    eprintln!("  Error writing to stdout: {}", e);
                    return exit_codes::EXECUTION_ERROR;
                }
            }
            ItemStatus::Failed(msg) => {
                failed += 1;
                eprintln!("[{}/{}] {}", i + 1, total, item.signal);
                eprintln!("  Error: {}", msg);
            }
            ItemStatus::Skipped => skipped += 1,
        }
    }

    let elapsed = start_time.elapsed();

    if !args.quiet {
        eprintln!(
            "Batch complete: {}/{} succeeded, {}/{} failed, {} skipped, {:.1}s",
            succeeded,
            total,
            failed,
            total,
            skipped,
            elapsed.as_secs_f64()
        );
    }

    if failed == 0 {
        exit_codes::SUCCESS
    } else if succeeded > 0 {
        exit_codes::PARTIAL_FAILURE
    } else {
        exit_codes::EXECUTION_ERROR
    }
}

fn process_item(item: &BatchItem, config: &CleanConfig, args: &BatchArgs) -> Result<String, String> {
    let (signal, table) = clean_params::load_inputs(&item.signal, item.confounds.as_deref())
        .map_err(|(_, msg)| msg)?;
    let outcome = clean_params::run_clean(&signal, table.as_ref(), config).map_err(|e| e.to_string())?;
    log::debug!(
        "{}: regressed out {} nuisance columns",
        item.signal,
        outcome.design_columns.len()
    );

    let Some(ref dir) = args.output_dir else {
        let report = CleanReport::new(&item.signal, item.confounds.as_deref(), config.clone(), outcome);
        return output::to_json(&report, true);
    };

    let (content, extension) = match args.format {
        OutputFormat::Tsv => (output::to_tsv(&outcome.cleaned)?, "tsv"),
        OutputFormat::Json => {
            let report = CleanReport::new(&item.signal, item.confounds.as_deref(), config.clone(), outcome);
            (output::to_json(&report, args.compact)?, "json")
        }
    };

    let out_path = Path::new(dir).join(format!("{}_cleaned.{}", file_stem(&item.signal), extension));
    let out_str = out_path.to_string_lossy().to_string();
    output::write_output(&content, Some(&out_str))?;
    Ok(out_str)
}

fn resolve_files(args: &BatchArgs) -> Result<Vec<String>, String> {
    if let Some(ref pattern) = args.glob {
        resolve_glob(pattern)
    } else if let Some(ref files) = args.files {
        Ok(files.clone())
    } else {
        Err("One of --glob or --files must be specified".to_string())
    }
}

fn resolve_glob(pattern: &str) -> Result<Vec<String>, String> {
    let paths = glob::glob(pattern)
        .map_err(|e| format!("Invalid glob pattern '{}': {}", pattern, e))?;

    let mut files: Vec<String> = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) => {
                if path.is_file() {
                    if let Some(s) = path.to_str() {
                        files.push(s.to_string());
                    }
                }
            }
            Err(e) => {
                log::warn!("glob error: {}", e);
            }
        }
    }
    files.sort();
    Ok(files)
}

fn file_stem(path: &str) -> &str {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output")
}

/// Pair each signal file with `template`, "{stem}" replaced by its file stem
fn pair_confounds(files: &[String], template: Option<&str>) -> Vec<BatchItem> {
    files
        .iter()
        .map(|signal| BatchItem {
            signal: signal.clone(),
            confounds: template.map(|t| t.replace("{stem}", file_stem(signal))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{ConfoundArgs, DisplacementArgs, FilterArgs};
    use std::fs;

    fn make_batch_args() -> BatchArgs {
        BatchArgs {
            glob: None,
            files: None,
            confounds_template: None,
            filter: FilterArgs {
                tr: Some(2.0),
                high_pass: None,
                no_detrend: false,
                detrend_order: None,
                standardize: None,
                config: None,
            },
            confound: ConfoundArgs {
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
            },
            output_dir: None,
            format: OutputFormat::Json,
            jobs: None,
            continue_on_error: false,
            dry_run: false,
            compact: false,
            quiet: false,
        }
    }

    #[test]
    fn test_resolve_files_no_input() {
        let args = make_batch_args();
        let result = resolve_files(&args);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("must be specified"));
    }

    #[test]
    fn test_resolve_files_explicit_list() {
        let mut args = make_batch_args();
        args.files = Some(vec!["/tmp/a.txt".to_string(), "/tmp/b.txt".to_string()]);
        let result = resolve_files(&args).unwrap();
        assert_eq!(result, vec!["/tmp/a.txt", "/tmp/b.txt"]);
    }

    #[test]
    fn test_resolve_glob_no_matches() {
        let result = resolve_glob("/nonexistent_dir_12345/*.txt").unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_resolve_glob_with_temp_files() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("b_bold.txt"), "").unwrap();
        fs::write(tmp.path().join("a_bold.txt"), "").unwrap();
        fs::write(tmp.path().join("a_confounds.tsv"), "").unwrap();

        let pattern = format!("{}/*_bold.txt", tmp.path().to_str().unwrap());
        let result = resolve_glob(&pattern).unwrap();
        assert_eq!(result.len(), 2);
        assert!(result[0].ends_with("a_bold.txt"));
    }

    #[test]
    fn test_pair_confounds_template() {
        let files = vec!["data/sub-01_bold.txt".to_string()];
        let items = pair_confounds(&files, Some("conf/{stem}_confounds.tsv"));
        assert_eq!(
            items,
            vec![BatchItem {
                signal: "data/sub-01_bold.txt".to_string(),
                confounds: Some("conf/sub-01_bold_confounds.tsv".to_string()),
            }]
        );

        let items = pair_confounds(&files, None);
        assert_eq!(items[0].confounds, None);
    }

    #[test]
    fn test_process_item_writes_tsv() {
        let tmp = tempfile::tempdir().unwrap();
        let signal = tmp.path().join("run1.txt");
        fs::write(&signal, "1 10\n2 12\n4 11\n8 15\n").unwrap();

        let mut args = make_batch_args();
        args.output_dir = Some(tmp.path().join("out").to_str().unwrap().to_string());
        args.format = OutputFormat::Tsv;
        fs::create_dir_all(args.output_dir.as_ref().unwrap()).unwrap();

        let item = BatchItem {
            signal: signal.to_str().unwrap().to_string(),
            confounds: None,
        };
        let config = clean_params::build_config(&args.filter, &args.confound).unwrap();
        let written = process_item(&item, &config, &args).unwrap();

        assert!(written.ends_with("run1_cleaned.tsv"));
        let content = fs::read_to_string(&written).unwrap();
        assert_eq!(content.lines().count(), 4);
    }
}
