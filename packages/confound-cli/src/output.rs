use confound_rs::SignalMatrix;
use std::io::Write;
use std::path::Path;

/// Write a rendered document to stdout or a file.
pub fn write_output(content: &str, output_path: Option<&str>) -> Result<(), String> {
    match output_path {
        Some(path) => {
            std::fs::write(Path::new(path), content)
                .map_err(|e| format!("Failed to write output file '{}': {}", path, e))
        }
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(content.as_bytes())
                .and_then(|_| {
                    if content.ends_with('\n') {
                        Ok(())
                    } else {
                        handle.write_all(b"\n")
                    }
                })
                .map_err(|e| format!("Failed to write to stdout: {}", e))
        }
    }
}

/// Serialize a value to JSON (pretty or compact).
pub fn to_json<T: serde::Serialize>(value: &T, compact: bool) -> Result<String, String> {
    if compact {
        serde_json::to_string(value).map_err(|e| format!("JSON serialization failed: {}", e))
    } else {
        serde_json::to_string_pretty(value)
            .map_err(|e| format!("JSON serialization failed: {}", e))
    }
}

/// Render a matrix as headerless tab-separated rows.
///
/// Values use the shortest representation that parses back exactly.
pub fn to_tsv(matrix: &SignalMatrix) -> Result<String, String> {
    let mut output = Vec::<u8>::new();
    {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(&mut output);

        for t in 0..matrix.n_times() {
            writer
                .write_record(matrix.row(t).iter().map(|v| v.to_string()))
                .map_err(|e| format!("Failed to write TSV row {}: {}", t, e))?;
        }
        writer
            .flush()
            .map_err(|e| format!("Failed to write TSV: {}", e))?;
    }

    String::from_utf8(output).map_err(|e| format!("Failed to convert TSV output to string: {}", e))
}

/// Render a series one value per line.
pub fn series_to_lines(values: &[f64]) -> String {
    let mut out = String::new();
    for v in values {
        out.push_str(&v.to_string());
        out.push('\n');
    }
    out
}
