use crate::confounds::ConfoundTable;
use crate::error::{CleanError, Result};
use crate::matrix::SignalMatrix;
use std::path::Path;

/// Tokens read as a missing value in confound tables
const MISSING_TOKENS: &[&str] = &["n/a", "na", "nan", ""];

/// Parse a delimited confounds table with a header row
///
/// The delimiter is a tab if the header contains one, a comma otherwise
/// (fMRIPrep writes `.tsv`). Fields may be quoted. Missing values (`n/a`,
/// `NaN`, empty fields) become `NaN`.
pub fn parse_table(content: &str) -> Result<ConfoundTable> {
    let header = content
        .lines()
        .find(|line| !line.trim().is_empty() && !line.starts_with('#'))
        .ok_or_else(|| CleanError::ParseError("table has no header row".to_string()))?;
    let delimiter = if header.contains('\t') { b'\t' } else { b',' };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(content.as_bytes());

    let names: Vec<String> = reader
        .headers()
        .map_err(table_error)?
        .iter()
        .map(String::from)
        .collect();

    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); names.len()];

    for record in reader.records() {
        let record = record.map_err(table_error)?;
        let line = record.position().map(|pos| pos.line()).unwrap_or(0);

        for (col_idx, field) in record.iter().enumerate() {
            let value = parse_value(field).ok_or_else(|| {
                CleanError::ParseError(format!(
                    "line {}, column '{}': '{}' is not a number",
                    line, names[col_idx], field
                ))
            })?;
            columns[col_idx].push(value);
        }
    }

    log::debug!(
        "Parsed confound table: {} columns × {} rows",
        names.len(),
        columns.first().map(|c| c.len()).unwrap_or(0)
    );

    ConfoundTable::new(names, columns)
}

/// Parse a headerless numeric matrix, one time sample per line
///
/// Values may be separated by whitespace, commas or tabs; `#` starts a
/// comment line.
pub fn parse_matrix(content: &str) -> Result<SignalMatrix> {
    let mut rows: Vec<Vec<f64>> = Vec::new();

    for (line_idx, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let row = trimmed
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|token| !token.is_empty())
            .map(|token| {
                token.parse::<f64>().map_err(|_| {
                    CleanError::ParseError(format!(
                        "line {}: '{}' is not a number",
                        line_idx + 1,
                        token
                    ))
                })
            })
            .collect::<Result<Vec<f64>>>()?;

        if let Some(first) = rows.first() {
            if first.len() != row.len() {
                return Err(CleanError::ParseError(format!(
                    "line {} has {} values, expected {}",
                    line_idx + 1,
                    row.len(),
                    first.len()
                )));
            }
        }
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(CleanError::ParseError("no data rows found".to_string()));
    }

    SignalMatrix::from_rows(rows)
}

pub fn read_table<P: AsRef<Path>>(path: P) -> Result<ConfoundTable> {
    let content = std::fs::read_to_string(path.as_ref())?;
    log::info!("Reading confound table {}", path.as_ref().display());
    parse_table(&content)
}

pub fn read_matrix<P: AsRef<Path>>(path: P) -> Result<SignalMatrix> {
    let content = std::fs::read_to_string(path.as_ref())?;
    log::info!("Reading signal matrix {}", path.as_ref().display());
    parse_matrix(&content)
}

fn table_error(err: csv::Error) -> CleanError {
    match err.kind() {
        csv::ErrorKind::UnequalLengths {
            pos,
            expected_len,
            len,
        } => CleanError::ParseError(format!(
            "line {} has {} fields, header has {}",
            pos.as_ref().map(|p| p.line()).unwrap_or(0),
            len,
            expected_len
        )),
        _ => CleanError::ParseError(err.to_string()),
    }
}

fn parse_value(field: &str) -> Option<f64> {
    let field = field.trim();
    if MISSING_TOKENS
        .iter()
        .any(|token| field.eq_ignore_ascii_case(token))
    {
        return Some(f64::NAN);
    }
    field.parse::<f64>().ok()
}
