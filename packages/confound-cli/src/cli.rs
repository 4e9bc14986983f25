use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use confound_rs::{HrfModel, Standardize};

#[derive(Parser)]
#[command(
    name = "confound",
    version,
    about = "fMRI confound regression and signal cleaning",
    long_about = "Clean fMRI time series: detrending, high-pass filtering, nuisance\n\
                  regression and motion censoring in one least-squares step, with\n\
                  optional percent signal change or z-score output."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Command {
    /// Clean a signal file against an optional confounds table
    Clean(CleanArgs),
    /// Show which volumes a displacement threshold would censor
    Censor(CensorArgs),
    /// Convolve an event series with a hemodynamic response kernel
    Convolve(ConvolveArgs),
    /// List the columns of a confounds table
    Columns(ColumnsArgs),
    /// Check that signal and confound files parse and line up
    Validate(ValidateArgs),
    /// Clean many signal files in parallel
    Batch(BatchArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StandardizeArg {
    Off,
    Psc,
    Zscore,
}

impl From<StandardizeArg> for Standardize {
    fn from(arg: StandardizeArg) -> Self {
        match arg {
            StandardizeArg::Off => Standardize::Off,
            StandardizeArg::Psc => Standardize::Psc,
            StandardizeArg::Zscore => Standardize::Zscore,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum HrfArg {
    Spm,
    Glover,
}

impl From<HrfArg> for HrfModel {
    fn from(arg: HrfArg) -> Self {
        match arg {
            HrfArg::Spm => HrfModel::Spm,
            HrfArg::Glover => HrfModel::Glover,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// JSON report with the cleaned matrix and run metadata
    Json,
    /// Headerless tab-separated matrix, one sample per line
    Tsv,
}

/// Temporal filtering and standardization
#[derive(Args, Clone)]
pub struct FilterArgs {
    /// Repetition time in seconds
    #[arg(long, value_parser = parse_positive, required_unless_present = "config")]
    pub tr: Option<f64>,

    /// High-pass cutoff in Hz (decimal or fraction, e.g. 0.008 or 1/128)
    #[arg(long, value_parser = parse_frequency)]
    pub high_pass: Option<f64>,

    /// Do not remove polynomial trends
    #[arg(long, default_value_t = false)]
    pub no_detrend: bool,

    /// Highest polynomial trend degree removed [default: 1]
    #[arg(long)]
    pub detrend_order: Option<usize>,

    /// Rescale the cleaned signal [default: off]
    #[arg(long, value_enum)]
    pub standardize: Option<StandardizeArg>,

    /// JSON cleaning configuration (replaces the filter and confound flags)
    #[arg(
        long,
        conflicts_with_all = [
            "tr", "high_pass", "no_detrend", "detrend_order", "standardize",
            "columns", "derivatives", "squares", "fd_threshold",
        ]
    )]
    pub config: Option<String>,
}

/// Confound selection and motion censoring
#[derive(Args, Clone)]
pub struct ConfoundArgs {
    /// Confound columns to regress out (space or comma separated)
    #[arg(long, num_args = 1.., value_delimiter = ',')]
    pub columns: Vec<String>,

    /// Use the six rigid-body motion parameters (added before --columns)
    #[arg(long, default_value_t = false)]
    pub motion: bool,

    /// Add temporal derivatives of the selected columns
    #[arg(long, default_value_t = false)]
    pub derivatives: bool,

    /// Add squares of the selected columns (and of their derivatives)
    #[arg(long, default_value_t = false)]
    pub squares: bool,

    /// Replacement for missing (n/a) confound values
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub fill_value: f64,

    /// Censor volumes whose displacement exceeds this value
    #[arg(long, value_parser = parse_positive)]
    pub fd_threshold: Option<f64>,

    #[command(flatten)]
    pub displacement: DisplacementArgs,

    /// Also censor this many volumes before each flagged volume
    #[arg(long, default_value_t = 0)]
    pub censor_before: usize,

    /// Also censor this many volumes after each flagged volume
    #[arg(long, default_value_t = 0)]
    pub censor_after: usize,
}

/// Where per-volume displacement comes from
#[derive(Args, Clone)]
pub struct DisplacementArgs {
    /// Confounds column holding framewise displacement
    #[arg(long, default_value = "framewise_displacement")]
    pub fd_column: String,

    /// Compute framewise displacement from the motion parameters instead
    #[arg(long, default_value_t = false, conflicts_with = "fd_column")]
    pub fd_from_motion: bool,

    /// Head radius in mm for converting rotations to displacement
    #[arg(long, default_value_t = confound_rs::DEFAULT_HEAD_RADIUS_MM, value_parser = parse_positive)]
    pub head_radius: f64,
}

#[derive(Args)]
pub struct CleanArgs {
    /// Signal file: headerless numeric text, one sample per line
    #[arg(long)]
    pub signal: String,

    /// Confounds table (TSV/CSV with header)
    #[arg(long)]
    pub confounds: Option<String>,

    #[command(flatten)]
    pub filter: FilterArgs,

    #[command(flatten)]
    pub confound: ConfoundArgs,

    /// Output file (default: stdout)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Compact JSON output (no indentation)
    #[arg(long, default_value_t = false)]
    pub compact: bool,

    /// Suppress progress messages on stderr
    #[arg(long, default_value_t = false)]
    pub quiet: bool,
}

#[derive(Args)]
pub struct CensorArgs {
    /// Confounds table (TSV/CSV with header)
    #[arg(long)]
    pub confounds: String,

    /// Censor volumes whose displacement exceeds this value
    #[arg(long, value_parser = parse_positive)]
    pub threshold: f64,

    #[command(flatten)]
    pub displacement: DisplacementArgs,

    /// Also censor this many volumes before each flagged volume
    #[arg(long, default_value_t = 0)]
    pub before: usize,

    /// Also censor this many volumes after each flagged volume
    #[arg(long, default_value_t = 0)]
    pub after: usize,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args)]
#[command(group(ArgGroup::new("input").required(true).args(["events", "events_table"])))]
#[command(group(ArgGroup::new("response").required(true).args(["kernel", "hrf"])))]
pub struct ConvolveArgs {
    /// Event series: one value per line, sampled once per scan
    #[arg(long)]
    pub events: Option<String>,

    /// Events table with onset and duration columns in seconds
    /// (optional amplitude column)
    #[arg(long, requires = "n_scans", requires = "tr")]
    pub events_table: Option<String>,

    /// Number of scans in the run, for --events-table
    #[arg(long)]
    pub n_scans: Option<usize>,

    /// Kernel file: one value per line
    #[arg(long)]
    pub kernel: Option<String>,

    /// Canonical hemodynamic response kernel
    #[arg(long, value_enum, requires = "tr")]
    pub hrf: Option<HrfArg>,

    /// Repetition time in seconds
    #[arg(long, env = "CONFOUND_TR", value_parser = parse_positive)]
    pub tr: Option<f64>,

    /// Keep the full convolution instead of truncating to the event length
    #[arg(long, default_value_t = false)]
    pub full: bool,

    /// Output file (default: stdout)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Compact JSON output (no indentation)
    #[arg(long, default_value_t = false)]
    pub compact: bool,
}

#[derive(Args)]
pub struct ColumnsArgs {
    /// Confounds table (TSV/CSV with header)
    #[arg(long)]
    pub confounds: String,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Signal file
    #[arg(long)]
    pub signal: String,

    /// Confounds table to check against the signal
    #[arg(long)]
    pub confounds: Option<String>,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Clone)]
#[command(group(ArgGroup::new("inputs").required(true).args(["glob", "files"])))]
pub struct BatchArgs {
    /// Glob pattern selecting signal files (e.g. "data/*_bold.txt")
    #[arg(long)]
    pub glob: Option<String>,

    /// Explicit list of signal files
    #[arg(long, num_args = 1..)]
    pub files: Option<Vec<String>>,

    /// Confounds path per signal file; "{stem}" is replaced by the signal
    /// file name without extension
    #[arg(long)]
    pub confounds_template: Option<String>,

    #[command(flatten)]
    pub filter: FilterArgs,

    #[command(flatten)]
    pub confound: ConfoundArgs,

    /// Directory for per-file results (default: JSON lines on stdout)
    #[arg(long)]
    pub output_dir: Option<String>,

    /// Output format for files in --output-dir
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Worker threads (default: one per core)
    #[arg(long)]
    pub jobs: Option<usize>,

    /// Keep processing after a file fails
    #[arg(long, default_value_t = false)]
    pub continue_on_error: bool,

    /// List the files and their confounds without processing them
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// Compact JSON output (no indentation)
    #[arg(long, default_value_t = false)]
    pub compact: bool,

    /// Suppress progress messages on stderr
    #[arg(long, default_value_t = false)]
    pub quiet: bool,
}

/// Parse a strictly positive, finite number.
pub fn parse_positive(s: &str) -> Result<f64, String> {
    let value = s
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("'{}' is not a number", s))?;
    if !value.is_finite() || value <= 0.0 {
        return Err(format!("'{}' must be a positive number", s));
    }
    Ok(value)
}

/// Parse a frequency given as a decimal ("0.008") or a fraction ("1/128").
pub fn parse_frequency(s: &str) -> Result<f64, String> {
    match s.split_once('/') {
        Some((num, den)) => {
            let num = parse_positive(num)
                .map_err(|_| format!("Invalid frequency '{}': bad numerator", s))?;
            let den = parse_positive(den)
                .map_err(|_| format!("Invalid frequency '{}': bad denominator", s))?;
            Ok(num / den)
        }
        None => parse_positive(s),
    }
}
