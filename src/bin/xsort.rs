//! `xsort`: long-flag CLI front end for the external sorter.
//!
//! One `clap` derive struct mapped straight onto a `Config` value, built
//! in `main`, supporting both fixed-width and delimited multi-key records.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use xsort::sort::compare::EmptyNumericPolicy;
use xsort::sort::config::{Config, Newline, RecordType};
use xsort::sort::error::SortError;
use xsort::sort::key::SortKey;
use xsort::sort::pipeline;
use xsort::sort::testfile;

/// External (out-of-core) sort for line-oriented and fixed-width files.
#[derive(Parser, Debug)]
#[command(name = "xsort", version, about)]
struct Cli {
    /// Input file to sort.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Destination for the sorted output.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Byte-range sort key: "START,LENGTH,NUMERIC,ASC" (0-based start,
    /// length 0 = to end, NUMERIC/ASC each "true"/"false"). Repeatable;
    /// applies when no delimiter is configured.
    #[arg(long = "sortkey")]
    sort_keys: Vec<String>,

    /// Delimited-column sort key: "FIELD,NUMERIC,ASC" (0-based column
    /// index). Repeatable; applies when a delimiter is configured.
    #[arg(long = "keyfield")]
    key_fields: Vec<String>,

    /// Column delimiter. Byte-wise keys are used when absent.
    #[arg(long)]
    delimiter: Option<String>,

    /// "variable" (terminator-delimited) or "fixed" (exact-width) records.
    #[arg(long = "record-type", default_value = "variable")]
    record_type: String,

    /// Record width in bytes, required when --record-type=fixed.
    #[arg(long = "record-length", default_value_t = 0)]
    record_length: usize,

    /// Trim leading/trailing ASCII whitespace from extracted key fields.
    #[arg(long = "truncate-spaces")]
    truncate_spaces: bool,

    /// Drop records that compare equal under the configured keys.
    #[arg(long = "remove-duplicates")]
    remove_duplicates: bool,

    /// "zero" (default) or "error" for an empty field under a numeric key.
    #[arg(long = "empty-numeric", default_value = "zero")]
    empty_numeric: String,

    /// Memory budget for one in-memory run, e.g. "512M", "2G". Derived from
    /// host memory when absent.
    #[arg(long)]
    memory: Option<String>,

    /// Max number of runs merged per cascade level.
    #[arg(long = "fan-in", default_value_t = xsort::sort::config::DEFAULT_FAN_IN)]
    fan_in: usize,

    /// Directory for intermediate run/merge files.
    #[arg(long = "temp-dir")]
    temp_dir: Option<PathBuf>,

    /// Output line terminator: "lf", "crlf", or "native".
    #[arg(long, default_value = "lf")]
    newline: String,

    /// Generate a test file with this many records instead of sorting, and
    /// exit. `--output` names the generated file.
    #[arg(long = "testfile")]
    testfile: Option<u64>,

    #[arg(short, long)]
    verbose: bool,

    /// Emit run/merge progress as info-level log lines.
    #[arg(long)]
    progress: bool,
}

fn parse_memory_flag(s: &str) -> Result<u64, SortError> {
    let s = s.trim();
    let upper = s.to_ascii_uppercase();
    let (digits, mult) = if let Some(d) = upper.strip_suffix('G') {
        (d, 1024u64 * 1024 * 1024)
    } else if let Some(d) = upper.strip_suffix('M') {
        (d, 1024u64 * 1024)
    } else if let Some(d) = upper.strip_suffix('K') {
        (d, 1024u64)
    } else {
        (upper.as_str(), 1u64)
    };
    digits
        .parse::<u64>()
        .map(|n| n * mult)
        .map_err(|_| SortError::Usage(format!("invalid --memory value: {s}")))
}

fn parse_bool_field(spec: &str, field: &str, name: &str) -> Result<bool, SortError> {
    match field.to_ascii_uppercase().as_str() {
        "TRUE" | "Y" | "1" => Ok(true),
        "FALSE" | "N" | "0" => Ok(false),
        other => Err(SortError::Usage(format!(
            "invalid {name} field '{other}' in: {spec}"
        ))),
    }
}

/// "START,LENGTH,NUMERIC,ASC" (spec.md section 6).
fn parse_byte_range_key(spec: &str) -> Result<SortKey, SortError> {
    let parts: Vec<&str> = spec.split(',').collect();
    if parts.len() != 4 {
        return Err(SortError::Usage(format!(
            "--sortkey expects START,LENGTH,NUMERIC,ASC, got: {spec}"
        )));
    }
    let start: usize = parts[0]
        .parse()
        .map_err(|_| SortError::Usage(format!("invalid --sortkey start: {spec}")))?;
    let length: usize = parts[1]
        .parse()
        .map_err(|_| SortError::Usage(format!("invalid --sortkey length: {spec}")))?;
    let numeric = parse_bool_field(spec, parts[2], "NUMERIC")?;
    let ascending = parse_bool_field(spec, parts[3], "ASC")?;
    Ok(SortKey::new(start, length, numeric, ascending))
}

/// "FIELD,NUMERIC,ASC" (spec.md section 6).
fn parse_field_key(spec: &str) -> Result<SortKey, SortError> {
    let parts: Vec<&str> = spec.split(',').collect();
    if parts.len() != 3 {
        return Err(SortError::Usage(format!(
            "--keyfield expects FIELD,NUMERIC,ASC, got: {spec}"
        )));
    }
    let field: usize = parts[0]
        .parse()
        .map_err(|_| SortError::Usage(format!("invalid --keyfield index: {spec}")))?;
    let numeric = parse_bool_field(spec, parts[1], "NUMERIC")?;
    let ascending = parse_bool_field(spec, parts[2], "ASC")?;
    Ok(SortKey::new(field, 0, numeric, ascending))
}

fn build_config(cli: Cli) -> Result<Config, SortError> {
    let input = cli
        .input
        .ok_or_else(|| SortError::Usage("--input is required".into()))?;
    let output = cli
        .output
        .ok_or_else(|| SortError::Usage("--output is required".into()))?;

    let record_type = match cli.record_type.to_ascii_lowercase().as_str() {
        "variable" => RecordType::Variable,
        "fixed" => RecordType::Fixed,
        other => return Err(SortError::Usage(format!("invalid --record-type: {other}"))),
    };
    if record_type == RecordType::Fixed && cli.record_length == 0 {
        return Err(SortError::Usage(
            "--record-type=fixed requires --record-length".into(),
        ));
    }

    let delimiter = cli.delimiter.clone().unwrap_or_default().into_bytes();

    let keys: Vec<SortKey> = if !delimiter.is_empty() {
        cli.key_fields
            .iter()
            .map(|s| parse_field_key(s))
            .collect::<Result<_, _>>()?
    } else {
        cli.sort_keys
            .iter()
            .map(|s| parse_byte_range_key(s))
            .collect::<Result<_, _>>()?
    };

    let empty_numeric = match cli.empty_numeric.to_ascii_lowercase().as_str() {
        "zero" => EmptyNumericPolicy::Zero,
        "error" => EmptyNumericPolicy::Error,
        other => return Err(SortError::Usage(format!("invalid --empty-numeric: {other}"))),
    };

    let newline = match cli.newline.to_ascii_lowercase().as_str() {
        "lf" => Newline::Lf,
        "crlf" => Newline::Crlf,
        "native" => Newline::Native,
        other => return Err(SortError::Usage(format!("invalid --newline: {other}"))),
    };

    let memory_budget = cli.memory.as_deref().map(parse_memory_flag).transpose()?;

    let mut config = Config::new(input, output);
    config.temp_dir = cli.temp_dir;
    config.record_type = record_type;
    config.record_length = cli.record_length;
    config.keys = keys;
    config.delimiter = delimiter;
    config.truncate_spaces = cli.truncate_spaces;
    config.remove_duplicates = cli.remove_duplicates;
    config.empty_numeric = empty_numeric;
    config.memory_budget = memory_budget;
    config.fan_in = cli.fan_in.max(2);
    config.newline = newline;
    config.verbose = cli.verbose;
    config.progress = cli.progress;

    Ok(config)
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Some(records) = cli.testfile {
        let output = match &cli.output {
            Some(p) => p.clone(),
            None => {
                eprintln!("xsort: --testfile requires --output");
                return ExitCode::from(1);
            }
        };
        return match testfile::generate_test_file(&output, records) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("xsort: {e}");
                ExitCode::from(e.exit_code() as u8)
            }
        };
    }

    let config = match build_config(cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("xsort: {e}");
            return ExitCode::from(e.exit_code() as u8);
        }
    };

    match pipeline::run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("xsort: {e}");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
