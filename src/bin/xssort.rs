//! `xssort`: legacy `KEY=VALUE` parameter-block CLI front end.
//!
//! Grounded on `cmd/xmsort/main.go`'s orchestration: argv is joined into a
//! single comma-separated parameter block and parsed as a whole
//! (`internal/config/config.go`'s `ParseXSSortParams`) rather than parsed
//! flag-by-flag the way `clap` does for `xsort`.

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use xsort::sort::legacy::{extract_testfile_count, extract_token, parse_legacy_params};
use xsort::sort::pipeline;
use xsort::sort::testfile;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> ExitCode {
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!(
            "usage: xssort I=<input>,O=<output>,RT=V|F,RL=<n>,S1=(p=1-10,g=N,v=ASC),... | xssort TF=<n>,O=<file>"
        );
        return ExitCode::from(1);
    }

    if let Some(records) = extract_testfile_count(&args) {
        let output = match extract_token(&args, "O=") {
            Some(p) => p,
            None => {
                eprintln!("xssort: TF= requires O=<file>");
                return ExitCode::from(1);
            }
        };
        return match testfile::generate_test_file(std::path::Path::new(&output), records) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("xssort: {e}");
                ExitCode::from(e.exit_code() as u8)
            }
        };
    }

    let config = match parse_legacy_params(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("xssort: {e}");
            return ExitCode::from(e.exit_code() as u8);
        }
    };

    match pipeline::run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("xssort: {e}");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
