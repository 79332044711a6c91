//! Top-level orchestration (spec.md section 2/5): planner -> run generation
//! -> cascaded merge. Grounded on `cmd/xmsort/main.go`'s orchestration
//! order (stat input, estimate average record length, compute chunk size,
//! make temp dir, split+sort, merge, clean up temp dir), translated into a
//! single `run(&Config)` entry point shared by both binaries.

use tempfile::TempDir;
use tracing::{info, instrument};

use super::cascade::cascade_merge;
use super::chunkio::{estimate_avg_record_len, fixed_record_storage_width, InputSource};
use super::config::{Config, RecordType};
use super::error::SortError;
use super::planner::{memory_budget_bytes, records_per_run};
use super::rungen::generate_runs;

#[instrument(skip(config), fields(input = %config.input.display(), output = %config.output.display()))]
pub fn run(config: &Config) -> Result<(), SortError> {
    if !config.input.exists() {
        return Err(SortError::InputMissing {
            path: config.input.clone(),
        });
    }

    let temp_dir = match &config.temp_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|e| SortError::io("create temp dir", dir, e))?;
            TempDir::new_in(dir).map_err(|e| SortError::io("create temp dir", dir, e))?
        }
        None => TempDir::new().map_err(|e| SortError::io("create temp dir", "/tmp", e))?,
    };

    info!(path = %temp_dir.path().display(), "temp directory ready");

    let source = InputSource::open(&config.input)?;
    let avg_len = estimate_avg_record_len(&source, config.record_type, config.record_length);
    let budget = memory_budget_bytes(config.memory_budget)?;
    let n = records_per_run(budget, avg_len.max(1));

    info!(avg_record_len = avg_len, budget_bytes = budget, records_per_run = n, "memory plan computed");

    let records = source.records(config.record_type, config.record_length);
    let total_records = records.len();
    let keys = config.effective_keys();

    // Run/intermediate files store each fixed-mode record at its trimmed
    // width, not the raw `record_length` read from the input (see
    // `chunkio::fixed_record_storage_width`). Everything downstream of the
    // initial input split -- run generation's writer and every merge level's
    // reader -- must agree on that narrower width, so it is resolved once
    // here and carried in a config clone rather than recomputed per stage.
    let mut stage_config = config.clone();
    if config.record_type == RecordType::Fixed {
        stage_config.record_length =
            fixed_record_storage_width(&source, config.record_length);
    }

    let runs = generate_runs(records, n, &stage_config, &keys, temp_dir.path())?;
    info!(runs = runs.len(), total_records, "run generation complete");

    if let Some(parent) = config.output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SortError::io("create output dir", parent, e))?;
        }
    }

    cascade_merge(runs, &config.output, &stage_config, &keys, temp_dir.path())?;
    info!("sort complete");
    Ok(())
}
