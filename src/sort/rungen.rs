//! Run Generator (spec.md section 4.D).
//!
//! Partitions the input into batches of `records_per_run` records, sorts
//! each batch on the configured keys, and spills it to `temp_dir` as one
//! run file. A dedicated reader thread feeds batches to a `rayon` worker
//! pool through a `crossbeam_channel` bounded to `workers + 1` in-flight
//! batches, so a slow sort/write stage applies back-pressure to batch
//! dispatch instead of buffering the whole input in memory at once. The
//! reader runs outside the rayon pool specifically so it can't be starved
//! of a scheduling slot by the consumers it's feeding. Grounded on
//! `SplitFileAndSort` (`internal/sorting/sort.go`), which uses a
//! `runtime.NumCPU()`-sized semaphore channel and a `sync.Once`-guarded
//! first-error latch; the channel here plays both roles.

use std::path::PathBuf;
use std::sync::Mutex;

use crossbeam_channel::bounded;
use tracing::{debug, instrument};

use super::chunkio::ChunkWriter;
use super::compare::compare;
use super::config::Config;
use super::error::SortError;
use super::key::SortKey;

/// One-shot error latch: the first worker error wins, later errors are
/// dropped. Mirrors the Go original's `sync.Once`-guarded capture.
struct ErrorLatch {
    slot: Mutex<Option<SortError>>,
}

impl ErrorLatch {
    fn new() -> Self {
        ErrorLatch {
            slot: Mutex::new(None),
        }
    }

    fn set(&self, err: SortError) {
        let mut guard = self.slot.lock().unwrap();
        if guard.is_none() {
            *guard = Some(err);
        }
    }

    fn into_inner(self) -> Option<SortError> {
        self.slot.into_inner().unwrap()
    }
}

/// Sort and spill one batch of records to `temp_dir/run_<index>`.
fn sort_and_spill(
    index: usize,
    mut batch: Vec<&[u8]>,
    config: &Config,
    keys: &[SortKey],
    temp_dir: &std::path::Path,
) -> Result<PathBuf, SortError> {
    let mut sort_err: Option<SortError> = None;
    batch.sort_by(|a, b| {
        if sort_err.is_some() {
            return std::cmp::Ordering::Equal;
        }
        match compare(a, b, keys, &config.delimiter, config.truncate_spaces, config.empty_numeric) {
            Ok(ord) => ord,
            Err(e) => {
                sort_err = Some(e);
                std::cmp::Ordering::Equal
            }
        }
    });
    if let Some(e) = sort_err {
        return Err(e);
    }

    if config.remove_duplicates {
        batch.dedup_by(|a, b| {
            matches!(
                compare(a, b, keys, &config.delimiter, config.truncate_spaces, config.empty_numeric),
                Ok(std::cmp::Ordering::Equal)
            )
        });
    }

    let run_path = temp_dir.join(format!("run_{index:08}"));
    let mut writer = ChunkWriter::create(&run_path, config.newline)?;
    for record in &batch {
        if config.record_type == super::config::RecordType::Fixed {
            writer.write_fixed_record(record)?;
        } else {
            writer.write_record(record)?;
        }
    }
    writer.finish()
}

/// Partition `records` into batches of `records_per_run` and sort+spill
/// each one, using a bounded channel to cap in-flight batches.
#[instrument(skip(records, config, keys))]
pub fn generate_runs(
    records: Vec<&[u8]>,
    records_per_run: usize,
    config: &Config,
    keys: &[SortKey],
    temp_dir: &std::path::Path,
) -> Result<Vec<PathBuf>, SortError> {
    if records.is_empty() {
        return Ok(Vec::new());
    }

    let batches: Vec<Vec<&[u8]>> = records
        .chunks(records_per_run.max(1))
        .map(|c| c.to_vec())
        .collect();
    let total = batches.len();
    debug!(total_runs = total, records_per_run, "partitioned input into runs");

    let workers = rayon::current_num_threads().max(1);
    let (tx, rx) = bounded::<(usize, Vec<&[u8]>)>(workers + 1);
    let latch = ErrorLatch::new();

    let results = Mutex::new(vec![None; total]);

    // The producer runs on its own `std::thread`, not inside the `rayon`
    // scope below: a rayon scope only has as many worker slots as the pool
    // has threads, and spawning the reader as one more task in that same
    // scope means it competes with the `workers` consumer tasks for those
    // slots. On a pool sized at 1 (or any pool smaller than `workers + 1`
    // tasks), the reader can lose that race permanently and the consumers
    // starve on an `rx` that never receives -- a deadlock. A dedicated
    // thread is outside rayon's scheduling entirely, so it always runs
    // concurrently with the worker pool regardless of pool size.
    // `std::thread::scope` (not `thread::spawn`) because `batches` borrows
    // from `records`, which is not `'static`.
    std::thread::scope(|scope| {
        scope.spawn(|| {
            for (i, batch) in batches.into_iter().enumerate() {
                if tx.send((i, batch)).is_err() {
                    break;
                }
            }
            drop(tx);
        });

        rayon::scope(|rayon_scope| {
            for _ in 0..workers {
                let rx = rx.clone();
                let results = &results;
                let latch = &latch;
                rayon_scope.spawn(move |_| {
                    while let Ok((index, batch)) = rx.recv() {
                        match sort_and_spill(index, batch, config, keys, temp_dir) {
                            Ok(path) => {
                                results.lock().unwrap()[index] = Some(path);
                            }
                            Err(e) => latch.set(e),
                        }
                    }
                });
            }
        });
    });

    if let Some(e) = latch.into_inner() {
        return Err(e);
    }

    let results = results.into_inner().unwrap();
    results
        .into_iter()
        .map(|opt| opt.ok_or_else(|| SortError::Resource("run generation incomplete".to_string())))
        .collect()
}
