//! `--testfile` generator: produces a file of pseudo-random fixed-pattern
//! lines for exercising the sorter. Grounded on `GenerateTestFile`
//! (`internal/testdata/generate.go`) and `cmd/genfile/main.go`: a pool of
//! worker threads each produce lines on a channel, consumed by a single
//! writer thread, which keeps disk writes single-threaded while record
//! generation is parallel.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::mpsc;
use std::thread;

use super::error::SortError;

const N_CHARS: usize = 25;
const SPACE_IDX: usize = 10;

/// Deterministic per-worker pseudo-random generator (xorshift64), seeded
/// from the worker id and record index so output is reproducible without
/// depending on a shared RNG across threads.
fn xorshift64(mut x: u64) -> u64 {
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    x
}

/// Build one line: a 4-digit zero-padded record number, then a run of
/// characters from a rotating alphabet with a blank inserted at
/// `SPACE_IDX`, repeated to vary line content across records.
fn generate_line(record_index: u64, worker_id: u64) -> String {
    let mut seed = record_index.wrapping_mul(2654435761).wrapping_add(worker_id);
    seed = xorshift64(seed.max(1));

    let mut line = format!("{:04}", record_index % 10_000);
    for i in 0..N_CHARS {
        if i == SPACE_IDX {
            line.push(' ');
            continue;
        }
        seed = xorshift64(seed);
        let c = (b'A' + (seed % 26) as u8) as char;
        line.push(c);
    }
    line
}

/// Generate `records` lines into `path`, one worker thread per hardware
/// core feeding a bounded channel to a single writer thread.
pub fn generate_test_file(path: &Path, records: u64) -> Result<(), SortError> {
    if records == 0 {
        return Err(SortError::Usage(
            "--testfile record count must be greater than zero".into(),
        ));
    }

    let workers = std::thread::available_parallelism()
        .map(|n| n.get() as u64)
        .unwrap_or(1)
        .min(records);

    let (tx, rx) = mpsc::sync_channel::<(u64, String)>(1024);
    let file = std::fs::File::create(path).map_err(|e| SortError::io("create testfile", path, e))?;

    let writer_path = path.to_path_buf();
    let writer_handle = thread::spawn(move || -> Result<(), SortError> {
        let mut writer = BufWriter::with_capacity(1 << 20, file);
        let mut pending: std::collections::BTreeMap<u64, String> = std::collections::BTreeMap::new();
        let mut next_to_write = 0u64;
        for (index, line) in rx {
            pending.insert(index, line);
            while let Some(line) = pending.remove(&next_to_write) {
                writer
                    .write_all(line.as_bytes())
                    .and_then(|_| writer.write_all(b"\n"))
                    .map_err(|e| SortError::io("write testfile", &writer_path, e))?;
                next_to_write += 1;
            }
        }
        writer
            .flush()
            .map_err(|e| SortError::io("flush testfile", &writer_path, e))
    });

    thread::scope(|scope| {
        for worker_id in 0..workers {
            let tx = tx.clone();
            scope.spawn(move || {
                let mut index = worker_id;
                while index < records {
                    let line = generate_line(index, worker_id);
                    if tx.send((index, line)).is_err() {
                        break;
                    }
                    index += workers;
                }
            });
        }
    });
    drop(tx);

    writer_handle
        .join()
        .map_err(|_| SortError::Resource("testfile writer thread panicked".into()))??;
    Ok(())
}
