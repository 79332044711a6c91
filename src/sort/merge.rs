//! Bounded-fan-in k-way merge.
//!
//! Merges at most `config.fan_in` already-sorted run files into one sorted
//! output using a binary min-heap, one `RunReader` per input, the usual
//! `BinaryHeap<Reverse<_>>` shape for an n-way merge.
//!
//! Comparator errors (an `EmptyNumeric` policy violation) are only possible
//! here if they were missed during run generation's own sort pass over the
//! same records; in practice run generation already surfaces that error
//! first, so the heap ordering treats a comparison failure as `Equal` and
//! relies on the earlier stage to have already rejected bad input.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::chunkio::{rename_or_copy, trim_trailing_eol, ChunkWriter};
use super::compare::{compare, EmptyNumericPolicy};
use super::config::{Config, RecordType};
use super::error::SortError;
use super::key::SortKey;

/// Reads records one at a time from a single run file.
enum RunReader {
    Variable(BufReader<File>),
    Fixed(BufReader<File>, usize),
}

impl RunReader {
    fn open(path: &Path, record_type: RecordType, record_length: usize) -> Result<Self, SortError> {
        let file = File::open(path).map_err(|e| SortError::io("open run", path, e))?;
        Ok(match record_type {
            RecordType::Variable => RunReader::Variable(BufReader::with_capacity(1 << 16, file)),
            RecordType::Fixed => {
                RunReader::Fixed(BufReader::with_capacity(1 << 16, file), record_length)
            }
        })
    }

    fn next_record(&mut self) -> Result<Option<Vec<u8>>, SortError> {
        match self {
            RunReader::Variable(reader) => {
                let mut buf = Vec::new();
                let n = reader
                    .read_until(b'\n', &mut buf)
                    .map_err(|e| SortError::io("read run", Path::new("<run>"), e))?;
                if n == 0 {
                    return Ok(None);
                }
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                    if buf.last() == Some(&b'\r') {
                        buf.pop();
                    }
                }
                Ok(Some(buf))
            }
            RunReader::Fixed(reader, len) => {
                let mut buf = vec![0u8; *len];
                match reader.read_exact(&mut buf) {
                    // `len` is already the post-trim storage width (see
                    // `chunkio::fixed_record_storage_width`), so this trim is
                    // a no-op in the common case; kept so a record straight
                    // off the original input's exact `record_length` never
                    // leaks a trailing CR/LF into a comparison.
                    Ok(()) => Ok(Some(trim_trailing_eol(&buf).to_vec())),
                    Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
                    Err(e) => Err(SortError::io("read run", Path::new("<run>"), e)),
                }
            }
        }
    }
}

/// Comparator context shared (via `Arc`) by every entry in the heap, so
/// ordering a pair of entries never needs to copy the key list.
struct MergeContext {
    keys: Vec<SortKey>,
    delimiter: Vec<u8>,
    trim: bool,
    empty_numeric: EmptyNumericPolicy,
}

struct HeapEntry {
    record: Vec<u8>,
    source: usize,
    ctx: Arc<MergeContext>,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        let ord = compare(
            &self.record,
            &other.record,
            &self.ctx.keys,
            &self.ctx.delimiter,
            self.ctx.trim,
            self.ctx.empty_numeric,
        )
        .unwrap_or(Ordering::Equal);
        ord.then_with(|| self.source.cmp(&other.source))
    }
}

/// Merge `inputs` (each individually sorted) into `output_path`. Returns
/// the output path on success; deletes every consumed input file.
pub fn merge_streams(
    inputs: &[PathBuf],
    output_path: &Path,
    config: &Config,
    keys: &[SortKey],
) -> Result<PathBuf, SortError> {
    if inputs.is_empty() {
        let writer = ChunkWriter::create(output_path, config.newline)?;
        return writer.finish();
    }
    if inputs.len() == 1 {
        rename_or_copy(&inputs[0], output_path)
            .map_err(|e| SortError::io("rename single run", output_path, e))?;
        return Ok(output_path.to_path_buf());
    }

    let mut readers: Vec<RunReader> = inputs
        .iter()
        .map(|p| RunReader::open(p, config.record_type, config.record_length))
        .collect::<Result<_, _>>()?;

    let ctx = Arc::new(MergeContext {
        keys: keys.to_vec(),
        delimiter: config.delimiter.clone(),
        trim: config.truncate_spaces,
        empty_numeric: config.empty_numeric,
    });

    let mut heap: BinaryHeap<Reverse<HeapEntry>> = BinaryHeap::with_capacity(readers.len());
    for (i, reader) in readers.iter_mut().enumerate() {
        if let Some(record) = reader.next_record()? {
            heap.push(Reverse(HeapEntry {
                record,
                source: i,
                ctx: ctx.clone(),
            }));
        }
    }

    let mut writer = ChunkWriter::create(output_path, config.newline)?;
    let mut last_emitted: Option<Vec<u8>> = None;

    while let Some(Reverse(entry)) = heap.pop() {
        let emit = !config.remove_duplicates
            || match &last_emitted {
                None => true,
                Some(prev) => !matches!(
                    compare(
                        prev,
                        &entry.record,
                        &ctx.keys,
                        &ctx.delimiter,
                        ctx.trim,
                        ctx.empty_numeric
                    ),
                    Ok(Ordering::Equal)
                ),
            };

        if emit {
            if config.record_type == RecordType::Fixed {
                writer.write_fixed_record(&entry.record)?;
            } else {
                writer.write_record(&entry.record)?;
            }
            last_emitted = Some(entry.record.clone());
        }

        if let Some(next) = readers[entry.source].next_record()? {
            heap.push(Reverse(HeapEntry {
                record: next,
                source: entry.source,
                ctx: ctx.clone(),
            }));
        }
    }

    let result = writer.finish()?;
    drop(readers);
    for input in inputs {
        let _ = fs::remove_file(input);
    }
    Ok(result)
}

/// Convenience alias matching spec terminology (spec.md section 4.F).
pub fn k_way_merge(
    inputs: &[PathBuf],
    output_path: &Path,
    config: &Config,
    keys: &[SortKey],
) -> Result<PathBuf, SortError> {
    merge_streams(inputs, output_path, config, keys)
}
