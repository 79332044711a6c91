//! Record I/O: input framing, average-length sampling, and run/merge output.
//!
//! Variable-length records are LF-terminated with optional CR-before-LF
//! stripping (CRLF input is accepted transparently); fixed-length records
//! are exact `record_length`-byte slices with a short trailing remainder
//! dropped. Input is memory-mapped when possible, falling back to a heap
//! read. Output goes through a `.tmp` write-then-rename so a crash never
//! leaves a half-written file at its final name (see DESIGN.md).

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use memchr::memchr_iter;
use memmap2::Mmap;

use super::config::{Newline, RecordType};
use super::error::SortError;

/// How many records to sample when estimating average record length.
const SAMPLE_RECORDS: usize = 100;

/// Owns the memory-mapped (or heap-loaded) bytes of the input file and
/// yields record slices from it without copying.
pub enum InputSource {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl InputSource {
    pub fn open(path: &Path) -> Result<Self, SortError> {
        let file = File::open(path).map_err(|e| SortError::io("open input", path, e))?;
        let meta = file
            .metadata()
            .map_err(|e| SortError::io("stat input", path, e))?;
        if meta.len() == 0 {
            return Ok(InputSource::Owned(Vec::new()));
        }
        // SAFETY: the input file is not expected to be concurrently
        // truncated or modified while this process holds it mapped.
        match unsafe { Mmap::map(&file) } {
            Ok(mmap) => Ok(InputSource::Mapped(mmap)),
            Err(_) => {
                let bytes = fs::read(path).map_err(|e| SortError::io("read input", path, e))?;
                Ok(InputSource::Owned(bytes))
            }
        }
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            InputSource::Mapped(m) => &m[..],
            InputSource::Owned(v) => &v[..],
        }
    }

    /// Iterate record slices per `record_type`, terminators stripped.
    pub fn records(&self, record_type: RecordType, record_length: usize) -> Vec<&[u8]> {
        match record_type {
            RecordType::Variable => split_variable_records(self.bytes()),
            RecordType::Fixed => split_fixed_records(self.bytes(), record_length),
        }
    }
}

/// Split on `\n`, stripping a preceding `\r` when present. A trailing
/// record with no terminator is kept (last line without a final newline).
pub fn split_variable_records(data: &[u8]) -> Vec<&[u8]> {
    if data.is_empty() {
        return Vec::new();
    }
    let mut records = Vec::new();
    let mut start = 0usize;
    for pos in memchr_iter(b'\n', data) {
        let mut end = pos;
        if end > start && data[end - 1] == b'\r' {
            end -= 1;
        }
        records.push(&data[start..end]);
        start = pos + 1;
    }
    if start < data.len() {
        records.push(&data[start..]);
    }
    records
}

/// Strip a single trailing `\n`, optionally preceded by `\r`, from a fixed
/// record slice (spec.md section 3: "trailing CR/LF bytes trimmed from
/// memory copy if present").
pub fn trim_trailing_eol(record: &[u8]) -> &[u8] {
    let record = record.strip_suffix(b"\n").unwrap_or(record);
    record.strip_suffix(b"\r").unwrap_or(record)
}

/// Split into exact `record_length`-byte slices. A short final remainder
/// (fewer than `record_length` bytes) is dropped. Each slice has a
/// trailing CR/LF stripped, if present, before it is handed to the rest of
/// the pipeline as a record.
pub fn split_fixed_records(data: &[u8], record_length: usize) -> Vec<&[u8]> {
    if record_length == 0 {
        return Vec::new();
    }
    data.chunks_exact(record_length)
        .map(trim_trailing_eol)
        .collect()
}

/// Width, in bytes, that a fixed-mode record occupies once spilled to a run
/// or intermediate file. `split_fixed_records` trims a trailing CR/LF off
/// the in-memory copy of each `record_length`-byte input block, and that
/// trimmed copy -- not the original `record_length` bytes -- is what
/// `ChunkWriter::write_fixed_record` writes back out. Every later stage that
/// reads a run/intermediate file fixed-stride (`RunReader::Fixed`) must use
/// this width, not the raw `record_length`, or reads drift out of alignment
/// the moment a file has gone through one write/read cycle. Derived from the
/// first record in the input; the trim amount is assumed uniform across a
/// well-formed fixed-width file.
pub fn fixed_record_storage_width(source: &InputSource, record_length: usize) -> usize {
    if record_length == 0 {
        return 0;
    }
    match source.bytes().chunks_exact(record_length).next() {
        Some(chunk) => trim_trailing_eol(chunk).len(),
        None => record_length,
    }
}

/// Sample up to `SAMPLE_RECORDS` records and return their mean length in
/// bytes (excluding the terminator).
pub fn estimate_avg_record_len(
    source: &InputSource,
    record_type: RecordType,
    record_length: usize,
) -> usize {
    match record_type {
        RecordType::Fixed => record_length,
        RecordType::Variable => {
            let data = source.bytes();
            let mut total = 0usize;
            let mut count = 0usize;
            let mut start = 0usize;
            for pos in memchr_iter(b'\n', data) {
                if count >= SAMPLE_RECORDS {
                    break;
                }
                let mut end = pos;
                if end > start && data[end - 1] == b'\r' {
                    end -= 1;
                }
                total += end - start;
                count += 1;
                start = pos + 1;
            }
            if count == 0 {
                0
            } else {
                total / count
            }
        }
    }
}

/// Rename `from` to `to`, falling back to copy+delete when the two paths
/// live on different filesystems (spec.md section 4.F: rename is atomic on
/// the same filesystem; cross-device moves can't be atomic, so a plain copy
/// is the best available substitute).
pub fn rename_or_copy(from: &Path, to: &Path) -> std::io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::CrossesDevices => {
            fs::copy(from, to)?;
            fs::remove_file(from)?;
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Buffered writer for a run's or a merge level's sorted output. Writes to
/// `<final_path>.tmp` and renames onto `final_path` only once every record
/// has been written and flushed, so a failure never leaves a partial file
/// visible at the destination name.
pub struct ChunkWriter {
    tmp_path: PathBuf,
    final_path: PathBuf,
    writer: BufWriter<File>,
    newline: &'static [u8],
}

impl ChunkWriter {
    pub fn create(final_path: impl Into<PathBuf>, newline: Newline) -> Result<Self, SortError> {
        let final_path = final_path.into();
        let mut tmp_path = final_path.clone();
        let mut file_name = tmp_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        file_name.push(".tmp");
        tmp_path.set_file_name(file_name);

        let file =
            File::create(&tmp_path).map_err(|e| SortError::io("create chunk", &tmp_path, e))?;
        Ok(ChunkWriter {
            tmp_path,
            final_path,
            writer: BufWriter::with_capacity(1 << 20, file),
            newline: newline.bytes(),
        })
    }

    pub fn write_record(&mut self, record: &[u8]) -> Result<(), SortError> {
        self.writer
            .write_all(record)
            .and_then(|_| self.writer.write_all(self.newline))
            .map_err(|e| SortError::io("write chunk", &self.tmp_path, e))
    }

    pub fn write_fixed_record(&mut self, record: &[u8]) -> Result<(), SortError> {
        self.writer
            .write_all(record)
            .map_err(|e| SortError::io("write chunk", &self.tmp_path, e))
    }

    /// Flush, close, and rename into place. Consumes `self` so a
    /// half-finished writer can never be forgotten before committing.
    pub fn finish(mut self) -> Result<PathBuf, SortError> {
        self.writer
            .flush()
            .map_err(|e| SortError::io("flush chunk", &self.tmp_path, e))?;
        drop(self.writer);
        fs::rename(&self.tmp_path, &self.final_path)
            .map_err(|e| SortError::io("rename chunk", &self.final_path, e))?;
        Ok(self.final_path)
    }
}
