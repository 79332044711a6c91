//! Run configuration (spec.md section 3).
//!
//! `Config` is the single value threaded through `pipeline::run` -- built
//! either by the long-flag `xsort` CLI or by the legacy `KEY=VALUE`
//! `xssort` parser (`legacy.rs`). Both front ends converge on this type so
//! the pipeline itself has no knowledge of which front end produced it.

use std::path::PathBuf;

use super::compare::EmptyNumericPolicy;
use super::key::SortKey;

/// Record framing: line-oriented (delimiter-terminated) or fixed-width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    /// Variable-length, terminator-delimited records.
    Variable,
    /// Fixed-length records of exactly `record_length` bytes, no terminator.
    Fixed,
}

/// Output line terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Newline {
    #[default]
    Lf,
    Crlf,
    /// `\r\n` on Windows, `\n` elsewhere -- matches `std::env::consts`.
    Native,
}

impl Newline {
    pub fn bytes(self) -> &'static [u8] {
        match self {
            Newline::Lf => b"\n",
            Newline::Crlf => b"\r\n",
            Newline::Native => {
                if cfg!(windows) {
                    b"\r\n"
                } else {
                    b"\n"
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub input: PathBuf,
    pub output: PathBuf,
    pub temp_dir: Option<PathBuf>,

    pub record_type: RecordType,
    /// Required when `record_type == Fixed`; ignored otherwise.
    pub record_length: usize,

    pub keys: Vec<SortKey>,
    pub delimiter: Vec<u8>,

    pub truncate_spaces: bool,
    pub remove_duplicates: bool,
    pub empty_numeric: EmptyNumericPolicy,

    /// Sort memory budget in bytes. `None` => derive from host memory
    /// (spec.md section 4.C).
    pub memory_budget: Option<u64>,

    /// Max number of runs merged per cascade level (spec.md section 4.F).
    pub fan_in: usize,

    pub newline: Newline,

    pub verbose: bool,
    pub progress: bool,
}

pub const DEFAULT_FAN_IN: usize = 128;

impl Config {
    pub fn new(input: PathBuf, output: PathBuf) -> Self {
        Config {
            input,
            output,
            temp_dir: None,
            record_type: RecordType::Variable,
            record_length: 0,
            keys: Vec::new(),
            delimiter: Vec::new(),
            truncate_spaces: false,
            remove_duplicates: false,
            empty_numeric: EmptyNumericPolicy::default(),
            memory_budget: None,
            fan_in: DEFAULT_FAN_IN,
            newline: Newline::default(),
            verbose: false,
            progress: false,
        }
    }

    /// spec.md section 9: at least one key is required for a deterministic order.
    pub fn default_whole_record_key(&self) -> SortKey {
        SortKey::new(0, 0, false, true)
    }

    pub fn effective_keys(&self) -> Vec<SortKey> {
        if self.keys.is_empty() {
            vec![self.default_whole_record_key()]
        } else {
            self.keys.clone()
        }
    }
}
