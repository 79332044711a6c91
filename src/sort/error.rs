//! Error taxonomy for the sort pipeline.
//!
//! One error kind per stage-level failure class. Each variant carries enough
//! context to produce a single-line, stage-and-cause user message; the
//! binaries map every `SortError` to a process exit code (see `pipeline`).

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SortError {
    #[error("usage error: {0}")]
    Usage(String),

    #[error("input file does not exist: {path}")]
    InputMissing { path: PathBuf },

    #[error("{stage}: I/O error on {path}: {source}")]
    Io {
        stage: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Parse(String),

    #[error("empty numeric field in record (key start={start}, length={length})")]
    EmptyNumeric { start: usize, length: usize },

    #[error("resource error: {0}")]
    Resource(String),
}

pub type SortResult<T> = Result<T, SortError>;

impl SortError {
    /// Process exit code: 0 success, 1 usage/input, 2 I/O/sort failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            SortError::Usage(_) | SortError::InputMissing { .. } | SortError::Parse(_) => 1,
            SortError::Io { .. } | SortError::EmptyNumeric { .. } | SortError::Resource(_) => 2,
        }
    }

    pub fn io(stage: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SortError::Io {
            stage,
            path: path.into(),
            source,
        }
    }
}
