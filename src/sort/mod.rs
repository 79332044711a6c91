//! External (out-of-core) record sorter.
//!
//! Ingests a file too large to hold in memory, partitions it into
//! memory-sized runs (`rungen`), sorts each run on a multi-key comparator
//! (`key`, `compare`), spills it to the temp directory (`chunkio`), and
//! merges the runs via a bounded-fan-in k-way merge (`merge`) cascaded
//! across as many levels as needed (`cascade`).

pub mod cascade;
pub mod chunkio;
pub mod compare;
pub mod config;
pub mod ebcdic;
pub mod error;
pub mod key;
pub mod legacy;
pub mod merge;
pub mod pipeline;
pub mod planner;
pub mod rungen;
pub mod testfile;

#[cfg(test)]
mod tests;

pub use self::compare::*;
pub use self::config::*;
pub use self::error::*;
pub use self::key::*;
pub use self::pipeline::run;
