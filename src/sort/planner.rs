//! Memory planner (spec.md section 4.C).
//!
//! Decides how many records fit in one in-memory run. Grounded on
//! `internal/utils/memory.go`'s `CalculateChunkSize`/`EstimateAverageLineSize`:
//! same `defaultFraction = 0.5` of host memory, same min/max record-count
//! clamp, same POSIX-vs-Windows split for which `sysinfo` field to trust.
//! `gopsutil.VirtualMemory` is replaced by the `sysinfo` crate, already the
//! pack's host-introspection dependency of choice.

use sysinfo::System;

use super::error::SortError;

pub const N_MIN: usize = 5_000;
pub const N_MAX: usize = 1_000_000;
const DEFAULT_FRACTION: f64 = 0.5;

/// Host memory budget in bytes, before applying `DEFAULT_FRACTION`.
///
/// POSIX: `available` memory (reclaimable cache counted as free).
/// Windows: the smaller of `available` and `free`, since Windows'
/// "available" estimate can overstate what a single process can actually
/// obtain without contention.
pub fn host_memory_bytes() -> Result<u64, SortError> {
    let mut sys = System::new();
    sys.refresh_memory();
    let available = sys.available_memory();
    let free = sys.free_memory();

    if available == 0 {
        return Err(SortError::Resource(
            "unable to determine host memory".to_string(),
        ));
    }

    let bytes = if cfg!(windows) {
        available.min(free)
    } else {
        available
    };
    Ok(bytes)
}

/// Memory budget in bytes to size one run with, given an explicit override
/// or a fraction of host memory.
pub fn memory_budget_bytes(explicit: Option<u64>) -> Result<u64, SortError> {
    match explicit {
        Some(bytes) => Ok(bytes),
        None => {
            let host = host_memory_bytes()?;
            Ok((host as f64 * DEFAULT_FRACTION) as u64)
        }
    }
}

/// Records per run: `clamp(budget / avg_record_len, N_MIN, N_MAX)`.
///
/// `avg_record_len` of zero (empty input, or sampling failed) is treated as
/// `N_MAX` records since there is nothing to weigh the budget against.
pub fn records_per_run(budget_bytes: u64, avg_record_len: usize) -> usize {
    if avg_record_len == 0 {
        return N_MAX;
    }
    let raw = budget_bytes / avg_record_len as u64;
    (raw as usize).clamp(N_MIN, N_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_to_minimum() {
        assert_eq!(records_per_run(1, 1_000_000), N_MIN);
    }

    #[test]
    fn clamps_to_maximum() {
        assert_eq!(records_per_run(u64::MAX, 1), N_MAX);
    }

    #[test]
    fn scales_linearly_between_bounds() {
        let n = records_per_run(100_000_000, 1_000);
        assert_eq!(n, 100_000);
    }

    #[test]
    fn zero_avg_len_falls_back_to_max() {
        assert_eq!(records_per_run(1_000, 0), N_MAX);
    }
}
