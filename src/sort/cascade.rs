//! Cascade coordinator.
//!
//! Merges an arbitrary number of sorted runs down to one output file,
//! batching by `config.fan_in` per level so no single merge ever opens more
//! than `fan_in` file handles at once. Batches within a level run in
//! parallel (`rayon`); levels run sequentially, since level N+1 depends on
//! level N's output.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info};

use super::config::Config;
use super::error::SortError;
use super::key::SortKey;
use super::merge::k_way_merge;

/// Merge `runs` into `output_path`. `temp_dir` holds intermediate levels;
/// every intermediate file is removed once it has been consumed by the
/// next level (by `k_way_merge` itself, on success).
pub fn cascade_merge(
    runs: Vec<PathBuf>,
    output_path: &Path,
    config: &Config,
    keys: &[SortKey],
    temp_dir: &Path,
) -> Result<PathBuf, SortError> {
    if runs.is_empty() {
        debug!("no runs to merge, writing empty output");
        return k_way_merge(&[], output_path, config, keys);
    }
    if runs.len() == 1 {
        return k_way_merge(&runs, output_path, config, keys);
    }

    let mut level = runs;
    let mut level_index = 0usize;

    loop {
        let batches: Vec<Vec<PathBuf>> = level
            .chunks(config.fan_in.max(2))
            .map(|c| c.to_vec())
            .collect();

        if batches.len() == 1 {
            let final_batch = batches.into_iter().next().unwrap();
            info!(runs = final_batch.len(), "final merge level");
            return k_way_merge(&final_batch, output_path, config, keys);
        }

        debug!(level = level_index, batches = batches.len(), "merging cascade level");

        let results: Vec<Result<PathBuf, SortError>> = batches
            .into_par_iter()
            .enumerate()
            .map(|(batch_index, batch)| {
                let intermediate = temp_dir.join(format!(
                    "level_{level_index:04}_batch_{batch_index:06}.run"
                ));
                k_way_merge(&batch, &intermediate, config, keys)
            })
            .collect();

        let mut next_level = Vec::with_capacity(results.len());
        let mut first_error = None;
        for result in results {
            match result {
                Ok(path) => next_level.push(path),
                Err(e) if first_error.is_none() => first_error = Some(e),
                Err(_) => {}
            }
        }

        if let Some(e) = first_error {
            for path in &next_level {
                let _ = std::fs::remove_file(path);
            }
            return Err(e);
        }

        level = next_level;
        level_index += 1;
    }
}
