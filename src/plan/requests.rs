//! Allocation request file loading.
//!
//! The CLI accepts request lists as YAML or JSON files; the format is
//! picked by file extension. The planner itself only ever sees the
//! in-memory request list.

use std::fs::File;
use std::path::Path;

use color_eyre::eyre::{eyre, Result};
use log::info;

use super::AllocationRequest;

/// Load allocation requests from a YAML (`.yaml`/`.yml`) or JSON
/// (`.json`) file.
pub fn load_requests(path: &Path) -> Result<Vec<AllocationRequest>> {
    info!("Loading allocation requests from: {:?}", path);

    let file = File::open(path)?;
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();

    let requests: Vec<AllocationRequest> = match extension {
        "yaml" | "yml" => serde_yaml::from_reader(file)?,
        "json" => serde_json::from_reader(file)?,
        other => {
            return Err(eyre!(
                "unsupported request file extension '{}' (expected yaml, yml or json)",
                other
            ))
        }
    };

    if requests.is_empty() {
        return Err(eyre!("request file {:?} contains no requests", path));
    }
    info!("Loaded {} allocation requests", requests.len());
    Ok(requests)
}
