// src/scrape/state.rs
//
// Durable scheduler statistics: one JSON file, loaded once at construction,
// overwritten wholesale after every mutation. Load and save failures are
// logged and absorbed so a broken disk never takes the scheduler down.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SchedulerState {
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
    pub total_runs: u64,
    pub successful_runs: u64,
    pub failed_runs: u64,
    pub last_error: Option<String>,
    pub articles_this_cycle: u64,
}

/// Every field carries `serde(default)`, so a partial or older file merges
/// over the defaults instead of failing the load.
pub fn load(path: &Path) -> SchedulerState {
    if !path.exists() {
        return SchedulerState::default();
    }
    match try_load(path) {
        Ok(state) => state,
        Err(e) => {
            warn!(error = ?e, path = %path.display(), "failed to load scheduler state");
            SchedulerState::default()
        }
    }
}

pub fn save(path: &Path, state: &SchedulerState) {
    if let Err(e) = try_save(path, state) {
        warn!(error = ?e, path = %path.display(), "failed to save scheduler state");
    }
}

fn try_load(path: &Path) -> Result<SchedulerState> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading scheduler state from {}", path.display()))?;
    serde_json::from_str(&content).context("parsing scheduler state json")
}

fn try_save(path: &Path, state: &SchedulerState) -> Result<()> {
    let json = serde_json::to_string_pretty(state).context("serializing scheduler state")?;
    std::fs::write(path, json)
        .with_context(|| format!("writing scheduler state to {}", path.display()))
}
