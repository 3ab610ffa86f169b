// src/scrape/config.rs
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use crate::scrape::scheduler::SchedulerCfg;

const ENV_PATH: &str = "SCRAPER_CONFIG_PATH";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Base URL of the aggregation backend.
    pub backend_url: String,
    /// Bind address of the control API.
    pub listen_addr: String,
    pub interval_minutes: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    /// Explicit per-request timeout for every outbound HTTP call.
    pub request_timeout_secs: u64,
    pub state_path: PathBuf,
    /// Begin scraping as soon as the process boots.
    pub start_on_init: bool,
    /// When the duplicate check itself fails, `true` treats the candidate as
    /// new (favors availability, risks re-ingestion during backend outages);
    /// `false` skips it.
    pub fail_open_duplicate_check: bool,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:5000".to_string(),
            listen_addr: "127.0.0.1:8080".to_string(),
            interval_minutes: 30,
            max_retries: 3,
            retry_delay_ms: 5_000,
            request_timeout_secs: 10,
            state_path: PathBuf::from("scraper_state.json"),
            start_on_init: false,
            fail_open_duplicate_check: true,
        }
    }
}

impl ScraperConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes * 60)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn scheduler_cfg(&self) -> SchedulerCfg {
        SchedulerCfg {
            interval: self.interval(),
            max_retries: self.max_retries,
            retry_delay: self.retry_delay(),
            state_path: self.state_path.clone(),
        }
    }
}

/// Load configuration from an explicit TOML path.
pub fn load_from(path: &Path) -> Result<ScraperConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading scraper config from {}", path.display()))?;
    toml::from_str(&content).context("parsing scraper config toml")
}

/// Resolve configuration:
/// 1) $SCRAPER_CONFIG_PATH
/// 2) config/scraper.toml
/// 3) built-in defaults
pub fn load_default() -> Result<ScraperConfig> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_from(&pb);
        }
        return Err(anyhow!("SCRAPER_CONFIG_PATH points to non-existent path"));
    }
    let toml_p = PathBuf::from("config/scraper.toml");
    if toml_p.exists() {
        return load_from(&toml_p);
    }
    Ok(ScraperConfig::default())
}
