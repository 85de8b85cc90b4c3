//! Configuration (spec.md §6.3): the recognized store options, loaded from
//! (lowest to highest priority) defaults, an optional TOML file, and
//! environment variables.
//!
//! Grounded on the teacher's `Settings`/`Config` split in `src/config.rs`:
//! a plain struct with a `Default` impl, overlaid by an optional file, with
//! environment variables applied last and taking highest precedence.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Default on-disk database filename (spec.md §6.2).
pub const DEFAULT_DATABASE_FILENAME: &str = "frontier.db";

/// Recognized store options (spec.md §6.3). `bloom_filters`,
/// `max_background_jobs`, `max_subcompactions`, and `max_bytes_for_level_base`
/// are accepted for compatibility with the source's RocksDB-tuning vocabulary
/// but have no effect against the SQLite backend (§4 expansion); `stats`
/// toggles whether `main.rs` logs store stats on shutdown.
#[derive(Debug, Clone)]
pub struct Config {
    pub store_path: PathBuf,
    pub store_purge: bool,
    pub store_bloom_filters: bool,
    pub store_max_background_jobs: u32,
    pub store_max_subcompactions: u32,
    pub store_max_bytes_for_level_base: u64,
    pub store_stats: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(DEFAULT_DATABASE_FILENAME),
            store_purge: false,
            store_bloom_filters: true,
            store_max_background_jobs: 2,
            store_max_subcompactions: 1,
            store_max_bytes_for_level_base: 256 * 1024 * 1024,
            store_stats: false,
        }
    }
}

/// Mirrors [`Config`]'s fields as optional overrides, the shape a TOML file
/// or env var layer contributes before being merged onto the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    store: StoreSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct StoreSection {
    path: Option<PathBuf>,
    purge: Option<bool>,
    bloom_filters: Option<bool>,
    max_background_jobs: Option<u32>,
    max_subcompactions: Option<u32>,
    max_bytes_for_level_base: Option<u64>,
    stats: Option<bool>,
}

impl Config {
    fn apply_file(&mut self, file: FileConfig) {
        let store = file.store;
        if let Some(path) = store.path {
            self.store_path = path;
        }
        if let Some(purge) = store.purge {
            self.store_purge = purge;
        }
        if let Some(bloom) = store.bloom_filters {
            self.store_bloom_filters = bloom;
        }
        if let Some(jobs) = store.max_background_jobs {
            self.store_max_background_jobs = jobs;
        }
        if let Some(subc) = store.max_subcompactions {
            self.store_max_subcompactions = subc;
        }
        if let Some(bytes) = store.max_bytes_for_level_base {
            self.store_max_bytes_for_level_base = bytes;
        }
        if let Some(stats) = store.stats {
            self.store_stats = stats;
        }
    }

    fn apply_env(&mut self) {
        if let Ok(path) = std::env::var("FRONTIER_STORE_PATH") {
            self.store_path = PathBuf::from(path);
        }
        if let Some(purge) = env_bool("FRONTIER_STORE_PURGE") {
            self.store_purge = purge;
        }
        if let Some(bloom) = env_bool("FRONTIER_STORE_BLOOM_FILTERS") {
            self.store_bloom_filters = bloom;
        }
        if let Ok(jobs) = std::env::var("FRONTIER_STORE_MAX_BACKGROUND_JOBS") {
            if let Ok(jobs) = jobs.parse() {
                self.store_max_background_jobs = jobs;
            }
        }
        if let Ok(subc) = std::env::var("FRONTIER_STORE_MAX_SUBCOMPACTIONS") {
            if let Ok(subc) = subc.parse() {
                self.store_max_subcompactions = subc;
            }
        }
        if let Ok(bytes) = std::env::var("FRONTIER_STORE_MAX_BYTES_FOR_LEVEL_BASE") {
            if let Ok(bytes) = bytes.parse() {
                self.store_max_bytes_for_level_base = bytes;
            }
        }
        if let Some(stats) = env_bool("FRONTIER_STORE_STATS") {
            self.store_stats = stats;
        }
    }

    /// Load a config by overlaying (in increasing priority) defaults, an
    /// optional TOML file, and environment variables.
    pub fn load(file_path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(path) = file_path {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("failed to read config file {}: {}", path.display(), e))?;
            let file: FileConfig = toml::from_str(&contents)
                .map_err(|e| anyhow::anyhow!("failed to parse config file {}: {}", path.display(), e))?;
            config.apply_file(file);
        }

        config.apply_env();
        Ok(config)
    }
}

fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key).ok().and_then(|v| match v.to_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    })
}
