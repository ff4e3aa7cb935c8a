use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "piscan";
const CONFIG_FILE: &str = "config.json";
const CORPUS_FILE: &str = "pi-digits";
const INDEX_DIR: &str = "index";

/// Application configuration stored in the app data directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Digit corpus file; defaults to `pi-digits` in the app data directory
    #[serde(default)]
    pub corpus_path: Option<PathBuf>,

    /// Index store directory; defaults to `index` in the app data directory
    #[serde(default)]
    pub index_dir: Option<PathBuf>,

    /// Key width used when building a new index store
    #[serde(default = "default_prefix_len")]
    pub prefix_len: usize,

    /// Widest range the CLI will read in one request
    #[serde(default = "default_max_range_width")]
    pub max_range_width: u64,

    /// Maximum number of shards built in parallel (limits memory usage)
    /// If 0, uses the number of CPU cores
    #[serde(default = "default_parallel_shard_count")]
    pub parallel_shard_count: usize,
}

fn default_prefix_len() -> usize {
    5
}

fn default_max_range_width() -> u64 {
    100_000
}

fn default_parallel_shard_count() -> usize {
    0 // 0 means use CPU count
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            corpus_path: None,
            index_dir: None,
            prefix_len: default_prefix_len(),
            max_range_width: default_max_range_width(),
            parallel_shard_count: default_parallel_shard_count(),
        }
    }
}

impl AppConfig {
    /// Load config from `path`, or from the app data directory when no path
    /// is given. A missing default config file yields the defaults; a missing
    /// explicit one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default_path = get_config_path()?;
                if !default_path.exists() {
                    return Ok(Self::default());
                }
                default_path
            }
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
        let config: AppConfig =
            serde_json::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save config to the app data directory
    pub fn save(&self) -> Result<PathBuf> {
        let config_path = get_config_path()?;
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, content).context("Failed to write config file")?;
        Ok(config_path)
    }

    /// Corpus location, falling back to the app data directory
    pub fn resolved_corpus_path(&self) -> Result<PathBuf> {
        match &self.corpus_path {
            Some(p) => Ok(p.clone()),
            None => Ok(get_app_data_dir()?.join(CORPUS_FILE)),
        }
    }

    /// Index store location, falling back to the app data directory
    pub fn resolved_index_dir(&self) -> Result<PathBuf> {
        match &self.index_dir {
            Some(p) => Ok(p.clone()),
            None => Ok(get_app_data_dir()?.join(INDEX_DIR)),
        }
    }

    /// Get the effective parallel shard count (resolves 0 to CPU count)
    pub fn effective_parallel_shard_count(&self) -> usize {
        if self.parallel_shard_count == 0 {
            num_cpus()
        } else {
            self.parallel_shard_count
        }
    }
}

/// Get the number of CPUs available
fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Get the path to the config file
pub fn get_config_path() -> Result<PathBuf> {
    let app_dir = get_app_data_dir()?;
    Ok(app_dir.join(CONFIG_FILE))
}

/// Get the application data directory for the corpus and index
pub fn get_app_data_dir() -> Result<PathBuf> {
    let base = if cfg!(target_os = "macos") {
        dirs::home_dir().map(|h| h.join("Library").join("Application Support"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
    } else {
        // Linux/Unix: use XDG_DATA_HOME or ~/.local/share
        dirs::data_dir()
    };

    let base = base.context("Could not determine app data directory")?;
    let app_dir = base.join(APP_NAME);

    fs::create_dir_all(&app_dir)?;
    Ok(app_dir)
}
