use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use directories::ProjectDirs;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::{NotesError, Result};

/// Browser local storage budget
pub const DEFAULT_QUOTA_BYTES: u64 = 5 * 1024 * 1024;

/// Application configuration settings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Directory backing the key-value store
    pub data_dir: PathBuf,

    /// Auto-save debounce window in milliseconds
    pub autosave_delay_ms: u64,

    /// Maximum bytes across all stored collections; `null` disables the limit
    pub storage_quota_bytes: Option<u64>,

    /// Storage key of the notes collection
    pub notes_key: String,

    /// Storage key of the notebooks collection
    pub notebooks_key: String,

    /// Storage key of the templates collection
    pub templates_key: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: default_data_dir(),
            autosave_delay_ms: 1500,
            storage_quota_bytes: Some(DEFAULT_QUOTA_BYTES),
            notes_key: "startNotesData".to_string(),
            notebooks_key: "startNotesNotebooks".to_string(),
            templates_key: "startNoteTemplates".to_string(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    match ProjectDirs::from("", "", "startnotes") {
        Some(dirs) => dirs.data_dir().to_path_buf(),
        None => {
            warn!("No home directory found, storing notes in ./.startnotes");
            PathBuf::from(".startnotes")
        }
    }
}

/// Location of the config file when none is given.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "startnotes").map(|dirs| dirs.config_dir().join("config.json"))
}

impl Config {
    /// Loads the config file at `path`, or the default location.
    ///
    /// A missing file gives the defaults; an unreadable or invalid file is an error.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let path = match path.map(Path::to_path_buf).or_else(default_config_path) {
            Some(path) => path,
            None => return Ok(Config::default()),
        };

        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&path).map_err(|e| NotesError::ConfigError {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        let config: Config =
            serde_json::from_str(&content).map_err(|e| NotesError::ConfigError {
                message: format!("invalid config {}: {}", path.display(), e),
            })?;

        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }
}
