use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{IoContext, ProfileError, Result};
use crate::paths::PROFILES_DIR_NAME;

/// Config stored in `<config dir>/heatprof/config.json`
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Installation root holding the live savegame/wraps folders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_game_path: Option<PathBuf>,

    /// Where profile snapshots live
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profiles_path: Option<PathBuf>,
}

impl Config {
    /// Default location of the config file, if the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "heatprof").map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Read config from file, returning default if file doesn't exist
    pub fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .io_context(|| format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&content).map_err(|source| ProfileError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write config atomically: temp file, then rename.
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .io_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let content = serde_json::to_string_pretty(self).map_err(|source| ProfileError::Config {
            path: path.to_path_buf(),
            source,
        })?;

        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, content)
            .io_context(|| format!("Failed to write temp config file: {}", temp_path.display()))?;

        std::fs::rename(&temp_path, path).io_context(|| {
            format!(
                "Failed to rename config file: {} -> {}",
                temp_path.display(),
                path.display()
            )
        })
    }

    /// Point the config at a new installation root.
    ///
    /// The profiles folder follows the root to `<root>/Profiles`.
    pub fn set_save_game_path(&mut self, path: &str) -> Result<()> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return Err(ProfileError::SaveGamePathRequired);
        }

        let root = PathBuf::from(trimmed);
        self.profiles_path = Some(root.join(PROFILES_DIR_NAME));
        self.save_game_path = Some(root);
        Ok(())
    }
}
