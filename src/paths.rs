use directories::UserDirs;
use std::path::{Path, PathBuf};

use crate::components::Subtree;
use crate::config::Config;
use crate::error::{ProfileError, Result};

/// File holding the active profile name, directly under the install root
pub const MARKER_FILE_NAME: &str = "active_profile.txt";
/// Reserved area for per-switch backup snapshots
pub const BACKUP_DIR_NAME: &str = ".backup";
/// Advisory lock file guarding mutating commands
pub const LOCK_FILE_NAME: &str = ".heatprof.lock";
/// Default profiles folder, alongside the live subtrees
pub const PROFILES_DIR_NAME: &str = "Profiles";

/// All computed paths used by heatprof for one installation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    /// .../Need for speed heat/SaveGame
    pub install_root: PathBuf,
    /// .../SaveGame/Profiles unless configured elsewhere
    pub profiles_dir: PathBuf,
}

impl Paths {
    pub fn new(install_root: impl Into<PathBuf>, profiles_dir: impl Into<PathBuf>) -> Self {
        Self {
            install_root: install_root.into(),
            profiles_dir: profiles_dir.into(),
        }
    }

    /// Paths for an install root using the conventional `Profiles` folder
    pub fn for_install_root(install_root: impl Into<PathBuf>) -> Self {
        let install_root = install_root.into();
        let profiles_dir = install_root.join(PROFILES_DIR_NAME);
        Self::new(install_root, profiles_dir)
    }

    /// Resolve paths from, in order: an explicit override, the config file, the
    /// default game location under the user's documents folder.
    pub fn resolve(config: &Config, save_path_override: Option<&Path>) -> Result<Self> {
        if let Some(root) = save_path_override {
            return Ok(Self::for_install_root(root));
        }

        let install_root = match &config.save_game_path {
            Some(root) => root.clone(),
            None => default_install_root().ok_or(ProfileError::SaveGamePathRequired)?,
        };

        Ok(match &config.profiles_path {
            Some(profiles) => Self::new(install_root, profiles.clone()),
            None => Self::for_install_root(install_root),
        })
    }

    /// Fail unless both roots are set
    pub fn validate(&self) -> Result<()> {
        if self.install_root.as_os_str().is_empty() {
            return Err(ProfileError::SaveGamePathRequired);
        }
        if self.profiles_dir.as_os_str().is_empty() {
            return Err(ProfileError::ProfilesPathRequired);
        }
        Ok(())
    }

    /// Live subtree the game reads and writes
    pub fn live(&self, subtree: Subtree) -> PathBuf {
        subtree.under(&self.install_root)
    }

    /// Get the path to a specific profile directory
    pub fn profile_dir(&self, name: &str) -> PathBuf {
        self.profiles_dir.join(name)
    }

    pub fn marker_file(&self) -> PathBuf {
        self.install_root.join(MARKER_FILE_NAME)
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.install_root.join(BACKUP_DIR_NAME)
    }

    pub fn lock_file(&self) -> PathBuf {
        self.install_root.join(LOCK_FILE_NAME)
    }
}

/// `<Documents>/Need for speed heat/SaveGame`, if a documents folder is known
pub fn default_install_root() -> Option<PathBuf> {
    let user_dirs = UserDirs::new()?;
    let documents = user_dirs
        .document_dir()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| user_dirs.home_dir().join("Documents"));
    Some(documents.join("Need for speed heat").join("SaveGame"))
}
