//! Active-profile marker.
//!
//! A single text file under the install root naming the active profile. There
//! is no in-memory cache: every read and write goes to disk.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{IoContext, ProfileError, Result};

/// Read/write access to the persisted active profile name.
pub trait ActiveMarker {
    /// Trimmed marker contents.
    ///
    /// Fails with [`ProfileError::MarkerMissing`] when no marker has been written yet.
    fn read_active(&self) -> Result<String>;

    /// Persist `name` (trimmed) as the active profile.
    ///
    /// Fails with [`ProfileError::NameRequired`] if `name` is blank.
    fn write_active(&self, name: &str) -> Result<()>;
}

/// Current marker value, with "no marker yet" mapped to `None`.
pub fn active_profile(marker: &impl ActiveMarker) -> Result<Option<String>> {
    match marker.read_active() {
        Ok(name) => Ok(Some(name)),
        Err(ProfileError::MarkerMissing { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Marker stored at `<install root>/active_profile.txt`
#[derive(Debug, Clone)]
pub struct MarkerFile {
    path: PathBuf,
}

impl MarkerFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ActiveMarker for MarkerFile {
    fn read_active(&self) -> Result<String> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(content.trim().to_string()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(ProfileError::MarkerMissing {
                path: self.path.clone(),
            }),
            Err(e) => Err(ProfileError::io(
                format!("Failed to read marker file: {}", self.path.display()),
                e,
            )),
        }
    }

    fn write_active(&self, name: &str) -> Result<()> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(ProfileError::NameRequired);
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .io_context(|| format!("Failed to create marker directory: {}", parent.display()))?;
        }

        let temp_path = self.path.with_extension("txt.tmp");
        fs::write(&temp_path, format!("{trimmed}\n"))
            .io_context(|| format!("Failed to write temp marker file: {}", temp_path.display()))?;

        fs::rename(&temp_path, &self.path).io_context(|| {
            format!(
                "Failed to rename marker file: {} -> {}",
                temp_path.display(),
                self.path.display()
            )
        })
    }
}
