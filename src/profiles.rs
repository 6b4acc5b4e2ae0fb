//! Profile catalog and name rules.
//!
//! A profile is a folder under the profiles root holding both a `savegame/`
//! and a `wraps/` directory. Folders missing either one are not profiles and
//! are left out of listings.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::components::Subtree;
use crate::error::{IoContext, ProfileError, Result};

/// Characters rejected in profile names (they break folder names on Windows)
const FORBIDDEN_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub name: String,
    pub path: PathBuf,
}

/// Read-only view of the profiles root
#[derive(Debug, Clone)]
pub struct Catalog {
    profiles_dir: PathBuf,
}

impl Catalog {
    pub fn new(profiles_dir: impl Into<PathBuf>) -> Self {
        Self {
            profiles_dir: profiles_dir.into(),
        }
    }

    /// List valid profiles sorted by name, creating the profiles root if needed
    pub fn list(&self) -> Result<Vec<Profile>> {
        if self.profiles_dir.as_os_str().is_empty() {
            return Err(ProfileError::ProfilesPathRequired);
        }

        fs::create_dir_all(&self.profiles_dir).io_context(|| {
            format!(
                "Failed to create profiles directory: {}",
                self.profiles_dir.display()
            )
        })?;

        let entries = fs::read_dir(&self.profiles_dir).io_context(|| {
            format!(
                "Failed to read profiles directory: {}",
                self.profiles_dir.display()
            )
        })?;

        let mut profiles: Vec<Profile> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()))
            .filter(|e| validate_layout(&e.path()).is_ok())
            .filter_map(|e| {
                let name = e.file_name().to_str()?.to_string();
                Some(Profile { name, path: e.path() })
            })
            .collect();

        profiles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(profiles)
    }

    /// Folders under the profiles root that fail layout validation
    pub fn invalid_entries(&self) -> Result<Vec<PathBuf>> {
        if !self.profiles_dir.exists() {
            return Ok(Vec::new());
        }

        let mut invalid: Vec<PathBuf> = fs::read_dir(&self.profiles_dir)
            .io_context(|| {
                format!(
                    "Failed to read profiles directory: {}",
                    self.profiles_dir.display()
                )
            })?
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()))
            .map(|e| e.path())
            .filter(|p| validate_layout(p).is_err())
            .collect();
        invalid.sort();
        Ok(invalid)
    }
}

/// Check that `profile_path` holds both required subtrees as directories
pub fn validate_layout(profile_path: &Path) -> Result<()> {
    if Subtree::ALL.iter().all(|s| s.under(profile_path).is_dir()) {
        return Ok(());
    }

    Err(ProfileError::InvalidLayout {
        path: profile_path.to_path_buf(),
    })
}

/// Validate a profile name and return it trimmed.
///
/// Rejects blank names, names containing `< > : " / \ | ? *`, and names
/// ending in a dot or a space.
pub fn validate_profile_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ProfileError::NameRequired);
    }

    if trimmed.contains(FORBIDDEN_CHARS) || trimmed.ends_with('.') || trimmed.ends_with(' ') {
        return Err(ProfileError::NameInvalid(trimmed.to_string()));
    }

    Ok(trimmed.to_string())
}
