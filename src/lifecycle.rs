//! Profile lifecycle: save the live installation as a profile, rename and
//! delete profiles, and reset the installation to a blank slate.

use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::components::Subtree;
use crate::error::{IoContext, ProfileError, Result};
use crate::fs_utils::TreeOps;
use crate::marker::{ActiveMarker, active_profile};
use crate::paths::Paths;
use crate::profiles::validate_profile_name;

pub struct Lifecycle<M, T> {
    paths: Paths,
    marker: M,
    tree: T,
}

impl<M: ActiveMarker, T: TreeOps> Lifecycle<M, T> {
    pub fn new(paths: Paths, marker: M, tree: T) -> Self {
        Self {
            paths,
            marker,
            tree,
        }
    }

    /// Remove both live subtrees and mark `name` as active.
    ///
    /// No profile snapshot is created; the game starts from scratch under the
    /// new identity.
    pub fn prepare_fresh_profile(&self, name: &str) -> Result<String> {
        let name = validate_profile_name(name)?;
        self.paths.validate()?;

        for subtree in Subtree::ALL {
            self.tree.remove_tree(&self.paths.live(subtree))?;
        }

        self.marker.write_active(&name)?;
        info!("reset installation to fresh profile '{name}'");
        Ok(name)
    }

    /// Snapshot the live installation into profile `name`.
    ///
    /// A blank `name` means the currently active profile. The marker is not
    /// changed. Returns the resolved profile name.
    pub fn save_current_profile(&self, name: &str) -> Result<String> {
        self.paths.validate()?;
        let name = self.resolve_profile_name(name)?;

        for subtree in Subtree::ALL {
            ensure_live_dir(&self.paths.live(subtree), subtree)?;
        }

        fs::create_dir_all(&self.paths.profiles_dir).io_context(|| {
            format!(
                "Failed to create profiles directory: {}",
                self.paths.profiles_dir.display()
            )
        })?;

        let profile_root = self.paths.profile_dir(&name);
        for subtree in Subtree::ALL {
            debug!("saving live {subtree} into '{name}'");
            self.tree
                .replace_tree(&self.paths.live(subtree), &subtree.under(&profile_root))?;
        }

        info!("saved current installation as '{name}'");
        Ok(name)
    }

    /// Rename profile `old` to `new`, following the marker if `old` is active.
    ///
    /// If the marker cannot be updated the folder is renamed back, so the
    /// marker never names a profile folder that no longer exists.
    pub fn rename_profile(&self, old: &str, new: &str) -> Result<()> {
        self.paths.validate()?;
        let old = validate_profile_name(old)?;
        let new = validate_profile_name(new)?;

        let old_path = self.paths.profile_dir(&old);
        let new_path = self.paths.profile_dir(&new);

        if !is_dir(&old_path)? {
            return Err(ProfileError::ProfileNotFound(old));
        }
        if fs::symlink_metadata(&new_path).is_ok() {
            return Err(ProfileError::ProfileAlreadyExists(new));
        }

        fs::rename(&old_path, &new_path).io_context(|| {
            format!(
                "Failed to rename '{}' to '{}'",
                old_path.display(),
                new_path.display()
            )
        })?;

        let follow_marker = match active_profile(&self.marker) {
            Ok(active) => active.is_some_and(|a| a.trim() == old),
            Err(e) => return Err(self.undo_rename(&new_path, &old_path, e)),
        };

        if follow_marker {
            if let Err(e) = self.marker.write_active(&new) {
                return Err(self.undo_rename(&new_path, &old_path, e));
            }
            info!("renamed active profile '{old}' to '{new}'");
        } else {
            info!("renamed profile '{old}' to '{new}'");
        }

        Ok(())
    }

    /// Delete profile `name`. The active profile cannot be deleted.
    pub fn delete_profile(&self, name: &str) -> Result<()> {
        self.paths.validate()?;
        let name = validate_profile_name(name)?;

        if active_profile(&self.marker)?.is_some_and(|a| a.trim() == name) {
            return Err(ProfileError::CannotDeleteActiveProfile(name));
        }

        let profile_path = self.paths.profile_dir(&name);
        if !is_dir(&profile_path)? {
            return Err(ProfileError::ProfileNotFound(name));
        }

        self.tree.remove_tree(&profile_path)?;
        info!("deleted profile '{name}'");
        Ok(())
    }

    fn resolve_profile_name(&self, name: &str) -> Result<String> {
        if !name.trim().is_empty() {
            return validate_profile_name(name);
        }

        let active = self.marker.read_active()?;
        validate_profile_name(&active)
    }

    /// Rename `from` back to `to` after `cause`, returning the error to report.
    ///
    /// If the folder cannot be moved back the marker no longer matches any
    /// profile folder, and the returned error names both failures.
    fn undo_rename(&self, from: &Path, to: &Path, cause: ProfileError) -> ProfileError {
        match fs::rename(from, to) {
            Ok(()) => cause,
            Err(e) => {
                warn!(
                    "failed to rename {} back to {}: {e}",
                    from.display(),
                    to.display()
                );
                ProfileError::io(
                    format!(
                        "{cause}; renaming {} back to {} also failed, rename it by hand",
                        from.display(),
                        to.display()
                    ),
                    e,
                )
            }
        }
    }
}

/// `Ok(false)` if `path` is missing; an error if it exists but is not a directory
fn is_dir(path: &Path) -> Result<bool> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(true),
        Ok(_) => Err(ProfileError::NotADirectory {
            path: path.to_path_buf(),
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(ProfileError::io(
            format!("Failed to read metadata: {}", path.display()),
            e,
        )),
    }
}

fn ensure_live_dir(path: &Path, subtree: Subtree) -> Result<()> {
    if is_dir(path)? {
        return Ok(());
    }
    Err(match subtree {
        Subtree::Savegame => ProfileError::RootSavegameMissing,
        Subtree::Wraps => ProfileError::RootWrapsMissing,
    })
}
