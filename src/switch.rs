//! Profile switching logic.
//!
//! Switching replaces the live `savegame/` and `wraps/` folders with a
//! profile's copies and then points the marker at that profile. The live
//! installation must never be left holding a mix of two profiles, so the
//! switch runs as a small transaction:
//!
//! 1. Validate the name, the configured roots and the target profile.
//! 2. Copy each live subtree that exists into `.backup/<timestamp>/`.
//! 3. Replace `savegame/`, then `wraps/`, from the profile.
//! 4. Write the marker.
//! 5. Remove the backup.
//!
//! If step 3 fails on `wraps/` or step 4 fails, both live subtrees are restored
//! from the backup (or removed if they did not exist before) and the error is
//! wrapped in [`ProfileError::RolledBack`]. If the restore itself fails the
//! backup is kept on disk and [`ProfileError::Unrecoverable`] is returned.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::components::Subtree;
use crate::error::{ProfileError, Result};
use crate::fs_utils::TreeOps;
use crate::marker::ActiveMarker;
use crate::paths::Paths;
use crate::profiles::{validate_layout, validate_profile_name};

/// Result of a committed switch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwitchOutcome {
    pub profile_name: String,
    pub switched_at: DateTime<Utc>,
    /// Always false for a committed switch; failed switches report rollback
    /// through [`ProfileError::rolled_back`].
    pub rolled_back: bool,
}

/// Pre-switch copy of the live installation
#[derive(Debug)]
struct Backup {
    root: PathBuf,
    /// Subtrees that existed before the switch and were copied
    present: Vec<Subtree>,
}

impl Backup {
    fn had_original(&self, subtree: Subtree) -> bool {
        self.present.contains(&subtree)
    }
}

pub struct Switcher<M, T> {
    paths: Paths,
    marker: M,
    tree: T,
    clock: fn() -> DateTime<Utc>,
}

impl<M: ActiveMarker, T: TreeOps> Switcher<M, T> {
    pub fn new(paths: Paths, marker: M, tree: T) -> Self {
        Self {
            paths,
            marker,
            tree,
            clock: Utc::now,
        }
    }

    /// Replace the time source used for backup names and the outcome timestamp
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Switch the live installation to `profile_name`
    pub fn switch(&self, profile_name: &str) -> Result<SwitchOutcome> {
        let name = validate_profile_name(profile_name)?;
        self.paths.validate()?;

        let profile_root = self.paths.profile_dir(&name);
        if !profile_root.is_dir() {
            return Err(ProfileError::ProfileNotFound(name));
        }
        validate_layout(&profile_root)?;

        info!("switching to profile '{name}'");
        let backup = self.back_up_live()?;

        let [first, second] = Subtree::ALL;

        if let Err(e) = self.swap(first, &profile_root) {
            // Nothing live has been replaced yet.
            self.discard_backup(&backup.root);
            return Err(e);
        }

        if let Err(e) = self.swap(second, &profile_root) {
            return Err(self.roll_back(&name, &backup, e));
        }

        if let Err(e) = self.marker.write_active(&name) {
            return Err(self.roll_back(&name, &backup, e));
        }

        self.discard_backup(&backup.root);
        info!("switched to profile '{name}'");

        Ok(SwitchOutcome {
            profile_name: name,
            switched_at: (self.clock)(),
            rolled_back: false,
        })
    }

    fn back_up_live(&self) -> Result<Backup> {
        let root = self.unique_backup_root();
        let mut backup = Backup {
            root,
            present: Vec::new(),
        };

        for subtree in Subtree::ALL {
            match self.back_up_subtree(subtree, &backup.root) {
                Ok(true) => backup.present.push(subtree),
                Ok(false) => debug!("live {subtree} absent, nothing to back up"),
                Err(e) => {
                    self.discard_backup(&backup.root);
                    return Err(e);
                }
            }
        }

        debug!(
            "backed up {:?} to {}",
            backup.present,
            backup.root.display()
        );
        Ok(backup)
    }

    fn back_up_subtree(&self, subtree: Subtree, backup_root: &Path) -> Result<bool> {
        let live = self.paths.live(subtree);
        match fs::symlink_metadata(&live) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ProfileError::io(
                format!("Failed to read metadata: {}", live.display()),
                e,
            )),
            Ok(_) => {
                self.tree.copy_tree(&live, &subtree.under(backup_root))?;
                Ok(true)
            }
        }
    }

    fn swap(&self, subtree: Subtree, profile_root: &Path) -> Result<()> {
        debug!("replacing live {subtree}");
        self.tree
            .replace_tree(&subtree.under(profile_root), &self.paths.live(subtree))
    }

    /// Restore both live subtrees from `backup` and build the error to report
    fn roll_back(&self, profile: &str, backup: &Backup, cause: ProfileError) -> ProfileError {
        warn!("switch to '{profile}' failed ({cause}), rolling back");

        let mut failure = None;
        for subtree in Subtree::ALL {
            let live = self.paths.live(subtree);
            let restored = if backup.had_original(subtree) {
                self.tree.replace_tree(&subtree.under(&backup.root), &live)
            } else {
                self.tree.remove_tree(&live)
            };

            if let Err(e) = restored {
                error!("failed to restore live {subtree}: {e}");
                failure.get_or_insert(e);
            }
        }

        match failure {
            None => {
                self.discard_backup(&backup.root);
                info!("rolled back switch to '{profile}'");
                ProfileError::RolledBack {
                    profile: profile.to_string(),
                    source: Box::new(cause),
                }
            }
            Some(rollback) => ProfileError::Unrecoverable {
                profile: profile.to_string(),
                source: Box::new(cause),
                rollback: Box::new(rollback),
                backup: backup.root.clone(),
            },
        }
    }

    /// `.backup/<YYYYMMDD-HHMMSS>`, suffixed if a snapshot with that name exists
    fn unique_backup_root(&self) -> PathBuf {
        let stamp = (self.clock)().format("%Y%m%d-%H%M%S").to_string();
        let backups = self.paths.backup_dir();

        let mut candidate = backups.join(&stamp);
        let mut n = 1;
        while fs::symlink_metadata(&candidate).is_ok() {
            candidate = backups.join(format!("{stamp}-{n}"));
            n += 1;
        }
        candidate
    }

    /// Best-effort removal of a backup snapshot; failures are only logged
    fn discard_backup(&self, backup_root: &Path) {
        if let Err(e) = self.cleanup_backup_tree(backup_root) {
            warn!("failed to clean up backup {}: {e}", backup_root.display());
        }
    }

    fn cleanup_backup_tree(&self, backup_root: &Path) -> Result<()> {
        self.tree.remove_tree(backup_root)?;

        let Some(parent) = backup_root.parent() else {
            return Ok(());
        };

        let mut entries = match fs::read_dir(parent) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(ProfileError::io(
                    format!("Failed to read backup directory: {}", parent.display()),
                    e,
                ));
            }
        };

        if entries.next().is_none() {
            self.tree.remove_tree(parent)?;
        }
        Ok(())
    }
}
