//! Diagnostic tool for heatprof.
//!
//! Implements `heatprof doctor`, which checks an installation for:
//! - a missing install root or live save folders,
//! - a marker naming a profile that was never saved,
//! - folders under the profiles root that are not valid profiles,
//! - backup snapshots and staging folders left behind by interrupted or
//!   failed switches.
//!
//! It reports each check with a pass/warn/fail icon.

use std::fs;
use std::path::{Path, PathBuf};

use crate::components::Subtree;
use crate::error::ProfileError;
use crate::fs_utils::{dir_size, format_bytes, is_replace_leftover};
use crate::lock::InstallLock;
use crate::marker::{MarkerFile, active_profile};
use crate::paths::Paths;
use crate::profiles::{Catalog, validate_layout};
use crate::ui::{Tone, Ui};

/// Run all checks; returns false if any check failed
pub fn run_doctor(paths: &Paths, ui: &Ui) -> bool {
    ui.section("heatprof Doctor");
    ui.newline();

    let mut healthy = true;

    healthy &= check_step(ui, "Installation", || {
        if !paths.install_root.is_dir() {
            ui.println(format!(
                "  {} Installation root missing: {}",
                ui.icon_err(),
                paths.install_root.display()
            ));
            ui.println("    Set it with 'heatprof path set <dir>'.");
            return false;
        }
        ui.println(format!(
            "  {} Installation root: {}",
            ui.icon_ok(),
            paths.install_root.display()
        ));

        for subtree in Subtree::ALL {
            let live = paths.live(subtree);
            if live.is_dir() {
                let size = dir_size(&live).map(format_bytes).unwrap_or_else(|_| "?".into());
                ui.println(format!("  {} {} ({size})", ui.icon_ok(), subtree.display_name()));
            } else {
                // Normal right after 'heatprof fresh'
                ui.println(format!("  {} {} missing", ui.icon_warn(), subtree.display_name()));
            }
        }

        match InstallLock::acquire(&paths.lock_file()) {
            Ok(_) => {}
            Err(ProfileError::Locked { .. }) => ui.println(format!(
                "  {} Another heatprof command is running right now",
                ui.icon_warn()
            )),
            Err(e) => ui.println(format!("  {} Cannot take install lock: {e}", ui.icon_warn())),
        }
        true
    });

    healthy &= check_step(ui, "Active Profile", || {
        match active_profile(&MarkerFile::new(paths.marker_file())) {
            Ok(Some(name)) => {
                ui.println(format!("  {} Active profile: {name}", ui.icon_info()));
                if validate_layout(&paths.profile_dir(&name)).is_ok() {
                    ui.println(format!("  {} Snapshot exists", ui.icon_ok()));
                } else {
                    ui.println(format!(
                        "  {} No saved snapshot; run 'heatprof save' to keep it",
                        ui.icon_warn()
                    ));
                }
                true
            }
            Ok(None) => {
                ui.println(format!("  {} No active profile yet", ui.icon_info()));
                true
            }
            Err(e) => {
                ui.println(format!("  {} Marker unreadable: {e}", ui.icon_err()));
                false
            }
        }
    });

    healthy &= check_step(ui, "Profiles", || {
        if !paths.profiles_dir.is_dir() {
            ui.println(format!(
                "  {} Profiles folder not created yet: {}",
                ui.icon_info(),
                paths.profiles_dir.display()
            ));
            return true;
        }

        let catalog = Catalog::new(&paths.profiles_dir);
        let profiles = match catalog.list() {
            Ok(profiles) => profiles,
            Err(e) => {
                ui.println(format!("  {} Cannot read profiles: {e}", ui.icon_err()));
                return false;
            }
        };

        ui.println(format!(
            "  {} {} profile(s) in {}",
            ui.icon_ok(),
            profiles.len(),
            paths.profiles_dir.display()
        ));
        for profile in &profiles {
            ui.println(format!("    {} {}", ui.icon_info(), profile.name));
        }

        for invalid in catalog.invalid_entries().unwrap_or_default() {
            ui.println(format!(
                "  {} Ignored (needs savegame/ and wraps/): {}",
                ui.icon_warn(),
                invalid.display()
            ));
        }
        true
    });

    healthy &= check_step(ui, "Leftovers", || {
        let mut clean = true;

        for backup in list_dirs(&paths.backup_dir()) {
            ui.println(format!(
                "  {} Backup snapshot from an interrupted switch: {}",
                ui.icon_warn(),
                backup.display()
            ));
            clean = false;
        }

        let mut scan = vec![paths.install_root.clone()];
        scan.extend(list_dirs(&paths.profiles_dir));
        for dir in scan {
            for leftover in list_dirs(&dir).into_iter().filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(is_replace_leftover)
            }) {
                ui.println(format!(
                    "  {} Staging copy from an interrupted replace: {}",
                    ui.icon_warn(),
                    leftover.display()
                ));
                clean = false;
            }
        }

        if clean {
            ui.println(format!("  {} Nothing left behind", ui.icon_ok()));
        } else {
            ui.println("    Inspect these and delete them once the live folders look right.");
        }
        // Leftovers are advisory only
        true
    });

    healthy
}

fn list_dirs(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()))
        .map(|e| e.path())
        .collect();
    dirs.sort();
    dirs
}

fn check_step<F>(ui: &Ui, name: &str, check_fn: F) -> bool
where
    F: FnOnce() -> bool,
{
    ui.println(ui.bold(format!("Checking {}...", name)));
    let success = check_fn();
    if !success {
        ui.println(ui.paint_tone("  Issues detected!", Tone::Bad));
    }
    ui.newline();
    success
}
