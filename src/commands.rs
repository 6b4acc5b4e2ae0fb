//! High-level command orchestration for the CLI.
//!
//! Each function here corresponds to a subcommand in `main.rs`. They wire the
//! real filesystem collaborators into [`Switcher`] and [`Lifecycle`], hold the
//! install lock around anything that mutates the installation, and turn
//! results into terminal output through [`Ui`].

use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::components::Subtree;
use crate::config::Config;
use crate::doctor::run_doctor;
use crate::error::{ErrorKind, ProfileError};
use crate::fs_utils::{LocalTree, dir_size, format_bytes};
use crate::lifecycle::Lifecycle;
use crate::lock::InstallLock;
use crate::marker::{MarkerFile, active_profile};
use crate::paths::Paths;
use crate::profiles::{Catalog, validate_profile_name};
use crate::switch::Switcher;
use crate::ui::{Tone, Ui};

fn marker(paths: &Paths) -> MarkerFile {
    MarkerFile::new(paths.marker_file())
}

fn switcher(paths: &Paths) -> Switcher<MarkerFile, LocalTree> {
    Switcher::new(paths.clone(), marker(paths), LocalTree)
}

fn lifecycle(paths: &Paths) -> Lifecycle<MarkerFile, LocalTree> {
    Lifecycle::new(paths.clone(), marker(paths), LocalTree)
}

fn lock(paths: &Paths) -> Result<InstallLock> {
    paths.validate()?;
    Ok(InstallLock::acquire(&paths.lock_file())?)
}

/// Attach a next-step hint to errors where there is an obvious one
fn with_hint(err: ProfileError) -> anyhow::Error {
    let hint = match &err {
        ProfileError::ProfileNotFound(_) | ProfileError::InvalidLayout { .. } => {
            Some("Use 'heatprof list' to see available profiles.")
        }
        ProfileError::CannotDeleteActiveProfile(_) => {
            Some("Switch to another profile first with 'heatprof use <other-profile>'.")
        }
        ProfileError::RootSavegameMissing | ProfileError::RootWrapsMissing => {
            Some("Start the game once so it creates its save folders, or check 'heatprof path'.")
        }
        ProfileError::MarkerMissing { .. } => {
            Some("No profile is active yet. Pass a name: 'heatprof save <name>'.")
        }
        ProfileError::SaveGamePathRequired => {
            Some("Set the installation root with 'heatprof path set <dir>'.")
        }
        ProfileError::Locked { .. } => Some("Wait for the other heatprof command to finish."),
        ProfileError::Unrecoverable { .. } => Some(
            "The installation may be inconsistent. Restore savegame/ and wraps/ from the backup shown above by hand.",
        ),
        _ => None,
    };

    match hint {
        Some(hint) => anyhow::Error::new(err).context(format!("Hint: {hint}")),
        None => anyhow::Error::new(err),
    }
}

#[derive(Debug, Serialize)]
struct ProfileRow {
    name: String,
    path: PathBuf,
    active: bool,
    size_bytes: Option<u64>,
}

/// List all available profiles
pub fn list(paths: &Paths, ui: &Ui, json: bool) -> Result<()> {
    let profiles = Catalog::new(&paths.profiles_dir).list().map_err(with_hint)?;
    let active = match active_profile(&marker(paths)) {
        Ok(active) => active,
        Err(e) if json => {
            warn!("cannot read active profile: {e}");
            None
        }
        Err(e) => {
            ui.warn(format!("Cannot read active profile: {e}"));
            None
        }
    };

    let rows: Vec<ProfileRow> = profiles
        .into_iter()
        .map(|p| ProfileRow {
            active: active.as_deref() == Some(p.name.as_str()),
            size_bytes: dir_size(&p.path).ok(),
            name: p.name,
            path: p.path,
        })
        .collect();

    if json {
        ui.println(serde_json::to_string_pretty(&rows).context("Failed to serialize profiles")?);
        return Ok(());
    }

    if rows.is_empty() {
        ui.warn("No profiles found.");
        ui.newline();
        ui.println("Create one from the current game state with:");
        ui.println(format!("  {} save <name>", ui.bold("heatprof")));
        return Ok(());
    }

    let mut table = ui.simple_table();
    table.set_header(vec![
        ui.header_cell(""),
        ui.header_cell("Profile"),
        ui.header_cell("Size"),
        ui.header_cell("Status"),
    ]);

    for row in &rows {
        let icon = if row.active { ui.icon_ok() } else { " " };
        let status = if row.active {
            ui.tone_cell("active", Tone::Good)
        } else {
            ui.cell("-")
        };
        let size = row
            .size_bytes
            .map(format_bytes)
            .unwrap_or_else(|| "?".to_string());

        table.add_row(vec![ui.cell(icon), ui.cell(&row.name), ui.cell(size), status]);
    }

    ui.section("Profiles");
    ui.println(table.to_string());

    if let Some(name) = active.filter(|a| !rows.iter().any(|r| &r.name == a)) {
        ui.newline();
        ui.info(format!(
            "Active profile '{name}' has no saved snapshot yet. Save it with 'heatprof save'."
        ));
    }

    Ok(())
}

/// Show the active profile and the state of the live folders
pub fn current(paths: &Paths, ui: &Ui) -> Result<()> {
    let active = active_profile(&marker(paths))?;

    ui.section("Current Profile");
    ui.newline();

    let mut table = ui.simple_table();
    match &active {
        Some(name) => {
            table.add_row(vec![ui.cell("Active profile:"), ui.header_cell(name)]);
            let saved = crate::profiles::validate_layout(&paths.profile_dir(name)).is_ok();
            let saved_cell = if saved {
                ui.tone_cell("yes", Tone::Good)
            } else {
                ui.tone_cell("no snapshot", Tone::Caution)
            };
            table.add_row(vec![ui.cell("Saved:"), saved_cell]);
        }
        None => {
            table.add_row(vec![ui.cell("Active profile:"), ui.cell("(none)")]);
        }
    }

    table.add_row(vec![
        ui.cell("Installation:"),
        ui.cell(paths.install_root.display().to_string()),
    ]);

    for subtree in Subtree::ALL {
        let live = paths.live(subtree);
        let status = if live.is_dir() {
            let size = dir_size(&live)
                .map(format_bytes)
                .unwrap_or_else(|_| "?".to_string());
            ui.cell(format!("present ({size})"))
        } else {
            ui.tone_cell("missing", Tone::Caution)
        };
        table.add_row(vec![ui.cell(format!("{}:", subtree.display_name())), status]);
    }

    ui.println(table.to_string());
    Ok(())
}

/// Switch the live installation to a profile
pub fn use_profile(paths: &Paths, name: &str, ui: &Ui, json: bool) -> Result<()> {
    let _lock = lock(paths)?;

    let spinner = ui.spinner(format!("Switching to profile '{}'...", name.trim()));
    match switcher(paths).switch(name) {
        Ok(outcome) => {
            if json {
                spinner.finish_and_clear();
                ui.println(
                    serde_json::to_string_pretty(&outcome).context("Failed to serialize result")?,
                );
            } else {
                ui.spinner_finish_ok(
                    &spinner,
                    format!("Active profile: {}", outcome.profile_name),
                );
            }
            Ok(())
        }
        Err(e) => {
            match e.kind() {
                ErrorKind::TransactionFailedRolledBack => ui.spinner_finish_err(
                    &spinner,
                    "Switch failed; your previous save data was restored",
                ),
                ErrorKind::TransactionFailedUnrecoverable => ui.spinner_finish_err(
                    &spinner,
                    "Switch failed and could not be rolled back",
                ),
                _ => ui.spinner_finish_err(&spinner, format!("Failed to switch: {e}")),
            }
            Err(with_hint(e))
        }
    }
}

/// Save the live installation as a profile (the active one if no name is given)
pub fn save(paths: &Paths, name: Option<&str>, ui: &Ui) -> Result<()> {
    let _lock = lock(paths)?;

    let spinner = ui.spinner("Saving current game state...");
    match lifecycle(paths).save_current_profile(name.unwrap_or_default()) {
        Ok(saved) => {
            ui.spinner_finish_ok(&spinner, format!("Saved current game state as '{saved}'"));
            Ok(())
        }
        Err(e) => {
            spinner.finish_and_clear();
            Err(with_hint(e))
        }
    }
}

/// Rename a profile
pub fn rename(paths: &Paths, old_name: &str, new_name: &str, ui: &Ui) -> Result<()> {
    let _lock = lock(paths)?;
    lifecycle(paths)
        .rename_profile(old_name, new_name)
        .map_err(with_hint)?;

    ui.ok(format!(
        "Renamed profile '{}' to '{}'",
        old_name.trim(),
        new_name.trim()
    ));
    Ok(())
}

/// Remove a profile, asking first unless `force`
pub fn remove(paths: &Paths, name: &str, ui: &Ui, force: bool) -> Result<()> {
    let name = validate_profile_name(name)?;

    if !force {
        let confirm = inquire::Confirm::new(&format!(
            "Are you sure you want to remove profile '{name}'?"
        ))
        .with_default(false)
        .with_help_message("This permanently deletes the profile's savegame and wraps")
        .prompt()
        .context("Confirmation cancelled")?;

        if !confirm {
            ui.warn("Removal cancelled.");
            return Ok(());
        }
    }

    let _lock = lock(paths)?;
    lifecycle(paths).delete_profile(&name).map_err(with_hint)?;

    ui.ok(format!("Removed profile '{name}'"));
    Ok(())
}

/// Clear the live folders and start a new profile from scratch
pub fn fresh(paths: &Paths, name: &str, ui: &Ui, force: bool) -> Result<()> {
    let name = validate_profile_name(name)?;

    // The unsaved check and the removal must see the same installation.
    let _lock = lock(paths)?;
    let active = active_profile(&marker(paths)).map_err(with_hint)?;
    let unsaved = active
        .as_deref()
        .is_some_and(|a| crate::profiles::validate_layout(&paths.profile_dir(a)).is_err());
    if unsaved && !force {
        bail!(
            "Active profile '{}' has no saved snapshot; its save data would be lost.\nHint: Run 'heatprof save' first, or pass --force.",
            active.unwrap_or_default()
        );
    }

    lifecycle(paths)
        .prepare_fresh_profile(&name)
        .map_err(with_hint)?;

    ui.ok(format!("Started fresh profile '{name}'"));
    ui.println(ui.dim("Launch the game to create new save data, then run 'heatprof save'."));
    Ok(())
}

/// Show the installation root and profiles folder in use
pub fn show_path(paths: &Paths, config_path: Option<&Path>, ui: &Ui) -> Result<()> {
    let mut table = ui.simple_table();
    table.add_row(vec![
        ui.cell("Installation:"),
        ui.cell(paths.install_root.display().to_string()),
    ]);
    table.add_row(vec![
        ui.cell("Profiles:"),
        ui.cell(paths.profiles_dir.display().to_string()),
    ]);
    if let Some(config_path) = config_path {
        table.add_row(vec![
            ui.cell("Config file:"),
            ui.cell(config_path.display().to_string()),
        ]);
    }
    ui.println(table.to_string());
    Ok(())
}

/// Persist a new installation root
pub fn set_path(config_path: &Path, dir: &str, ui: &Ui) -> Result<()> {
    let mut config = Config::read(config_path)?;
    config.set_save_game_path(dir)?;
    config.write(config_path)?;

    if let Some(root) = &config.save_game_path {
        if !root.is_dir() {
            ui.warn(format!("{} does not exist yet", root.display()));
        }
        ui.ok(format!("Installation root set to {}", root.display()));
    }
    Ok(())
}

/// Run diagnostics
pub fn doctor(paths: &Paths, ui: &Ui) -> Result<()> {
    if run_doctor(paths, ui) {
        Ok(())
    } else {
        bail!("heatprof doctor found problems")
    }
}
