//! Test utilities shared across test modules
//!
//! Fixture builders for installations and profiles, plus fault-injecting
//! [`TreeOps`] and [`ActiveMarker`] fakes for driving failure paths.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::error::{ProfileError, Result};
use crate::fs_utils::{LocalTree, TreeOps};
use crate::marker::ActiveMarker;
use crate::paths::Paths;

/// Paths for an installation at `<temp>/SaveGame` with `<temp>/SaveGame/Profiles`
pub fn setup_test_paths(temp_dir: &TempDir) -> Paths {
    Paths::for_install_root(temp_dir.path().join("SaveGame"))
}

pub fn create_dir_with_file(dir: &Path, file_name: &str, content: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join(file_name), content).unwrap();
}

/// Profile with `savegame/slot.sav` and `wraps/wrap.txt`
pub fn create_profile(profiles_dir: &Path, name: &str, save: &str, wrap: &str) {
    let root = profiles_dir.join(name);
    create_dir_with_file(&root.join("savegame"), "slot.sav", save);
    create_dir_with_file(&root.join("wraps"), "wrap.txt", wrap);
}

/// Live installation with `savegame/slot.sav` and `wraps/wrap.txt`
pub fn create_live(paths: &Paths, save: &str, wrap: &str) {
    create_dir_with_file(&paths.install_root.join("savegame"), "slot.sav", save);
    create_dir_with_file(&paths.install_root.join("wraps"), "wrap.txt", wrap);
}

pub fn assert_file_content(path: &Path, expected: &str) {
    let data = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("read file {}: {e}", path.display()));
    assert_eq!(data, expected, "content of {}", path.display());
}

/// Relative path -> content of every file below `root`; directories map to `None`
pub fn read_tree(root: &Path) -> BTreeMap<PathBuf, Option<String>> {
    fn walk(root: &Path, dir: &Path, out: &mut BTreeMap<PathBuf, Option<String>>) {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            let rel = path.strip_prefix(root).unwrap().to_path_buf();
            if path.is_dir() {
                out.insert(rel, None);
                walk(root, &path, out);
            } else {
                out.insert(rel, Some(fs::read_to_string(&path).unwrap()));
            }
        }
    }

    let mut out = BTreeMap::new();
    walk(root, root, &mut out);
    out
}

fn forced(what: &str) -> ProfileError {
    ProfileError::io(format!("forced {what} failure"), io::Error::other(what.to_string()))
}

/// Marker whose writes always fail; reads return `active` or "missing"
pub struct FailingMarker {
    pub active: Option<String>,
}

impl ActiveMarker for FailingMarker {
    fn read_active(&self) -> Result<String> {
        self.active.clone().ok_or_else(|| ProfileError::MarkerMissing {
            path: PathBuf::from("active_profile.txt"),
        })
    }

    fn write_active(&self, _name: &str) -> Result<()> {
        Err(forced("marker write"))
    }
}

/// Marker whose reads fail with an I/O error
pub struct UnreadableMarker;

impl ActiveMarker for UnreadableMarker {
    fn read_active(&self) -> Result<String> {
        Err(forced("marker read"))
    }

    fn write_active(&self, _name: &str) -> Result<()> {
        Err(forced("marker write"))
    }
}

/// [`LocalTree`] that fails selected calls, counted from 1 per operation
#[derive(Default)]
pub struct FaultyTree {
    fail_copy: Vec<usize>,
    fail_replace: Vec<usize>,
    fail_remove: Vec<usize>,
    copies: Cell<usize>,
    replaces: Cell<usize>,
    removes: Cell<usize>,
}

impl FaultyTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_copy(mut self, nth: usize) -> Self {
        self.fail_copy.push(nth);
        self
    }

    pub fn fail_replace(mut self, nth: usize) -> Self {
        self.fail_replace.push(nth);
        self
    }

    pub fn fail_remove(mut self, nth: usize) -> Self {
        self.fail_remove.push(nth);
        self
    }

    pub fn replace_calls(&self) -> usize {
        self.replaces.get()
    }
}

fn bump(counter: &Cell<usize>) -> usize {
    counter.set(counter.get() + 1);
    counter.get()
}

impl TreeOps for FaultyTree {
    fn copy_tree(&self, src: &Path, dst: &Path) -> Result<()> {
        if self.fail_copy.contains(&bump(&self.copies)) {
            return Err(forced("copy"));
        }
        LocalTree.copy_tree(src, dst)
    }

    fn replace_tree(&self, src: &Path, dst: &Path) -> Result<()> {
        if self.fail_replace.contains(&bump(&self.replaces)) {
            return Err(forced("replace"));
        }
        LocalTree.replace_tree(src, dst)
    }

    fn remove_tree(&self, path: &Path) -> Result<()> {
        if self.fail_remove.contains(&bump(&self.removes)) {
            return Err(forced("remove"));
        }
        LocalTree.remove_tree(path)
    }
}
