//! Directory tree operations.
//!
//! All content mutation of the live installation and of profile snapshots goes
//! through the [`TreeOps`] trait so the switch and lifecycle logic can be driven
//! against fault-injecting fakes in tests. [`LocalTree`] is the real
//! implementation on top of `std::fs`.

use chrono::Utc;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{IoContext, ProfileError, Result};

/// Marker inserted between the destination name and the timestamp of a
/// staging directory created by [`TreeOps::replace_tree`].
pub const REPLACE_TEMP_MARKER: &str = ".tmp-";

/// Copy, replace and remove whole directory trees.
pub trait TreeOps {
    /// Recursively copy `src` into `dst`, creating `dst` and its parents.
    ///
    /// # Errors
    /// - [`ProfileError::NotFound`] if `src` does not exist
    /// - [`ProfileError::NotADirectory`] if `src` is not a directory
    /// - [`ProfileError::SymlinkUnsupported`] if a symbolic link is found anywhere in the tree
    /// - the first I/O failure otherwise
    fn copy_tree(&self, src: &Path, dst: &Path) -> Result<()>;

    /// Make `dst` hold exactly the contents of `src`.
    ///
    /// The new tree is staged beside `dst` first; only then is `dst` removed and
    /// the staged copy renamed into place. If that final rename fails the staged
    /// copy is left on disk.
    fn replace_tree(&self, src: &Path, dst: &Path) -> Result<()>;

    /// Recursively delete `path`. A missing path is not an error.
    fn remove_tree(&self, path: &Path) -> Result<()>;
}

/// [`TreeOps`] against the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTree;

impl TreeOps for LocalTree {
    fn copy_tree(&self, src: &Path, dst: &Path) -> Result<()> {
        let meta = match fs::symlink_metadata(src) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ProfileError::NotFound {
                    path: src.to_path_buf(),
                });
            }
            Err(e) => {
                return Err(ProfileError::io(
                    format!("Failed to read metadata: {}", src.display()),
                    e,
                ));
            }
        };

        if meta.file_type().is_symlink() {
            return Err(ProfileError::SymlinkUnsupported {
                path: src.to_path_buf(),
            });
        }
        if !meta.is_dir() {
            return Err(ProfileError::NotADirectory {
                path: src.to_path_buf(),
            });
        }

        copy_dir_recursive(src, dst)
    }

    fn replace_tree(&self, src: &Path, dst: &Path) -> Result<()> {
        self.replace_tree_via(src, dst, |from, to| fs::rename(from, to))
    }

    fn remove_tree(&self, path: &Path) -> Result<()> {
        match fs::remove_dir_all(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ProfileError::io(
                format!("Failed to remove directory: {}", path.display()),
                e,
            )),
        }
    }
}

impl LocalTree {
    /// [`TreeOps::replace_tree`] with the final move into place supplied by the caller
    fn replace_tree_via(
        &self,
        src: &Path,
        dst: &Path,
        move_into_place: fn(&Path, &Path) -> io::Result<()>,
    ) -> Result<()> {
        let staging = staging_path(dst);
        debug!(src = %src.display(), dst = %dst.display(), staging = %staging.display(), "replacing tree");

        self.remove_tree(&staging)?;
        if let Err(e) = self.copy_tree(src, &staging) {
            if let Err(cleanup) = self.remove_tree(&staging) {
                warn!("failed to remove partial copy {}: {cleanup}", staging.display());
            }
            return Err(e);
        }

        self.remove_tree(dst)?;

        // From here on the staged copy is the only copy of the new content.
        move_into_place(&staging, dst).io_context(|| {
            format!(
                "Failed to move {} into place at {} (staged copy kept)",
                staging.display(),
                dst.display()
            )
        })
    }
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst)
        .io_context(|| format!("Failed to create destination directory: {}", dst.display()))?;

    let entries = fs::read_dir(src)
        .io_context(|| format!("Failed to read source directory: {}", src.display()))?;

    for entry in entries {
        let entry = entry.io_context(|| format!("Failed to read entry in {}", src.display()))?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        let file_type = entry
            .file_type()
            .io_context(|| format!("Failed to read file type: {}", src_path.display()))?;

        if file_type.is_symlink() {
            return Err(ProfileError::SymlinkUnsupported { path: src_path });
        } else if file_type.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            // fs::copy carries the permission bits over.
            fs::copy(&src_path, &dst_path).io_context(|| {
                format!(
                    "Failed to copy file: {} -> {}",
                    src_path.display(),
                    dst_path.display()
                )
            })?;
        }
    }

    Ok(())
}

/// Sibling staging location for `dst`: `<name>.tmp-<nanos>`.
fn staging_path(dst: &Path) -> PathBuf {
    let stamp = Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_else(|| Utc::now().timestamp_micros());
    let mut name = dst
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("tree"));
    name.push(format!("{REPLACE_TEMP_MARKER}{stamp}"));
    dst.with_file_name(name)
}

/// True if `name` looks like a staging directory left by an interrupted replace.
pub fn is_replace_leftover(name: &str) -> bool {
    name.rsplit_once(REPLACE_TEMP_MARKER)
        .is_some_and(|(base, stamp)| {
            !base.is_empty() && !stamp.is_empty() && stamp.chars().all(|c| c.is_ascii_digit())
        })
}

/// Recursively calculate the total size of a directory in bytes.
///
/// Symbolic links are not followed.
pub fn dir_size(path: &Path) -> io::Result<u64> {
    let mut total = 0;
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            total += dir_size(&entry.path())?;
        } else if file_type.is_file() {
            total += entry.metadata()?.len();
        }
    }
    Ok(total)
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{assert_file_content, create_dir_with_file, read_tree};
    use tempfile::TempDir;

    #[test]
    fn test_remove_missing_is_ok() {
        let temp_dir = TempDir::new().unwrap();
        let ops = LocalTree;
        assert!(ops.remove_tree(&temp_dir.path().join("nope")).is_ok());
        assert!(ops.remove_tree(&temp_dir.path().join("a/b/c")).is_ok());
    }

    #[test]
    fn test_copy_tree_nested() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("source");
        let dst = temp_dir.path().join("deep/destination");
        create_dir_with_file(&src.join("savegame"), "save1.sav", "save-content");
        create_dir_with_file(&src.join("wraps/cars"), "car-wrap.txt", "wrap-content");
        fs::create_dir_all(src.join("empty")).unwrap();

        LocalTree.copy_tree(&src, &dst).unwrap();

        assert_eq!(read_tree(&src), read_tree(&dst));
        assert_file_content(&dst.join("wraps/cars/car-wrap.txt"), "wrap-content");
        assert!(dst.join("empty").is_dir());
    }

    #[test]
    fn test_copy_tree_errors() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("source.txt");
        fs::write(&file, "not-a-dir").unwrap();

        let err = LocalTree
            .copy_tree(&file, &temp_dir.path().join("d1"))
            .unwrap_err();
        assert!(matches!(err, ProfileError::NotADirectory { .. }));

        let err = LocalTree
            .copy_tree(&temp_dir.path().join("missing"), &temp_dir.path().join("d2"))
            .unwrap_err();
        assert!(matches!(err, ProfileError::NotFound { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_tree_rejects_symlinks() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("source");
        create_dir_with_file(&src, "real.sav", "data");
        std::os::unix::fs::symlink(src.join("real.sav"), src.join("link.sav")).unwrap();

        let err = LocalTree
            .copy_tree(&src, &temp_dir.path().join("dst"))
            .unwrap_err();
        assert!(matches!(err, ProfileError::SymlinkUnsupported { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_tree_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("source");
        create_dir_with_file(&src, "run.sh", "#!/bin/sh");
        fs::set_permissions(src.join("run.sh"), fs::Permissions::from_mode(0o750)).unwrap();

        let dst = temp_dir.path().join("dst");
        LocalTree.copy_tree(&src, &dst).unwrap();

        let mode = fs::metadata(dst.join("run.sh")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o750);
    }

    #[test]
    fn test_replace_tree_shapes() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("source");
        create_dir_with_file(&src, "slot.sav", "new");
        create_dir_with_file(&src.join("sub"), "inner.txt", "inner");

        // Missing destination
        let missing = temp_dir.path().join("missing");
        LocalTree.replace_tree(&src, &missing).unwrap();
        assert_eq!(read_tree(&src), read_tree(&missing));

        // Deeper destination with different content
        let deeper = temp_dir.path().join("deeper");
        create_dir_with_file(&deeper.join("a/b/c"), "old.txt", "old");
        create_dir_with_file(&deeper, "slot.sav", "old");
        LocalTree.replace_tree(&src, &deeper).unwrap();
        assert_eq!(read_tree(&src), read_tree(&deeper));
        assert!(!deeper.join("a").exists());

        // Shallower destination
        let shallow = temp_dir.path().join("shallow");
        fs::create_dir_all(&shallow).unwrap();
        LocalTree.replace_tree(&src, &shallow).unwrap();
        assert_eq!(read_tree(&src), read_tree(&shallow));

        // No staging directories left behind
        let leftovers: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| is_replace_leftover(&e.file_name().to_string_lossy()))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_replace_tree_missing_source_keeps_destination() {
        let temp_dir = TempDir::new().unwrap();
        let dst = temp_dir.path().join("dst");
        create_dir_with_file(&dst, "slot.sav", "keep");

        let err = LocalTree
            .replace_tree(&temp_dir.path().join("missing"), &dst)
            .unwrap_err();
        assert!(matches!(err, ProfileError::NotFound { .. }));
        assert_file_content(&dst.join("slot.sav"), "keep");
    }

    #[test]
    fn test_replace_tree_keeps_staged_copy_when_final_move_fails() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("source");
        create_dir_with_file(&src, "slot.sav", "new");
        let dst = temp_dir.path().join("savegame");
        create_dir_with_file(&dst, "slot.sav", "old");

        let err = LocalTree
            .replace_tree_via(&src, &dst, |_, _| Err(io::Error::other("move refused")))
            .unwrap_err();
        assert!(matches!(err, ProfileError::Io { .. }));
        assert!(!dst.exists());

        let staged: Vec<PathBuf> = fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| is_replace_leftover(&e.file_name().to_string_lossy()))
            .map(|e| e.path())
            .collect();
        assert_eq!(staged.len(), 1);
        assert_eq!(read_tree(&staged[0]), read_tree(&src));
    }

    #[test]
    fn test_staging_path_is_sibling() {
        let staging = staging_path(Path::new("/games/SaveGame/savegame"));
        assert_eq!(staging.parent(), Some(Path::new("/games/SaveGame")));
        let name = staging.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("savegame.tmp-"));
        assert!(is_replace_leftover(&name));
        assert!(!is_replace_leftover("savegame"));
        assert!(!is_replace_leftover(".tmp-123"));
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.00 MB");
    }
}
