use std::path::{Path, PathBuf};

use serde::Serialize;

/// The two directory trees that make up a profile and the live installation.
///
/// Order matters: every multi-step operation handles `Savegame` before `Wraps`
/// so partial failures are deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Subtree {
    Savegame,
    Wraps,
}

impl Subtree {
    /// All subtrees in processing order
    pub const ALL: [Subtree; 2] = [Subtree::Savegame, Subtree::Wraps];

    /// Folder name on disk, identical under the install root and in a profile
    pub fn dir_name(&self) -> &'static str {
        match self {
            Subtree::Savegame => "savegame",
            Subtree::Wraps => "wraps",
        }
    }

    /// Get human-readable display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Subtree::Savegame => "Save data (savegame/)",
            Subtree::Wraps => "Cosmetics (wraps/)",
        }
    }

    /// Resolve this subtree below `root` (install root, profile dir or backup dir)
    pub fn under(&self, root: &Path) -> PathBuf {
        root.join(self.dir_name())
    }
}

impl std::fmt::Display for Subtree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}
