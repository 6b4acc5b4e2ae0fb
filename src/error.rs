//! Error types for profile operations.
//!
//! Every failure the library can report is a [`ProfileError`] variant. Callers
//! that only care about the broad category (show a hint, pick an exit code)
//! use [`ProfileError::kind`].

use std::io;
use std::path::PathBuf;

/// Broad failure category of a [`ProfileError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Empty/invalid profile name or missing required path.
    InputInvalid,
    /// Marker file, profile directory or live subtree is missing.
    NotFound,
    /// Target name taken, active profile deletion, installation locked.
    Conflict,
    /// Any other filesystem failure.
    IoFailure,
    /// A switch step failed and the live installation was restored.
    TransactionFailedRolledBack,
    /// A switch step failed and restoring the live installation failed too.
    TransactionFailedUnrecoverable,
}

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("profile name is required")]
    NameRequired,

    #[error("profile name '{0}' contains invalid characters")]
    NameInvalid(String),

    #[error("savegame path is required")]
    SaveGamePathRequired,

    #[error("profiles path is required")]
    ProfilesPathRequired,

    #[error("profile at {} must contain savegame and wraps folders", path.display())]
    InvalidLayout { path: PathBuf },

    #[error("not a directory: {}", path.display())]
    NotADirectory { path: PathBuf },

    #[error("path does not exist: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("symbolic links are not supported: {}", path.display())]
    SymlinkUnsupported { path: PathBuf },

    #[error("no active profile marker at {}", path.display())]
    MarkerMissing { path: PathBuf },

    #[error("root savegame folder is missing")]
    RootSavegameMissing,

    #[error("root wraps folder is missing")]
    RootWrapsMissing,

    #[error("profile '{0}' not found")]
    ProfileNotFound(String),

    #[error("profile '{0}' already exists")]
    ProfileAlreadyExists(String),

    #[error("cannot delete active profile '{0}'")]
    CannotDeleteActiveProfile(String),

    #[error("installation at {} is locked by another heatprof process", path.display())]
    Locked { path: PathBuf },

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid config file {}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The switch failed after mutating the installation, and the previous
    /// state was restored.
    #[error("switch to '{profile}' failed and was rolled back")]
    RolledBack {
        profile: String,
        #[source]
        source: Box<ProfileError>,
    },

    /// The switch failed and so did the restore. `backup` still holds the
    /// pre-switch snapshot when it could be kept.
    #[error(
        "switch to '{profile}' failed: {source}; rollback failed: {rollback} (backup kept at {})",
        backup.display()
    )]
    Unrecoverable {
        profile: String,
        #[source]
        source: Box<ProfileError>,
        rollback: Box<ProfileError>,
        backup: PathBuf,
    },
}

impl ProfileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NameRequired
            | Self::NameInvalid(_)
            | Self::SaveGamePathRequired
            | Self::ProfilesPathRequired
            | Self::InvalidLayout { .. }
            | Self::NotADirectory { .. }
            | Self::SymlinkUnsupported { .. }
            | Self::Config { .. } => ErrorKind::InputInvalid,
            Self::NotFound { .. }
            | Self::MarkerMissing { .. }
            | Self::RootSavegameMissing
            | Self::RootWrapsMissing
            | Self::ProfileNotFound(_) => ErrorKind::NotFound,
            Self::ProfileAlreadyExists(_)
            | Self::CannotDeleteActiveProfile(_)
            | Self::Locked { .. } => ErrorKind::Conflict,
            Self::Io { .. } => ErrorKind::IoFailure,
            Self::RolledBack { .. } => ErrorKind::TransactionFailedRolledBack,
            Self::Unrecoverable { .. } => ErrorKind::TransactionFailedUnrecoverable,
        }
    }

    /// Whether a rollback was attempted, successful or not.
    pub fn rolled_back(&self) -> bool {
        matches!(self, Self::RolledBack { .. } | Self::Unrecoverable { .. })
    }

    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Attach a context message to a raw `io::Result`.
pub(crate) trait IoContext<T> {
    fn io_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> IoContext<T> for io::Result<T> {
    fn io_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|source| ProfileError::io(f(), source))
    }
}

pub type Result<T, E = ProfileError> = std::result::Result<T, E>;
