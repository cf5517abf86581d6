use std::path::PathBuf;

use thiserror::Error;

use crate::contract::{ObjectKind, RepositoryError};

/// Per-entry failure classes of a synchronisation run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Local file unreadable, or vanished between enumeration and upload.
    #[error("local I/O error on {}: {source}", path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The local tree could not be enumerated.
    #[error("failed to scan {}: {message}", path.display())]
    Scan { path: PathBuf, message: String },

    /// A create/delete call (or a required lookup) failed remotely.
    #[error("remote {operation} failed for {path}: {source}")]
    Remote {
        operation: &'static str,
        path: String,
        #[source]
        source: RepositoryError,
    },

    /// The remote path holds an object of the other kind.
    #[error("{path} exists as a {found}, expected a {expected}")]
    KindConflict {
        path: String,
        expected: ObjectKind,
        found: ObjectKind,
    },

    /// The parent folder of a path to be created does not exist remotely.
    #[error("parent folder {path} does not exist")]
    ParentMissing { path: String },
}

impl SyncError {
    /// Whether the run must stop even when per-entry failures are isolated.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SyncError::Remote { .. } | SyncError::ParentMissing { .. } | SyncError::Scan { .. }
        )
    }

    pub(crate) fn remote(
        operation: &'static str,
        path: impl Into<String>,
        source: RepositoryError,
    ) -> Self {
        SyncError::Remote {
            operation,
            path: path.into(),
            source,
        }
    }
}
