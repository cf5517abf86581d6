//! Recursive enumeration of the local tree.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::error::SyncError;

/// One enumerated local filesystem entry. A snapshot taken at scan time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalEntry {
    pub absolute_path: PathBuf,
    pub is_directory: bool,
    /// Byte length; `0` for directories.
    pub size_bytes: u64,
    /// Set when the entry was found but could not be read during the scan
    /// (broken symlink, permission denied, symlink loop).
    pub scan_error: Option<String>,
}

impl LocalEntry {
    pub fn file_name(&self) -> String {
        self.absolute_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn unreadable(path: PathBuf, message: String) -> Self {
        Self {
            absolute_path: path,
            is_directory: false,
            size_bytes: 0,
            scan_error: Some(message),
        }
    }
}

/// Enumerate `root` and everything below it in pre-order, root first,
/// siblings sorted by file name.
///
/// Symlinks are followed; loops are detected and reported. An entry below
/// the root that cannot be read is returned with `scan_error` set so the
/// run can record it and carry on. Only an unreadable root is an error.
pub fn scan_tree(root: &Path) -> Result<Vec<LocalEntry>, SyncError> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(SyncError::Scan {
                    path: root.to_path_buf(),
                    message: e.to_string(),
                });
            }
            Err(e) => {
                let path = e.path().unwrap_or(root).to_path_buf();
                warn!(path = %path.display(), error = %e, "[SYNC] Unreadable local entry");
                entries.push(LocalEntry::unreadable(path, e.to_string()));
                continue;
            }
        };
        let file_type = entry.file_type();
        if !file_type.is_dir() && !file_type.is_file() {
            warn!(path = %entry.path().display(), "[SYNC] Skipping entry that is neither file nor directory");
            continue;
        }
        if file_type.is_dir() {
            entries.push(LocalEntry {
                absolute_path: entry.into_path(),
                is_directory: true,
                size_bytes: 0,
                scan_error: None,
            });
            continue;
        }
        match entry.metadata() {
            Ok(metadata) => entries.push(LocalEntry {
                absolute_path: entry.into_path(),
                is_directory: false,
                size_bytes: metadata.len(),
                scan_error: None,
            }),
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "[SYNC] Unreadable local entry");
                entries.push(LocalEntry::unreadable(entry.into_path(), e.to_string()));
            }
        }
    }
    info!(root = %root.display(), count = entries.len(), "Scanned local tree");
    Ok(entries)
}
