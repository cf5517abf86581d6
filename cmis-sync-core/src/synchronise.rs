//! High-level pipeline: mirrors a local directory tree into the repository.
//!
//! This module drives one synchronisation run. It:
//!   - Enumerates the local tree in pre-order (root first, siblings sorted)
//!   - Maps every entry to its remote destination path
//!   - Ensures a remote folder for every directory and a remote document for
//!     every file, applying the configured overwrite policy
//!   - Records one [`EntryReport`] per entry and aggregates them into a
//!     [`SynchroniseReport`]
//!
//! # Error Handling
//! Remote protocol failures always stop the walk. Local I/O failures (including
//! entries the scan could not read) and folder/document kind conflicts are
//! recorded against their entry and the
//! walk continues, unless [`SynchroniseConfig::fail_fast`] is set, in which
//! case the first failure of any kind stops it. Either way the report's
//! failure count decides the caller's exit status.
//!
//! # Concurrency
//! Strictly sequential: one remote call at a time on the single repository
//! value passed in by the caller.
//!
//! # Navigation
//! - Main entrypoint: [`synchronise`]
//! - Pre-enumerated variant: [`synchronise_entries`]

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::contract::{ContentDetector, Repository};
use crate::error::SyncError;
use crate::path_map::{map_file_path, map_path, normalise_root, split_parent};
use crate::reconcile::{
    ensure_document, ensure_folder, ensure_folder_path, DocumentOutcome, ExistingDocumentPolicy,
    FolderOutcome,
};
use crate::scan::{scan_tree, LocalEntry};

/// The top-level synchronise configuration.
#[derive(Debug, Clone)]
pub struct SynchroniseConfig {
    /// Local directory to mirror.
    pub local_root: PathBuf,
    /// Remote folder the tree is mirrored into. Assumed to exist.
    pub dest_root: String,
    /// Leading relative path segments to drop before mapping.
    pub skip_segments: usize,
    /// Replace existing documents (delete, then create).
    pub overwrite: bool,
    /// Without `overwrite`, create a second document next to an existing one
    /// instead of skipping it.
    pub allow_duplicates: bool,
    /// Stop at the first failure of any kind.
    pub fail_fast: bool,
}

impl SynchroniseConfig {
    pub fn new(local_root: impl Into<PathBuf>, dest_root: impl Into<String>) -> Self {
        Self {
            local_root: local_root.into(),
            dest_root: dest_root.into(),
            skip_segments: 0,
            overwrite: false,
            allow_duplicates: false,
            fail_fast: false,
        }
    }

    pub fn existing_document_policy(&self) -> ExistingDocumentPolicy {
        ExistingDocumentPolicy::from_flags(self.overwrite, self.allow_duplicates)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntryOutcome {
    /// The local root, or a directory mapped onto the destination root.
    SkippedRoot,
    CreatedFolder,
    ExistingFolder,
    Uploaded,
    Replaced,
    SkippedExisting,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntryReport {
    pub local_path: PathBuf,
    pub remote_path: String,
    pub outcome: EntryOutcome,
    pub remote_id: Option<String>,
    pub mime_type: Option<String>,
    pub error: Option<String>,
}

/// Result of a run.
#[derive(Debug, Default, Serialize)]
pub struct SynchroniseReport {
    pub entries: Vec<EntryReport>,
    /// Set when the walk stopped before every entry was processed.
    pub aborted: bool,
}

impl SynchroniseReport {
    fn count(&self, outcome: EntryOutcome) -> usize {
        self.entries.iter().filter(|e| e.outcome == outcome).count()
    }

    pub fn folders_created(&self) -> usize {
        self.count(EntryOutcome::CreatedFolder)
    }

    pub fn documents_uploaded(&self) -> usize {
        self.count(EntryOutcome::Uploaded) + self.count(EntryOutcome::Replaced)
    }

    pub fn skipped(&self) -> usize {
        self.count(EntryOutcome::SkippedRoot)
            + self.count(EntryOutcome::ExistingFolder)
            + self.count(EntryOutcome::SkippedExisting)
    }

    pub fn failed(&self) -> usize {
        self.count(EntryOutcome::Failed)
    }

    pub fn is_success(&self) -> bool {
        !self.aborted && self.failed() == 0
    }
}

/// Entrypoint: scan `config.local_root` and mirror it into the repository.
///
/// Returns `Err` only when the local tree cannot be enumerated; per-entry
/// failures are in the report.
pub async fn synchronise<R, D>(
    config: &SynchroniseConfig,
    repo: &R,
    detector: &D,
) -> Result<SynchroniseReport, SyncError>
where
    R: Repository + ?Sized,
    D: ContentDetector + ?Sized,
{
    info!(
        local_root = %config.local_root.display(),
        dest_root = %config.dest_root,
        skip_segments = config.skip_segments,
        overwrite = config.overwrite,
        "[SYNC] Starting synchronisation"
    );
    let entries = scan_tree(&config.local_root).map_err(|e| {
        error!(error = %e, "[SYNC][ERROR] Failed to enumerate local tree");
        e
    })?;
    Ok(synchronise_entries(config, &entries, repo, detector).await)
}

/// Mirror already enumerated entries. The first entry is taken to be the
/// local root and is never reconciled.
pub async fn synchronise_entries<R, D>(
    config: &SynchroniseConfig,
    entries: &[LocalEntry],
    repo: &R,
    detector: &D,
) -> SynchroniseReport
where
    R: Repository + ?Sized,
    D: ContentDetector + ?Sized,
{
    let dest_root = normalise_root(&config.dest_root);
    let policy = config.existing_document_policy();
    let mut report = SynchroniseReport::default();

    for (index, entry) in entries.iter().enumerate() {
        if index == 0 {
            debug!(path = %entry.absolute_path.display(), "[SYNC] Skipping local root");
            report.entries.push(EntryReport {
                local_path: entry.absolute_path.clone(),
                remote_path: dest_root.clone(),
                outcome: EntryOutcome::SkippedRoot,
                remote_id: None,
                mime_type: None,
                error: None,
            });
            continue;
        }

        let result = if let Some(message) = &entry.scan_error {
            Err(unreadable_entry(config, entry, message))
        } else if entry.is_directory {
            sync_directory(config, &dest_root, entry, repo).await
        } else {
            sync_file(config, &dest_root, entry, repo, detector, policy).await
        };

        match result {
            Ok(entry_report) => report.entries.push(entry_report),
            Err((remote_path, e)) => {
                error!(
                    source = %entry.absolute_path.display(),
                    destination = %remote_path,
                    error = %e,
                    "[SYNC][ERROR] Entry failed"
                );
                let stop = config.fail_fast || e.is_fatal();
                report.entries.push(EntryReport {
                    local_path: entry.absolute_path.clone(),
                    remote_path,
                    outcome: EntryOutcome::Failed,
                    remote_id: None,
                    mime_type: None,
                    error: Some(e.to_string()),
                });
                if stop {
                    warn!(
                        remaining = entries.len() - index - 1,
                        "[SYNC][ERROR] Stopping synchronisation"
                    );
                    report.aborted = true;
                    break;
                }
            }
        }
    }

    info!(
        folders_created = report.folders_created(),
        documents_uploaded = report.documents_uploaded(),
        skipped = report.skipped(),
        failed = report.failed(),
        aborted = report.aborted,
        "[SYNC] Synchronisation finished"
    );
    match serde_json::to_string_pretty(&report) {
        Ok(json) => debug!(json = %json, "[SYNC][DEBUG] Report as JSON"),
        Err(e) => debug!(error = ?e, "[SYNC][DEBUG] Failed to serialize report as JSON"),
    }
    report
}

type EntryResult = Result<EntryReport, (String, SyncError)>;

async fn sync_directory<R>(
    config: &SynchroniseConfig,
    dest_root: &str,
    entry: &LocalEntry,
    repo: &R,
) -> EntryResult
where
    R: Repository + ?Sized,
{
    let remote_path = remote_path_for(config, entry, map_path)?;
    if remote_path == dest_root {
        debug!(path = %entry.absolute_path.display(), "[SYNC] Directory maps onto destination root, skipping");
        return Ok(report_for(entry, remote_path, EntryOutcome::SkippedRoot, None, None));
    }

    let Some((parent, name)) = split_parent(&remote_path) else {
        return Ok(report_for(entry, remote_path, EntryOutcome::SkippedRoot, None, None));
    };
    info!(source = %entry.absolute_path.display(), name = %name, parent = %parent, "[SYNC][FOLDER] Ensuring folder");

    match ensure_folder(repo, &parent, &name).await {
        Ok(FolderOutcome::Created(folder)) => Ok(report_for(
            entry,
            remote_path,
            EntryOutcome::CreatedFolder,
            Some(folder.id),
            None,
        )),
        Ok(FolderOutcome::Existing(folder)) => Ok(report_for(
            entry,
            remote_path,
            EntryOutcome::ExistingFolder,
            Some(folder.id),
            None,
        )),
        Err(e) => Err((remote_path, e)),
    }
}

async fn sync_file<R, D>(
    config: &SynchroniseConfig,
    dest_root: &str,
    entry: &LocalEntry,
    repo: &R,
    detector: &D,
    policy: ExistingDocumentPolicy,
) -> EntryResult
where
    R: Repository + ?Sized,
    D: ContentDetector + ?Sized,
{
    let remote_path = remote_path_for(config, entry, map_file_path)?;
    let parent_path = split_parent(&remote_path)
        .map(|(parent, _)| parent)
        .unwrap_or_else(|| dest_root.to_string());
    info!(
        source = %entry.absolute_path.display(),
        parent = %parent_path,
        size = entry.size_bytes,
        "[SYNC][UPLOAD] Ensuring document"
    );

    let parent = match ensure_folder_path(repo, &parent_path).await {
        Ok(FolderOutcome::Created(folder)) => {
            info!(path = %folder.path, id = %folder.id, "[SYNC][FOLDER] Created missing parent folder");
            folder
        }
        Ok(FolderOutcome::Existing(folder)) => folder,
        Err(e) => return Err((remote_path, e)),
    };

    match ensure_document(
        repo,
        detector,
        &parent,
        &entry.absolute_path,
        &remote_path,
        policy,
    )
    .await
    {
        Ok(DocumentOutcome::Uploaded {
            document,
            mime_type,
        }) => Ok(report_for(
            entry,
            remote_path,
            EntryOutcome::Uploaded,
            Some(document.id),
            Some(mime_type),
        )),
        Ok(DocumentOutcome::Replaced {
            document,
            mime_type,
            ..
        }) => Ok(report_for(
            entry,
            remote_path,
            EntryOutcome::Replaced,
            Some(document.id),
            Some(mime_type),
        )),
        Ok(DocumentOutcome::SkippedExisting(existing)) => Ok(report_for(
            entry,
            remote_path,
            EntryOutcome::SkippedExisting,
            Some(existing.id),
            None,
        )),
        Err(e) => Err((remote_path, e)),
    }
}

fn unreadable_entry(
    config: &SynchroniseConfig,
    entry: &LocalEntry,
    message: &str,
) -> (String, SyncError) {
    let remote_path = map_file_path(
        &config.local_root,
        &entry.absolute_path,
        &config.dest_root,
        config.skip_segments,
    )
    .unwrap_or_default();
    (
        remote_path,
        SyncError::LocalIo {
            path: entry.absolute_path.clone(),
            source: std::io::Error::other(message.to_string()),
        },
    )
}

fn remote_path_for(
    config: &SynchroniseConfig,
    entry: &LocalEntry,
    mapper: fn(&Path, &Path, &str, usize) -> Option<String>,
) -> Result<String, (String, SyncError)> {
    mapper(
        &config.local_root,
        &entry.absolute_path,
        &config.dest_root,
        config.skip_segments,
    )
    .ok_or_else(|| {
        (
            String::new(),
            SyncError::Scan {
                path: entry.absolute_path.clone(),
                message: format!("not under {}", config.local_root.display()),
            },
        )
    })
}

fn report_for(
    entry: &LocalEntry,
    remote_path: String,
    outcome: EntryOutcome,
    remote_id: Option<String>,
    mime_type: Option<String>,
) -> EntryReport {
    EntryReport {
        local_path: entry.absolute_path.clone(),
        remote_path,
        outcome,
        remote_id,
        mime_type,
        error: None,
    }
}
