//! Folder and document reconcilers.
//!
//! Both follow check-then-act: a fresh existence lookup, then at most one
//! create (and, for replaced documents, one delete). The repository offers
//! no transactional create-if-absent, so another writer (or a lookup that
//! failed open) can leave an object in place between the lookup and the
//! create. A rejected folder create is therefore followed by a second
//! lookup, and a folder found there is adopted instead of failing the run.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::contract::{ContentDetector, NewDocument, ObjectKind, RemoteObjectRef, Repository};
use crate::detect::detect_content_type;
use crate::error::SyncError;
use crate::path_map::{join_remote, normalise_root, split_parent};
use crate::resolver::exists;

/// What [`ensure_folder`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderOutcome {
    Created(RemoteObjectRef),
    Existing(RemoteObjectRef),
}

impl FolderOutcome {
    pub fn folder(&self) -> &RemoteObjectRef {
        match self {
            FolderOutcome::Created(f) | FolderOutcome::Existing(f) => f,
        }
    }

    pub fn into_folder(self) -> RemoteObjectRef {
        match self {
            FolderOutcome::Created(f) | FolderOutcome::Existing(f) => f,
        }
    }
}

/// Ensure a folder called `name` exists under `parent_path`.
///
/// An existing folder is returned untouched. When absent, the parent is
/// looked up (the repository root when `parent_path` is empty or `/`) and
/// must already exist.
pub async fn ensure_folder<R>(
    repo: &R,
    parent_path: &str,
    name: &str,
) -> Result<FolderOutcome, SyncError>
where
    R: Repository + ?Sized,
{
    let parent_path = normalise_root(parent_path);
    let target = join_remote(&parent_path, &[name]);

    if let Some(found) = exists(repo, &target).await {
        let found = expect_folder(&target, found)?;
        info!(path = %target, id = %found.id, "[SYNC][FOLDER] Folder already exists, nothing to do");
        return Ok(FolderOutcome::Existing(found));
    }

    let parent = resolve_parent(repo, &parent_path).await?;
    create_or_adopt(repo, &parent, &target, name).await
}

/// Ensure the folder at the full `remote_path` exists, creating every missing
/// ancestor from the nearest existing one down. The root always exists.
pub async fn ensure_folder_path<R>(repo: &R, remote_path: &str) -> Result<FolderOutcome, SyncError>
where
    R: Repository + ?Sized,
{
    let remote_path = normalise_root(remote_path);
    let mut missing: Vec<(String, String)> = Vec::new();
    let mut current = remote_path.clone();

    let mut folder = loop {
        let Some((parent, name)) = split_parent(&current) else {
            break repo
                .root_folder()
                .await
                .map_err(|e| SyncError::remote("root folder lookup", "/", e))?;
        };
        if let Some(found) = exists(repo, &current).await {
            break expect_folder(&current, found)?;
        }
        missing.push((current, name));
        current = parent;
    };

    if missing.is_empty() {
        debug!(path = %remote_path, id = %folder.id, "[SYNC][FOLDER] Folder exists");
        return Ok(FolderOutcome::Existing(folder));
    }

    let mut created_any = false;
    for (target, name) in missing.into_iter().rev() {
        folder = match create_or_adopt(repo, &folder, &target, &name).await? {
            FolderOutcome::Created(created) => {
                created_any = true;
                created
            }
            FolderOutcome::Existing(existing) => existing,
        };
    }
    Ok(if created_any {
        FolderOutcome::Created(folder)
    } else {
        FolderOutcome::Existing(folder)
    })
}

/// Create `name` under `parent`. When the create is rejected but a folder
/// now sits at `target`, that folder is adopted.
async fn create_or_adopt<R>(
    repo: &R,
    parent: &RemoteObjectRef,
    target: &str,
    name: &str,
) -> Result<FolderOutcome, SyncError>
where
    R: Repository + ?Sized,
{
    debug!(name, parent = %parent.path, "[SYNC][FOLDER] Creating folder");
    match repo.create_folder(parent, name).await {
        Ok(created) => {
            info!(path = %target, id = %created.id, "[SYNC][FOLDER] Created folder");
            Ok(FolderOutcome::Created(created))
        }
        Err(e) => match exists(repo, target).await {
            Some(found) => {
                let found = expect_folder(target, found)?;
                warn!(
                    path = %target,
                    id = %found.id,
                    error = %e,
                    "[SYNC][FOLDER] Create rejected but folder exists, using it"
                );
                Ok(FolderOutcome::Existing(found))
            }
            None => Err(SyncError::remote("create folder", target, e)),
        },
    }
}

fn expect_folder(path: &str, found: RemoteObjectRef) -> Result<RemoteObjectRef, SyncError> {
    if found.is_folder() {
        Ok(found)
    } else {
        Err(SyncError::KindConflict {
            path: path.to_string(),
            expected: ObjectKind::Folder,
            found: found.kind,
        })
    }
}

async fn resolve_parent<R>(repo: &R, parent_path: &str) -> Result<RemoteObjectRef, SyncError>
where
    R: Repository + ?Sized,
{
    if parent_path == "/" {
        return repo
            .root_folder()
            .await
            .map_err(|e| SyncError::remote("root folder lookup", "/", e));
    }
    match exists(repo, parent_path).await {
        Some(parent) => expect_folder(parent_path, parent),
        None => Err(SyncError::ParentMissing {
            path: parent_path.to_string(),
        }),
    }
}

/// What to do when a document already exists at the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ExistingDocumentPolicy {
    /// Leave it alone.
    #[default]
    Skip,
    /// Delete it, then create the new one.
    Replace,
    /// Create another document next to it (only where the repository
    /// allows duplicate names).
    Duplicate,
}

impl ExistingDocumentPolicy {
    pub fn from_flags(overwrite: bool, allow_duplicates: bool) -> Self {
        match (overwrite, allow_duplicates) {
            (true, _) => ExistingDocumentPolicy::Replace,
            (false, true) => ExistingDocumentPolicy::Duplicate,
            (false, false) => ExistingDocumentPolicy::Skip,
        }
    }
}

/// What [`ensure_document`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentOutcome {
    Uploaded {
        document: RemoteObjectRef,
        mime_type: String,
    },
    Replaced {
        previous: RemoteObjectRef,
        document: RemoteObjectRef,
        mime_type: String,
    },
    SkippedExisting(RemoteObjectRef),
}

/// Ensure a document with the contents of `local_file` exists at
/// `remote_path` inside `parent`, applying `policy` to an existing one.
///
/// The content type is detected through its own file handle; the upload
/// opens a second one. Both are dropped on every exit path. On replace the
/// local file is opened before the remote document is deleted.
pub async fn ensure_document<R, D>(
    repo: &R,
    detector: &D,
    parent: &RemoteObjectRef,
    local_file: &Path,
    remote_path: &str,
    policy: ExistingDocumentPolicy,
) -> Result<DocumentOutcome, SyncError>
where
    R: Repository + ?Sized,
    D: ContentDetector + ?Sized,
{
    let name = split_parent(remote_path)
        .map(|(_, name)| name)
        .unwrap_or_else(|| remote_path.to_string());

    let existing = match exists(repo, remote_path).await {
        Some(found) if found.kind == ObjectKind::Folder => {
            return Err(SyncError::KindConflict {
                path: remote_path.to_string(),
                expected: ObjectKind::Document,
                found: found.kind,
            });
        }
        other => other,
    };

    if let Some(found) = &existing {
        if policy == ExistingDocumentPolicy::Skip {
            info!(
                source = %local_file.display(),
                destination = remote_path,
                id = %found.id,
                "[SYNC][UPLOAD] Document exists and overwrite is off, skipping"
            );
            return Ok(DocumentOutcome::SkippedExisting(found.clone()));
        }
    }

    let mime_type = detect_content_type(detector, local_file, &name).await;

    let file = tokio::fs::File::open(local_file)
        .await
        .map_err(|e| local_io(local_file, e))?;
    let length = file
        .metadata()
        .await
        .map_err(|e| local_io(local_file, e))?
        .len();

    let previous = match (existing, policy) {
        (Some(found), ExistingDocumentPolicy::Replace) => {
            repo.delete_object(&found)
                .await
                .map_err(|e| SyncError::remote("delete document", remote_path, e))?;
            info!(destination = remote_path, id = %found.id, "[SYNC][UPLOAD] Deleted existing document before replacing it");
            Some(found)
        }
        (Some(found), _) => {
            info!(destination = remote_path, id = %found.id, "[SYNC][UPLOAD] Document exists, creating a duplicate");
            None
        }
        (None, _) => None,
    };

    let document = NewDocument {
        name: name.clone(),
        mime_type: mime_type.clone(),
        length,
        content: Box::new(file),
    };
    let created = repo
        .create_document(parent, document)
        .await
        .map_err(|e| SyncError::remote("create document", remote_path, e))?;

    info!(
        name = %name,
        size = length,
        destination = remote_path,
        id = %created.id,
        mime = %mime_type,
        "[SYNC][UPLOAD] Uploaded document"
    );

    let mime_type = mime_type.to_string();
    Ok(match previous {
        Some(previous) => DocumentOutcome::Replaced {
            previous,
            document: created,
            mime_type,
        },
        None => DocumentOutcome::Uploaded {
            document: created,
            mime_type,
        },
    })
}

fn local_io(path: &Path, source: std::io::Error) -> SyncError {
    SyncError::LocalIo {
        path: path.to_path_buf(),
        source,
    }
}
