//! # contract: collaborator interfaces for the reconciliation engine
//!
//! This module defines the two seams the engine talks through:
//!
//! - [`Repository`]: the remote document repository (lookup by path, folder
//!   and document creation, deletion). Implemented by the CMIS client in the
//!   binary crate, by `MockRepository` and by in-memory fakes in tests.
//! - [`ContentDetector`]: byte-level MIME detection for a file's leading bytes.
//!
//! Plus the plain data exchanged over them ([`RemoteObjectRef`],
//! [`NewDocument`]) and the uniform collaborator error ([`RepositoryError`]).
//!
//! ## Mocking & Testing
//! - Both traits are annotated for `mockall` (behind the `test-export-mocks`
//!   feature, on by default) so integration tests can build deterministic mocks.
//!
//! ## Caching
//! - Implementors of [`Repository::lookup_by_path`] must not serve results from
//!   a cache. The engine has no transactional check-and-create and relies on
//!   every lookup reflecting the current remote state.

use std::fmt;

use async_trait::async_trait;
use mime::Mime;
use serde::Serialize;
use thiserror::Error;
use tokio::io::AsyncRead;

#[allow(unused_imports)]
use mockall::{automock, predicate::*};

/// Kind of a node in the remote repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ObjectKind {
    Folder,
    Document,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKind::Folder => f.write_str("folder"),
            ObjectKind::Document => f.write_str("document"),
        }
    }
}

/// An existing remote node, as returned by a lookup or a create call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteObjectRef {
    /// Absolute `/`-separated repository path.
    pub path: String,
    /// Repository-assigned object id.
    pub id: String,
    pub kind: ObjectKind,
}

impl RemoteObjectRef {
    pub fn is_folder(&self) -> bool {
        self.kind == ObjectKind::Folder
    }
}

/// Readable content handed to [`Repository::create_document`].
pub type ByteSource = Box<dyn AsyncRead + Send + Sync + Unpin>;

/// Everything needed to create one document. Built immediately before the
/// create call and consumed by it.
pub struct NewDocument {
    /// Document name (last segment of the destination path).
    pub name: String,
    /// Detected MIME type.
    pub mime_type: Mime,
    /// Content length in bytes.
    pub length: u64,
    /// Stream over the file contents, independent of any detection read.
    pub content: ByteSource,
}

impl fmt::Debug for NewDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewDocument")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

/// Failure reported by a [`Repository`] implementation.
///
/// A lookup that simply finds nothing is not an error: it is `Ok(None)`.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("transport failure: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("repository rejected request ({status}, {exception}): {message}")]
    Rejected {
        status: u16,
        exception: String,
        message: String,
    },
    #[error("unexpected repository response: {0}")]
    UnexpectedResponse(String),
}

/// The remote repository protocol client.
///
/// One value is created per run (the session) and borrowed by every
/// reconciler call; nothing else may use it concurrently.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Repository: Send + Sync {
    /// Fetch the object at `path`, bypassing any client-side cache.
    /// Returns `Ok(None)` when the repository reports the path as not found.
    async fn lookup_by_path(&self, path: &str) -> Result<Option<RemoteObjectRef>, RepositoryError>;

    /// The repository root folder (`/`).
    async fn root_folder(&self) -> Result<RemoteObjectRef, RepositoryError>;

    /// Create a folder called `name` under `parent`.
    async fn create_folder(
        &self,
        parent: &RemoteObjectRef,
        name: &str,
    ) -> Result<RemoteObjectRef, RepositoryError>;

    /// Create a document under `parent` as a new major version.
    async fn create_document(
        &self,
        parent: &RemoteObjectRef,
        document: NewDocument,
    ) -> Result<RemoteObjectRef, RepositoryError>;

    /// Delete `object` (all versions).
    async fn delete_object(&self, object: &RemoteObjectRef) -> Result<(), RepositoryError>;
}

/// Error from a [`ContentDetector`]. Never fatal to an upload.
#[derive(Debug, Error)]
#[error("content detection failed: {0}")]
pub struct DetectError(pub String);

/// Byte-level content type detection.
///
/// Receives a copy of the leading bytes, so detection can never disturb the
/// stream later used for transfer.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait ContentDetector: Send + Sync {
    fn detect(&self, head: &[u8], file_name: &str) -> Result<Mime, DetectError>;
}
