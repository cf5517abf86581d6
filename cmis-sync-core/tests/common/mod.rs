#![allow(dead_code)]

use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use cmis_sync_core::contract::{
    NewDocument, ObjectKind, RemoteObjectRef, Repository, RepositoryError,
};
use tokio::io::AsyncReadExt;

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub object: RemoteObjectRef,
    pub content: Vec<u8>,
    pub mime_type: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    objects: Vec<StoredObject>,
    next_id: u64,
    create_folder_calls: usize,
    create_document_calls: usize,
    delete_calls: usize,
    failing_lookups: HashSet<String>,
    failing_once: HashSet<String>,
}

/// In-memory repository. Paths are unique unless `allow_duplicate_names`
/// is set, in which case documents may share a path.
#[derive(Debug)]
pub struct FakeRepository {
    state: Mutex<State>,
    allow_duplicate_names: bool,
}

impl FakeRepository {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            allow_duplicate_names: false,
        }
    }

    pub fn allowing_duplicates() -> Self {
        Self {
            allow_duplicate_names: true,
            ..Self::new()
        }
    }

    /// Pre-create a folder at `path` (parents are not checked).
    pub fn seed_folder(&self, path: &str) -> RemoteObjectRef {
        self.insert(path, ObjectKind::Folder, Vec::new(), None)
    }

    pub fn seed_document(&self, path: &str, content: &[u8]) -> RemoteObjectRef {
        self.insert(path, ObjectKind::Document, content.to_vec(), None)
    }

    pub fn fail_lookups_for(&self, path: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_lookups
            .insert(path.to_string());
    }

    /// Fail only the next lookup of `path`, as a dropped connection would.
    pub fn fail_next_lookup_for(&self, path: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_once
            .insert(path.to_string());
    }

    pub fn objects_at(&self, path: &str) -> Vec<StoredObject> {
        self.state
            .lock()
            .unwrap()
            .objects
            .iter()
            .filter(|o| o.object.path == path)
            .cloned()
            .collect()
    }

    pub fn folder_paths(&self) -> Vec<String> {
        self.paths_of(ObjectKind::Folder)
    }

    pub fn document_paths(&self) -> Vec<String> {
        self.paths_of(ObjectKind::Document)
    }

    pub fn create_folder_calls(&self) -> usize {
        self.state.lock().unwrap().create_folder_calls
    }

    pub fn create_document_calls(&self) -> usize {
        self.state.lock().unwrap().create_document_calls
    }

    pub fn delete_calls(&self) -> usize {
        self.state.lock().unwrap().delete_calls
    }

    fn paths_of(&self, kind: ObjectKind) -> Vec<String> {
        let mut paths: Vec<String> = self
            .state
            .lock()
            .unwrap()
            .objects
            .iter()
            .filter(|o| o.object.kind == kind)
            .map(|o| o.object.path.clone())
            .collect();
        paths.sort();
        paths
    }

    fn insert(
        &self,
        path: &str,
        kind: ObjectKind,
        content: Vec<u8>,
        mime_type: Option<String>,
    ) -> RemoteObjectRef {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let object = RemoteObjectRef {
            path: path.to_string(),
            id: format!("obj-{}", state.next_id),
            kind,
        };
        state.objects.push(StoredObject {
            object: object.clone(),
            content,
            mime_type,
        });
        object
    }

    fn child_path(parent: &RemoteObjectRef, name: &str) -> String {
        if parent.path == "/" {
            format!("/{name}")
        } else {
            format!("{}/{name}", parent.path)
        }
    }

    fn already_exists(path: &str) -> RepositoryError {
        RepositoryError::Rejected {
            status: 409,
            exception: "contentAlreadyExists".to_string(),
            message: format!("{path} already exists"),
        }
    }
}

#[async_trait]
impl Repository for FakeRepository {
    async fn lookup_by_path(&self, path: &str) -> Result<Option<RemoteObjectRef>, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        if state.failing_once.remove(path) || state.failing_lookups.contains(path) {
            return Err(RepositoryError::Transport("connection reset".into()));
        }
        if path == "/" {
            return Ok(Some(RemoteObjectRef {
                path: "/".to_string(),
                id: "root".to_string(),
                kind: ObjectKind::Folder,
            }));
        }
        Ok(state
            .objects
            .iter()
            .find(|o| o.object.path == path)
            .map(|o| o.object.clone()))
    }

    async fn root_folder(&self) -> Result<RemoteObjectRef, RepositoryError> {
        Ok(RemoteObjectRef {
            path: "/".to_string(),
            id: "root".to_string(),
            kind: ObjectKind::Folder,
        })
    }

    async fn create_folder(
        &self,
        parent: &RemoteObjectRef,
        name: &str,
    ) -> Result<RemoteObjectRef, RepositoryError> {
        let path = Self::child_path(parent, name);
        {
            let mut state = self.state.lock().unwrap();
            state.create_folder_calls += 1;
            if state.objects.iter().any(|o| o.object.path == path) {
                return Err(Self::already_exists(&path));
            }
        }
        Ok(self.insert(&path, ObjectKind::Folder, Vec::new(), None))
    }

    async fn create_document(
        &self,
        parent: &RemoteObjectRef,
        mut document: NewDocument,
    ) -> Result<RemoteObjectRef, RepositoryError> {
        let mut content = Vec::new();
        document
            .content
            .read_to_end(&mut content)
            .await
            .map_err(|e| RepositoryError::Transport(Box::new(e)))?;
        let path = Self::child_path(parent, &document.name);
        {
            let mut state = self.state.lock().unwrap();
            state.create_document_calls += 1;
            let taken = state.objects.iter().any(|o| o.object.path == path);
            if taken && !self.allow_duplicate_names {
                return Err(Self::already_exists(&path));
            }
        }
        assert_eq!(
            content.len() as u64,
            document.length,
            "declared length must match streamed content"
        );
        Ok(self.insert(
            &path,
            ObjectKind::Document,
            content,
            Some(document.mime_type.to_string()),
        ))
    }

    async fn delete_object(&self, object: &RemoteObjectRef) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().unwrap();
        state.delete_calls += 1;
        let before = state.objects.len();
        state.objects.retain(|o| o.object.id != object.id);
        if state.objects.len() == before {
            return Err(RepositoryError::Rejected {
                status: 404,
                exception: "objectNotFound".to_string(),
                message: object.id.clone(),
            });
        }
        Ok(())
    }
}

/// Write `files` (relative path, contents) under `root`, creating directories.
pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (rel, contents) in files {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }
}
