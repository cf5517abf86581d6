#![doc = "CMIS Browser Binding client: the concrete repository behind the reconciliation engine."]
//
//! # CMIS client
//!
//! Implements [`cmis_sync_core::contract::Repository`] against a CMIS 1.1
//! repository over the Browser Binding (JSON over HTTP):
//!
//! - `GET  <service url>` lists the repositories and their URLs
//! - `GET  <root folder url>/<path>?cmisselector=object` looks an object up by path
//! - `POST <root folder url>?objectId=<id>` with `cmisaction=createFolder`,
//!   `createDocument` (multipart, content streamed from disk) or `delete`
//!
//! Every request carries HTTP basic authentication. Lookups are sent with
//! `Cache-Control: no-cache` and nothing is cached on the client side.
//!
//! One [`CmisClient`] is the session for a whole run.

use std::collections::BTreeMap;

use async_trait::async_trait;
use cmis_sync_core::contract::{
    NewDocument, ObjectKind, RemoteObjectRef, Repository, RepositoryError,
};
use reqwest::header::CACHE_CONTROL;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio_util::io::ReaderStream;
use url::Url;

#[derive(Debug, Error)]
pub enum CmisError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("url cannot carry a path: {0}")]
    CannotBeABase(Url),
    #[error("repository returned {status} ({exception}): {message}")]
    Api {
        status: StatusCode,
        exception: String,
        message: String,
    },
    #[error("endpoint advertises no repositories")]
    NoRepository,
    #[error("repository {0} is not offered by the endpoint")]
    UnknownRepository(String),
    #[error("response is missing property {0}")]
    MissingProperty(&'static str),
    #[error("object has base type {0}, expected cmis:folder or cmis:document")]
    UnsupportedBaseType(String),
}

impl From<CmisError> for RepositoryError {
    fn from(e: CmisError) -> Self {
        match e {
            CmisError::Api {
                status,
                exception,
                message,
            } => RepositoryError::Rejected {
                status: status.as_u16(),
                exception,
                message,
            },
            CmisError::MissingProperty(_)
            | CmisError::UnsupportedBaseType(_)
            | CmisError::NoRepository
            | CmisError::UnknownRepository(_) => RepositoryError::UnexpectedResponse(e.to_string()),
            other => RepositoryError::Transport(Box::new(other)),
        }
    }
}

/// Username/password for HTTP basic authentication.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryInfo {
    repository_id: String,
    root_folder_url: Url,
    root_folder_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SuccinctObject {
    succinct_properties: Map<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    exception: String,
    #[serde(default)]
    message: String,
}

#[derive(Clone)]
pub struct CmisClient {
    http: Client,
    credentials: Credentials,
    repository_id: String,
    root_folder_url: Url,
    root_folder_id: String,
}

impl CmisClient {
    /// Open a session: fetch the repository list from `endpoint` and bind to
    /// `repository_id`, or to the first repository (by id) when `None`.
    pub async fn connect(
        endpoint: &str,
        credentials: Credentials,
        repository_id: Option<&str>,
    ) -> Result<Self, CmisError> {
        let endpoint = Url::parse(endpoint)?;
        let http = Client::new();
        tracing::info!(endpoint = %endpoint, username = %credentials.username, "Connecting to CMIS endpoint");

        let response = http
            .get(endpoint.clone())
            .basic_auth(&credentials.username, Some(&credentials.password))
            .send()
            .await?;
        let repositories: BTreeMap<String, RepositoryInfo> =
            Self::handle_response(response).await?;

        let info = match repository_id {
            Some(id) => repositories
                .into_values()
                .find(|r| r.repository_id == id)
                .ok_or_else(|| CmisError::UnknownRepository(id.to_string()))?,
            None => repositories
                .into_values()
                .next()
                .ok_or(CmisError::NoRepository)?,
        };
        tracing::info!(
            repository_id = %info.repository_id,
            root_folder_url = %info.root_folder_url,
            "Opened CMIS session"
        );

        Ok(Self {
            http,
            credentials,
            repository_id: info.repository_id,
            root_folder_url: info.root_folder_url,
            root_folder_id: info.root_folder_id,
        })
    }

    pub fn repository_id(&self) -> &str {
        &self.repository_id
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.basic_auth(&self.credentials.username, Some(&self.credentials.password))
    }

    fn object_url(&self, path: &str) -> Result<Url, CmisError> {
        let mut url = self.root_folder_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| CmisError::CannotBeABase(self.root_folder_url.clone()))?;
            segments.pop_if_empty();
            for segment in path.split('/').filter(|s| !s.is_empty()) {
                segments.push(segment);
            }
        }
        url.query_pairs_mut()
            .append_pair("cmisselector", "object")
            .append_pair("succinct", "true");
        Ok(url)
    }

    fn action_url(&self, object_id: &str) -> Url {
        let mut url = self.root_folder_url.clone();
        url.query_pairs_mut().append_pair("objectId", object_id);
        url
    }

    async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T, CmisError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }
        Err(Self::api_error(status, response).await)
    }

    async fn api_error(status: StatusCode, response: Response) -> CmisError {
        let body = response.text().await.unwrap_or_default();
        let parsed: ErrorBody = serde_json::from_str(&body).unwrap_or_else(|_| ErrorBody {
            exception: String::new(),
            message: body,
        });
        CmisError::Api {
            status,
            exception: parsed.exception,
            message: parsed.message,
        }
    }
}

fn string_property<'a>(
    properties: &'a Map<String, Value>,
    key: &'static str,
) -> Result<&'a str, CmisError> {
    properties
        .get(key)
        .and_then(Value::as_str)
        .ok_or(CmisError::MissingProperty(key))
}

fn to_object_ref(
    object: SuccinctObject,
    fallback_path: String,
) -> Result<RemoteObjectRef, CmisError> {
    let properties = &object.succinct_properties;
    let id = string_property(properties, "cmis:objectId")?.to_string();
    let kind = match string_property(properties, "cmis:baseTypeId")? {
        "cmis:folder" => ObjectKind::Folder,
        "cmis:document" => ObjectKind::Document,
        other => return Err(CmisError::UnsupportedBaseType(other.to_string())),
    };
    let path = properties
        .get("cmis:path")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or(fallback_path);
    Ok(RemoteObjectRef { path, id, kind })
}

fn child_path(parent: &RemoteObjectRef, name: &str) -> String {
    if parent.path == "/" {
        format!("/{name}")
    } else {
        format!("{}/{name}", parent.path.trim_end_matches('/'))
    }
}

#[async_trait]
impl Repository for CmisClient {
    async fn lookup_by_path(&self, path: &str) -> Result<Option<RemoteObjectRef>, RepositoryError> {
        let url = self.object_url(path)?;
        tracing::debug!(path, url = %url, "Looking up object by path");
        let response = self
            .authed(self.http.get(url))
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(CmisError::from)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let object: SuccinctObject = Self::handle_response(response).await?;
        Ok(Some(to_object_ref(object, path.to_string())?))
    }

    async fn root_folder(&self) -> Result<RemoteObjectRef, RepositoryError> {
        Ok(RemoteObjectRef {
            path: "/".to_string(),
            id: self.root_folder_id.clone(),
            kind: ObjectKind::Folder,
        })
    }

    async fn create_folder(
        &self,
        parent: &RemoteObjectRef,
        name: &str,
    ) -> Result<RemoteObjectRef, RepositoryError> {
        tracing::info!(parent = %parent.path, parent_id = %parent.id, name, "Creating CMIS folder");
        let form = [
            ("cmisaction", "createFolder"),
            ("propertyId[0]", "cmis:objectTypeId"),
            ("propertyValue[0]", "cmis:folder"),
            ("propertyId[1]", "cmis:name"),
            ("propertyValue[1]", name),
            ("succinct", "true"),
        ];
        let response = self
            .authed(self.http.post(self.action_url(&parent.id)))
            .form(&form)
            .send()
            .await
            .map_err(CmisError::from)?;
        let object: SuccinctObject = Self::handle_response(response).await.map_err(|e| {
            tracing::error!(error = %e, parent = %parent.path, name, "Failed to create folder");
            e
        })?;
        Ok(to_object_ref(object, child_path(parent, name))?)
    }

    async fn create_document(
        &self,
        parent: &RemoteObjectRef,
        document: NewDocument,
    ) -> Result<RemoteObjectRef, RepositoryError> {
        tracing::info!(
            parent = %parent.path,
            name = %document.name,
            size = document.length,
            mime = %document.mime_type,
            "Uploading CMIS document"
        );
        let path = child_path(parent, &document.name);
        let body = Body::wrap_stream(ReaderStream::new(document.content));
        let content = Part::stream_with_length(body, document.length)
            .file_name(document.name.clone())
            .mime_str(document.mime_type.as_ref())
            .map_err(CmisError::from)?;
        let form = Form::new()
            .text("cmisaction", "createDocument")
            .text("propertyId[0]", "cmis:objectTypeId")
            .text("propertyValue[0]", "cmis:document")
            .text("propertyId[1]", "cmis:name")
            .text("propertyValue[1]", document.name.clone())
            .text("versioningState", "major")
            .text("succinct", "true")
            .part("content", content);

        let response = self
            .authed(self.http.post(self.action_url(&parent.id)))
            .multipart(form)
            .send()
            .await
            .map_err(CmisError::from)?;
        let object: SuccinctObject = Self::handle_response(response).await.map_err(|e| {
            tracing::error!(error = %e, path = %path, "Failed to create document");
            e
        })?;
        Ok(to_object_ref(object, path)?)
    }

    async fn delete_object(&self, object: &RemoteObjectRef) -> Result<(), RepositoryError> {
        tracing::info!(path = %object.path, id = %object.id, "Deleting CMIS object");
        let form = [
            ("cmisaction", "delete"),
            ("objectId", object.id.as_str()),
            ("allVersions", "true"),
        ];
        let response = self
            .authed(self.http.post(self.action_url(&object.id)))
            .form(&form)
            .send()
            .await
            .map_err(CmisError::from)?;
        let status = response.status();
        if !status.is_success() {
            let e = Self::api_error(status, response).await;
            tracing::error!(error = %e, path = %object.path, "Failed to delete object");
            return Err(e.into());
        }
        Ok(())
    }
}
