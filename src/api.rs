// API client module: a small blocking HTTP client that uploads local files
// into the Beekeeper document library. One upload is four requests made
// strictly in sequence, each fed by the previous response:
//
//   1. request an upload token          GET  /api/2/files/file/upload/token
//   2. send the bytes to cloud storage  POST <upload_url from the token>
//   3. register the stored object       POST /api/2/files/file/upload
//   4. create the folder artifact       POST /api/2/artifacts/{folder}/children
//
// Any failure aborts the upload; nothing is retried.

use crate::config::Config;
use crate::error::{Step, UploadError};
use crate::mime::resolve_mime;
use anyhow::{Context, Result};
use reqwest::blocking::{multipart, Client, RequestBuilder, Response};
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Form field the file content goes under when the token names none.
const DEFAULT_FILE_PARAM: &str = "file";

/// Descriptor returned by the token endpoint. Single use.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UploadToken {
    pub upload_url: String,
    #[serde(default)]
    pub file_param_name: Option<String>,
    /// Storage backend fields, in the order they must be sent.
    #[serde(default)]
    pub additional_form_data: Vec<FormField>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub name: String,
    pub value: String,
}

impl UploadToken {
    /// Field name for the file part.
    pub fn file_param(&self) -> &str {
        self.file_param_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_FILE_PARAM)
    }

    /// Storage key of the uploaded object, if the token carries a usable one.
    pub fn key(&self) -> Option<&str> {
        self.additional_form_data
            .iter()
            .find(|field| field.name == "key")
            .map(|field| field.value.as_str())
            .filter(|value| !value.is_empty())
    }
}

/// Body of the registration request (step 3).
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct RegisterRequest {
    pub key: String,
    pub media_type: String,
    pub name: String,
    pub size: u64,
}

/// Registered-file record. Ids are kept as raw JSON values because the API
/// does not commit to numbers or strings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FileInfo {
    pub id: Value,
    pub key: String,
    pub media_type: String,
    pub size: u64,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub userid: Value,
}

/// File metadata duplicated onto the artifact, in the artifact API's casing.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactMetadata {
    pub id: Value,
    pub key: String,
    pub mime_type: String,
    pub size: u64,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub user_id: Value,
}

impl From<&FileInfo> for ArtifactMetadata {
    fn from(info: &FileInfo) -> Self {
        ArtifactMetadata {
            id: info.id.clone(),
            key: info.key.clone(),
            mime_type: info.media_type.clone(),
            size: info.size,
            url: info.url.clone(),
            user_id: info.userid.clone(),
        }
    }
}

/// Body of the artifact creation request (step 4).
#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewArtifact {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub parent_id: String,
    pub metadata: ArtifactMetadata,
}

/// Document library entry as returned by the artifact endpoint. The entry
/// already exists once this arrives, so nothing beyond a JSON object is
/// required; `metadata` and unmodelled fields are kept as sent.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub parent_id: Option<Value>,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Artifact {
    /// Human readable id, with a placeholder when the response had none.
    pub fn display_id(&self) -> String {
        match &self.id {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Null) | None => "(see response)".to_string(),
            Some(other) => other.to_string(),
        }
    }
}

/// Local file about to be uploaded, inspected once before any request.
#[derive(Debug, Clone)]
pub struct LocalFile {
    pub path: PathBuf,
    /// Name registered in Beekeeper.
    pub name: String,
    /// Base name of the local file, used as the multipart file name.
    pub file_name: String,
    pub media_type: &'static str,
    pub size: u64,
}

impl LocalFile {
    /// Check that `path` is an existing regular file and capture its size.
    /// An empty override name counts as no override.
    pub fn inspect(path: &Path, override_name: Option<&str>) -> Result<Self, UploadError> {
        let meta = match std::fs::metadata(path) {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => {
                return Err(UploadError::LocalFileNotFound {
                    path: path.to_path_buf(),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(UploadError::LocalFileNotFound {
                    path: path.to_path_buf(),
                })
            }
            Err(source) => {
                return Err(UploadError::LocalFile {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = override_name
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| file_name.clone());

        Ok(LocalFile {
            path: path.to_path_buf(),
            name,
            file_name,
            media_type: resolve_mime(path),
            size: meta.len(),
        })
    }
}

/// Blocking client bound to one tenant and one target folder.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    target_folder_id: String,
    auth: HeaderValue,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build HTTP client")?;

        let mut auth = HeaderValue::from_str(&format!("Token {}", config.token))
            .context("Token contains characters not allowed in a header")?;
        auth.set_sensitive(true);

        Ok(ApiClient {
            client,
            base_url: config.tenant_url.clone(),
            target_folder_id: config.target_folder_id.clone(),
            auth,
        })
    }

    /// Create a client from environment variables. See `Config::from_env`.
    pub fn from_env() -> Result<Self> {
        let config = Config::from_env().context("Failed to load configuration")?;
        Self::new(&config)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Tenant API requests carry the token; the cloud upload never does.
    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(AUTHORIZATION, self.auth.clone())
            .header(CONTENT_TYPE, "application/json")
    }

    /// Upload `file_path` into the target folder. The registered name is
    /// `override_name` or the local base name.
    pub fn upload_file(
        &self,
        file_path: &Path,
        override_name: Option<&str>,
    ) -> Result<Artifact, UploadError> {
        let file = LocalFile::inspect(file_path, override_name)?;
        let artifact = self.upload(&file)?;
        log_uploaded(&file.name, &artifact);
        Ok(artifact)
    }

    /// Run the four steps for an inspected file. Nothing is logged at info
    /// level, so callers drawing progress output can report the outcome
    /// themselves.
    pub fn upload(&self, file: &LocalFile) -> Result<Artifact, UploadError> {
        debug!(
            path = %file.path.display(),
            size = file.size,
            media_type = file.media_type,
            "starting upload"
        );

        let token = self.request_token()?;
        self.upload_to_cloud(&token, file)?;
        let info = self.register_upload(&token, file)?;
        self.create_artifact(&info, &file.name)
    }

    /// Step 1: fetch a single-use upload token for the document library.
    pub fn request_token(&self) -> Result<UploadToken, UploadError> {
        let request = self.authorized(self.client.get(self.url("/api/2/files/file/upload/token")));
        let response = send(Step::Token, request)?;
        let token: UploadToken = decode(Step::Token, response)?;
        debug!(
            fields = token.additional_form_data.len(),
            "received upload token"
        );
        Ok(token)
    }

    /// Step 2: post the token's form fields, then the file content, to the
    /// storage endpoint named by the token.
    pub fn upload_to_cloud(&self, token: &UploadToken, file: &LocalFile) -> Result<(), UploadError> {
        let mut form = multipart::Form::new();
        for field in &token.additional_form_data {
            form = form.text(field.name.clone(), field.value.clone());
        }

        let reader = File::open(&file.path).map_err(|source| UploadError::LocalFile {
            path: file.path.clone(),
            source,
        })?;
        let part = multipart::Part::reader_with_length(reader, file.size)
            .file_name(file.file_name.clone())
            .mime_str(file.media_type)
            .map_err(|source| UploadError::Transport {
                step: Step::CloudUpload,
                source,
            })?;
        form = form.part(token.file_param().to_string(), part);

        let request = self.client.post(&token.upload_url).multipart(form);
        send(Step::CloudUpload, request)?;
        debug!(name = %file.name, "bytes stored");
        Ok(())
    }

    /// Step 3: register the stored object under its display name.
    pub fn register_upload(
        &self,
        token: &UploadToken,
        file: &LocalFile,
    ) -> Result<FileInfo, UploadError> {
        let key = token.key().ok_or_else(|| UploadError::Protocol {
            message: "no 'key' found in upload token".to_string(),
        })?;

        let body = RegisterRequest {
            key: key.to_string(),
            media_type: file.media_type.to_string(),
            name: file.name.clone(),
            size: file.size,
        };
        let request = self
            .authorized(self.client.post(self.url("/api/2/files/file/upload")))
            .json(&body);
        let response = send(Step::Register, request)?;
        decode(Step::Register, response)
    }

    /// Step 4: create the file node under the target folder.
    pub fn create_artifact(&self, info: &FileInfo, name: &str) -> Result<Artifact, UploadError> {
        let body = NewArtifact {
            name: name.to_string(),
            kind: "file".to_string(),
            parent_id: self.target_folder_id.clone(),
            metadata: ArtifactMetadata::from(info),
        };
        let path = format!("/api/2/artifacts/{}/children", self.target_folder_id);
        let request = self.authorized(self.client.post(self.url(&path))).json(&body);
        let response = send(Step::Artifact, request)?;
        decode(Step::Artifact, response)
    }
}

/// Confirmation line for a finished upload.
pub fn log_uploaded(name: &str, artifact: &Artifact) {
    info!(
        name = %name,
        artifact_id = %artifact.display_id(),
        "Uploaded {} -> artifact {}",
        name,
        artifact.display_id()
    );
}

/// Send a request and turn any non-success status into the step's error,
/// keeping the response body verbatim.
fn send(step: Step, request: RequestBuilder) -> Result<Response, UploadError> {
    let response = request
        .send()
        .map_err(|source| UploadError::Transport { step, source })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(UploadError::http(step, status.as_u16(), body));
    }
    Ok(response)
}

fn decode<T: DeserializeOwned>(step: Step, response: Response) -> Result<T, UploadError> {
    response
        .json()
        .map_err(|source| UploadError::InvalidResponse { step, source })
}
