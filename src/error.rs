// Error types for the upload pipeline, the configuration loader and the
// batch driver. Library code returns these; the binaries wrap them with
// `anyhow` at the outermost boundary.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The remote step of the upload pipeline a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Token,
    CloudUpload,
    Register,
    Artifact,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Token => "upload token",
            Step::CloudUpload => "cloud upload",
            Step::Register => "register",
            Step::Artifact => "artifact creation",
        };
        f.write_str(name)
    }
}

/// Failure of a single file upload. HTTP variants keep the status code and
/// the raw response body, which is the only diagnostic the API gives.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("file not found: {}", path.display())]
    LocalFileNotFound { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    LocalFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("upload token error ({status}): {body}")]
    Token { status: u16, body: String },

    #[error("cloud upload error ({status}): {body}")]
    CloudUpload { status: u16, body: String },

    #[error("protocol error: {message}")]
    Protocol { message: String },

    #[error("register error ({status}): {body}")]
    Register { status: u16, body: String },

    #[error("artifact creation error ({status}): {body}")]
    Artifact { status: u16, body: String },

    #[error("{step} request failed: {source}")]
    Transport {
        step: Step,
        #[source]
        source: reqwest::Error,
    },

    #[error("{step} response could not be decoded: {source}")]
    InvalidResponse {
        step: Step,
        #[source]
        source: reqwest::Error,
    },
}

impl UploadError {
    /// Build the status-carrying variant for `step`.
    pub fn http(step: Step, status: u16, body: String) -> Self {
        match step {
            Step::Token => UploadError::Token { status, body },
            Step::CloudUpload => UploadError::CloudUpload { status, body },
            Step::Register => UploadError::Register { status, body },
            Step::Artifact => UploadError::Artifact { status, body },
        }
    }

    /// Pipeline step that failed. `None` for local precondition failures.
    pub fn step(&self) -> Option<Step> {
        match self {
            UploadError::LocalFileNotFound { .. } | UploadError::LocalFile { .. } => None,
            UploadError::Token { .. } => Some(Step::Token),
            UploadError::CloudUpload { .. } => Some(Step::CloudUpload),
            // A malformed token is only detected right before registration.
            UploadError::Protocol { .. } => Some(Step::Register),
            UploadError::Register { .. } => Some(Step::Register),
            UploadError::Artifact { .. } => Some(Step::Artifact),
            UploadError::Transport { step, .. } | UploadError::InvalidResponse { step, .. } => {
                Some(*step)
            }
        }
    }

    /// HTTP status returned by the remote side, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            UploadError::Token { status, .. }
            | UploadError::CloudUpload { status, .. }
            | UploadError::Register { status, .. }
            | UploadError::Artifact { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing configuration: set {0}")]
    Missing(&'static str),

    #[error("invalid BEEKEEPER_TIMEOUT_SECS value: {0:?}")]
    InvalidTimeout(String),
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("folder not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("failed to list {}: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
