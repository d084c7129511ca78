use std::path::PathBuf;

use automator_core::api::{join_messages, ErrorDetail, ErrorResponse, ValidationDetail};
use automator_core::{CoreError, GroupKey};
use thiserror::Error;

/// Failure of one request to the automation service.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The service rejected the request body; each entry is one problem.
    #[error("{}", join_messages(.0))]
    Validation(Vec<ValidationDetail>),
    /// 409, e.g. a task instance is already running.
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl TransportError {
    /// Classify a non-success response.
    pub fn from_status(status: u16, body: &[u8]) -> Self {
        let parsed = serde_json::from_slice::<ErrorResponse>(body).ok();
        match (status, parsed) {
            (409, Some(ErrorResponse { detail: ErrorDetail::Message(message) })) => {
                TransportError::Conflict(message)
            }
            (409, _) => TransportError::Conflict(String::from_utf8_lossy(body).into_owned()),
            (400..=499, Some(ErrorResponse { detail: ErrorDetail::Items(items) })) => {
                TransportError::Validation(items)
            }
            _ => TransportError::Status {
                status,
                body: String::from_utf8_lossy(body).into_owned(),
            },
        }
    }
}

/// Failure of a mirror operation.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Snapshot(#[from] CoreError),
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("no {group} entry named {name:?}")]
    Unknown { group: GroupKey, name: String },
}

impl MirrorError {
    /// Joined validation messages, when the service rejected a settings update.
    pub fn validation_message(&self) -> Option<String> {
        match self {
            MirrorError::Transport(TransportError::Validation(details)) => {
                Some(join_messages(details))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}
