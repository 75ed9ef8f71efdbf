//! Error types for Sendback.

use std::path::PathBuf;

use thiserror::Error;

use crate::model::MessageStatus;

/// Sendback error type.
#[derive(Error, Debug)]
pub enum Error {
    /// A store could not write its backing file
    #[error("failed to persist {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An image source could not be copied into the staging area
    #[error("failed to stage image: {0}")]
    Stage(String),

    /// Message not found
    #[error("message not found: {id}")]
    MessageNotFound { id: String },

    /// Message id already present in a store
    #[error("duplicate message id: {id}")]
    DuplicateMessage { id: String },

    /// Profile not found
    #[error("profile not found: {id}")]
    ProfileNotFound { id: String },

    /// Friend already registered
    #[error("{name} is already a registered friend")]
    DuplicateFriend { name: String },

    /// Invalid message status transition
    #[error("invalid status transition: {from:?} -> {to:?}")]
    InvalidStatusTransition { from: MessageStatus, to: MessageStatus },

    /// The caller is not signed in
    #[error("not signed in")]
    NotSignedIn,

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// API/backend error
    #[error("api error: {0}")]
    Api(String),

    /// Network error
    #[error("network error: {0}")]
    Network(String),

    /// A gateway call did not finish in time
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML serialization error
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Network(e.to_string())
    }
}

/// Result type alias for Sendback.
pub type Result<T> = std::result::Result<T, Error>;
