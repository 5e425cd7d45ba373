use thiserror::Error;

/// Errors produced while forming keys and descriptors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid path segment {segment:?}: {reason}")]
    InvalidSegment { segment: String, reason: String },

    #[error("invalid object key {key:?}: {reason}")]
    InvalidObjectKey { key: String, reason: String },

    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("serialization error: {0}")]
    Serialization(String),
}
