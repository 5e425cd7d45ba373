use std::io;
use std::path::PathBuf;

use cachet_backend::BackendError;
use cachet_types::TypeError;

/// Errors from blob and directory operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The local file to upload does not exist.
    #[error("file does not exist: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// The object to delete does not exist.
    #[error("{bucket}/{key} does not exist")]
    TargetAbsent { bucket: String, key: String },

    /// The backend failed for a reason other than "not found".
    #[error("blob backend failed to {operation} {bucket}/{key} (status {status:?}): {source}")]
    Backend {
        operation: &'static str,
        bucket: String,
        key: String,
        status: Option<u16>,
        #[source]
        source: BackendError,
    },

    /// The local file exists but could not be read.
    #[error("failed to read {}: {source}", path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A bucket or object key is malformed.
    #[error("{0}")]
    Type(#[from] TypeError),
}

impl StorageError {
    /// Log a backend failure with its context and wrap it.
    pub(crate) fn backend(operation: &'static str, bucket: &str, key: &str, source: BackendError) -> Self {
        let status = source.status();
        tracing::error!(
            operation,
            bucket,
            key,
            status = ?status,
            error = %source,
            "blob backend call failed"
        );
        Self::Backend {
            operation,
            bucket: bucket.to_string(),
            key: key.to_string(),
            status,
            source,
        }
    }

    /// Returns `true` for failures raised before contacting the backend.
    pub fn is_precondition_failed(&self) -> bool {
        matches!(
            self,
            Self::FileNotFound { .. } | Self::TargetAbsent { .. } | Self::Type(_)
        )
    }

    /// The backend status carried by a wrapped backend failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Backend { status, .. } => *status,
            _ => None,
        }
    }
}

/// Result alias for blob operations.
pub type StorageResult<T> = Result<T, StorageError>;
