use cachet_backend::BackendError;
use cachet_types::TypeError;
use thiserror::Error;

/// Errors from document repository operations.
///
/// "Not found" and "already exists" are not errors: they come back as
/// `Ok(false)` / `Ok(None)`.
#[derive(Debug, Error)]
pub enum DocError {
    /// The backend failed for a reason other than "not found".
    #[error("document backend failed to {operation} {key}: {source}")]
    Backend {
        operation: &'static str,
        key: String,
        #[source]
        source: BackendError,
    },

    /// A sub-collection write was attempted under a parent that does not exist.
    #[error("parent document not found: {key}")]
    ParentNotFound { key: String },

    /// The operation needs a unique key but the descriptor has none.
    #[error("document in collection {collection} has no unique key")]
    MissingUniqueKey { collection: String },

    /// The stored snapshot does not fit the requested payload type.
    #[error("cannot deserialize document {key}: {source}")]
    Deserialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A key or payload could not be formed.
    #[error("{0}")]
    Type(#[from] TypeError),
}

impl DocError {
    /// Returns `true` for failures raised before contacting the backend.
    pub fn is_precondition_failed(&self) -> bool {
        matches!(
            self,
            Self::ParentNotFound { .. } | Self::MissingUniqueKey { .. } | Self::Type(_)
        )
    }

    /// The backend status carried by a wrapped backend failure.
    pub fn backend_status(&self) -> Option<u16> {
        match self {
            Self::Backend { source, .. } => source.status(),
            _ => None,
        }
    }
}

/// Result alias for document operations.
pub type DocResult<T> = Result<T, DocError>;
