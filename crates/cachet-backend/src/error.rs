use std::io;

/// Errors surfaced by a backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The addressed document or object does not exist.
    #[error("not found: {resource}")]
    NotFound { resource: String },

    /// The service answered with a failure status (auth, quota, server error).
    #[error("backend returned status {code}: {message}")]
    Status { code: u16, message: String },

    /// The service could not be reached.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// A stored payload could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from a local backend.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl BackendError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Returns `true` for the "does not exist" answer.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// HTTP-style status code, when the failure carries one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::NotFound { .. } => Some(404),
            Self::Status { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Map an I/O error, turning `NotFound` into the backend's not-found answer.
    pub(crate) fn from_io(err: io::Error, resource: &str) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            Self::not_found(resource)
        } else {
            Self::Io(err)
        }
    }
}

/// Result alias for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(BackendError::not_found("x").status(), Some(404));
        let err = BackendError::Status { code: 403, message: "forbidden".into() };
        assert_eq!(err.status(), Some(403));
        assert!(!err.is_not_found());
        assert_eq!(BackendError::Unavailable("down".into()).status(), None);
    }

    #[test]
    fn io_not_found_maps_to_not_found() {
        let err = BackendError::from_io(io::Error::from(io::ErrorKind::NotFound), "a/b");
        assert!(err.is_not_found());
        let err = BackendError::from_io(io::Error::from(io::ErrorKind::PermissionDenied), "a/b");
        assert!(matches!(err, BackendError::Io(_)));
    }
}
