use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("settings error: {0}")]
    Settings(#[from] crate::config::SettingsError),

    #[error("document error: {0}")]
    Document(#[from] cachet_docs::DocError),

    #[error("storage error: {0}")]
    Storage(#[from] cachet_blobs::StorageError),

    #[error("backend error: {0}")]
    Backend(#[from] cachet_backend::BackendError),

    #[error("invalid key: {0}")]
    Type(#[from] cachet_types::TypeError),
}

pub type SdkResult<T> = Result<T, SdkError>;
