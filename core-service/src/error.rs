use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Library error: {0}")]
    Library(#[from] core_library::LibraryError),

    #[error("Metadata error: {0}")]
    Metadata(#[from] core_metadata::MetadataError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::error::Error),

    #[error("No user named '{0}'")]
    UserNotFound(String),

    #[error("No cover found for ISBN {0}")]
    CoverNotFound(String),

    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },
}

impl ServiceError {
    pub(crate) fn validation(field: &str, message: impl Into<String>) -> Self {
        ServiceError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
