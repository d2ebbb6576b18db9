use thiserror::Error;

/// Service layer errors - combines all error types
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    RfcError(#[from] kunai_rfc::error::RfcError),

    #[error(transparent)]
    CoreError(#[from] kunai_core::error::CoreError),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Transport failure: {0}")]
    TransportFailure(String),

    #[error("Provider {provider} failed: {message}")]
    ProviderError { provider: String, message: String },

    #[error("Invalid working hours: {0}")]
    InvalidScheduleSpec(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Queue overflow: {0}")]
    QueueOverflow(String),

    #[error("Invalid account id: {0:?}")]
    InvalidAccountId(String),

    #[error("Corrupt queue file: {0}")]
    CorruptQueueFile(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
