use crate::config::ValidationError;
use mappings::{BackendError, RegisterError, SyncError};
use shared::tls::TlsError;
use thiserror::Error;

/// Errors that can occur during gateway operations
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ValidationError),

    #[error("TLS setup failed: {0}")]
    Tls(#[from] TlsError),

    #[error("Failed to read request body: {0}")]
    RequestBodyError(String),

    #[error("Invalid registration: {0}")]
    InvalidRegistration(String),

    #[error("Registration failed: {0}")]
    RegistrationFailed(#[from] RegisterError),

    #[error("Mapping store error: {0}")]
    Backend(#[from] BackendError),

    #[error("Mapping synchronization stopped: {0}")]
    SyncStopped(#[from] SyncError),

    #[error("HTTP client error: {0}")]
    HttpClientError(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    InternalError(String),
}
