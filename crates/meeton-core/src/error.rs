//! Error types for meeton-core

use thiserror::Error;

use crate::api::ApiError;
use crate::auth::AuthError;

/// Result type alias using meeton-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in meeton-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Backend request error
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Authentication/session error
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid client configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No signed-in user for an operation that needs one
    #[error("Not signed in")]
    NotSignedIn,

    /// Gated action refused by the upload permission check
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
}
