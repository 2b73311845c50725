use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] meeton_core::Error),
    #[error(transparent)]
    Auth(#[from] meeton_core::auth::AuthError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(
        "No API URL configured. Pass --api-url, set MEETON_API_URL, or run `meeton config init --api-base-url <url>`."
    )]
    ApiUrlMissing,
    #[error("Not signed in. Run `meeton login --email <email> --password <password>` first.")]
    NotSignedIn,
    #[error("Event ID cannot be empty")]
    EmptyEventId,
    #[error("Notification ID cannot be empty")]
    EmptyNotificationId,
    #[error("{0}")]
    Rejected(String),
}
