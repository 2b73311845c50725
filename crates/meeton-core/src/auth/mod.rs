//! Authentication: credentials, the backend auth seam, session persistence
//! and the [`AuthSession`] lifecycle.

mod http;
mod session;
mod store;

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::UserId;
use crate::util::unix_timestamp_now;

pub use http::HttpAuthenticator;
pub use session::{AuthSession, SessionEvent, SessionObserver, SessionState};
pub use store::{FileSessionStore, MemorySessionStore, SessionPersistence, SESSION_FILE_NAME};

const EXPIRY_SKEW_SECONDS: i64 = 60;

/// Identity of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl SessionUser {
    /// Best label for prompts: display name, then email, then id.
    #[must_use]
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or_else(|| self.id.as_str())
    }
}

/// Tokens issued by the backend for one login.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Unix seconds; `None` when the backend did not say.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: SessionUser,
}

impl Credentials {
    /// Expired, or close enough to expiry that a refresh is due.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expires_at| expires_at <= unix_timestamp_now() + EXPIRY_SKEW_SECONDS)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Credentials")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid auth configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Not signed in")]
    NotSignedIn,
    #[error("A sign-in is already in progress")]
    SignInInProgress,
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to parse JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Auth API error: {0}")]
    Api(String),
    #[error("Auth service unavailable: {0}")]
    Unavailable(String),
    #[error("Session storage error: {0}")]
    Storage(String),
}

impl AuthError {
    /// Transport failures and server errors say nothing about whether the
    /// tokens are still good.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Unavailable(_))
    }
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Backend authentication endpoints.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<Credentials>;
    /// Exchange `current.refresh_token` for new credentials. Fields the
    /// backend leaves out of the response are carried over from `current`.
    async fn refresh(&self, current: &Credentials) -> AuthResult<Credentials>;
    async fn sign_out(&self, access_token: &str) -> AuthResult<()>;
}

/// Shared slot holding the bearer token of the active session.
///
/// The session writes it; HTTP clients read it on every request.
#[derive(Clone, Default)]
pub struct AccessToken(Arc<RwLock<Option<String>>>);

impl AccessToken {
    #[must_use]
    pub fn get(&self) -> Option<String> {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set(&self, token: impl Into<String>) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = Some(token.into());
    }

    pub fn clear(&self) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    #[must_use]
    pub fn is_present(&self) -> bool {
        self.0.read().unwrap_or_else(PoisonError::into_inner).is_some()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_present() {
            "[REDACTED]"
        } else {
            "<none>"
        };
        formatter.debug_tuple("AccessToken").field(&state).finish()
    }
}

pub(crate) fn validate_credentials(email: &str, password: &str) -> AuthResult<()> {
    if email.trim().is_empty() {
        return Err(AuthError::Api("Email is required".to_string()));
    }
    if password.trim().is_empty() {
        return Err(AuthError::Api("Password is required".to_string()));
    }
    Ok(())
}
