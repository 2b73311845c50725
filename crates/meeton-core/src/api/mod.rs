//! Backend contract consumed by the membership state layer.
//!
//! The backend is the store of record for events, attendees, RSVPs, photos and
//! notifications. Everything here is a thin typed view over its REST routes.

mod guarded;
mod http;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::models::{
    Attendee, EventId, NotificationId, NotificationPage, NotificationQuery, Photo, PhotoUpload,
    RsvpStatus, UploadPermission,
};

pub use guarded::SessionGuardedStore;
pub use http::HttpEventStore;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No access token available; sign in first")]
    NotAuthenticated,
    #[error("Session expired or access token rejected")]
    Unauthorized,
    #[error("Endpoint unavailable (HTTP {status})")]
    Unavailable { status: u16 },
    #[error("Backend returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to parse JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid API configuration: {0}")]
    InvalidConfiguration(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// Classify a non-2xx response.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => Self::Unauthorized,
            StatusCode::NOT_FOUND | StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED => {
                Self::Unavailable {
                    status: status.as_u16(),
                }
            }
            _ => Self::Status {
                status: status.as_u16(),
                message: parse_api_error(body),
            },
        }
    }

    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

/// Remote operations the client depends on.
///
/// `HttpEventStore` talks to the real backend; tests substitute in-memory
/// implementations.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// `POST /events/{id}/rsvp`
    async fn submit_rsvp(&self, event_id: &EventId, status: RsvpStatus) -> ApiResult<()>;

    /// `GET /events/{id}/upload-permissions`
    async fn upload_permissions(&self, event_id: &EventId) -> ApiResult<UploadPermission>;

    /// `GET /events/{id}/attendees`
    async fn attendees(&self, event_id: &EventId) -> ApiResult<Vec<Attendee>>;

    /// `GET /notifications?page&limit&unreadOnly`
    async fn notifications(&self, query: NotificationQuery) -> ApiResult<NotificationPage>;

    /// `POST /notifications/{id}/read`
    async fn mark_notification_read(&self, notification_id: &NotificationId) -> ApiResult<()>;

    /// `POST /notifications/read-all`
    async fn mark_all_notifications_read(&self) -> ApiResult<()>;

    /// `POST /events/{id}/photos`
    async fn upload_photo(&self, event_id: &EventId, upload: &PhotoUpload) -> ApiResult<Photo>;
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
    msg: Option<String>,
}

fn parse_api_error(body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.msg).or(payload.error) {
            return crate::util::compact_text(&message);
        }
    }

    let trimmed = crate::util::compact_text(body);
    if trimmed.is_empty() {
        "empty response body".to_string()
    } else {
        trimmed
    }
}
