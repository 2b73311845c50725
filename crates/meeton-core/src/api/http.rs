//! `reqwest` implementation of the backend contract.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{ApiError, ApiResult, EventStore};
use crate::auth::AccessToken;
use crate::config::ClientConfig;
use crate::models::{
    Attendee, EventId, NotificationId, NotificationPage, NotificationQuery, Photo, PhotoUpload,
    RsvpStatus, UploadPermission,
};
use crate::util::normalize_base_url;

/// HTTP client for the MeetOn REST API.
///
/// Every call carries the bearer token currently held by the session's
/// [`AccessToken`] handle.
#[derive(Debug, Clone)]
pub struct HttpEventStore {
    base_url: String,
    client: Client,
    token: AccessToken,
}

impl HttpEventStore {
    pub fn new(config: &ClientConfig, token: AccessToken) -> ApiResult<Self> {
        let base_url =
            normalize_base_url(&config.api_base_url).map_err(ApiError::InvalidConfiguration)?;
        let client = Client::builder().timeout(config.request_timeout()).build()?;
        Ok(Self {
            base_url,
            client,
            token,
        })
    }

    /// Returns the base URL this client was configured with.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn event_url(&self, event_id: &EventId, suffix: &str) -> String {
        format!(
            "{}/events/{}/{suffix}",
            self.base_url,
            urlencoding::encode(event_id.as_str())
        )
    }

    fn authorized(&self, request: RequestBuilder) -> ApiResult<RequestBuilder> {
        let token = self.token.get().ok_or(ApiError::NotAuthenticated)?;
        Ok(request
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/json"))
    }

    async fn send(&self, request: RequestBuilder) -> ApiResult<Response> {
        let response = self.authorized(request)?.send().await?;
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::from_status(status, &body))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        let response = self.send(request).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl EventStore for HttpEventStore {
    async fn submit_rsvp(&self, event_id: &EventId, status: RsvpStatus) -> ApiResult<()> {
        let request = self
            .client
            .post(self.event_url(event_id, "rsvp"))
            .json(&serde_json::json!({ "rsvp": status }));
        self.send(request).await?;
        Ok(())
    }

    async fn upload_permissions(&self, event_id: &EventId) -> ApiResult<UploadPermission> {
        let request = self
            .client
            .get(self.event_url(event_id, "upload-permissions"));
        self.send_json(request).await
    }

    async fn attendees(&self, event_id: &EventId) -> ApiResult<Vec<Attendee>> {
        let request = self.client.get(self.event_url(event_id, "attendees"));
        self.send_json(request).await
    }

    async fn notifications(&self, query: NotificationQuery) -> ApiResult<NotificationPage> {
        let request = self
            .client
            .get(format!("{}/notifications", self.base_url))
            .query(&query.to_query_pairs());
        self.send_json(request).await
    }

    async fn mark_notification_read(&self, notification_id: &NotificationId) -> ApiResult<()> {
        let request = self.client.post(format!(
            "{}/notifications/{}/read",
            self.base_url,
            urlencoding::encode(notification_id.as_str())
        ));
        self.send(request).await?;
        Ok(())
    }

    async fn mark_all_notifications_read(&self) -> ApiResult<()> {
        let request = self
            .client
            .post(format!("{}/notifications/read-all", self.base_url));
        self.send(request).await?;
        Ok(())
    }

    async fn upload_photo(&self, event_id: &EventId, upload: &PhotoUpload) -> ApiResult<Photo> {
        let part = Part::bytes(upload.bytes.clone())
            .file_name(upload.file_name.clone())
            .mime_str(&upload.content_type)?;
        let mut form = Form::new().part("photo", part);
        if let Some(caption) = &upload.caption {
            form = form.text("caption", caption.clone());
        }
        let request = self
            .client
            .post(self.event_url(event_id, "photos"))
            .multipart(form);
        let payload: PhotoResponse = self.send_json(request).await?;
        Ok(payload.into_photo())
    }
}

/// Upload responses come back either bare or wrapped in `{ "photo": ... }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PhotoResponse {
    Wrapped { photo: Photo },
    Bare(Photo),
}

impl PhotoResponse {
    fn into_photo(self) -> Photo {
        match self {
            Self::Wrapped { photo } | Self::Bare(photo) => photo,
        }
    }
}
