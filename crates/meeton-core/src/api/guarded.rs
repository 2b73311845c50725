//! Store decorator that turns rejected tokens into session expiry.

use std::sync::Arc;

use async_trait::async_trait;

use super::{ApiResult, EventStore};
use crate::auth::AuthSession;
use crate::models::{
    Attendee, EventId, NotificationId, NotificationPage, NotificationQuery, Photo, PhotoUpload,
    RsvpStatus, UploadPermission,
};

/// Wraps an [`EventStore`] and reports any `401` to the [`AuthSession`].
///
/// Callers still receive the error; the session broadcasts the expiry so
/// cache resets happen in one place instead of at every call site.
pub struct SessionGuardedStore {
    inner: Arc<dyn EventStore>,
    session: Arc<AuthSession>,
}

impl SessionGuardedStore {
    pub fn new(inner: Arc<dyn EventStore>, session: Arc<AuthSession>) -> Self {
        Self { inner, session }
    }

    async fn guard<T, F>(&self, call: F) -> ApiResult<T>
    where
        F: std::future::Future<Output = ApiResult<T>> + Send,
    {
        let generation = self.session.generation();
        let result = call.await;
        if let Err(error) = &result {
            if error.is_unauthorized() {
                tracing::warn!("Backend rejected the access token; expiring session");
                self.session.expire_generation(generation);
            }
        }
        result
    }
}

#[async_trait]
impl EventStore for SessionGuardedStore {
    async fn submit_rsvp(&self, event_id: &EventId, status: RsvpStatus) -> ApiResult<()> {
        self.guard(self.inner.submit_rsvp(event_id, status)).await
    }

    async fn upload_permissions(&self, event_id: &EventId) -> ApiResult<UploadPermission> {
        self.guard(self.inner.upload_permissions(event_id)).await
    }

    async fn attendees(&self, event_id: &EventId) -> ApiResult<Vec<Attendee>> {
        self.guard(self.inner.attendees(event_id)).await
    }

    async fn notifications(&self, query: NotificationQuery) -> ApiResult<NotificationPage> {
        self.guard(self.inner.notifications(query)).await
    }

    async fn mark_notification_read(&self, notification_id: &NotificationId) -> ApiResult<()> {
        self.guard(self.inner.mark_notification_read(notification_id))
            .await
    }

    async fn mark_all_notifications_read(&self) -> ApiResult<()> {
        self.guard(self.inner.mark_all_notifications_read()).await
    }

    async fn upload_photo(&self, event_id: &EventId, upload: &PhotoUpload) -> ApiResult<Photo> {
        self.guard(self.inner.upload_photo(event_id, upload)).await
    }
}
