//! In-memory backend doubles used by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use crate::api::{ApiError, ApiResult, EventStore};
use crate::auth::{AuthError, AuthResult, Authenticator, Credentials, SessionUser};
use crate::models::{
    Attendee, EventId, Notification, NotificationId, NotificationPage, NotificationQuery,
    Pagination, Photo, PhotoId, PhotoUpload, RsvpStatus, UploadPermission, UserId, UserSummary,
};

/// Canned outcome for one mocked endpoint.
#[derive(Debug, Clone)]
pub enum Reply<T> {
    Ok(T),
    Unauthorized,
    Unavailable,
    Failed,
}

impl<T: Clone> Reply<T> {
    fn result(&self) -> ApiResult<T> {
        match self {
            Self::Ok(value) => Ok(value.clone()),
            Self::Unauthorized => Err(ApiError::Unauthorized),
            Self::Unavailable => Err(ApiError::Unavailable { status: 404 }),
            Self::Failed => Err(ApiError::Status {
                status: 500,
                message: "boom".to_string(),
            }),
        }
    }
}

pub struct MockEventStore {
    pub rsvp: Mutex<Reply<()>>,
    pub rsvp_delays: Mutex<HashMap<RsvpStatus, Duration>>,
    pub submitted: Mutex<Vec<(EventId, RsvpStatus)>>,
    pub permission: Mutex<Reply<UploadPermission>>,
    pub permission_delay: Mutex<Duration>,
    pub attendees: Mutex<Reply<Vec<Attendee>>>,
    pub notifications: Mutex<Reply<NotificationPage>>,
    pub notification_delay: Mutex<Duration>,
    pub notification_calls: AtomicU32,
    pub mark_read: Mutex<Reply<()>>,
    pub mark_read_delay: Mutex<Duration>,
    pub upload: Mutex<Reply<Photo>>,
    pub calls: Mutex<Vec<&'static str>>,
}

impl Default for MockEventStore {
    fn default() -> Self {
        Self {
            rsvp: Mutex::new(Reply::Ok(())),
            rsvp_delays: Mutex::new(HashMap::new()),
            submitted: Mutex::new(Vec::new()),
            permission: Mutex::new(Reply::Unavailable),
            permission_delay: Mutex::new(Duration::ZERO),
            attendees: Mutex::new(Reply::Unavailable),
            notifications: Mutex::new(Reply::Ok(NotificationPage::default())),
            notification_delay: Mutex::new(Duration::ZERO),
            notification_calls: AtomicU32::new(0),
            mark_read: Mutex::new(Reply::Ok(())),
            mark_read_delay: Mutex::new(Duration::ZERO),
            upload: Mutex::new(Reply::Ok(photo("p1"))),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl MockEventStore {
    pub fn set<T>(slot: &Mutex<Reply<T>>, reply: Reply<T>) {
        *slot.lock().unwrap() = reply;
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }

    async fn wait(delay: &Mutex<Duration>) {
        let delay = *delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl EventStore for MockEventStore {
    async fn submit_rsvp(&self, event_id: &EventId, status: RsvpStatus) -> ApiResult<()> {
        self.record("submit_rsvp");
        let delay = self
            .rsvp_delays
            .lock()
            .unwrap()
            .get(&status)
            .copied()
            .unwrap_or_default();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let result = self.rsvp.lock().unwrap().result();
        if result.is_ok() {
            self.submitted
                .lock()
                .unwrap()
                .push((event_id.clone(), status));
        }
        result
    }

    async fn upload_permissions(&self, _event_id: &EventId) -> ApiResult<UploadPermission> {
        self.record("upload_permissions");
        Self::wait(&self.permission_delay).await;
        self.permission.lock().unwrap().result()
    }

    async fn attendees(&self, _event_id: &EventId) -> ApiResult<Vec<Attendee>> {
        self.record("attendees");
        self.attendees.lock().unwrap().result()
    }

    async fn notifications(&self, _query: NotificationQuery) -> ApiResult<NotificationPage> {
        self.record("notifications");
        self.notification_calls.fetch_add(1, Ordering::SeqCst);
        Self::wait(&self.notification_delay).await;
        self.notifications.lock().unwrap().result()
    }

    async fn mark_notification_read(&self, _notification_id: &NotificationId) -> ApiResult<()> {
        self.record("mark_notification_read");
        Self::wait(&self.mark_read_delay).await;
        self.mark_read.lock().unwrap().result()
    }

    async fn mark_all_notifications_read(&self) -> ApiResult<()> {
        self.record("mark_all_notifications_read");
        Self::wait(&self.mark_read_delay).await;
        self.mark_read.lock().unwrap().result()
    }

    async fn upload_photo(&self, _event_id: &EventId, _upload: &PhotoUpload) -> ApiResult<Photo> {
        self.record("upload_photo");
        self.upload.lock().unwrap().result()
    }
}

pub fn event(id: &str) -> EventId {
    EventId::new(id).unwrap()
}

pub fn user(id: &str) -> UserId {
    UserId::new(id).unwrap()
}

pub fn attendee(id: &str, rsvp: Option<RsvpStatus>) -> Attendee {
    Attendee {
        user_id: user(id),
        rsvp,
        user: UserSummary::default(),
    }
}

pub fn photo(id: &str) -> Photo {
    Photo {
        id: PhotoId::new(id).unwrap(),
        event_id: None,
        url: format!("https://cdn.example.com/{id}.jpg"),
        caption: None,
        uploaded_by: None,
        created_at: None,
    }
}

/// Page with `unread` unread rows followed by `read` read rows.
pub fn page(unread: usize, read: usize) -> NotificationPage {
    let notifications = (0..unread + read)
        .map(|index| Notification {
            id: NotificationId::new(format!("n{index}")).unwrap(),
            kind: Some("RSVP_UPDATE".to_string()),
            message: format!("notification {index}"),
            is_read: index >= unread,
            created_at: None,
            event_id: None,
        })
        .collect();
    NotificationPage {
        notifications,
        pagination: Pagination {
            page: Some(1),
            total_pages: 1,
        },
    }
}

/// Authenticator that accepts any password and rejects every refresh.
#[derive(Default)]
pub struct StaticAuthenticator;

#[async_trait]
impl Authenticator for StaticAuthenticator {
    async fn sign_in(&self, email: &str, _password: &str) -> AuthResult<Credentials> {
        Ok(Credentials {
            access_token: "token".to_string(),
            refresh_token: None,
            expires_at: None,
            user: SessionUser {
                id: user("u1"),
                email: Some(email.to_string()),
                display_name: None,
            },
        })
    }

    async fn refresh(&self, _current: &Credentials) -> AuthResult<Credentials> {
        Err(AuthError::InvalidCredentials)
    }

    async fn sign_out(&self, _access_token: &str) -> AuthResult<()> {
        Ok(())
    }
}
