//! Membership synchronizer.
//!
//! `MembershipSync` ties the per-user state (RSVP cache, notification badge)
//! to the session lifecycle. It observes the [`AuthSession`] and, whenever
//! the signed-in identity changes, drops everything that belonged to the
//! previous identity before any new data is fetched.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::api::{EventStore, HttpEventStore, SessionGuardedStore};
use crate::auth::{
    AuthResult, AuthSession, HttpAuthenticator, SessionEvent, SessionObserver,
    SessionPersistence, SessionUser,
};
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::models::{
    EventId, Notification, NotificationId, NotificationQuery, Photo, PhotoUpload, RsvpStatus,
    UploadPermission,
};
use crate::notifications::NotificationCounter;
use crate::permissions::PermissionResolver;
use crate::photos::PhotoUploader;
use crate::rsvp::RsvpCache;

pub const SESSION_EXPIRED_NOTICE: &str = "Your session has expired. Please sign in again.";
pub const SIGN_IN_TO_UPLOAD: &str = "Sign in to upload photos.";

pub struct MembershipSync {
    session: Arc<AuthSession>,
    cache: Arc<RsvpCache>,
    resolver: Arc<PermissionResolver>,
    counter: NotificationCounter,
    uploader: PhotoUploader,
    notice: Mutex<Option<String>>,
    background_refresh: AtomicBool,
}

impl MembershipSync {
    /// Build the synchronizer over `store` and register it with `session`.
    ///
    /// `store` is wrapped so that any `401` expires the session.
    pub fn new(
        session: Arc<AuthSession>,
        store: Arc<dyn EventStore>,
        config: &ClientConfig,
    ) -> Arc<Self> {
        let store: Arc<dyn EventStore> =
            Arc::new(SessionGuardedStore::new(store, Arc::clone(&session)));
        let cache = Arc::new(RsvpCache::new(Arc::clone(&store)));
        let resolver = Arc::new(PermissionResolver::new(
            Arc::clone(&store),
            Arc::clone(&cache),
        ));
        let counter = NotificationCounter::new(Arc::clone(&store), config);
        let uploader = PhotoUploader::new(store, Arc::clone(&resolver));

        let sync = Arc::new(Self {
            session: Arc::clone(&session),
            cache,
            resolver,
            counter,
            uploader,
            notice: Mutex::new(None),
            background_refresh: AtomicBool::new(true),
        });

        let observer: Weak<Self> = Arc::downgrade(&sync);
        session.add_observer(observer);
        if session.is_authenticated() {
            sync.counter.start();
        }
        sync
    }

    /// Wire the HTTP backend described by `config`.
    pub fn connect(
        config: &ClientConfig,
        persistence: Arc<dyn SessionPersistence>,
    ) -> Result<Arc<Self>> {
        let authenticator = Arc::new(HttpAuthenticator::new(config)?);
        let session = Arc::new(AuthSession::new(authenticator, persistence));
        let store = Arc::new(HttpEventStore::new(config, session.access_token())?);
        Ok(Self::new(session, store, config))
    }

    pub fn session(&self) -> &Arc<AuthSession> {
        &self.session
    }

    pub fn cache(&self) -> &Arc<RsvpCache> {
        &self.cache
    }

    pub fn resolver(&self) -> &Arc<PermissionResolver> {
        &self.resolver
    }

    pub const fn counter(&self) -> &NotificationCounter {
        &self.counter
    }

    /// Whether a sign-in starts the periodic notification refresh.
    ///
    /// Short-lived callers that only run one command turn it off; disabling
    /// also stops a task that is already running.
    pub fn set_background_refresh(&self, enabled: bool) {
        self.background_refresh.store(enabled, Ordering::SeqCst);
        if !enabled {
            self.counter.stop();
        }
    }

    /// Apply a session transition to the per-user state.
    pub fn handle(&self, event: &SessionEvent) {
        match event {
            SessionEvent::SignedIn(user) => {
                tracing::info!(user = %user.id, "Loading membership state");
                self.cache.clear_all();
                self.counter.reset();
                if self.background_refresh.load(Ordering::SeqCst) {
                    self.counter.start();
                }
                self.set_notice(None);
            }
            SessionEvent::Expired => {
                self.cache.clear_all();
                self.counter.reset();
                self.set_notice(Some(SESSION_EXPIRED_NOTICE.to_string()));
            }
            SessionEvent::SignedOut => {
                self.cache.clear_all();
                self.counter.reset();
            }
            SessionEvent::AuthenticationFailed { message } => {
                self.set_notice(Some(message.clone()));
            }
            SessionEvent::TokenRefreshed => {}
        }
    }

    /// Last user-facing message produced by a session transition.
    pub fn last_notice(&self) -> Option<String> {
        self.lock_notice().clone()
    }

    pub fn take_notice(&self) -> Option<String> {
        self.lock_notice().take()
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<SessionUser> {
        self.session.sign_in(email, password).await
    }

    pub async fn sign_out(&self) {
        self.session.sign_out().await;
    }

    /// Submit an RSVP for the signed-in user.
    pub async fn rsvp(&self, event_id: &EventId, status: RsvpStatus) -> bool {
        if !self.session.is_authenticated() {
            tracing::warn!(event = %event_id, "RSVP ignored; not signed in");
            return false;
        }
        self.cache.update(event_id, status).await
    }

    pub fn rsvp_status(&self, event_id: &EventId) -> RsvpStatus {
        self.cache.get(event_id)
    }

    pub async fn upload_permission(&self, event_id: &EventId) -> UploadPermission {
        match self.session.current_user() {
            Some(user) => self.resolver.resolve(event_id, &user.id).await,
            None => UploadPermission::denied(SIGN_IN_TO_UPLOAD, None),
        }
    }

    pub async fn upload_photo(&self, event_id: &EventId, upload: PhotoUpload) -> Result<Photo> {
        let user = self.session.current_user().ok_or(Error::NotSignedIn)?;
        self.uploader.upload(event_id, &user.id, upload).await
    }

    pub fn unread_count(&self) -> u32 {
        self.counter.unread_count()
    }

    pub async fn refresh_notifications(&self) -> bool {
        self.counter.refresh().await
    }

    pub async fn recent_notifications(&self, limit: u32) -> Option<Vec<Notification>> {
        self.counter.recent(limit).await
    }

    pub async fn list_notifications(&self, query: NotificationQuery) -> Option<Vec<Notification>> {
        self.counter.list(query).await
    }

    pub async fn mark_read(&self, notification_id: &NotificationId) -> bool {
        self.counter.mark_read(notification_id).await
    }

    pub async fn mark_all_read(&self) -> bool {
        self.counter.mark_all_read().await
    }

    fn set_notice(&self, notice: Option<String>) {
        *self.lock_notice() = notice;
    }

    fn lock_notice(&self) -> MutexGuard<'_, Option<String>> {
        self.notice.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionObserver for MembershipSync {
    fn on_session_event(&self, event: &SessionEvent) {
        self.handle(event);
    }
}
