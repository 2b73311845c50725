//! Session lifecycle.
//!
//! `AuthSession` owns the signed-in identity and its tokens and is the only
//! component whose state changes arrive from outside the user's actions
//! (expiry reported by the backend, the background token refresh). Every
//! transition is announced to observers synchronously and to broadcast
//! subscribers.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::{
    validate_credentials, AccessToken, AuthError, AuthResult, Authenticator, Credentials,
    SessionPersistence, SessionUser,
};

const EVENT_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticating,
    Authenticated(SessionUser),
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn(SessionUser),
    TokenRefreshed,
    Expired,
    AuthenticationFailed { message: String },
    SignedOut,
}

/// Receives session events before the call that caused them returns.
pub trait SessionObserver: Send + Sync {
    fn on_session_event(&self, event: &SessionEvent);
}

struct SessionInner {
    state: SessionState,
    credentials: Option<Credentials>,
    /// Bumped whenever the signed-in identity is replaced or dropped.
    generation: u64,
}

pub struct AuthSession {
    authenticator: Arc<dyn Authenticator>,
    store: Arc<dyn SessionPersistence>,
    token: AccessToken,
    inner: Mutex<SessionInner>,
    events: broadcast::Sender<SessionEvent>,
    observers: Mutex<Vec<Weak<dyn SessionObserver>>>,
}

impl AuthSession {
    pub fn new(authenticator: Arc<dyn Authenticator>, store: Arc<dyn SessionPersistence>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            authenticator,
            store,
            token: AccessToken::default(),
            inner: Mutex::new(SessionInner {
                state: SessionState::Anonymous,
                credentials: None,
                generation: 0,
            }),
            events,
            observers: Mutex::new(Vec::new()),
        }
    }

    /// Handle to the bearer token, for HTTP clients.
    pub fn access_token(&self) -> AccessToken {
        self.token.clone()
    }

    pub fn state(&self) -> SessionState {
        self.lock().state.clone()
    }

    pub fn current_user(&self) -> Option<SessionUser> {
        match &self.lock().state {
            SessionState::Authenticated(user) => Some(user.clone()),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.lock().state, SessionState::Authenticated(_))
    }

    /// Signed-in user, or the identity of the last persisted session.
    pub fn last_known_user(&self) -> Option<SessionUser> {
        self.current_user().or_else(|| {
            self.store
                .load_session()
                .ok()
                .flatten()
                .map(|credentials| credentials.user)
        })
    }

    /// Identity generation; see [`Self::expire_generation`].
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn add_observer(&self, observer: Weak<dyn SessionObserver>) {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    /// Sign in, replacing any current session.
    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<SessionUser> {
        validate_credentials(email, password)?;

        let replaced = {
            let mut inner = self.lock();
            if inner.state == SessionState::Authenticating {
                return Err(AuthError::SignInInProgress);
            }
            let replaced = matches!(inner.state, SessionState::Authenticated(_));
            inner.state = SessionState::Authenticating;
            inner.credentials = None;
            inner.generation += 1;
            self.token.clear();
            replaced
        };
        if replaced {
            self.emit(SessionEvent::SignedOut);
        }

        match self.authenticator.sign_in(email, password).await {
            Ok(credentials) => {
                let user = credentials.user.clone();
                self.install(credentials);
                Ok(user)
            }
            Err(error) => {
                self.lock().state = SessionState::Anonymous;
                tracing::warn!("Sign-in failed: {}", error);
                self.emit(SessionEvent::AuthenticationFailed {
                    message: error.to_string(),
                });
                Err(error)
            }
        }
    }

    /// Resume the persisted session, refreshing it once if it has expired.
    ///
    /// When the backend cannot be reached the persisted blob is kept, so
    /// [`Self::last_known_user`] still answers offline.
    pub async fn restore(&self) -> AuthResult<Option<SessionUser>> {
        let Some(stored) = self.store.load_session()? else {
            return Ok(None);
        };

        if !stored.is_expired() {
            let user = stored.user.clone();
            self.install(stored);
            return Ok(Some(user));
        }

        if stored.refresh_token.is_none() {
            self.clear_persisted();
            return Ok(None);
        }

        match self.authenticator.refresh(&stored).await {
            Ok(credentials) => {
                let user = credentials.user.clone();
                self.install(credentials);
                Ok(Some(user))
            }
            Err(error) if error.is_transient() => {
                tracing::warn!("Could not refresh persisted session while offline: {}", error);
                Ok(None)
            }
            Err(error) => {
                tracing::warn!("Failed to refresh persisted session: {}", error);
                self.clear_persisted();
                Ok(None)
            }
        }
    }

    /// Exchange the refresh token for new credentials.
    ///
    /// A rejected refresh expires the session; a transport failure leaves it
    /// alone so the next attempt can retry.
    pub async fn refresh(&self) -> AuthResult<()> {
        let (generation, current) = {
            let inner = self.lock();
            let Some(credentials) = inner.credentials.clone() else {
                return Err(AuthError::NotSignedIn);
            };
            (inner.generation, credentials)
        };

        if current.refresh_token.is_none() {
            if current.is_expired() {
                self.expire_generation(generation);
            }
            return Err(AuthError::Api("No refresh token available".to_string()));
        }

        match self.authenticator.refresh(&current).await {
            Ok(credentials) => {
                {
                    let mut inner = self.lock();
                    if inner.generation != generation
                        || !matches!(inner.state, SessionState::Authenticated(_))
                    {
                        tracing::debug!("Discarding token refresh for a replaced session");
                        return Ok(());
                    }
                    inner.state = SessionState::Authenticated(credentials.user.clone());
                    self.token.set(credentials.access_token.clone());
                    inner.credentials = Some(credentials.clone());
                }
                self.persist(&credentials);
                tracing::debug!("Access token refreshed");
                self.emit(SessionEvent::TokenRefreshed);
                Ok(())
            }
            Err(error) if error.is_transient() => {
                tracing::warn!("Token refresh failed, will retry: {}", error);
                Err(error)
            }
            Err(error) => {
                tracing::warn!("Token refresh rejected: {}", error);
                self.expire_generation(generation);
                Err(error)
            }
        }
    }

    /// Whether the held credentials are inside the expiry window.
    pub fn needs_refresh(&self) -> bool {
        let inner = self.lock();
        matches!(inner.state, SessionState::Authenticated(_))
            && inner
                .credentials
                .as_ref()
                .is_some_and(Credentials::is_expired)
    }

    /// Force the current session into `Expired`.
    ///
    /// Returns `false` when there was no authenticated session to expire.
    pub fn expire(&self) -> bool {
        let generation = self.generation();
        self.expire_generation(generation)
    }

    /// Expire the session only if it is still the one identified by
    /// `generation`, so a late `401` from a previous login is ignored.
    pub fn expire_generation(&self, generation: u64) -> bool {
        {
            let mut inner = self.lock();
            if inner.generation != generation
                || !matches!(inner.state, SessionState::Authenticated(_))
            {
                return false;
            }
            inner.state = SessionState::Expired;
            inner.credentials = None;
            inner.generation += 1;
            self.token.clear();
        }
        self.clear_persisted();
        tracing::info!("Session expired");
        self.emit(SessionEvent::Expired);
        true
    }

    /// Sign out locally, then tell the backend. The remote call is best-effort.
    pub async fn sign_out(&self) {
        let (credentials, was_active) = {
            let mut inner = self.lock();
            let was_active = matches!(
                inner.state,
                SessionState::Authenticated(_) | SessionState::Expired
            );
            inner.state = SessionState::Anonymous;
            inner.generation += 1;
            self.token.clear();
            (inner.credentials.take(), was_active)
        };
        self.clear_persisted();
        if was_active {
            tracing::info!("Signed out");
            self.emit(SessionEvent::SignedOut);
        }

        if let Some(credentials) = credentials {
            if let Err(error) = self.authenticator.sign_out(&credentials.access_token).await {
                tracing::warn!("Remote sign-out failed: {}", error);
            }
        }
    }

    /// Periodically refresh the token before it expires.
    ///
    /// The task holds only a weak reference and ends once the session is dropped.
    pub fn spawn_refresh_loop(self: &Arc<Self>, check_every: Duration) -> JoinHandle<()> {
        let session = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(check_every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(session) = session.upgrade() else {
                    break;
                };
                if session.needs_refresh() {
                    let _ = session.refresh().await;
                }
            }
        })
    }

    fn install(&self, credentials: Credentials) {
        let user = credentials.user.clone();
        {
            let mut inner = self.lock();
            inner.state = SessionState::Authenticated(user.clone());
            inner.credentials = Some(credentials.clone());
            inner.generation += 1;
            self.token.set(credentials.access_token.clone());
        }
        self.persist(&credentials);
        tracing::info!(user = %user.id, "Signed in");
        self.emit(SessionEvent::SignedIn(user));
    }

    fn persist(&self, credentials: &Credentials) {
        if let Err(error) = self.store.save_session(credentials) {
            tracing::warn!("Failed to persist session: {}", error);
        }
    }

    fn clear_persisted(&self) {
        if let Err(error) = self.store.clear_session() {
            tracing::warn!("Failed to clear persisted session: {}", error);
        }
    }

    fn emit(&self, event: SessionEvent) {
        let observers: Vec<Arc<dyn SessionObserver>> = {
            let mut guard = self
                .observers
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            guard.retain(|observer| observer.strong_count() > 0);
            guard.iter().filter_map(Weak::upgrade).collect()
        };
        for observer in observers {
            observer.on_session_event(&event);
        }
        let _ = self.events.send(event);
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::auth::MemorySessionStore;
    use crate::models::UserId;
    use crate::util::unix_timestamp_now;

    #[derive(Clone, Copy, PartialEq, Eq)]
    enum RefreshMode {
        Succeed,
        Reject,
        Offline,
        ServerError,
    }

    struct FakeAuthenticator {
        reject_sign_in: AtomicBool,
        short_lived: AtomicBool,
        refresh_mode: Mutex<RefreshMode>,
        refresh_calls: AtomicUsize,
        sign_out_calls: AtomicUsize,
    }

    impl FakeAuthenticator {
        fn new() -> Self {
            Self {
                reject_sign_in: AtomicBool::new(false),
                short_lived: AtomicBool::new(false),
                refresh_mode: Mutex::new(RefreshMode::Succeed),
                refresh_calls: AtomicUsize::new(0),
                sign_out_calls: AtomicUsize::new(0),
            }
        }

        fn set_refresh_mode(&self, mode: RefreshMode) {
            *self.refresh_mode.lock().unwrap() = mode;
        }
    }

    fn offline_error() -> AuthError {
        let error = reqwest::Client::new()
            .get("not a url")
            .build()
            .unwrap_err();
        AuthError::Http(error)
    }

    fn credentials(token: &str, expires_at: Option<i64>) -> Credentials {
        Credentials {
            access_token: token.to_string(),
            refresh_token: Some("refresh".to_string()),
            expires_at,
            user: SessionUser {
                id: UserId::new("u1").unwrap(),
                email: Some("ana@example.com".to_string()),
                display_name: None,
            },
        }
    }

    #[async_trait]
    impl Authenticator for FakeAuthenticator {
        async fn sign_in(&self, _email: &str, _password: &str) -> AuthResult<Credentials> {
            if self.reject_sign_in.load(Ordering::SeqCst) {
                return Err(AuthError::InvalidCredentials);
            }
            let lifetime = if self.short_lived.load(Ordering::SeqCst) { 30 } else { 3600 };
            Ok(credentials("token-1", Some(unix_timestamp_now() + lifetime)))
        }

        async fn refresh(&self, _current: &Credentials) -> AuthResult<Credentials> {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            let mode = *self.refresh_mode.lock().unwrap();
            match mode {
                RefreshMode::Succeed => Ok(credentials("token-2", Some(unix_timestamp_now() + 3600))),
                RefreshMode::Reject => Err(AuthError::InvalidCredentials),
                RefreshMode::Offline => Err(offline_error()),
                RefreshMode::ServerError => Err(AuthError::Unavailable("HTTP 503".to_string())),
            }
        }

        async fn sign_out(&self, _access_token: &str) -> AuthResult<()> {
            self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn session() -> (AuthSession, Arc<FakeAuthenticator>, Arc<MemorySessionStore>) {
        let authenticator = Arc::new(FakeAuthenticator::new());
        let store = Arc::new(MemorySessionStore::default());
        let session = AuthSession::new(authenticator.clone(), store.clone());
        (session, authenticator, store)
    }

    fn drain(receiver: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn sign_in_installs_token_and_persists_session() {
        let (session, _, store) = session();
        let mut events = session.subscribe();

        let user = session.sign_in("ana@example.com", "pw").await.unwrap();

        assert_eq!(session.state(), SessionState::Authenticated(user.clone()));
        assert_eq!(session.access_token().get().as_deref(), Some("token-1"));
        assert!(store.load_session().unwrap().is_some());
        assert_eq!(drain(&mut events), vec![SessionEvent::SignedIn(user)]);
    }

    #[tokio::test]
    async fn failed_sign_in_returns_to_anonymous() {
        let (session, authenticator, _) = session();
        authenticator.reject_sign_in.store(true, Ordering::SeqCst);
        let mut events = session.subscribe();

        let error = session.sign_in("ana@example.com", "bad").await.unwrap_err();

        assert!(matches!(error, AuthError::InvalidCredentials));
        assert_eq!(session.state(), SessionState::Anonymous);
        assert!(!session.access_token().is_present());
        assert!(matches!(
            drain(&mut events).as_slice(),
            [SessionEvent::AuthenticationFailed { .. }]
        ));
    }

    #[tokio::test]
    async fn expire_happens_once_per_session() {
        let (session, _, store) = session();
        session.sign_in("ana@example.com", "pw").await.unwrap();
        let mut events = session.subscribe();

        assert!(session.expire());
        assert!(!session.expire());

        assert_eq!(session.state(), SessionState::Expired);
        assert!(!session.access_token().is_present());
        assert!(store.load_session().unwrap().is_none());
        assert_eq!(drain(&mut events), vec![SessionEvent::Expired]);
    }

    #[tokio::test]
    async fn stale_generation_does_not_expire_new_session() {
        let (session, _, _) = session();
        session.sign_in("ana@example.com", "pw").await.unwrap();
        let stale = session.generation();
        session.sign_in("ana@example.com", "pw").await.unwrap();

        assert!(!session.expire_generation(stale));
        assert!(session.is_authenticated());
    }

    #[tokio::test]
    async fn refresh_swaps_token_and_notifies() {
        let (session, _, _) = session();
        session.sign_in("ana@example.com", "pw").await.unwrap();
        let mut events = session.subscribe();

        session.refresh().await.unwrap();

        assert_eq!(session.access_token().get().as_deref(), Some("token-2"));
        assert_eq!(drain(&mut events), vec![SessionEvent::TokenRefreshed]);
    }

    #[tokio::test]
    async fn rejected_refresh_expires_session() {
        let (session, authenticator, _) = session();
        session.sign_in("ana@example.com", "pw").await.unwrap();
        authenticator.set_refresh_mode(RefreshMode::Reject);

        assert!(session.refresh().await.is_err());
        assert_eq!(session.state(), SessionState::Expired);
    }

    #[tokio::test]
    async fn offline_refresh_keeps_session() {
        let (session, authenticator, _) = session();
        session.sign_in("ana@example.com", "pw").await.unwrap();
        authenticator.set_refresh_mode(RefreshMode::Offline);

        assert!(session.refresh().await.is_err());
        assert!(session.is_authenticated());
    }

    #[tokio::test]
    async fn refresh_during_server_outage_keeps_session() {
        let (session, authenticator, store) = session();
        session.sign_in("ana@example.com", "pw").await.unwrap();
        let mut events = session.subscribe();
        authenticator.set_refresh_mode(RefreshMode::ServerError);

        assert!(matches!(
            session.refresh().await,
            Err(AuthError::Unavailable(_))
        ));
        assert!(session.is_authenticated());
        assert_eq!(session.access_token().get().as_deref(), Some("token-1"));
        assert!(store.load_session().unwrap().is_some());
        assert!(drain(&mut events).is_empty());
    }

    #[tokio::test]
    async fn restore_uses_valid_persisted_session_without_refresh() {
        let (session, authenticator, store) = session();
        store
            .save_session(&credentials("stored", Some(unix_timestamp_now() + 3600)))
            .unwrap();

        let user = session.restore().await.unwrap();

        assert!(user.is_some());
        assert_eq!(session.access_token().get().as_deref(), Some("stored"));
        assert_eq!(authenticator.refresh_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn restore_refreshes_expired_session() {
        let (session, authenticator, store) = session();
        store
            .save_session(&credentials("stale", Some(unix_timestamp_now() - 10)))
            .unwrap();

        assert!(session.restore().await.unwrap().is_some());
        assert_eq!(session.access_token().get().as_deref(), Some("token-2"));
        assert_eq!(authenticator.refresh_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn restore_offline_keeps_last_known_identity() {
        let (session, authenticator, store) = session();
        authenticator.set_refresh_mode(RefreshMode::Offline);
        store
            .save_session(&credentials("stale", Some(unix_timestamp_now() - 10)))
            .unwrap();

        assert_eq!(session.restore().await.unwrap(), None);
        assert_eq!(session.state(), SessionState::Anonymous);
        assert_eq!(
            session.last_known_user().map(|user| user.id.to_string()),
            Some("u1".to_string())
        );
    }

    #[tokio::test]
    async fn sign_out_clears_everything_and_calls_backend() {
        let (session, authenticator, store) = session();
        session.sign_in("ana@example.com", "pw").await.unwrap();
        let mut events = session.subscribe();

        session.sign_out().await;

        assert_eq!(session.state(), SessionState::Anonymous);
        assert!(store.load_session().unwrap().is_none());
        assert!(session.last_known_user().is_none());
        assert_eq!(authenticator.sign_out_calls.load(Ordering::SeqCst), 1);
        assert_eq!(drain(&mut events), vec![SessionEvent::SignedOut]);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_loop_renews_expiring_token() {
        let authenticator = Arc::new(FakeAuthenticator::new());
        authenticator.short_lived.store(true, Ordering::SeqCst);
        let session = Arc::new(AuthSession::new(
            authenticator.clone(),
            Arc::new(MemorySessionStore::default()),
        ));
        session.sign_in("ana@example.com", "pw").await.unwrap();
        assert!(session.needs_refresh());

        let handle = session.spawn_refresh_loop(Duration::from_secs(10));
        tokio::time::sleep(Duration::from_secs(25)).await;

        assert_eq!(session.access_token().get().as_deref(), Some("token-2"));
        assert_eq!(authenticator.refresh_calls.load(Ordering::SeqCst), 1);
        handle.abort();
    }

    #[tokio::test]
    async fn observers_see_events_synchronously() {
        struct Recorder(Mutex<Vec<SessionEvent>>);

        impl SessionObserver for Recorder {
            fn on_session_event(&self, event: &SessionEvent) {
                self.0.lock().unwrap().push(event.clone());
            }
        }

        let (session, _, _) = session();
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let weak: Weak<Recorder> = Arc::downgrade(&recorder);
        session.add_observer(weak);

        session.sign_in("ana@example.com", "pw").await.unwrap();
        session.expire();

        let seen = recorder.0.lock().unwrap().clone();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1], SessionEvent::Expired);
    }
}
