//! Unread notification badge.
//!
//! Keeps an approximate unread count: local marks adjust it immediately and a
//! background refresh reconciles it with the backend every
//! `refresh_interval`. Between refreshes the count may drift from the server.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::api::EventStore;
use crate::config::ClientConfig;
use crate::models::{Notification, NotificationId, NotificationQuery};

struct CounterShared {
    store: Arc<dyn EventStore>,
    unread: watch::Sender<u32>,
    /// Bumped by `reset`; refreshes started under an older epoch are dropped.
    epoch: AtomicU64,
    page_size: u32,
    last_refreshed_at: Mutex<Option<DateTime<Utc>>>,
}

impl CounterShared {
    async fn refresh(&self) -> bool {
        let epoch = self.epoch.load(Ordering::SeqCst);
        let page = match self
            .store
            .notifications(NotificationQuery::unread(self.page_size))
            .await
        {
            Ok(page) => page,
            Err(error) => {
                tracing::warn!("Failed to refresh unread notifications: {}", error);
                return false;
            }
        };

        let count = page.unread_count();
        let mut stale = false;
        self.unread.send_if_modified(|unread| {
            if self.epoch.load(Ordering::SeqCst) != epoch {
                stale = true;
                return false;
            }
            let changed = *unread != count;
            *unread = count;
            changed
        });
        if stale {
            tracing::debug!("Discarding notification refresh from a previous session");
            return false;
        }

        tracing::debug!(unread = count, "Unread notifications refreshed");
        *self
            .last_refreshed_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Utc::now());
        true
    }
}

pub struct NotificationCounter {
    shared: Arc<CounterShared>,
    refresh_interval: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl NotificationCounter {
    pub fn new(store: Arc<dyn EventStore>, config: &ClientConfig) -> Self {
        Self::with_settings(
            store,
            config.notification_refresh_interval(),
            config.notification_page_size,
        )
    }

    pub fn with_settings(
        store: Arc<dyn EventStore>,
        refresh_interval: Duration,
        page_size: u32,
    ) -> Self {
        let (unread, _) = watch::channel(0);
        Self {
            shared: Arc::new(CounterShared {
                store,
                unread,
                epoch: AtomicU64::new(0),
                page_size,
                last_refreshed_at: Mutex::new(None),
            }),
            refresh_interval,
            task: Mutex::new(None),
        }
    }

    pub fn unread_count(&self) -> u32 {
        *self.shared.unread.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u32> {
        self.shared.unread.subscribe()
    }

    /// Number of resets so far. Refreshes started under an older epoch are
    /// discarded when they resolve.
    pub fn epoch(&self) -> u64 {
        self.shared.epoch.load(Ordering::SeqCst)
    }

    pub const fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    /// When the count was last reconciled with the backend.
    pub fn last_refreshed_at(&self) -> Option<DateTime<Utc>> {
        *self
            .shared
            .last_refreshed_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Recount unread notifications from the first page. Keeps the previous
    /// count when the backend cannot be reached.
    pub async fn refresh(&self) -> bool {
        self.shared.refresh().await
    }

    /// Most recent notifications, read or not.
    pub async fn recent(&self, limit: u32) -> Option<Vec<Notification>> {
        self.list(NotificationQuery::recent(limit)).await
    }

    /// One page of notifications, `None` when the backend cannot be reached.
    pub async fn list(&self, query: NotificationQuery) -> Option<Vec<Notification>> {
        match self.shared.store.notifications(query).await {
            Ok(page) => Some(page.notifications),
            Err(error) => {
                tracing::warn!("Failed to list notifications: {}", error);
                None
            }
        }
    }

    /// Decrement locally, then tell the backend. The local change is kept
    /// even if the backend call fails.
    pub async fn mark_read(&self, notification_id: &NotificationId) -> bool {
        self.shared
            .unread
            .send_modify(|unread| *unread = unread.saturating_sub(1));

        match self.shared.store.mark_notification_read(notification_id).await {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(
                    notification = %notification_id,
                    "Failed to mark notification read: {}",
                    error
                );
                false
            }
        }
    }

    pub async fn mark_all_read(&self) -> bool {
        self.shared.unread.send_replace(0);

        match self.shared.store.mark_all_notifications_read().await {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!("Failed to mark all notifications read: {}", error);
                false
            }
        }
    }

    /// Refresh now and then periodically, replacing any running task.
    ///
    /// Returns `false` outside a Tokio runtime.
    pub fn start(&self) -> bool {
        if tokio::runtime::Handle::try_current().is_err() {
            tracing::warn!("No async runtime; notification refresh not started");
            return false;
        }

        let shared = Arc::clone(&self.shared);
        let period = self.refresh_interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                shared.refresh().await;
            }
        });

        if let Some(previous) = self.lock_task().replace(handle) {
            previous.abort();
        }
        tracing::debug!(interval_secs = period.as_secs(), "Notification refresh started");
        true
    }

    pub fn stop(&self) {
        if let Some(handle) = self.lock_task().take() {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock_task()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop refreshing and zero the count. In-flight refreshes are discarded.
    pub fn reset(&self) {
        self.stop();
        self.shared.epoch.fetch_add(1, Ordering::SeqCst);
        self.shared.unread.send_replace(0);
        *self
            .shared
            .last_refreshed_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn lock_task(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for NotificationCounter {
    fn drop(&mut self) {
        self.stop();
    }
}
