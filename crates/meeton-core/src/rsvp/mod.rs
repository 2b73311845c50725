//! Per-event RSVP cache.
//!
//! Holds the signed-in user's last known response for each event so screens
//! can read it without a round trip. The backend stays authoritative: remote
//! writes land here only after the backend accepted them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;

use crate::api::EventStore;
use crate::models::{EventId, RsvpStatus};

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Change notification for cache subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RsvpChange {
    Set { event_id: EventId, status: RsvpStatus },
    Cleared { event_id: EventId },
    ClearedAll,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    /// `None` marks an event cleared after a write was submitted.
    status: Option<RsvpStatus>,
    stamp: u64,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<EventId, Slot>,
    cleared_at: u64,
}

impl CacheState {
    fn accepts(&self, event_id: &EventId, stamp: u64) -> bool {
        stamp > self.cleared_at
            && !matches!(self.entries.get(event_id), Some(slot) if slot.stamp >= stamp)
    }
}

pub struct RsvpCache {
    store: Arc<dyn EventStore>,
    state: Mutex<CacheState>,
    sequence: AtomicU64,
    changes: broadcast::Sender<RsvpChange>,
}

impl RsvpCache {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            store,
            state: Mutex::new(CacheState::default()),
            sequence: AtomicU64::new(0),
            changes,
        }
    }

    /// Cached status for `event_id`, `No` when nothing is known.
    pub fn get(&self, event_id: &EventId) -> RsvpStatus {
        self.cached(event_id).unwrap_or_default()
    }

    /// Cached status, distinguishing "unknown" from an explicit `No`.
    pub fn cached(&self, event_id: &EventId) -> Option<RsvpStatus> {
        self.lock()
            .entries
            .get(event_id)
            .and_then(|slot| slot.status)
    }

    /// Store a status the backend already reported.
    pub fn set(&self, event_id: &EventId, status: RsvpStatus) {
        let stamp = self.next_stamp();
        self.lock().entries.insert(
            event_id.clone(),
            Slot {
                status: Some(status),
                stamp,
            },
        );
        tracing::debug!(event = %event_id, %status, "RSVP cached");
        self.notify(RsvpChange::Set {
            event_id: event_id.clone(),
            status,
        });
    }

    /// Submit an RSVP and cache it once the backend accepts it.
    ///
    /// Returns `false` when the remote write failed; the cache is untouched in
    /// that case. A write whose response arrives after a newer write or a
    /// clear for the same event is not applied locally.
    pub async fn update(&self, event_id: &EventId, status: RsvpStatus) -> bool {
        let stamp = self.begin_write();

        if let Err(error) = self.store.submit_rsvp(event_id, status).await {
            tracing::warn!(event = %event_id, "Failed to submit RSVP: {}", error);
            return false;
        }

        self.set_if_current(event_id, status, stamp);
        true
    }

    /// Reserve a stamp for a write whose value is not known yet.
    ///
    /// Take it before the remote call that produces the value and pass it to
    /// [`Self::set_if_current`] once the call resolves.
    pub fn begin_write(&self) -> u64 {
        self.next_stamp()
    }

    /// Store `status` unless a newer write or a clear happened after `stamp`
    /// was reserved. Returns whether the value was applied.
    pub fn set_if_current(&self, event_id: &EventId, status: RsvpStatus, stamp: u64) -> bool {
        let applied = {
            let mut state = self.lock();
            if state.accepts(event_id, stamp) {
                state.entries.insert(
                    event_id.clone(),
                    Slot {
                        status: Some(status),
                        stamp,
                    },
                );
                true
            } else {
                false
            }
        };

        if applied {
            tracing::debug!(event = %event_id, %status, "RSVP cached");
            self.notify(RsvpChange::Set {
                event_id: event_id.clone(),
                status,
            });
        } else {
            tracing::debug!(event = %event_id, %status, "RSVP result superseded; not cached");
        }
        applied
    }

    pub fn clear(&self, event_id: &EventId) {
        let stamp = self.next_stamp();
        self.lock().entries.insert(
            event_id.clone(),
            Slot {
                status: None,
                stamp,
            },
        );
        self.notify(RsvpChange::Cleared {
            event_id: event_id.clone(),
        });
    }

    pub fn clear_all(&self) {
        let stamp = self.next_stamp();
        {
            let mut state = self.lock();
            state.entries.clear();
            state.cleared_at = stamp;
        }
        tracing::debug!("RSVP cache cleared");
        self.notify(RsvpChange::ClearedAll);
    }

    /// All known statuses.
    pub fn snapshot(&self) -> HashMap<EventId, RsvpStatus> {
        self.lock()
            .entries
            .iter()
            .filter_map(|(event_id, slot)| slot.status.map(|status| (event_id.clone(), status)))
            .collect()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RsvpChange> {
        self.changes.subscribe()
    }

    fn next_stamp(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn notify(&self, change: RsvpChange) {
        let _ = self.changes.send(change);
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
