//! Upload permission resolution.
//!
//! Decides whether the signed-in user may upload photos to an event. The
//! backend's permissions endpoint is preferred; older deployments without it
//! are handled by deriving the answer from the attendee list. When nothing
//! can be reached the answer is a deny.

use std::sync::Arc;

use crate::api::{ApiError, EventStore};
use crate::models::{EventId, RsvpStatus, UploadPermission, UserId};
use crate::rsvp::RsvpCache;

pub const REASON_NOT_RSVPED: &str = "You must RSVP to this event before uploading photos.";
pub const REASON_NOT_ATTENDING: &str = "Only guests who RSVP'd Going or Maybe can upload photos.";
pub const REASON_GOING: &str = "You're going to this event.";
pub const REASON_MAYBE: &str = "You RSVP'd Maybe, which still allows photo uploads.";
pub const REASON_UNAVAILABLE: &str = "Unable to check upload permissions. Please try again.";

/// One way of answering a permission check, tried in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStrategy {
    /// `GET /events/{id}/upload-permissions`.
    PermissionsEndpoint,
    /// Derive from `GET /events/{id}/attendees`.
    AttendeeList,
}

impl PermissionStrategy {
    pub const DEFAULT_ORDER: [Self; 2] = [Self::PermissionsEndpoint, Self::AttendeeList];
}

/// Policy text for a known RSVP value.
pub const fn reason_for(status: RsvpStatus) -> &'static str {
    match status {
        RsvpStatus::Yes => REASON_GOING,
        RsvpStatus::Maybe => REASON_MAYBE,
        RsvpStatus::No => REASON_NOT_ATTENDING,
    }
}

pub struct PermissionResolver {
    store: Arc<dyn EventStore>,
    cache: Arc<RsvpCache>,
    strategies: Vec<PermissionStrategy>,
}

impl PermissionResolver {
    pub fn new(store: Arc<dyn EventStore>, cache: Arc<RsvpCache>) -> Self {
        Self::with_strategies(store, cache, PermissionStrategy::DEFAULT_ORDER.to_vec())
    }

    pub fn with_strategies(
        store: Arc<dyn EventStore>,
        cache: Arc<RsvpCache>,
        strategies: Vec<PermissionStrategy>,
    ) -> Self {
        Self {
            store,
            cache,
            strategies,
        }
    }

    pub fn strategies(&self) -> &[PermissionStrategy] {
        &self.strategies
    }

    /// Decide whether `user_id` may upload to `event_id`. Never fails.
    ///
    /// The RSVP status learned on the way is cached unless the cache was
    /// cleared or written while the lookup was in flight.
    pub async fn resolve(&self, event_id: &EventId, user_id: &UserId) -> UploadPermission {
        let stamp = self.cache.begin_write();
        let mut decision = None;

        for strategy in &self.strategies {
            match self.try_strategy(*strategy, event_id, user_id).await {
                Ok(permission) => {
                    decision = Some(permission);
                    break;
                }
                Err(ApiError::Unauthorized) => {
                    tracing::warn!(event = %event_id, "Permission check rejected; session expired");
                    break;
                }
                Err(error) => {
                    tracing::warn!(
                        event = %event_id,
                        ?strategy,
                        "Permission strategy failed: {}",
                        error
                    );
                }
            }
        }

        let decision =
            decision.unwrap_or_else(|| UploadPermission::denied(REASON_UNAVAILABLE, None));
        if let Some(status) = decision.rsvp_status {
            self.cache.set_if_current(event_id, status, stamp);
        }
        decision
    }

    pub async fn can_upload(&self, event_id: &EventId, user_id: &UserId) -> bool {
        self.resolve(event_id, user_id).await.can_upload
    }

    async fn try_strategy(
        &self,
        strategy: PermissionStrategy,
        event_id: &EventId,
        user_id: &UserId,
    ) -> Result<UploadPermission, ApiError> {
        match strategy {
            PermissionStrategy::PermissionsEndpoint => {
                let permission = self.store.upload_permissions(event_id).await?;
                Ok(fill_reason(permission))
            }
            PermissionStrategy::AttendeeList => {
                let attendees = self.store.attendees(event_id).await?;
                let entry = attendees.iter().find(|attendee| &attendee.user_id == user_id);
                Ok(match entry {
                    None => UploadPermission::denied(REASON_NOT_RSVPED, None),
                    Some(attendee) => from_rsvp(attendee.rsvp),
                })
            }
        }
    }
}

fn from_rsvp(rsvp: Option<RsvpStatus>) -> UploadPermission {
    match rsvp {
        Some(status) if status.allows_upload() => {
            UploadPermission::allowed(status, reason_for(status))
        }
        Some(status) => UploadPermission::denied(REASON_NOT_ATTENDING, Some(status)),
        None => UploadPermission::denied(REASON_NOT_ATTENDING, None),
    }
}

/// The endpoint may omit `reason`; denials always carry one.
fn fill_reason(mut permission: UploadPermission) -> UploadPermission {
    if permission.reason_text().trim().is_empty() {
        permission.reason = match (permission.can_upload, permission.rsvp_status) {
            (_, Some(status)) => Some(reason_for(status).to_string()),
            (true, None) => None,
            (false, None) => Some(REASON_NOT_RSVPED.to_string()),
        };
    }
    permission
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::test_support::{attendee, event, user, MockEventStore, Reply};

    type Fixture = (PermissionResolver, Arc<MockEventStore>, Arc<RsvpCache>);

    fn resolver(strategies: Vec<PermissionStrategy>) -> Fixture {
        let store = Arc::new(MockEventStore::default());
        let cache = Arc::new(RsvpCache::new(store.clone()));
        let resolver =
            PermissionResolver::with_strategies(store.clone(), cache.clone(), strategies);
        (resolver, store, cache)
    }

    fn default_resolver() -> Fixture {
        resolver(PermissionStrategy::DEFAULT_ORDER.to_vec())
    }

    #[tokio::test]
    async fn endpoint_decision_is_used_and_cached() {
        let (resolver, store, cache) = default_resolver();
        MockEventStore::set(
            &store.permission,
            Reply::Ok(UploadPermission::allowed(RsvpStatus::Yes, "ok")),
        );

        let permission = resolver.resolve(&event("e1"), &user("u1")).await;

        assert_eq!(permission, UploadPermission::allowed(RsvpStatus::Yes, "ok"));
        assert_eq!(cache.get(&event("e1")), RsvpStatus::Yes);
        assert_eq!(store.calls(), vec!["upload_permissions"]);
    }

    #[tokio::test]
    async fn endpoint_denial_without_reason_gets_policy_reason() {
        let (resolver, store, _) = default_resolver();
        MockEventStore::set(
            &store.permission,
            Reply::Ok(UploadPermission {
                can_upload: false,
                reason: None,
                rsvp_status: Some(RsvpStatus::No),
            }),
        );

        let permission = resolver.resolve(&event("e1"), &user("u1")).await;

        assert!(!permission.can_upload);
        assert_eq!(permission.reason_text(), REASON_NOT_ATTENDING);
    }

    #[tokio::test]
    async fn attendee_fallback_allows_going_and_maybe() {
        for status in [RsvpStatus::Yes, RsvpStatus::Maybe] {
            let (resolver, store, cache) = default_resolver();
            MockEventStore::set(
                &store.attendees,
                Reply::Ok(vec![attendee("other", None), attendee("u1", Some(status))]),
            );

            let permission = resolver.resolve(&event("e1"), &user("u1")).await;

            assert!(permission.can_upload);
            assert_eq!(permission.rsvp_status, Some(status));
            assert_eq!(permission.reason_text(), reason_for(status));
            assert_eq!(cache.get(&event("e1")), status);
        }
    }

    #[tokio::test]
    async fn attendee_fallback_denies_no_and_missing_rsvp() {
        for status in [Some(RsvpStatus::No), None] {
            let (resolver, store, _) = default_resolver();
            MockEventStore::set(&store.attendees, Reply::Ok(vec![attendee("u1", status)]));

            let permission = resolver.resolve(&event("e1"), &user("u1")).await;

            assert!(!permission.can_upload);
            assert_eq!(permission.reason_text(), REASON_NOT_ATTENDING);
        }
    }

    #[tokio::test]
    async fn user_missing_from_attendees_must_rsvp() {
        let (resolver, store, _) = default_resolver();
        MockEventStore::set(
            &store.attendees,
            Reply::Ok(vec![attendee("other", Some(RsvpStatus::Yes))]),
        );

        let permission = resolver.resolve(&event("e2"), &user("u1")).await;

        assert!(!permission.can_upload);
        assert!(permission.reason_text().contains("RSVP"));
        assert_eq!(store.calls(), vec!["upload_permissions", "attendees"]);
    }

    #[tokio::test]
    async fn both_strategies_failing_denies() {
        let (resolver, store, cache) = default_resolver();
        MockEventStore::set(&store.attendees, Reply::Failed);
        cache.set(&event("e1"), RsvpStatus::Yes);

        let permission = resolver.resolve(&event("e1"), &user("u1")).await;

        assert_eq!(permission, UploadPermission::denied(REASON_UNAVAILABLE, None));
        assert_eq!(cache.get(&event("e1")), RsvpStatus::Yes);
    }

    #[tokio::test]
    async fn unauthorized_stops_the_chain() {
        let (resolver, store, _) = default_resolver();
        MockEventStore::set(&store.permission, Reply::Unauthorized);
        MockEventStore::set(
            &store.attendees,
            Reply::Ok(vec![attendee("u1", Some(RsvpStatus::Yes))]),
        );

        let permission = resolver.resolve(&event("e1"), &user("u1")).await;

        assert!(!permission.can_upload);
        assert_eq!(store.calls(), vec!["upload_permissions"]);
    }

    #[tokio::test]
    async fn attendee_only_order_skips_endpoint() {
        let (resolver, store, _) = resolver(vec![PermissionStrategy::AttendeeList]);
        MockEventStore::set(
            &store.permission,
            Reply::Ok(UploadPermission::allowed(RsvpStatus::Yes, "ok")),
        );
        MockEventStore::set(
            &store.attendees,
            Reply::Ok(vec![attendee("u1", Some(RsvpStatus::No))]),
        );

        assert!(!resolver.can_upload(&event("e1"), &user("u1")).await);
        assert_eq!(store.calls(), vec!["attendees"]);
    }

    #[tokio::test(start_paused = true)]
    async fn lookup_in_flight_across_clear_all_is_not_cached() {
        let (resolver, store, cache) = default_resolver();
        MockEventStore::set(
            &store.permission,
            Reply::Ok(UploadPermission::allowed(RsvpStatus::Yes, "ok")),
        );
        *store.permission_delay.lock().unwrap() = Duration::from_millis(50);

        let (e1, u1) = (event("e1"), user("u1"));
        let (permission, ()) = tokio::join!(resolver.resolve(&e1, &u1), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            cache.clear_all();
        });

        assert!(permission.can_upload);
        assert_eq!(cache.cached(&e1), None);
        assert!(cache.snapshot().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn lookup_does_not_overwrite_a_newer_rsvp() {
        let (resolver, store, cache) = default_resolver();
        MockEventStore::set(
            &store.permission,
            Reply::Ok(UploadPermission::denied(REASON_NOT_ATTENDING, Some(RsvpStatus::No))),
        );
        *store.permission_delay.lock().unwrap() = Duration::from_millis(50);

        let (e1, u1) = (event("e1"), user("u1"));
        let (_, accepted) = tokio::join!(resolver.resolve(&e1, &u1), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            cache.update(&e1, RsvpStatus::Yes).await
        });

        assert!(accepted);
        assert_eq!(cache.get(&e1), RsvpStatus::Yes);
    }
}
