//! meeton-core - Core library for MeetOn
//!
//! Client-side membership state for the MeetOn event planner: the signed-in
//! session, the user's RSVPs, photo upload permissions and the unread
//! notification badge, kept consistent with the backend across logins.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod notifications;
pub mod permissions;
pub mod photos;
pub mod rsvp;
pub mod sync;
pub mod util;

#[cfg(test)]
mod test_support;

pub use api::{ApiError, EventStore, HttpEventStore, SessionGuardedStore};
pub use auth::{AuthSession, SessionEvent, SessionState};
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use models::{EventId, RsvpStatus, UploadPermission, UserId};
pub use notifications::NotificationCounter;
pub use permissions::{PermissionResolver, PermissionStrategy};
pub use photos::PhotoUploader;
pub use rsvp::{RsvpCache, RsvpChange};
pub use sync::MembershipSync;
