//! Data models for MeetOn
//!
//! Users, events, photos and notification rows are owned by the backend; the
//! types here mirror the JSON the client reads and writes.

mod attendee;
mod ids;
mod notification;
mod permission;
mod photo;
mod rsvp;

pub use attendee::{Attendee, UserSummary};
pub use ids::{EventId, NotificationId, PhotoId, UserId};
pub use notification::{Notification, NotificationPage, NotificationQuery, Pagination};
pub use permission::UploadPermission;
pub use photo::{Photo, PhotoUpload};
pub use rsvp::RsvpStatus;
