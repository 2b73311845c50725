//! Attendee rows returned by the event attendee list.

use serde::{Deserialize, Serialize};

use super::ids::UserId;
use super::rsvp::RsvpStatus;

/// Public profile fields embedded in attendee rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    #[serde(default)]
    pub id: Option<UserId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// One entry of `GET /events/{id}/attendees`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    pub user_id: UserId,
    /// Missing when the user was invited but never answered.
    #[serde(default)]
    pub rsvp: Option<RsvpStatus>,
    #[serde(default)]
    pub user: UserSummary,
}
