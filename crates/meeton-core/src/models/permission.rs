//! Upload permission decision.

use serde::{Deserialize, Serialize};

use super::rsvp::RsvpStatus;

/// Whether the current user may upload photos to an event.
///
/// Recomputed on every check and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadPermission {
    pub can_upload: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rsvp_status: Option<RsvpStatus>,
}

impl UploadPermission {
    #[must_use]
    pub fn allowed(rsvp_status: RsvpStatus, reason: impl Into<String>) -> Self {
        Self {
            can_upload: true,
            reason: Some(reason.into()),
            rsvp_status: Some(rsvp_status),
        }
    }

    #[must_use]
    pub fn denied(reason: impl Into<String>, rsvp_status: Option<RsvpStatus>) -> Self {
        Self {
            can_upload: false,
            reason: Some(reason.into()),
            rsvp_status,
        }
    }

    /// Reason text, or an empty string when the backend sent none.
    #[must_use]
    pub fn reason_text(&self) -> &str {
        self.reason.as_deref().unwrap_or_default()
    }
}
