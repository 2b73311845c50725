//! Notification rows and paging.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{EventId, NotificationId};

/// A notification as listed by `GET /notifications`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub event_id: Option<EventId>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub total_pages: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPage {
    #[serde(default)]
    pub notifications: Vec<Notification>,
    #[serde(default)]
    pub pagination: Pagination,
}

impl NotificationPage {
    /// Number of rows on this page that are still unread.
    #[must_use]
    pub fn unread_count(&self) -> u32 {
        let unread = self.notifications.iter().filter(|n| !n.is_read).count();
        u32::try_from(unread).unwrap_or(u32::MAX)
    }
}

/// Query parameters for the notification list endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationQuery {
    pub page: u32,
    pub limit: u32,
    pub unread_only: bool,
}

impl NotificationQuery {
    /// First page of the `limit` most recent unread notifications.
    #[must_use]
    pub const fn unread(limit: u32) -> Self {
        Self {
            page: 1,
            limit,
            unread_only: true,
        }
    }

    /// First page of the `limit` most recent notifications.
    #[must_use]
    pub const fn recent(limit: u32) -> Self {
        Self {
            page: 1,
            limit,
            unread_only: false,
        }
    }

    pub(crate) fn to_query_pairs(self) -> [(&'static str, String); 3] {
        [
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
            ("unreadOnly", self.unread_only.to_string()),
        ]
    }
}
