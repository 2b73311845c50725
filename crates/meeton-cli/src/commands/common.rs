use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use meeton_core::auth::{FileSessionStore, SessionUser};
use meeton_core::models::{EventId, Notification, NotificationId, PhotoUpload};
use meeton_core::util::{compact_text, normalize_text_option};
use meeton_core::{ClientConfig, MembershipSync, UploadPermission};
use serde::Serialize;

use crate::config_profiles::{session_dir, CliProfile, CliProfilesConfig};
use crate::error::CliError;

/// Everything a command needs to talk to the backend for one profile.
pub struct Context {
    pub profile: String,
    pub sync: Arc<MembershipSync>,
}

impl Context {
    pub fn open(api_url: Option<&str>, profile: Option<&str>) -> Result<Self, CliError> {
        let profiles = CliProfilesConfig::load().map_err(CliError::Config)?;
        let profile_name = profiles.resolve_profile_name(profile);
        let config = resolve_client_config(api_url, profiles.profile(&profile_name))?;
        let session_dir = session_dir(&profile_name).map_err(CliError::Config)?;
        let store = FileSessionStore::in_dir(session_dir);
        let sync = MembershipSync::connect(&config, Arc::new(store))?;
        Ok(Self::new(profile_name, sync))
    }

    /// Commands run once and exit, so restoring a session must not start
    /// the periodic notification refresh.
    pub fn new(profile: String, sync: Arc<MembershipSync>) -> Self {
        sync.set_background_refresh(false);
        Self { profile, sync }
    }

    /// Resume the stored session or fail with a sign-in hint.
    pub async fn signed_in(&self) -> Result<SessionUser, CliError> {
        self.sync
            .session()
            .restore()
            .await?
            .ok_or(CliError::NotSignedIn)
    }
}

pub fn resolve_client_config(
    api_url: Option<&str>,
    profile: Option<&CliProfile>,
) -> Result<ClientConfig, CliError> {
    resolve_client_config_with(api_url, profile, ClientConfig::from_env()?)
}

/// Precedence for the base URL: `--api-url`, then `MEETON_API_URL`, then the profile.
pub fn resolve_client_config_with(
    api_url: Option<&str>,
    profile: Option<&CliProfile>,
    from_env: Option<ClientConfig>,
) -> Result<ClientConfig, CliError> {
    let explicit = normalize_text_option(api_url.map(str::to_string));

    let mut config = match (from_env, profile.and_then(CliProfile::api_base_url)) {
        (Some(config), _) => config,
        (None, Some(url)) => {
            let mut config = ClientConfig::new(url)?;
            if let Some(timeout) = profile.and_then(|profile| profile.request_timeout_secs) {
                config.request_timeout_secs = timeout;
            }
            config
        }
        (None, None) => {
            let url = explicit.clone().ok_or(CliError::ApiUrlMissing)?;
            ClientConfig::new(url)?
        }
    };

    if let Some(url) = explicit {
        config.api_base_url = url;
    }
    Ok(config.validated()?)
}

pub fn parse_event_id(raw: &str) -> Result<EventId, CliError> {
    EventId::new(raw).map_err(|_| CliError::EmptyEventId)
}

pub fn parse_notification_id(raw: &str) -> Result<NotificationId, CliError> {
    NotificationId::new(raw).map_err(|_| CliError::EmptyNotificationId)
}

/// Read an image from disk, guessing its content type from the extension.
pub fn photo_upload_from_path(
    path: &Path,
    caption: Option<String>,
) -> Result<PhotoUpload, CliError> {
    let bytes = std::fs::read(path)?;
    let content_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();
    let mut upload = PhotoUpload::new(bytes, content_type)?.with_caption(caption);
    if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
        upload = upload.with_file_name(name);
    }
    Ok(upload)
}

pub fn format_permission(permission: &UploadPermission) -> String {
    let verdict = if permission.can_upload {
        "Photo uploads allowed"
    } else {
        "Photo uploads not allowed"
    };
    let mut line = verdict.to_string();
    if let Some(status) = permission.rsvp_status {
        line.push_str(&format!(" (RSVP: {})", status.label()));
    }
    let reason = permission.reason_text();
    if !reason.is_empty() {
        line.push_str(": ");
        line.push_str(reason);
    }
    line
}

#[derive(Debug, Serialize)]
pub struct NotificationListItem {
    pub id: String,
    pub kind: Option<String>,
    pub message: String,
    pub is_read: bool,
    pub created_at: Option<String>,
    pub relative_time: Option<String>,
    pub event_id: Option<String>,
}

pub fn notification_to_list_item(
    notification: &Notification,
    now: DateTime<Utc>,
) -> NotificationListItem {
    NotificationListItem {
        id: notification.id.to_string(),
        kind: notification.kind.clone(),
        message: notification.message.clone(),
        is_read: notification.is_read,
        created_at: notification.created_at.map(|at| at.to_rfc3339()),
        relative_time: notification
            .created_at
            .map(|at| format_relative_time(at.timestamp_millis(), now.timestamp_millis())),
        event_id: notification.event_id.as_ref().map(ToString::to_string),
    }
}

pub fn format_notification_lines(
    notifications: &[Notification],
    now: DateTime<Utc>,
) -> Vec<String> {
    notifications
        .iter()
        .map(|notification| {
            let marker = if notification.is_read { " " } else { "*" };
            let when = notification.created_at.map_or_else(String::new, |at| {
                format!(
                    " ({})",
                    format_relative_time(at.timestamp_millis(), now.timestamp_millis())
                )
            });
            format!(
                "{marker} {} {}{when}",
                notification.id,
                compact_text(&notification.message)
            )
        })
        .collect()
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else {
        format!("{}w ago", diff / week)
    }
}
