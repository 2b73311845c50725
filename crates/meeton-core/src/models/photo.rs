//! Photo model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ids::{EventId, PhotoId, UserId};
use crate::error::{Error, Result};

/// A photo stored for an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub id: PhotoId,
    #[serde(default)]
    pub event_id: Option<EventId>,
    pub url: String,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub uploaded_by: Option<UserId>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Photo bytes ready to be sent to the backend.
#[derive(Clone, PartialEq, Eq)]
pub struct PhotoUpload {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub content_type: String,
    pub caption: Option<String>,
}

impl PhotoUpload {
    /// Validate raw image bytes and assign a generated file name.
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Result<Self> {
        let content_type = content_type.into().trim().to_ascii_lowercase();
        if bytes.is_empty() {
            return Err(Error::InvalidInput("Photo is empty".to_string()));
        }
        if !content_type.starts_with("image/") {
            return Err(Error::InvalidInput(format!(
                "Unsupported photo content type: {content_type}"
            )));
        }
        let extension = content_type
            .strip_prefix("image/")
            .map(|subtype| if subtype == "jpeg" { "jpg" } else { subtype })
            .unwrap_or("bin");
        let file_name = format!("{}.{extension}", Uuid::now_v7());
        Ok(Self {
            bytes,
            file_name,
            content_type,
            caption: None,
        })
    }

    #[must_use]
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    #[must_use]
    pub fn with_caption(mut self, caption: Option<String>) -> Self {
        self.caption = crate::util::normalize_text_option(caption);
        self
    }
}

impl std::fmt::Debug for PhotoUpload {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("PhotoUpload")
            .field("bytes", &self.bytes.len())
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("caption", &self.caption)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_non_image_uploads() {
        assert!(PhotoUpload::new(Vec::new(), "image/png").is_err());
        assert!(PhotoUpload::new(vec![1, 2, 3], "application/pdf").is_err());
    }

    #[test]
    fn generated_name_uses_content_type_extension() {
        let upload = PhotoUpload::new(vec![0xFF, 0xD8], "IMAGE/JPEG").unwrap();
        assert_eq!(upload.content_type, "image/jpeg");
        assert!(upload.file_name.ends_with(".jpg"));
    }

    #[test]
    fn blank_caption_is_dropped() {
        let upload = PhotoUpload::new(vec![1], "image/png")
            .unwrap()
            .with_caption(Some("   ".to_string()));
        assert_eq!(upload.caption, None);
    }
}
