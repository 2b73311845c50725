//! Permission-gated photo upload.

use std::sync::Arc;

use crate::api::EventStore;
use crate::error::{Error, Result};
use crate::models::{EventId, Photo, PhotoUpload, UserId};
use crate::permissions::PermissionResolver;

pub struct PhotoUploader {
    store: Arc<dyn EventStore>,
    resolver: Arc<PermissionResolver>,
}

impl PhotoUploader {
    pub fn new(store: Arc<dyn EventStore>, resolver: Arc<PermissionResolver>) -> Self {
        Self { store, resolver }
    }

    /// Check upload permission, then send the photo.
    pub async fn upload(
        &self,
        event_id: &EventId,
        user_id: &UserId,
        upload: PhotoUpload,
    ) -> Result<Photo> {
        let permission = self.resolver.resolve(event_id, user_id).await;
        if !permission.can_upload {
            return Err(Error::PermissionDenied(permission.reason_text().to_string()));
        }

        let photo = self.store.upload_photo(event_id, &upload).await?;
        if photo.id.as_str().trim().is_empty() {
            return Err(Error::InvalidInput(
                "Backend returned a photo without an id".to_string(),
            ));
        }
        tracing::info!(event = %event_id, photo = %photo.id, "Photo uploaded");
        Ok(photo)
    }
}
