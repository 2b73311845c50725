use std::path::Path;

use crate::commands::common::{parse_event_id, photo_upload_from_path, Context};
use crate::error::CliError;

pub async fn run_upload(
    context: &Context,
    event: &str,
    path: &Path,
    caption: Option<String>,
) -> Result<(), CliError> {
    let event_id = parse_event_id(event)?;
    let upload = photo_upload_from_path(path, caption)?;
    context.signed_in().await?;

    let photo = context.sync.upload_photo(&event_id, upload).await?;
    println!("Uploaded photo {} to {event_id}", photo.id);
    println!("{}", photo.url);
    Ok(())
}
