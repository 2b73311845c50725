use meeton_core::RsvpStatus;

use crate::commands::common::{format_permission, parse_event_id, Context};
use crate::error::CliError;

pub async fn run_rsvp(context: &Context, event: &str, status: RsvpStatus) -> Result<(), CliError> {
    let event_id = parse_event_id(event)?;
    context.signed_in().await?;

    if !context.sync.rsvp(&event_id, status).await {
        return Err(CliError::Rejected(
            context
                .sync
                .take_notice()
                .unwrap_or_else(|| format!("Could not save RSVP for event {event_id}")),
        ));
    }
    println!("RSVP for {event_id}: {}", status.label());
    Ok(())
}

pub async fn run_permissions(context: &Context, event: &str, as_json: bool) -> Result<(), CliError> {
    let event_id = parse_event_id(event)?;
    context.signed_in().await?;

    let permission = context.sync.upload_permission(&event_id).await;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&permission)?);
    } else {
        println!("{}", format_permission(&permission));
    }
    Ok(())
}
