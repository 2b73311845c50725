use chrono::Utc;
use meeton_core::models::NotificationQuery;

use crate::cli::NotificationCommands;
use crate::commands::common::{
    format_notification_lines, notification_to_list_item, parse_notification_id, Context,
    NotificationListItem,
};
use crate::error::CliError;

pub async fn run_notifications(
    context: &Context,
    command: Option<NotificationCommands>,
) -> Result<(), CliError> {
    context.signed_in().await?;

    match command.unwrap_or(NotificationCommands::Count) {
        NotificationCommands::Count => {
            if !context.sync.refresh_notifications().await {
                return Err(rejected(context, "Could not load notifications"));
            }
            println!("{}", context.sync.unread_count());
        }
        NotificationCommands::List {
            limit,
            unread,
            json,
        } => {
            let query = if unread {
                NotificationQuery::unread(limit)
            } else {
                NotificationQuery::recent(limit)
            };
            let notifications = context
                .sync
                .list_notifications(query)
                .await
                .ok_or_else(|| rejected(context, "Could not load notifications"))?;

            let now = Utc::now();
            if json {
                let items = notifications
                    .iter()
                    .map(|notification| notification_to_list_item(notification, now))
                    .collect::<Vec<NotificationListItem>>();
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else if notifications.is_empty() {
                println!("No notifications.");
            } else {
                for line in format_notification_lines(&notifications, now) {
                    println!("{line}");
                }
            }
        }
        NotificationCommands::Read { id } => {
            let notification_id = parse_notification_id(&id)?;
            if !context.sync.mark_read(&notification_id).await {
                return Err(rejected(context, "Could not mark notification as read"));
            }
            println!("Marked {notification_id} as read");
        }
        NotificationCommands::ReadAll => {
            if !context.sync.mark_all_read().await {
                return Err(rejected(context, "Could not mark notifications as read"));
            }
            println!("Marked all notifications as read");
        }
    }
    Ok(())
}

fn rejected(context: &Context, fallback: &str) -> CliError {
    CliError::Rejected(
        context
            .sync
            .take_notice()
            .unwrap_or_else(|| fallback.to_string()),
    )
}
