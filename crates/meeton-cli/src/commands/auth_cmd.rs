use meeton_core::SessionState;

use crate::commands::common::Context;
use crate::error::CliError;

pub async fn run_login(context: &Context, email: &str, password: &str) -> Result<(), CliError> {
    let user = context.sync.sign_in(email, password).await?;
    println!(
        "Signed in profile '{}' as {}",
        context.profile,
        user.label()
    );
    Ok(())
}

pub async fn run_status(context: &Context) -> Result<(), CliError> {
    if let Some(user) = context.sync.session().restore().await? {
        println!("Profile '{}' is signed in as {}", context.profile, user.label());
        return Ok(());
    }

    match context.sync.session().last_known_user() {
        Some(user) if context.sync.session().state() == SessionState::Anonymous => {
            println!(
                "Profile '{}' could not reach the backend; last signed in as {}",
                context.profile,
                user.label()
            );
        }
        _ => println!("Profile '{}' is not signed in.", context.profile),
    }
    Ok(())
}

pub async fn run_logout(context: &Context) -> Result<(), CliError> {
    // Restore first so the backend session is revoked too.
    if let Err(error) = context.sync.session().restore().await {
        tracing::warn!("Could not restore session before signing out: {}", error);
    }
    context.sync.sign_out().await;
    println!("Signed out profile '{}'", context.profile);
    Ok(())
}
