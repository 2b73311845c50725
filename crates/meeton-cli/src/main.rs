//! MeetOn CLI - RSVP, photo uploads and notifications from the terminal

mod cli;
mod commands;
mod config_profiles;
mod error;


use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::auth_cmd::{run_login, run_logout, run_status};
use crate::commands::common::Context;
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::events::{run_permissions, run_rsvp};
use crate::commands::notifications::run_notifications;
use crate::commands::upload::run_upload;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("meeton=info,meeton_core=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let api_url = cli.api_url.clone();
    let profile = cli.profile.clone();
    let open = || Context::open(api_url.as_deref(), profile.as_deref());

    match cli.command {
        Commands::Login { email, password } => run_login(&open()?, &email, &password).await?,
        Commands::Logout => run_logout(&open()?).await?,
        Commands::Status => run_status(&open()?).await?,
        Commands::Rsvp { event, status } => run_rsvp(&open()?, &event, status).await?,
        Commands::Permissions { event, json } => run_permissions(&open()?, &event, json).await?,
        Commands::Upload {
            event,
            path,
            caption,
        } => run_upload(&open()?, &event, &path, caption).await?,
        Commands::Notifications { command } => run_notifications(&open()?, command).await?,
        Commands::Config { command } => run_config(command, profile.as_deref())?,
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref())?,
    }

    Ok(())
}
