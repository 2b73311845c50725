use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand, ValueEnum};
use meeton_core::RsvpStatus;

#[derive(Parser)]
#[command(name = "meeton")]
#[command(about = "RSVP, share photos and follow notifications for MeetOn events")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Backend API base URL (overrides MEETON_API_URL and the profile)
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// CLI profile name
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in with email and password
    Login {
        #[arg(long, value_name = "EMAIL")]
        email: String,
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show who is signed in
    Status,
    /// Answer an event invitation
    Rsvp {
        /// Event ID
        event: String,
        /// yes | maybe | no (also: going, not-going)
        #[arg(value_parser = parse_rsvp)]
        status: RsvpStatus,
    },
    /// Check whether you can upload photos to an event
    #[command(alias = "can-upload")]
    Permissions {
        /// Event ID
        event: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Upload a photo to an event
    Upload {
        /// Event ID
        event: String,
        /// Image file
        #[arg(value_name = "PATH")]
        path: PathBuf,
        /// Optional caption
        #[arg(long)]
        caption: Option<String>,
    },
    /// Unread notification count and list
    Notifications {
        #[command(subcommand)]
        command: Option<NotificationCommands>,
    },
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum NotificationCommands {
    /// Print the unread count (default)
    Count,
    /// List recent notifications
    List {
        /// Number of notifications to show
        #[arg(short, long, default_value = "20")]
        limit: u32,
        /// Only unread notifications
        #[arg(long)]
        unread: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark one notification as read
    Read {
        /// Notification ID
        id: String,
    },
    /// Mark every notification as read
    ReadAll,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update a profile
    Init {
        /// Profile name to initialize
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// Backend API base URL
        #[arg(long, value_name = "URL")]
        api_base_url: Option<String>,
        /// Request timeout in seconds
        #[arg(long, value_name = "SECS")]
        request_timeout_secs: Option<u64>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

pub fn parse_rsvp(value: &str) -> Result<RsvpStatus, String> {
    RsvpStatus::from_str(value).map_err(|error| error.to_string())
}
