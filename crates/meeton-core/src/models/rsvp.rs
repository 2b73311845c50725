//! RSVP model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A user's attendance response for one event.
///
/// `No` doubles as the value for events the client knows nothing about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RsvpStatus {
    Yes,
    Maybe,
    #[default]
    No,
}

impl RsvpStatus {
    /// Wire representation used by the backend.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Yes => "YES",
            Self::Maybe => "MAYBE",
            Self::No => "NO",
        }
    }

    /// Human label used in permission reasons and CLI output.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Yes => "Going",
            Self::Maybe => "Maybe",
            Self::No => "Not going",
        }
    }

    /// Guests who are going or might go may upload photos.
    #[must_use]
    pub const fn allows_upload(self) -> bool {
        matches!(self, Self::Yes | Self::Maybe)
    }
}

impl fmt::Display for RsvpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RsvpStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yes" | "going" => Ok(Self::Yes),
            "maybe" => Ok(Self::Maybe),
            "no" | "not-going" | "not_going" => Ok(Self::No),
            other => Err(Error::InvalidInput(format!(
                "unknown RSVP value '{other}' (expected YES, MAYBE or NO)"
            ))),
        }
    }
}
