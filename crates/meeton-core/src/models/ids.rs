//! Backend-issued identifiers.
//!
//! The backend owns id generation, so these are opaque strings on the client.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

macro_rules! backend_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a backend id, rejecting blank values.
            pub fn new(raw: impl Into<String>) -> Result<Self> {
                let raw = raw.into();
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Err(Error::InvalidInput(concat!($label, " must not be empty").to_string()));
                }
                Ok(Self(trimmed.to_string()))
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                Self::new(s)
            }
        }
    };
}

backend_id!(
    /// Identifier of an event.
    EventId,
    "Event id"
);
backend_id!(
    /// Identifier of a user account.
    UserId,
    "User id"
);
backend_id!(
    /// Identifier of a notification row.
    NotificationId,
    "Notification id"
);
backend_id!(
    /// Identifier of an uploaded photo.
    PhotoId,
    "Photo id"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_trim_whitespace() {
        let id = EventId::new("  evt-1 ").unwrap();
        assert_eq!(id.as_str(), "evt-1");
    }

    #[test]
    fn blank_ids_are_rejected() {
        assert!(EventId::new("   ").is_err());
        assert!("".parse::<UserId>().is_err());
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = PhotoId::new("p1").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"p1\"");
    }
}
