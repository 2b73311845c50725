//! Client configuration.
//!
//! `ClientConfig` carries the backend base URL plus the timing knobs of the
//! membership state layer. It can be built in code, deserialized from a
//! profile file, or read from `MEETON_*` environment variables.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::util::{is_http_url, normalize_text_option};
use crate::{Error, Result};

pub const ENV_API_URL: &str = "MEETON_API_URL";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "MEETON_REQUEST_TIMEOUT_SECS";
pub const ENV_NOTIFICATION_REFRESH_SECS: &str = "MEETON_NOTIFICATION_REFRESH_SECS";
pub const ENV_NOTIFICATION_PAGE_SIZE: &str = "MEETON_NOTIFICATION_PAGE_SIZE";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
const DEFAULT_NOTIFICATION_REFRESH_SECS: u64 = 30;
const DEFAULT_NOTIFICATION_PAGE_SIZE: u32 = 50;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Base URL of the REST API, e.g. `https://api.meeton.app/api`.
    pub api_base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Period of the background unread-count refresh. Optimistic
    /// mark-as-read adjustments may drift from the server for at most this long.
    #[serde(default = "default_notification_refresh_secs")]
    pub notification_refresh_secs: u64,
    /// How many recent unread notifications one refresh fetches.
    #[serde(default = "default_notification_page_size")]
    pub notification_page_size: u32,
}

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

const fn default_notification_refresh_secs() -> u64 {
    DEFAULT_NOTIFICATION_REFRESH_SECS
}

const fn default_notification_page_size() -> u32 {
    DEFAULT_NOTIFICATION_PAGE_SIZE
}

impl ClientConfig {
    /// Config with default timings for the given API base URL.
    pub fn new(api_base_url: impl Into<String>) -> Result<Self> {
        let config = Self {
            api_base_url: api_base_url.into(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            notification_refresh_secs: DEFAULT_NOTIFICATION_REFRESH_SECS,
            notification_page_size: DEFAULT_NOTIFICATION_PAGE_SIZE,
        };
        config.validated()
    }

    /// Load configuration from `MEETON_*` environment variables.
    ///
    /// Returns `Ok(None)` when `MEETON_API_URL` is not set.
    pub fn from_env() -> Result<Option<Self>> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Self::from_env`] with an injectable variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Option<Self>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let Some(api_base_url) = normalize_text_option(lookup(ENV_API_URL)) else {
            return Ok(None);
        };

        let config = Self {
            api_base_url,
            request_timeout_secs: parse_number(&lookup, ENV_REQUEST_TIMEOUT_SECS)?
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            notification_refresh_secs: parse_number(&lookup, ENV_NOTIFICATION_REFRESH_SECS)?
                .unwrap_or(DEFAULT_NOTIFICATION_REFRESH_SECS),
            notification_page_size: parse_number(&lookup, ENV_NOTIFICATION_PAGE_SIZE)?
                .unwrap_or(DEFAULT_NOTIFICATION_PAGE_SIZE),
        };
        config.validated().map(Some)
    }

    /// Trim and check every field.
    pub fn validated(mut self) -> Result<Self> {
        let url = self.api_base_url.trim().trim_end_matches('/').to_string();
        if url.is_empty() {
            return Err(Error::Config("api_base_url must not be empty".to_string()));
        }
        if !is_http_url(&url) {
            return Err(Error::Config(
                "api_base_url must include http:// or https://".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.notification_refresh_secs == 0 {
            return Err(Error::Config(
                "notification_refresh_secs must be greater than zero".to_string(),
            ));
        }
        if self.notification_page_size == 0 {
            return Err(Error::Config(
                "notification_page_size must be greater than zero".to_string(),
            ));
        }
        self.api_base_url = url;
        Ok(self)
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    #[must_use]
    pub const fn notification_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.notification_refresh_secs)
    }
}

fn parse_number<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let Some(raw) = normalize_text_option(lookup(key)) else {
        return Ok(None);
    };
    raw.parse::<T>()
        .map(Some)
        .map_err(|_| Error::Config(format!("{key} must be a positive integer, got '{raw}'")))
}
