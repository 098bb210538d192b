//! Watcher configuration.
//!
//! [`WatcherOptions`] is the raw option surface (as parsed from a command line
//! or environment); [`WatcherConfig::from_options`] validates it.

use reqwest::Url;
use std::time::Duration;

use super::errors::ConfigError;
use super::filter::FilterTable;
use super::value_objects::{
    DEFAULT_AGE_LIMIT_SECS, DEFAULT_PENDING_EXPIRY_SECS, MAX_DESERIALIZATION_TIME, SEND_TIMEOUT,
};

/// Unvalidated watcher options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatcherOptions {
    /// `receiver[:action]` entries.
    pub watch: Vec<String>,
    /// Where notifications are POSTed.
    pub receiver_url: Option<String>,
    /// Blocks at least this old (seconds) are not reported. Negative disables.
    pub age_limit_secs: i64,
    /// Staged actions older than this (seconds) are evicted. Negative disables.
    pub pending_expiry_secs: i64,
}

impl Default for WatcherOptions {
    fn default() -> Self {
        Self {
            watch: Vec::new(),
            receiver_url: None,
            age_limit_secs: DEFAULT_AGE_LIMIT_SECS,
            pending_expiry_secs: DEFAULT_PENDING_EXPIRY_SECS,
        }
    }
}

/// Validated watcher configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatcherConfig {
    pub filters: FilterTable,
    pub receiver_url: Url,
    /// `None` disables the age check.
    pub age_limit: Option<Duration>,
    /// `None` keeps unresolved entries forever.
    pub pending_expiry: Option<Duration>,
    pub send_timeout: Duration,
    pub decode_timeout: Duration,
}

impl WatcherConfig {
    /// Validate raw options.
    ///
    /// # Errors
    ///
    /// - `MissingReceiverUrl` if no URL was given
    /// - `InvalidReceiverUrl` / `UnsupportedScheme` for an unusable URL
    /// - `InvalidWatchEntry` for a malformed filter entry
    pub fn from_options(options: WatcherOptions) -> Result<Self, ConfigError> {
        let raw_url = options
            .receiver_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or(ConfigError::MissingReceiverUrl)?;

        let receiver_url = Url::parse(raw_url).map_err(|e| ConfigError::InvalidReceiverUrl {
            url: raw_url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(receiver_url.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme(receiver_url.scheme().to_string()));
        }

        Ok(Self {
            filters: FilterTable::configure(&options.watch)?,
            receiver_url,
            age_limit: non_negative_secs(options.age_limit_secs),
            pending_expiry: non_negative_secs(options.pending_expiry_secs),
            send_timeout: SEND_TIMEOUT,
            decode_timeout: MAX_DESERIALIZATION_TIME,
        })
    }
}

/// Seconds as a duration; negative values mean "disabled".
pub fn non_negative_secs(secs: i64) -> Option<Duration> {
    u64::try_from(secs).ok().map(Duration::from_secs)
}
