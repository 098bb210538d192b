//! Outbound (Driven) ports for the action watcher.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Url;
use serde_json::Value;
use shared_types::Action;
use std::time::{Duration, Instant};

use crate::domain::{DecodeError, DeliveryError, Message};

/// Turns an action's opaque bytes into a structured value.
///
/// Keyed by `action.account` (whose ABI describes the data) and `action.name`.
pub trait AbiDecoder: Send + Sync {
    /// Decode within `max_time`.
    ///
    /// # Errors
    /// - `NoSchema`: no ABI registered for the account
    /// - `UnknownAction`: the ABI does not declare the action
    /// - `Timeout` / `Malformed`: the bytes could not be decoded
    fn decode_action(&self, action: &Action, max_time: Duration) -> Result<Value, DecodeError>;
}

/// Time source for consistent timestamp handling.
///
/// Abstracted to allow testing with deterministic time.
pub trait TimeSource: Send + Sync {
    /// Current wall-clock time.
    fn now(&self) -> DateTime<Utc>;
}

/// Default system time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fire-and-forget hand-off of a finished message.
pub trait NotificationSink: Send + Sync {
    /// Queue `message` for `destination`. Never blocks, never reports network
    /// outcomes.
    fn enqueue(&self, destination: &Url, message: Message, deadline: Instant);
}

/// One HTTP POST of a JSON body.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// POST `body` with `Content-Type: application/json`.
    ///
    /// A 2xx answer (with or without a body) is success.
    async fn post_json(&self, url: &Url, body: Vec<u8>, timeout: Duration)
        -> Result<(), DeliveryError>;
}

/// Mock time source for testing.
#[cfg(test)]
pub struct MockTimeSource {
    time: parking_lot::Mutex<DateTime<Utc>>,
}

#[cfg(test)]
impl MockTimeSource {
    pub fn new(initial: DateTime<Utc>) -> Self {
        Self {
            time: parking_lot::Mutex::new(initial),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        *self.time.lock() += by;
    }
}

#[cfg(test)]
impl TimeSource for MockTimeSource {
    fn now(&self) -> DateTime<Utc> {
        *self.time.lock()
    }
}

/// Sink recording every enqueued message.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingSink {
    pub messages: parking_lot::Mutex<Vec<(Url, Message, Instant)>>,
}

#[cfg(test)]
impl NotificationSink for RecordingSink {
    fn enqueue(&self, destination: &Url, message: Message, deadline: Instant) {
        self.messages.lock().push((destination.clone(), message, deadline));
    }
}

/// Decoder answering from a fixed `(account, name) -> value` table.
#[cfg(test)]
#[derive(Default)]
pub struct MapDecoder {
    pub values: std::collections::HashMap<(shared_types::Name, shared_types::Name), Value>,
}

#[cfg(test)]
impl MapDecoder {
    pub fn with(mut self, account: &str, name: &str, value: Value) -> Self {
        let key = (account.parse().unwrap(), name.parse().unwrap());
        self.values.insert(key, value);
        self
    }
}

#[cfg(test)]
impl AbiDecoder for MapDecoder {
    fn decode_action(&self, action: &Action, _max_time: Duration) -> Result<Value, DecodeError> {
        self.values
            .get(&(action.account, action.name))
            .cloned()
            .ok_or(DecodeError::NoSchema {
                account: action.account,
            })
    }
}
