//! Watcher entities: staged actions, the wire payload and delivery tasks.

use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use shared_types::{Action, Name, PermissionLevel, TransactionId};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// A matched action staged for its transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencedAction {
    /// Copy of the matched action.
    pub action: Action,
    /// 0-based depth-first position within the transaction's trace, counting
    /// every visited action.
    pub seq_num: u32,
    /// Account whose code ran for this trace.
    pub receiver: Name,
}

/// One reported action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionNotif {
    pub tx_id: TransactionId,
    pub account: Name,
    pub name: Name,
    pub seq_num: u32,
    pub receiver: Name,
    #[serde(with = "block_time_format")]
    pub block_time: DateTime<Utc>,
    pub block_num: u32,
    pub authorization: Vec<PermissionLevel>,
    /// Decoded action payload.
    pub action_data: serde_json::Value,
}

/// Body POSTed to the receiver: every notification resolved by one block.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Message {
    pub actions: Vec<ActionNotif>,
}

impl Message {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }
}

/// A message queued for delivery. Owns everything it carries.
#[derive(Debug, Clone)]
pub struct DeliveryTask {
    /// Correlates log lines for the same task.
    pub id: Uuid,
    pub destination: Url,
    pub payload: Message,
    /// Deadline for the first attempt.
    pub deadline: Instant,
    /// Window granted to a retry, measured from when it starts.
    pub window: Duration,
}

impl DeliveryTask {
    pub fn new(destination: Url, payload: Message, deadline: Instant, window: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            destination,
            payload,
            deadline,
            window,
        }
    }
}

/// Block time on the wire: UTC with millisecond precision and no zone suffix,
/// e.g. `2024-05-01T12:00:00.500`.
pub mod block_time_format {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

    pub fn serialize<S: Serializer>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let text = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&text, FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(serde::de::Error::custom)
    }
}
