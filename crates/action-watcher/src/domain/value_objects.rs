//! Constants and small result types for the action watcher.

use std::time::Duration;

/// Default `watch-age-limit`, in seconds.
pub const DEFAULT_AGE_LIMIT_SECS: i64 = 60;

/// Default `watch-pending-expiry`, in seconds (maximum transaction lifetime).
pub const DEFAULT_PENDING_EXPIRY_SECS: i64 = 3600;

/// Window granted to each HTTP send attempt.
pub const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Budget for decoding one action's data.
pub const MAX_DESERIALIZATION_TIME: Duration = Duration::from_secs(5);

/// First try plus exactly one retry.
pub const MAX_SEND_ATTEMPTS: u32 = 2;

/// What handling one accepted block did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockReport {
    /// Block number.
    pub block_num: u32,
    /// Staged transactions found in the block and removed from the index.
    pub resolved_transactions: usize,
    /// Notifications placed in the outgoing message.
    pub notified_actions: usize,
    /// The block was older than the age limit; nothing was sent.
    pub skipped_by_age: bool,
    /// Unresolved transactions dropped by the expiry window.
    pub evicted: usize,
}

impl BlockReport {
    /// True if a message was handed to the delivery client.
    pub fn enqueued(&self) -> bool {
        self.notified_actions > 0
    }
}
