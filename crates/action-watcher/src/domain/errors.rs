//! Action watcher error types.

use shared_types::{ChainError, Name};
use thiserror::Error;

/// Startup-fatal configuration problems.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// No `watch-receiver-url` was given.
    #[error("missing required option watch-receiver-url")]
    MissingReceiverUrl,

    /// The receiver URL does not parse.
    #[error("invalid watch-receiver-url {url:?}: {reason}")]
    InvalidReceiverUrl { url: String, reason: String },

    /// The receiver URL is not http or https.
    #[error("unsupported watch-receiver-url scheme {0:?}: expected http or https")]
    UnsupportedScheme(String),

    /// A `watch` entry is not `receiver[:action]`.
    #[error("invalid watch entry {entry:?}: {reason}")]
    InvalidWatchEntry { entry: String, reason: String },
}

/// Per-action decode failure. The action is dropped; its siblings proceed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// No ABI registered for the account.
    #[error("no abi registered for {account}")]
    NoSchema { account: Name },

    /// The account's ABI does not declare the action.
    #[error("{account} abi has no action {action}")]
    UnknownAction { account: Name, action: Name },

    /// Decoding ran past its budget.
    #[error("decoding {account}::{action} timed out")]
    Timeout { account: Name, action: Name },

    /// The bytes do not match the declared layout.
    #[error("cannot decode {account}::{action}: {reason}")]
    Malformed {
        account: Name,
        action: Name,
        reason: String,
    },
}

/// Failure of one HTTP send attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// Could not reach the receiver.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The attempt ran past its window.
    #[error("request timed out")]
    Timeout,

    /// The task's deadline had already passed before sending.
    #[error("deadline exceeded before send")]
    DeadlineExceeded,

    /// The receiver answered with a non-success status.
    #[error("receiver returned status {0}")]
    Status(u16),

    /// The response could not be read.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Any other client-side failure.
    #[error("transport error: {0}")]
    Transport(String),
}

impl DeliveryError {
    /// Whether another attempt could succeed.
    ///
    /// Network and receiver failures are transient; a request that cannot be
    /// built or sent for client-side reasons fails the same way again.
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Transport(_))
    }
}

/// Errors surfaced by the watcher to its host.
#[derive(Debug, Error)]
pub enum WatcherError {
    /// Chain data the watcher cannot interpret (e.g. an underivable transaction id).
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("delivery client: {0}")]
    Delivery(#[from] DeliveryError),

    /// `startup` called on a running plugin.
    #[error("watcher is already running")]
    AlreadyRunning,

    /// Lifecycle call out of order.
    #[error("watcher is not running")]
    NotRunning,

    /// `startup` called outside a tokio runtime.
    #[error("no async runtime available: {0}")]
    NoRuntime(String),
}
