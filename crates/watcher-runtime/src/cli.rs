//! Command line surface of `watcher-node`.

use action_watcher::{WatcherOptions, DEFAULT_AGE_LIMIT_SECS, DEFAULT_PENDING_EXPIRY_SECS};
use clap::Parser;
use std::path::PathBuf;

/// Reports actions from accepted blocks to an HTTP receiver.
#[derive(Parser, Debug, Clone)]
#[command(name = "watcher-node")]
#[command(about = "Watch chain actions and POST them to an HTTP receiver")]
pub struct Cli {
    /// Track actions: `receiver:action`, or `receiver` / `receiver:*` for every action
    #[arg(long = "watch", env = "WATCHER_WATCH", value_delimiter = ',')]
    pub watch: Vec<String>,

    /// URL notifications are POSTed to
    #[arg(long = "watch-receiver-url", env = "WATCHER_RECEIVER_URL")]
    pub receiver_url: Option<String>,

    /// Blocks at least this many seconds old are not reported (negative disables)
    #[arg(
        long = "watch-age-limit",
        env = "WATCHER_AGE_LIMIT",
        default_value_t = DEFAULT_AGE_LIMIT_SECS,
        allow_negative_numbers = true
    )]
    pub age_limit: i64,

    /// Seconds an unresolved transaction is kept (negative keeps forever)
    #[arg(
        long = "watch-pending-expiry",
        env = "WATCHER_PENDING_EXPIRY",
        default_value_t = DEFAULT_PENDING_EXPIRY_SECS,
        allow_negative_numbers = true
    )]
    pub pending_expiry: i64,

    /// Directory of `<account>.abi.json` files
    #[arg(long = "abi-dir")]
    pub abi_dir: Option<PathBuf>,

    /// Chain event feed, one JSON event per line (`-` reads stdin)
    #[arg(long = "events", default_value = "-")]
    pub events: String,
}

impl Cli {
    pub fn watcher_options(&self) -> WatcherOptions {
        WatcherOptions {
            watch: self
                .watch
                .iter()
                .map(|entry| entry.trim().to_string())
                .filter(|entry| !entry.is_empty())
                .collect(),
            receiver_url: self.receiver_url.clone(),
            age_limit_secs: self.age_limit,
            pending_expiry_secs: self.pending_expiry,
        }
    }
}
