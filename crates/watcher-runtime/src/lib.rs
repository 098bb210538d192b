//! # Watcher Runtime
//!
//! Hosts the action watcher outside a ledger node: chain events are read from a
//! newline-delimited JSON feed and published on an in-memory bus the plugin is
//! subscribed to.
//!
//! ## Startup Sequence
//!
//! 1. Parse options (flags or `WATCHER_*` environment variables)
//! 2. Initialize logging and metrics
//! 3. Validate the watcher configuration
//! 4. Load contract ABIs from `--abi-dir`
//! 5. Initialize and start the plugin
//! 6. Replay the feed until EOF or Ctrl-C, then shut down

pub mod cli;
pub mod feed;
pub mod runtime;

pub use cli::Cli;
pub use feed::{parse_line, EventFeed, FeedError};
pub use runtime::{load_abis, ReplaySummary, RuntimeError, WatcherNode};
