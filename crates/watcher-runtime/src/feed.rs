//! # Chain Event Feed
//!
//! Newline-delimited JSON, one [`ChainEvent`] per line:
//!
//! ```text
//! {"type":"applied_transaction","id":"9f86..","action_traces":[...]}
//! {"type":"accepted_block","block_num":7,"timestamp":"2024-06-01T12:00:00Z","transactions":[...]}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.

use shared_bus::ChainEvent;
use std::path::Path;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("failed to open event feed {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to read event feed at line {line}: {source}")]
    Read {
        line: usize,
        source: std::io::Error,
    },

    #[error("invalid chain event at line {line}: {source}")]
    Parse {
        line: usize,
        source: serde_json::Error,
    },
}

/// Parse one feed line. `Ok(None)` for blank and comment lines.
pub fn parse_line(line_no: usize, line: &str) -> Result<Option<ChainEvent>, FeedError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    serde_json::from_str(trimmed)
        .map(Some)
        .map_err(|source| FeedError::Parse {
            line: line_no,
            source,
        })
}

/// Reads chain events from any async line source.
pub struct EventFeed<R> {
    reader: R,
    line_no: usize,
    buf: String,
}

pub type BoxedReader = Box<dyn AsyncBufRead + Unpin + Send>;

impl EventFeed<BoxedReader> {
    /// Open `source`: a file path, or `-` for stdin.
    pub async fn open(source: &str) -> Result<Self, FeedError> {
        let reader: BoxedReader = if source == "-" {
            Box::new(BufReader::new(tokio::io::stdin()))
        } else {
            let file = tokio::fs::File::open(Path::new(source))
                .await
                .map_err(|e| FeedError::Open {
                    path: source.to_string(),
                    source: e,
                })?;
            Box::new(BufReader::new(file))
        };
        Ok(Self::new(reader))
    }
}

impl<R: AsyncBufRead + Unpin> EventFeed<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_no: 0,
            buf: String::new(),
        }
    }

    /// Next event, or `None` at end of input.
    pub async fn next_event(&mut self) -> Result<Option<ChainEvent>, FeedError> {
        loop {
            self.buf.clear();
            self.line_no += 1;
            let read = self
                .reader
                .read_line(&mut self.buf)
                .await
                .map_err(|source| FeedError::Read {
                    line: self.line_no,
                    source,
                })?;
            if read == 0 {
                return Ok(None);
            }
            if let Some(event) = parse_line(self.line_no, &self.buf)? {
                return Ok(Some(event));
            }
        }
    }

    /// Lines consumed so far.
    pub fn lines_read(&self) -> usize {
        self.line_no
    }
}
