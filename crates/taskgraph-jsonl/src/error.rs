//! Error types for taskgraph-jsonl operations.

use std::io;
use thiserror::Error;

/// The error type for taskgraph-jsonl operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Reading or writing the underlying file failed.
    #[error("I/O failure: {0}")]
    Io(#[from] io::Error),

    /// A record could not be serialized.
    #[error("could not encode record: {0}")]
    Json(#[from] serde_json::Error),

    /// A line did not hold a valid record.
    #[error("line {line_number}: {source}")]
    Line {
        /// 1-based line number in the file
        line_number: usize,
        /// Why the line was rejected
        #[source]
        source: serde_json::Error,
    },
}

/// A specialized Result type for taskgraph-jsonl operations.
pub type Result<T> = std::result::Result<T, Error>;
