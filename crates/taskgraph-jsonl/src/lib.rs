//! Async JSONL (JSON Lines) support for taskgraph.
//!
//! Provides a buffered line reader and writer, crash-safe atomic file
//! replacement, and resilient loading that skips malformed lines while
//! reporting them as [`Warning`]s.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod atomic;
pub mod error;
pub mod reader;
pub mod warning;
pub mod writer;

pub use atomic::{write_jsonl_atomic, write_jsonl_atomic_iter};
pub use error::{Error, Result};
pub use reader::{JsonlReader, read_jsonl_resilient};
pub use warning::Warning;
pub use writer::JsonlWriter;
