//! JSONL reading operations.
//!
//! This module provides async functionality for reading JSONL files line-by-line
//! with efficient buffering and line number tracking for error reporting.

use crate::warning::Warning;
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// Async reader for JSONL (JSON Lines) data.
///
/// `JsonlReader` wraps an async reader and provides buffered reading of JSONL
/// formatted data. It tracks line numbers to provide useful context in error
/// messages when parsing fails. Blank lines are skipped.
///
/// # Examples
///
/// ```no_run
/// use taskgraph_jsonl::JsonlReader;
/// use tokio::fs::File;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let file = File::open("data.jsonl").await?;
/// let mut reader = JsonlReader::new(file);
/// while let Some(value) = reader.read_line::<serde_json::Value>().await? {
///     println!("{value}");
/// }
/// # Ok(())
/// # }
/// ```
pub struct JsonlReader<R> {
    /// Buffered reader wrapping the underlying async reader.
    reader: BufReader<R>,
    /// Current line number (1-based counting, 0 before any lines are read).
    line_number: usize,
    /// Reused line buffer.
    buf: String,
}

impl<R: AsyncRead + Unpin> JsonlReader<R> {
    /// Creates a new `JsonlReader` wrapping the given async reader.
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            line_number: 0,
            buf: String::new(),
        }
    }

    /// Creates a new `JsonlReader` with a custom buffer capacity.
    #[must_use]
    pub fn with_capacity(reader: R, capacity: usize) -> Self {
        Self {
            reader: BufReader::with_capacity(capacity, reader),
            line_number: 0,
            buf: String::new(),
        }
    }

    /// Returns the 1-based number of the last line read, or 0 before any read.
    #[must_use]
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Advances to the next non-blank line, leaving it in the line buffer.
    ///
    /// Returns `false` at end of input.
    async fn next_non_blank(&mut self) -> Result<bool> {
        loop {
            self.buf.clear();
            let read = self.reader.read_line(&mut self.buf).await?;
            if read == 0 {
                return Ok(false);
            }
            self.line_number += 1;
            if !self.buf.trim().is_empty() {
                return Ok(true);
            }
        }
    }

    /// Reads and deserializes the next record.
    ///
    /// Returns `Ok(None)` at end of input.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Line`] when the line is not valid JSON for `T`, or
    /// [`Error::Io`] when reading fails.
    pub async fn read_line<T: DeserializeOwned>(&mut self) -> Result<Option<T>> {
        if !self.next_non_blank().await? {
            return Ok(None);
        }
        serde_json::from_str(self.buf.trim())
            .map(Some)
            .map_err(|source| Error::Line {
                line_number: self.line_number,
                source,
            })
    }

    /// Reads every remaining record, skipping lines that fail to parse.
    ///
    /// Lines that are not JSON at all are reported as
    /// [`Warning::MalformedJson`], valid JSON that does not fit `T` as
    /// [`Warning::SkippedLine`]. Only I/O failures abort the read.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the underlying reader fails.
    pub async fn read_all_resilient<T: DeserializeOwned>(
        &mut self,
    ) -> Result<(Vec<T>, Vec<Warning>)> {
        let mut values = Vec::new();
        let mut warnings = Vec::new();

        while self.next_non_blank().await? {
            match serde_json::from_str::<T>(self.buf.trim()) {
                Ok(value) => values.push(value),
                // Well-formed JSON of the wrong shape is reported separately.
                Err(e) if e.is_data() => {
                    tracing::debug!(line = self.line_number, error = %e, "Skipping JSONL line of unexpected shape");
                    warnings.push(Warning::SkippedLine {
                        line_number: self.line_number,
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    tracing::debug!(line = self.line_number, error = %e, "Skipping malformed JSONL line");
                    warnings.push(Warning::MalformedJson {
                        line_number: self.line_number,
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok((values, warnings))
    }

    /// Consumes the reader, returning the underlying buffered reader.
    #[must_use]
    pub fn into_inner(self) -> BufReader<R> {
        self.reader
    }
}

/// Reads a JSONL file, skipping malformed lines.
///
/// Returns the successfully parsed records together with a warning for every
/// line that was skipped.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be opened or read.
pub async fn read_jsonl_resilient<T, P>(path: P) -> Result<(Vec<T>, Vec<Warning>)>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref()).await?;
    let mut reader = JsonlReader::new(file);
    let (values, warnings) = reader.read_all_resilient().await?;

    if !warnings.is_empty() {
        tracing::warn!(
            path = %path.as_ref().display(),
            skipped = warnings.len(),
            "Skipped malformed lines while loading JSONL file"
        );
    }

    Ok((values, warnings))
}
