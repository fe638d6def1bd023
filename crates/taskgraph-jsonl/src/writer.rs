//! JSONL writing operations.
//!
//! This module provides async functionality for writing data in JSONL format
//! with efficient buffering.

use crate::Result;
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

/// Async writer for JSONL (JSON Lines) data.
///
/// Each value is serialized to a single line followed by a newline character.
/// Call [`flush`](Self::flush) before dropping the writer.
pub struct JsonlWriter<W> {
    /// Buffered writer wrapping the underlying async writer.
    writer: BufWriter<W>,
}

impl<W: AsyncWrite + Unpin> JsonlWriter<W> {
    /// Creates a new `JsonlWriter` wrapping the given async writer.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
        }
    }

    /// Creates a new `JsonlWriter` with a custom buffer capacity.
    #[must_use]
    pub fn with_capacity(writer: W, capacity: usize) -> Self {
        Self {
            writer: BufWriter::with_capacity(capacity, writer),
        }
    }

    /// Serializes one value as a JSON line.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the underlying write fails.
    pub async fn write<T: Serialize>(&mut self, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        Ok(())
    }

    /// Serializes every value of an iterator, one per line.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first serialization or write failure.
    pub async fn write_all<T, I>(&mut self, values: I) -> Result<()>
    where
        T: Serialize,
        I: IntoIterator<Item = T>,
    {
        for value in values {
            self.write(&value).await?;
        }
        Ok(())
    }

    /// Flushes buffered data to the underlying writer.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying flush fails.
    pub async fn flush(&mut self) -> Result<()> {
        self.writer.flush().await?;
        Ok(())
    }

    /// Consumes the writer, returning the underlying buffered writer.
    ///
    /// Note: This does not flush the buffer.
    #[must_use]
    pub fn into_inner(self) -> BufWriter<W> {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[derive(Serialize)]
    struct Row<'a> {
        id: u32,
        name: &'a str,
    }

    #[tokio::test]
    async fn writes_one_value_per_line() {
        let mut writer = JsonlWriter::new(Cursor::new(Vec::new()));
        writer
            .write_all([Row { id: 1, name: "a" }, Row { id: 2, name: "b\nc" }])
            .await
            .unwrap();
        writer.flush().await.unwrap();

        let bytes = writer.into_inner().into_inner().into_inner();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(
            text,
            "{\"id\":1,\"name\":\"a\"}\n{\"id\":2,\"name\":\"b\\nc\"}\n"
        );
    }

    #[tokio::test]
    async fn empty_iterator_writes_nothing() {
        let mut writer = JsonlWriter::with_capacity(Cursor::new(Vec::new()), 64);
        writer.write_all(Vec::<Row<'_>>::new()).await.unwrap();
        writer.flush().await.unwrap();
        assert!(writer.into_inner().into_inner().into_inner().is_empty());
    }
}
