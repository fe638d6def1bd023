//! Atomic write operations for JSONL files.
//!
//! Data is first written to a sibling temporary file, flushed and synced, then
//! renamed over the target. Renames within one filesystem are atomic on POSIX
//! systems, so the target is never observed half-written.

use crate::{JsonlWriter, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs::File;

/// Atomically replaces `path` with the given values, one JSON line each.
///
/// # Errors
///
/// Returns an error if the temporary file cannot be created, a value fails
/// to serialize, or the final rename fails. On failure the original file is
/// left unchanged.
///
/// # Examples
///
/// ```no_run
/// use taskgraph_jsonl::write_jsonl_atomic;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Record { id: u32 }
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// write_jsonl_atomic("data.jsonl", &[Record { id: 1 }, Record { id: 2 }]).await?;
/// # Ok(())
/// # }
/// ```
pub async fn write_jsonl_atomic<T, P>(path: P, values: &[T]) -> Result<()>
where
    T: Serialize,
    P: AsRef<Path>,
{
    write_jsonl_atomic_iter(path, values.iter()).await
}

/// Atomically replaces `path` with the values of an iterator.
///
/// # Errors
///
/// See [`write_jsonl_atomic`].
pub async fn write_jsonl_atomic_iter<T, I, P>(path: P, values: I) -> Result<()>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let temp_path = make_temp_path(path);

    if let Err(e) = write_to_temp_file(&temp_path, values).await {
        // Best-effort cleanup; the write error is what the caller needs.
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e);
    }

    tokio::fs::rename(&temp_path, path).await?;
    tracing::trace!(path = %path.display(), "Atomically replaced JSONL file");

    Ok(())
}

/// Appends `.tmp` to the file extension (`tasks.jsonl` -> `tasks.jsonl.tmp`).
fn make_temp_path(path: &Path) -> PathBuf {
    let mut temp_path = path.to_path_buf();
    let new_extension = match path.extension() {
        Some(ext) => {
            let mut new_ext = ext.to_os_string();
            new_ext.push(".tmp");
            new_ext
        }
        None => std::ffi::OsString::from("tmp"),
    };
    temp_path.set_extension(new_extension);
    temp_path
}

async fn write_to_temp_file<T, I>(temp_path: &Path, values: I) -> Result<()>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let file = File::create(temp_path).await?;
    let mut writer = JsonlWriter::new(file);
    writer.write_all(values).await?;
    writer.flush().await?;
    writer.into_inner().into_inner().sync_all().await?;
    Ok(())
}
