//! Line sources: where raw log text comes from.

use async_trait::async_trait;
use std::borrow::Cow;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::error::{LogError, LogResult};

/// Path that selects standard input.
pub const STDIN_PATH: &str = "-";

/// Buffered reader handed out by a [`LineSource`].
pub type LineReader = Box<dyn AsyncBufRead + Send + Unpin>;

/// Abstraction over log inputs, so the pipeline can be driven from files,
/// stdin or in-memory samples.
#[async_trait]
pub trait LineSource: Send + Sync {
    /// Open `path` for streaming.
    async fn open(&self, path: &str) -> LogResult<LineReader>;

    /// Check if `path` exists and is readable.
    async fn exists(&self, path: &str) -> bool;

    /// Read every line of `path` into memory.
    async fn read_lines(&self, path: &str) -> LogResult<Vec<String>> {
        let mut reader = self.open(path).await?;
        let mut buf = Vec::new();
        let mut out = Vec::new();
        while let Some(line) = next_line_lossy(&mut reader, &mut buf)
            .await
            .map_err(|e| LogError::Io(format!("{path}: {e}")))?
        {
            out.push(line);
        }
        Ok(out)
    }
}

/// Read the next line from `reader`, without its `\n` or `\r\n` ending.
///
/// Invalid UTF-8 is replaced with U+FFFD instead of failing the read, so a
/// truncated multi-byte character only affects its own line. `buf` is reused
/// between calls.
pub async fn next_line_lossy<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    let line = String::from_utf8_lossy(buf);
    if matches!(line, Cow::Owned(_)) {
        tracing::debug!(bytes = buf.len(), "replaced invalid UTF-8 in input line");
    }
    Ok(Some(line.into_owned()))
}

/// Reads logs from the local filesystem, or stdin for `-`.
pub struct FileLineSource;

#[async_trait]
impl LineSource for FileLineSource {
    async fn open(&self, path: &str) -> LogResult<LineReader> {
        if path == STDIN_PATH {
            return Ok(Box::new(BufReader::new(tokio::io::stdin())));
        }
        let file = tokio::fs::File::open(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LogError::NotFound(path.to_string())
            } else {
                LogError::Io(format!("{path}: {e}"))
            }
        })?;
        Ok(Box::new(BufReader::new(file)))
    }

    async fn exists(&self, path: &str) -> bool {
        path == STDIN_PATH || tokio::fs::metadata(path).await.is_ok()
    }
}
