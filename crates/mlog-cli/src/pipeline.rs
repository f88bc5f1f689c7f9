//! Streaming pipeline: read lines, decode, write JSON lines, keep statistics.

use anyhow::Context;
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use mlog_parse::{
    LineError, LineResult, LineSource, LogEntry, LogParser, ParseStats, ParsedLine, next_line_lossy,
};

use crate::config::{CliConfig, OutputConfig, OutputMode};

/// One output line.
#[derive(Debug, Serialize)]
pub struct OutputRecord<'a> {
    /// 1-based input line number.
    pub line: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<&'a LogEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorRecord>,
}

#[derive(Debug, Serialize)]
pub struct ErrorRecord {
    pub kind: &'static str,
    pub message: String,
}

impl From<&LineError> for ErrorRecord {
    fn from(e: &LineError) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

/// Decode `path` from `source`, writing records to `out` per `config.output`.
///
/// Per-line failures are logged and counted; only I/O and configuration
/// errors end the run early.
pub async fn run<W>(
    source: &dyn LineSource,
    path: &str,
    config: &CliConfig,
    out: &mut W,
) -> anyhow::Result<ParseStats>
where
    W: AsyncWrite + Unpin + Send,
{
    let policy = config.parser.eviction_policy()?;
    let mut parser = LogParser::new(policy);
    let mut stats = ParseStats::new();

    let mut reader = source.open(path).await?;
    let mut buf = Vec::new();
    let mut line_no = 0u64;
    tracing::debug!(path, ?policy, "decoding started");

    while let Some(line) = next_line_lossy(&mut reader, &mut buf)
        .await
        .with_context(|| format!("reading {path}"))?
    {
        line_no += 1;
        let result = parser.process_line(&line);
        stats.record(&result);

        if let Some(e) = line_error(&result) {
            tracing::warn!(line = line_no, kind = e.kind(), error = %e, "line not fully decoded");
        }
        if let Some(record) = select_record(&result, line_no, &config.output) {
            let mut bytes = serde_json::to_vec(&record)?;
            bytes.push(b'\n');
            out.write_all(&bytes).await?;
        }
    }

    stats.observe_tracker(parser.tracker());
    tracing::info!(
        total_lines = stats.total_lines,
        errors = stats.error_count(),
        tracked_connections = stats.tracked_connections,
        evicted_connections = stats.evicted_connections,
        "{}",
        stats.summary()
    );

    if config.output.mode == OutputMode::Summary {
        let mut bytes = serde_json::to_vec(&stats)?;
        bytes.push(b'\n');
        out.write_all(&bytes).await?;
    }
    out.flush().await?;
    Ok(stats)
}

fn line_error(result: &LineResult<ParsedLine>) -> Option<&LineError> {
    match result {
        Ok(parsed) => parsed.error.as_ref(),
        Err(e) => Some(e),
    }
}

/// Lines that carry nothing beyond their header.
fn is_passthrough(parsed: &ParsedLine) -> bool {
    parsed.is_clean() && parsed.entry.command.is_none() && parsed.connection_event.is_none()
}

fn select_record<'a>(
    result: &'a LineResult<ParsedLine>,
    line: u64,
    output: &OutputConfig,
) -> Option<OutputRecord<'a>> {
    match (result, output.mode) {
        (_, OutputMode::Summary) => None,
        (Err(e), _) => Some(OutputRecord {
            line,
            entry: None,
            error: Some(e.into()),
        }),
        (Ok(parsed), OutputMode::Errors) if parsed.is_clean() => None,
        (Ok(parsed), OutputMode::Entries) if !output.include_passthrough && is_passthrough(parsed) => {
            None
        }
        (Ok(parsed), _) => Some(OutputRecord {
            line,
            entry: Some(&parsed.entry),
            error: parsed.error.as_ref().map(ErrorRecord::from),
        }),
    }
}
