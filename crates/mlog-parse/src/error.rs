//! Error types for line decoding, grammar parsing and log sources.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Longest suffix preview rendered in a grammar error message.
const PREVIEW_CHARS: usize = 40;

// ── Grammar ───────────────────────────────────────────────────

/// No grammar production matched at `offset`.
///
/// `offset` is a byte offset into the text handed to the parser and
/// `remaining` is the unparsed suffix starting there.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected {expected} at byte {offset}, found {}", preview(.remaining))]
pub struct GrammarError {
    pub offset: usize,
    pub remaining: String,
    pub expected: &'static str,
}

impl GrammarError {
    pub fn new(text: &str, offset: usize, expected: &'static str) -> Self {
        let offset = offset.min(text.len());
        Self {
            offset,
            remaining: text.get(offset..).unwrap_or_default().to_string(),
            expected,
        }
    }

    /// Re-anchor an error raised on a sub-span starting at `base` of `text`.
    pub fn rebase(self, text: &str, base: usize) -> Self {
        Self::new(text, base + self.offset, self.expected)
    }
}

fn preview(remaining: &str) -> String {
    if remaining.is_empty() {
        return "end of input".to_string();
    }
    let mut shown: String = remaining.chars().take(PREVIEW_CHARS).collect();
    if shown.len() < remaining.len() {
        shown.push('…');
    }
    format!("{shown:?}")
}

// ── Line decoding ─────────────────────────────────────────────

/// Which span of a COMMAND message failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    CommandParameters,
    PlanSummary,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CommandParameters => "commandparams",
            Self::PlanSummary => "plansummary",
        })
    }
}

/// Per-line decode failures. None of these stop the stream.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LineError {
    #[error("line does not match the log header layout")]
    HeaderMismatch,

    #[error("COMMAND message has no `command <ns> command: <verb>` prefix")]
    CommandInfoMissing,

    #[error("COMMAND payload does not match the expected layout for `{verb}`")]
    PayloadShapeMismatch { verb: String },

    #[error("unknown command: {0}")]
    UnrecognizedCommand(String),

    #[error("{section}: parse error: {error}")]
    Grammar {
        section: Section,
        #[source]
        error: GrammarError,
    },
}

impl LineError {
    /// Stable snake_case name, used as a statistics key.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::HeaderMismatch => "header_mismatch",
            Self::CommandInfoMissing => "command_info_missing",
            Self::PayloadShapeMismatch { .. } => "payload_shape_mismatch",
            Self::UnrecognizedCommand(_) => "unrecognized_command",
            Self::Grammar {
                section: Section::CommandParameters,
                ..
            } => "grammar_command_parameters",
            Self::Grammar {
                section: Section::PlanSummary,
                ..
            } => "grammar_plan_summary",
        }
    }
}

/// Convenience alias for per-line decode results.
pub type LineResult<T> = Result<T, LineError>;

// ── Sources & configuration ───────────────────────────────────

/// Errors raised while reading log input or loading parser settings.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("source not found: {0}")]
    NotFound(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

/// Convenience alias for source and configuration results.
pub type LogResult<T> = Result<T, LogError>;
