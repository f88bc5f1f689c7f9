//! COMMAND message classification and span extraction.
//!
//! Find-like commands log a plan summary between their parameters and the
//! protocol tag; every other known command goes straight to the protocol.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

use crate::error::{LineError, LineResult};
use crate::types::CommandInfo;

/// Verbs whose messages carry a `planSummary:` segment.
pub const FIND_LIKE_VERBS: &[&str] = &["find", "count", "getMore", "findAndModify", "aggregate", "query"];

/// Verbs logged without a plan summary.
pub const OTHER_VERBS: &[&str] = &[
    "insert",
    "update",
    "delete",
    "isMaster",
    "listCollections",
    "serverStatus",
    "replSetUpdatePosition",
    "dbStats",
    "collStats",
];

static RE_COMMAND_INFO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"command (?P<collection>\S+)\scommand:\s(?P<verb>\S+)\s").unwrap()
});

static RE_FIND_PAYLOAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"command (?P<collection>\S+)\scommand:\s",
        r"(?P<verb>\S+)\s",
        r"(?P<params>\{.*\})\s",
        r"planSummary:\s",
        r"(?P<plan>.*)\sprotocol:",
        r"(?P<protocol>\S+)\s",
        r"(?P<duration>[0-9]+)ms",
    ))
    .unwrap()
});

static RE_OTHER_PAYLOAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"command (?P<collection>\S+)\scommand:\s",
        r"(?P<verb>\S+)\s",
        r"(?P<params>\{.*\})\sprotocol:",
        r"(?P<protocol>\S+)\s",
        r"(?P<duration>[0-9]+)ms",
    ))
    .unwrap()
});

// BinData(0, E3B0C44298FC1) -> BinData(0, "E3B0C44298FC1")
static RE_BIN_DATA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(BinData\(\d+,)\s*([A-Fa-f0-9]+)\)").unwrap());

/// Message layout selected by the command verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// Parameters, plan summary, protocol, duration.
    FindLike,
    /// Parameters, protocol, duration.
    Other,
}

impl PayloadShape {
    pub fn for_verb(verb: &str) -> Option<Self> {
        if FIND_LIKE_VERBS.contains(&verb) {
            Some(Self::FindLike)
        } else if OTHER_VERBS.contains(&verb) {
            Some(Self::Other)
        } else {
            None
        }
    }
}

/// Raw spans of a COMMAND message, borrowed from the message body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadSpans<'a> {
    pub shape: PayloadShape,
    pub collection: &'a str,
    pub verb: &'a str,
    /// From the first `{` to the last `}` before the next marker, including
    /// any execution statistics logged after the parameters.
    pub params: &'a str,
    pub plan_summary: Option<&'a str>,
    pub protocol: &'a str,
    pub duration_ms: u64,
}

impl PayloadSpans<'_> {
    pub fn command_info(&self) -> CommandInfo {
        CommandInfo {
            collection: self.collection.to_string(),
            verb: self.verb.to_string(),
            protocol: self.protocol.to_string(),
            duration_ms: self.duration_ms,
        }
    }
}

/// Collection namespace and verb from the `command <ns> command: <verb>` prefix.
pub fn command_info(body: &str) -> Option<(&str, &str)> {
    let caps = RE_COMMAND_INFO.captures(body)?;
    Some((caps.name("collection")?.as_str(), caps.name("verb")?.as_str()))
}

/// Pick the layout for `verb` and cut `body` into its spans.
///
/// An unknown verb fails before any span is looked at.
pub fn classify_and_extract<'a>(verb: &str, body: &'a str) -> LineResult<PayloadSpans<'a>> {
    let shape =
        PayloadShape::for_verb(verb).ok_or_else(|| LineError::UnrecognizedCommand(verb.to_string()))?;
    let mismatch = || LineError::PayloadShapeMismatch {
        verb: verb.to_string(),
    };

    let re = match shape {
        PayloadShape::FindLike => &*RE_FIND_PAYLOAD,
        PayloadShape::Other => &*RE_OTHER_PAYLOAD,
    };
    let caps = re.captures(body).ok_or_else(mismatch)?;
    let span = |name: &str| caps.name(name).map(|m| m.as_str());

    let logged_verb = span("verb").ok_or_else(mismatch)?;
    if logged_verb != verb {
        return Err(mismatch());
    }
    let duration_ms = span("duration")
        .and_then(|d| d.parse().ok())
        .ok_or_else(mismatch)?;

    Ok(PayloadSpans {
        shape,
        collection: span("collection").ok_or_else(mismatch)?,
        verb: logged_verb,
        params: span("params").ok_or_else(mismatch)?,
        plan_summary: match shape {
            PayloadShape::FindLike => Some(span("plan").ok_or_else(mismatch)?),
            PayloadShape::Other => None,
        },
        protocol: span("protocol").ok_or_else(mismatch)?,
        duration_ms,
    })
}

/// Quote the unquoted hex payload of `BinData(<subtype>, <hex>)` literals so
/// the grammar can lex them as strings.
pub fn quote_bin_data(text: &str) -> Cow<'_, str> {
    RE_BIN_DATA.replace_all(text, r#"${1} "${2}")"#)
}
