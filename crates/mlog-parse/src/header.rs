//! Fixed five-field log header: `<timestamp> <severity> <component> <context> <message>`.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;

// Components may be padded with several spaces before the context.
static RE_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<timestamp>\S+)\s(?P<severity>\S)\s(?P<component>\S+)\s+(?P<context>\S+)(?:\s(?P<message>.*))?$",
    )
    .unwrap()
});

/// Server log severity, from the single-letter code in the header.
///
/// Serializes as a plain string: the lowercase name for known codes, the
/// raw code letter otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Fatal,
    Error,
    Warning,
    Info,
    Debug,
    /// A code this decoder does not know, kept verbatim.
    Unknown(char),
}

impl Severity {
    pub fn from_code(code: char) -> Self {
        match code {
            'F' => Self::Fatal,
            'E' => Self::Error,
            'W' => Self::Warning,
            'I' => Self::Info,
            'D' => Self::Debug,
            other => Self::Unknown(other),
        }
    }

    pub fn code(&self) -> char {
        match self {
            Self::Fatal => 'F',
            Self::Error => 'E',
            Self::Warning => 'W',
            Self::Info => 'I',
            Self::Debug => 'D',
            Self::Unknown(c) => *c,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fatal => "fatal",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Unknown(_) => "unknown",
        }
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Unknown(c) => serializer.collect_str(c),
            known => serializer.serialize_str(known.as_str()),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The five header fields of one log line, borrowed from the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogHeader<'a> {
    pub timestamp: &'a str,
    pub severity: Severity,
    pub component: &'a str,
    pub context: &'a str,
    pub message: &'a str,
}

/// Split a raw line into its header fields.
///
/// Returns `None` when the line does not have the fixed header shape.
pub fn split_header(line: &str) -> Option<LogHeader<'_>> {
    let caps = RE_HEADER.captures(line)?;
    let severity = caps.name("severity")?.as_str().chars().next()?;
    Some(LogHeader {
        timestamp: caps.name("timestamp")?.as_str(),
        severity: Severity::from_code(severity),
        component: caps.name("component")?.as_str(),
        context: caps.name("context")?.as_str(),
        message: caps.name("message").map_or("", |m| m.as_str()),
    })
}

/// Parse a header timestamp such as `2018-10-05T14:01:04.067+0000`.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z")
        .or_else(|_| DateTime::parse_from_rfc3339(s))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn split_command_line() {
        let line = "2018-10-05T14:01:04.067+0000 I COMMAND  [conn206777] command FooDb.cats command: find { find: \"cats\" }";
        let h = split_header(line).unwrap();
        assert_eq!(h.timestamp, "2018-10-05T14:01:04.067+0000");
        assert_eq!(h.severity, Severity::Info);
        assert_eq!(h.component, "COMMAND");
        assert_eq!(h.context, "[conn206777]");
        assert!(h.message.starts_with("command FooDb"));
    }

    #[test]
    fn split_network_line() {
        let line = "2018-10-05T14:01:04.067+0000 I NETWORK  [listener] connection accepted from 10.178.5.250:47878 #2078609 (252 connections now open)";
        let h = split_header(line).unwrap();
        assert_eq!(h.component, "NETWORK");
        assert_eq!(h.context, "[listener]");
        assert!(h.message.starts_with("connection accepted"));
    }

    #[test]
    fn empty_message_is_allowed() {
        let h = split_header("2018-10-05T14:01:04.067+0000 W STORAGE  [initandlisten]").unwrap();
        assert_eq!(h.severity, Severity::Warning);
        assert_eq!(h.message, "");
    }

    #[test]
    fn non_header_lines_rejected() {
        assert!(split_header("").is_none());
        assert!(split_header("just some text").is_none());
        assert!(split_header("2018-10-05T14:01:04.067+0000 INFO COMMAND [conn1] x").is_none());
    }

    #[test]
    fn severity_codes() {
        assert_eq!(Severity::from_code('F'), Severity::Fatal);
        assert_eq!(Severity::from_code('E'), Severity::Error);
        assert_eq!(Severity::from_code('D'), Severity::Debug);
        let odd = Severity::from_code('X');
        assert_eq!(odd, Severity::Unknown('X'));
        assert_eq!(odd.code(), 'X');
        assert_eq!(odd.to_string(), "unknown");
    }

    #[test]
    fn severity_serializes_as_string() {
        assert_eq!(serde_json::to_value(Severity::Warning).unwrap(), "warning");
        assert_eq!(serde_json::to_value(Severity::Unknown('X')).unwrap(), "X");
    }

    #[test]
    fn timestamp_with_numeric_offset() {
        let ts = parse_timestamp("2018-10-05T14:01:04.067+0000").unwrap();
        assert_eq!(ts.year(), 2018);
        assert_eq!(ts.hour(), 14);
        assert_eq!(ts.timestamp_subsec_millis(), 67);
    }

    #[test]
    fn timestamp_rfc3339_and_garbage() {
        let ts = parse_timestamp("2018-10-05T16:01:04.067+02:00").unwrap();
        assert_eq!(ts.hour(), 14);
        assert!(parse_timestamp("Fri Oct  5 14:01:04.067").is_none());
    }
}
