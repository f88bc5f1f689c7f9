//! Structured records produced per log line.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::header::{self, LogHeader, Severity};
use crate::plan::PlanSummary;
use crate::value::PseudoDocument;

// ── Connection ────────────────────────────────────────────────

/// A client connection as announced by the listener.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Connection {
    /// Canonical id, identical to the line context: `[conn2078609]`.
    pub id: String,
    pub ip: String,
    pub port: String,
    /// Driver/OS document from the "received client metadata" line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_metadata: Option<PseudoDocument>,
}

impl Connection {
    pub fn new(id: impl Into<String>, ip: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ip: ip.into(),
            port: port.into(),
            client_metadata: None,
        }
    }

    /// Copy of this connection with client metadata attached.
    pub fn with_metadata(&self, metadata: PseudoDocument) -> Self {
        Self {
            client_metadata: Some(metadata),
            ..self.clone()
        }
    }

    /// Context tag for a numeric connection id: `7` -> `[conn7]`.
    pub fn context_for(numeric_id: &str) -> String {
        format!("[conn{numeric_id}]")
    }
}

// ── Command info ──────────────────────────────────────────────

/// Fixed fields of a COMMAND message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandInfo {
    /// Namespace, e.g. `FooDb.mycatpicscollection`.
    pub collection: String,
    pub verb: String,
    pub protocol: String,
    pub duration_ms: u64,
}

// ── Log Entry ─────────────────────────────────────────────────

/// One decoded log line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    /// Timestamp text as logged.
    pub timestamp: String,
    /// Parsed timestamp (None if unparseable).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    pub severity: Severity,
    pub component: String,
    pub context: String,
    /// Message body as logged.
    pub message: String,
    /// Connection this line belongs to, shared with the tracker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection: Option<Arc<Connection>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<CommandInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_parameters: Option<PseudoDocument>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_summary: Option<PlanSummary>,
}

impl LogEntry {
    /// Entry with header fields populated and everything else empty.
    pub fn from_header(header: &LogHeader<'_>) -> Self {
        Self {
            timestamp: header.timestamp.to_string(),
            time: header::parse_timestamp(header.timestamp),
            severity: header.severity,
            component: header.component.to_string(),
            context: header.context.to_string(),
            message: header.message.to_string(),
            connection: None,
            command: None,
            command_parameters: None,
            plan_summary: None,
        }
    }

    pub fn is_command(&self) -> bool {
        self.command.is_some()
    }
}
