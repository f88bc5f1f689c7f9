//! Running statistics over a decoded log stream.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::assembler::{ConnectionEvent, ParsedLine};
use crate::error::{LineError, LineResult};
use crate::tracker::ConnectionTracker;

/// Counters accumulated line by line; serializes as the CLI summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParseStats {
    pub total_lines: u64,
    /// Lines with a valid header.
    pub decoded_lines: u64,
    pub header_mismatches: u64,
    /// Lines decoded without any error.
    pub clean_lines: u64,
    pub by_component: BTreeMap<String, u64>,
    pub by_severity: BTreeMap<String, u64>,
    pub commands_by_verb: BTreeMap<String, u64>,
    pub errors_by_kind: BTreeMap<String, u64>,
    pub connections_opened: u64,
    pub connections_closed: u64,
    pub earliest: Option<DateTime<Utc>>,
    pub latest: Option<DateTime<Utc>>,
    /// Connections still tracked at the last [`ParseStats::observe_tracker`].
    pub tracked_connections: u64,
    pub evicted_connections: u64,
}

impl ParseStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: &LineResult<ParsedLine>) {
        self.total_lines += 1;
        let parsed = match result {
            Ok(parsed) => parsed,
            Err(e) => {
                self.header_mismatches += 1;
                self.count_error(e);
                return;
            }
        };
        self.decoded_lines += 1;

        let entry = &parsed.entry;
        *self.by_component.entry(entry.component.clone()).or_default() += 1;
        *self.by_severity.entry(entry.severity.to_string()).or_default() += 1;
        if let Some(command) = &entry.command {
            *self.commands_by_verb.entry(command.verb.clone()).or_default() += 1;
        }

        match &parsed.error {
            Some(e) => self.count_error(e),
            None => self.clean_lines += 1,
        }

        match parsed.connection_event {
            Some(ConnectionEvent::Accepted) => self.connections_opened += 1,
            Some(ConnectionEvent::Closed) => self.connections_closed += 1,
            _ => {}
        }

        if let Some(t) = entry.time {
            self.earliest = Some(self.earliest.map_or(t, |e| e.min(t)));
            self.latest = Some(self.latest.map_or(t, |l| l.max(t)));
        }
    }

    /// Copy the tracker's table size and eviction count.
    pub fn observe_tracker(&mut self, tracker: &ConnectionTracker) {
        self.tracked_connections = tracker.len() as u64;
        self.evicted_connections = tracker.evicted();
    }

    pub fn error_count(&self) -> u64 {
        self.errors_by_kind.values().sum()
    }

    /// One-line human summary.
    pub fn summary(&self) -> String {
        format!(
            "{} lines: {} decoded, {} with errors, {} connections opened, {} closed",
            self.total_lines,
            self.decoded_lines,
            self.error_count(),
            self.connections_opened,
            self.connections_closed,
        )
    }

    fn count_error(&mut self, error: &LineError) {
        *self.errors_by_kind.entry(error.kind().to_string()).or_default() += 1;
    }
}
