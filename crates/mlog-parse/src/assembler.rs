//! Per-line assembly: header split, connection bookkeeping, COMMAND decoding.

use crate::config::EvictionPolicy;
use crate::error::{LineError, LineResult, Section};
use crate::grammar;
use crate::header::{self, LogHeader, Severity};
use crate::network::{self, NetworkEvent, NETWORK_COMPONENT};
use crate::payload;
use crate::plan;
use crate::tracker::ConnectionTracker;
use crate::types::LogEntry;

/// Component name of query/command lines.
pub const COMMAND_COMPONENT: &str = "COMMAND";

/// COMMAND messages with this prefix are diagnostics, not commands.
const WARNING_PREFIX: &str = "warning";

/// Connection table change caused by a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    Accepted,
    MetadataAttached,
    Closed,
}

/// Outcome of one line: the best-effort entry plus the decode error, if any.
#[derive(Debug, Clone)]
pub struct ParsedLine {
    pub entry: LogEntry,
    pub error: Option<LineError>,
    pub connection_event: Option<ConnectionEvent>,
}

impl ParsedLine {
    pub fn is_clean(&self) -> bool {
        self.error.is_none()
    }
}

/// Streaming log decoder. Owns the connection table for one log stream.
#[derive(Debug, Default)]
pub struct LogParser {
    tracker: ConnectionTracker,
}

impl LogParser {
    pub fn new(policy: EvictionPolicy) -> Self {
        Self::with_tracker(ConnectionTracker::new(policy))
    }

    pub fn with_tracker(tracker: ConnectionTracker) -> Self {
        Self { tracker }
    }

    pub fn tracker(&self) -> &ConnectionTracker {
        &self.tracker
    }

    /// Decode one raw line.
    ///
    /// Only a line without the fixed header is an `Err`; every other failure
    /// is reported on the returned [`ParsedLine`].
    pub fn process_line(&mut self, line: &str) -> LineResult<ParsedLine> {
        let line = line.trim_end_matches(['\r', '\n']);
        let header = header::split_header(line).ok_or(LineError::HeaderMismatch)?;
        Ok(self.process_header(header))
    }

    /// Decode a line whose five header fields are already split.
    pub fn process_header(&mut self, header: LogHeader<'_>) -> ParsedLine {
        let mut entry = LogEntry::from_header(&header);
        let mut connection_event = None;
        let mut pending_close = false;

        if header.component == NETWORK_COMPONENT {
            match network::classify(header.context, header.message) {
                Some(NetworkEvent::Accept { ip, port, id }) => {
                    entry.connection = Some(self.tracker.accept(ip, port, id));
                    connection_event = Some(ConnectionEvent::Accepted);
                }
                Some(NetworkEvent::Metadata { metadata, .. }) => {
                    if self.tracker.attach_metadata(header.context, metadata) {
                        connection_event = Some(ConnectionEvent::MetadataAttached);
                    }
                }
                Some(NetworkEvent::Close { .. }) => pending_close = true,
                None => {}
            }
        }

        if entry.connection.is_none() {
            entry.connection = self.tracker.lookup(header.context);
        }
        if pending_close && self.tracker.close(header.context).is_some() {
            connection_event = Some(ConnectionEvent::Closed);
        }

        let error = if is_decodable_command(&header) {
            decode_command(&mut entry, header.message).err()
        } else {
            None
        };

        ParsedLine {
            entry,
            error,
            connection_event,
        }
    }

    /// Lazily decode `lines` in order.
    pub fn entries<I>(&mut self, lines: I) -> Entries<'_, I::IntoIter>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        Entries {
            parser: self,
            lines: lines.into_iter(),
        }
    }
}

fn is_decodable_command(header: &LogHeader<'_>) -> bool {
    header.component == COMMAND_COMPONENT
        && header.severity == Severity::Info
        && !header.message.starts_with(WARNING_PREFIX)
}

fn decode_command(entry: &mut LogEntry, message: &str) -> LineResult<()> {
    let body = payload::quote_bin_data(message);
    let (_, verb) = payload::command_info(&body).ok_or(LineError::CommandInfoMissing)?;
    let spans = payload::classify_and_extract(verb, &body)?;
    entry.command = Some(spans.command_info());

    let params = grammar::parse_document(spans.params).map_err(|error| LineError::Grammar {
        section: Section::CommandParameters,
        error,
    })?;
    entry.command_parameters = Some(params);

    if let Some(text) = spans.plan_summary {
        let summary = plan::parse_plan_summary(text).map_err(|error| LineError::Grammar {
            section: Section::PlanSummary,
            error,
        })?;
        entry.plan_summary = Some(summary);
    }
    Ok(())
}

/// Iterator returned by [`LogParser::entries`].
pub struct Entries<'p, I> {
    parser: &'p mut LogParser,
    lines: I,
}

impl<I> Iterator for Entries<'_, I>
where
    I: Iterator,
    I::Item: AsRef<str>,
{
    type Item = LineResult<ParsedLine>;

    fn next(&mut self) -> Option<Self::Item> {
        let line = self.lines.next()?;
        Some(self.parser.process_line(line.as_ref()))
    }
}
