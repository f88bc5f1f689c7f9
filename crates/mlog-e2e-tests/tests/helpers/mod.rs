//! Shared test harness for end-to-end tests.
//!
//! Builds log lines in server format, feeds them through a `LogParser` and
//! through the CLI pipeline over a `MockLineSource`.

use mlog_cli::config::CliConfig;
use mlog_cli::pipeline;
use mlog_parse::{LineResult, LogParser, MockLineSource, ParseStats, ParsedLine};

pub const TS: &str = "2018-10-05T14:01:04.067+0000";

/// Path under which `TestHarness::push` stores lines.
pub const HARNESS_PATH: &str = "/var/log/mongodb/mongod.log";

/// A log line with severity `I`.
pub fn info(component: &str, context: &str, message: &str) -> String {
    format!("{TS} I {component}  {context} {message}")
}

pub fn accept(numeric_id: u32, ip: &str, port: u16) -> String {
    info(
        "NETWORK",
        "[listener]",
        &format!("connection accepted from {ip}:{port} #{numeric_id} (1 connection now open)"),
    )
}

pub fn metadata(numeric_id: u32, ip: &str, port: u16, document: &str) -> String {
    info(
        "NETWORK",
        &format!("[conn{numeric_id}]"),
        &format!("received client metadata from {ip}:{port} conn{numeric_id}: {document}"),
    )
}

pub fn end(numeric_id: u32, ip: &str, port: u16) -> String {
    info(
        "NETWORK",
        &format!("[conn{numeric_id}]"),
        &format!("end connection {ip}:{port} (0 connections now open)"),
    )
}

pub fn command(numeric_id: u32, message: &str) -> String {
    info("COMMAND", &format!("[conn{numeric_id}]"), message)
}

/// Test harness owning a parser and the lines fed to it so far.
pub struct TestHarness {
    pub parser: LogParser,
    pub lines: Vec<String>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self {
            parser: LogParser::default(),
            lines: Vec::new(),
        }
    }

    pub fn with_parser(parser: LogParser) -> Self {
        Self {
            parser,
            lines: Vec::new(),
        }
    }

    /// Decode one line, remembering it for `run_pipeline`.
    pub fn push(&mut self, line: impl Into<String>) -> LineResult<ParsedLine> {
        let line = line.into();
        let result = self.parser.process_line(&line);
        self.lines.push(line);
        result
    }

    /// Decode a line that must parse without any error.
    pub fn push_clean(&mut self, line: impl Into<String>) -> ParsedLine {
        let parsed = self.push(line).expect("line has a header");
        assert!(parsed.is_clean(), "unexpected error: {:?}", parsed.error);
        parsed
    }

    /// Replay every pushed line through the CLI pipeline.
    pub async fn run_pipeline(&self, config: &CliConfig) -> (ParseStats, Vec<serde_json::Value>) {
        let mut source = MockLineSource::new();
        source.add_file(HARNESS_PATH, self.lines.clone());
        let mut out = Vec::new();
        let stats = pipeline::run(&source, HARNESS_PATH, config, &mut out)
            .await
            .expect("pipeline run");
        let records = String::from_utf8(out)
            .expect("utf-8 output")
            .lines()
            .map(|l| serde_json::from_str(l).expect("json record"))
            .collect();
        (stats, records)
    }
}
