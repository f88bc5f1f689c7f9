//! E2E tests for connection tracking across NETWORK and COMMAND lines.

mod helpers;

use std::num::NonZeroUsize;
use std::sync::Arc;

use helpers::{TestHarness, accept, command, end, metadata};
use mlog_cli::config::CliConfig;
use mlog_parse::{ConnectionEvent, EvictionPolicy, LogParser};

const INSERT: &str =
    r#"command db.cats command: insert { insert: "cats", ordered: true, $db: "db" } ninserted:1 protocol:op_msg 2ms"#;

/// Accept, command, end: the command carries the connection, later lines don't.
#[test]
fn e2e_accept_command_close() {
    let mut h = TestHarness::new();

    let accepted = h.push_clean(accept(7, "10.0.0.1", 1234));
    assert_eq!(accepted.connection_event, Some(ConnectionEvent::Accepted));
    let conn = accepted.entry.connection.clone().unwrap();
    assert_eq!(conn.id, "[conn7]");
    assert_eq!(conn.ip, "10.0.0.1");
    assert_eq!(conn.port, "1234");

    let cmd = h.push_clean(command(7, INSERT));
    assert!(Arc::ptr_eq(cmd.entry.connection.as_ref().unwrap(), &conn));

    let closed = h.push_clean(end(7, "10.0.0.1", 1234));
    assert_eq!(closed.connection_event, Some(ConnectionEvent::Closed));
    assert_eq!(closed.entry.connection.unwrap().id, "[conn7]");

    let after = h.push_clean(command(7, INSERT));
    assert!(after.entry.connection.is_none());
    assert!(h.parser.tracker().is_empty());
}

/// Metadata is visible from later lines and absent from earlier entries.
#[test]
fn e2e_client_metadata_enrichment() {
    let mut h = TestHarness::new();

    let accepted = h.push_clean(accept(42, "10.178.5.250", 47878));
    h.push_clean(metadata(
        42,
        "10.178.5.250",
        47878,
        r#"{ driver: { name: "mongo-java-driver", version: "3.8.2" }, os: { type: "Linux" } }"#,
    ));
    let cmd = h.push_clean(command(42, INSERT));

    let meta = cmd.entry.connection.as_ref().unwrap().client_metadata.as_ref().unwrap();
    assert_eq!(
        meta.get_document("driver").unwrap().get_str("version"),
        Some("3.8.2")
    );
    assert!(accepted.entry.connection.unwrap().client_metadata.is_none());
}

/// Metadata for an unknown connection or with a broken document is dropped.
#[test]
fn e2e_metadata_dropped() {
    let mut h = TestHarness::new();

    let orphan = h.push_clean(metadata(9, "10.0.0.9", 1, "{ driver: { name: 'x' } }"));
    assert!(orphan.connection_event.is_none());
    assert!(orphan.entry.connection.is_none());

    h.push_clean(accept(9, "10.0.0.9", 1));
    let broken = h.push_clean(metadata(9, "10.0.0.9", 1, "{ driver: "));
    assert!(broken.connection_event.is_none());
    assert!(broken.entry.connection.unwrap().client_metadata.is_none());
}

/// Interleaved connections keep their own identity.
#[test]
fn e2e_interleaved_connections() {
    let mut h = TestHarness::new();
    h.push_clean(accept(1, "10.0.0.1", 1001));
    h.push_clean(accept(2, "10.0.0.2", 1002));

    let a = h.push_clean(command(1, INSERT));
    let b = h.push_clean(command(2, INSERT));
    assert_eq!(a.entry.connection.unwrap().ip, "10.0.0.1");
    assert_eq!(b.entry.connection.unwrap().ip, "10.0.0.2");

    h.push_clean(end(1, "10.0.0.1", 1001));
    assert_eq!(h.parser.tracker().len(), 1);
    assert!(h.parser.tracker().get("[conn2]").is_some());
}

/// A bounded table evicts the least recently used connection.
#[test]
fn e2e_lru_eviction() {
    let parser = LogParser::new(EvictionPolicy::LeastRecentlyUsed {
        max_entries: NonZeroUsize::new(2).unwrap(),
    });
    let mut h = TestHarness::with_parser(parser);

    h.push_clean(accept(1, "10.0.0.1", 1));
    h.push_clean(accept(2, "10.0.0.2", 2));
    h.push_clean(command(1, INSERT));
    h.push_clean(accept(3, "10.0.0.3", 3));

    assert_eq!(h.parser.tracker().evicted(), 1);
    assert!(h.push_clean(command(2, INSERT)).entry.connection.is_none());
    assert!(h.push_clean(command(1, INSERT)).entry.connection.is_some());
}

/// The pipeline reports connection counters in its statistics.
#[tokio::test]
async fn e2e_pipeline_connection_stats() {
    let mut h = TestHarness::new();
    h.push_clean(accept(1, "10.0.0.1", 1));
    h.push_clean(accept(2, "10.0.0.2", 2));
    h.push_clean(end(1, "10.0.0.1", 1));

    let config: CliConfig = toml::from_str(
        r#"
[parser]
eviction = "lru"
max_connections = 1
"#,
    )
    .unwrap();
    let (stats, records) = h.run_pipeline(&config).await;

    assert_eq!(records.len(), 3);
    assert_eq!(stats.connections_opened, 2);
    // [conn1] was evicted by the second accept, so its end line closes nothing.
    assert_eq!(stats.connections_closed, 0);
    assert_eq!(stats.evicted_connections, 1);
    assert_eq!(stats.tracked_connections, 1);
    assert!(records[2]["entry"].get("connection").is_none());
}
