//! In-memory line source serving sample server logs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::io::Cursor;

use crate::error::{LogError, LogResult};
use crate::source::{LineReader, LineSource};

/// Serves pre-loaded log content by path.
pub struct MockLineSource {
    files: HashMap<String, Vec<u8>>,
}

impl MockLineSource {
    pub fn new() -> Self {
        Self {
            files: HashMap::new(),
        }
    }

    pub fn add_file(&mut self, path: impl Into<String>, lines: Vec<String>) {
        let mut text = lines.join("\n");
        text.push('\n');
        self.files.insert(path.into(), text.into_bytes());
    }

    /// Serve `bytes` verbatim, e.g. content that is not valid UTF-8.
    pub fn add_raw_file(&mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), bytes.into());
    }

    /// Accept, metadata, command and end lines for one connection.
    pub fn with_connection_lifecycle_sample() -> Self {
        let mut m = Self::new();
        m.add_file(
            "/var/log/mongodb/lifecycle.log",
            vec![
                "2018-10-05T14:01:04.067+0000 I NETWORK  [listener] connection accepted from 10.178.5.250:47878 #2078609 (252 connections now open)".into(),
                r#"2018-10-05T14:01:04.068+0000 I NETWORK  [conn2078609] received client metadata from 10.178.5.250:47878 conn2078609: { driver: { name: "PyMongo", version: "3.7.1" }, os: { type: "Linux", name: "Linux", architecture: "x86_64", version: "4.4.0-1069-aws" }, platform: "CPython 3.6.6.final.0" }"#.into(),
                r#"2018-10-05T14:01:04.301+0000 I COMMAND  [conn2078609] command FooDb.cats command: find { find: "cats", filter: { owner: "ada" }, $db: "FooDb" } planSummary: IXSCAN { owner: 1 } keysExamined:3 docsExamined:3 cursorExhausted:1 numYields:0 nreturned:3 reslen:812 locks:{ Global: { acquireCount: { r: 2 } } } protocol:op_msg 4ms"#.into(),
                "2018-10-05T14:01:05.112+0000 I NETWORK  [conn2078609] end connection 10.178.5.250:47878 (251 connections now open)".into(),
            ],
        );
        m
    }

    /// Find-like and insert command lines from several connections.
    pub fn with_command_sample() -> Self {
        let mut m = Self::new();
        m.add_file(
            "/var/log/mongodb/commands.log",
            vec![
                r#"2018-10-05T14:02:00.000+0000 I COMMAND  [conn11] command FooDb.mycatpicscollection command: find { find: "mycatpicscollection", filter: { foo.FooObjectId: ObjectId('5a8c3a142053a407a936745e'), foo.max_time: { $gte: 1534769530.5 }, foo.min_time: { $lte: 1534769548.47 } }, $db: "FooDb" } planSummary: IXSCAN { foo.FooObjectId: 1, foo.min_time: -1 } keysExamined:50314 docsExamined:2 cursorExhausted:1 numYields:393 nreturned:2 reslen:14980 locks:{ Global: { acquireCount: { r: 788 } } } protocol:op_query 219ms"#.into(),
                r#"2018-10-05T14:02:01.000+0000 I COMMAND  [conn12] command FooDb.mycatpicscollection command: insert { insert: "mycatpicscollection", ordered: true, $clusterTime: { clusterTime: Timestamp(1538979514, 76), signature: { hash: BinData(0, 0000000000000000000000000000000000000000), keyId: 0 } }, lsid: { id: UUID("c3cc9fef-182a-4917-9b5a-f715d0639ac2") }, $db: "FooDb" } ninserted:1 keysInserted:3 numYields:0 reslen:229 locks:{ Global: { acquireCount: { r: 2, w: 2 } } } protocol:op_query 12ms"#.into(),
                r#"2018-10-05T14:02:02.000+0000 I COMMAND  [conn11] command FooDb.cats command: count { count: "cats", query: { owner: "ada" }, $db: "FooDb" } planSummary: COUNT_SCAN { owner: 1 } keysExamined:3 docsExamined:0 numYields:0 reslen:45 protocol:op_msg 1ms"#.into(),
                r#"2018-10-05T14:02:03.000+0000 I COMMAND  [conn12] command FooDb.cats command: aggregate { aggregate: "cats", pipeline: [ { $match: { owner: "ada" } }, { $group: { _id: "$color", n: { $sum: 1 } } } ], cursor: {}, $db: "FooDb" } planSummary: COLLSCAN keysExamined:0 docsExamined:45227 cursorExhausted:1 numYields:353 nreturned:4 reslen:340 protocol:op_msg 130ms"#.into(),
            ],
        );
        m
    }

    /// Lines that fail in each of the ways a line can fail.
    pub fn with_malformed_sample() -> Self {
        let mut m = Self::new();
        m.add_file(
            "/var/log/mongodb/malformed.log",
            vec![
                "this is not a log line".into(),
                r#"2018-10-05T14:03:00.000+0000 I COMMAND  [conn20] command admin.$cmd command: dropDatabase { dropDatabase: 1, $db: "admin" } protocol:op_msg 5ms"#.into(),
                r#"2018-10-05T14:03:01.000+0000 I COMMAND  [conn20] command FooDb.cats command: find { find: "cats" } protocol:op_msg 3ms"#.into(),
                r#"2018-10-05T14:03:02.000+0000 I COMMAND  [conn20] command FooDb.cats command: insert { insert: "cats", documents: ? } protocol:op_msg 3ms"#.into(),
                "2018-10-05T14:03:03.000+0000 I COMMAND  [conn20] CMD: drop FooDb.cats".into(),
                "2018-10-05T14:03:04.000+0000 I COMMAND  [conn20] warning: log line attempted (16kB) over max size (10kB), printing beginning and end ...".into(),
            ],
        );
        m
    }
}

impl Default for MockLineSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LineSource for MockLineSource {
    async fn open(&self, path: &str) -> LogResult<LineReader> {
        let bytes = self
            .files
            .get(path)
            .ok_or_else(|| LogError::NotFound(path.to_string()))?;
        Ok(Box::new(Cursor::new(bytes.clone())))
    }

    async fn exists(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }
}
