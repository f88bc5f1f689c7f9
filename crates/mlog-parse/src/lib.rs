//! Decoder for MongoDB server text logs.
//!
//! Splits each line into its fixed header, tracks client connections from
//! NETWORK lines, and decodes COMMAND lines into a command summary, a
//! pseudo-JSON parameter document and a plan summary. Per-line failures never
//! stop the stream. A `LineSource` abstraction feeds the decoder from files,
//! stdin or in-memory samples.

pub mod assembler;
pub mod config;
pub mod error;
pub mod grammar;
pub mod header;
pub mod mock;
pub mod network;
pub mod payload;
pub mod plan;
pub mod source;
pub mod stats;
pub mod tracker;
pub mod types;
pub mod value;

// Re-export key types for convenience
pub use assembler::{ConnectionEvent, LogParser, ParsedLine};
pub use config::{EvictionPolicy, ParserConfig};
pub use error::{GrammarError, LineError, LineResult, LogError, LogResult, Section};
pub use grammar::{parse_document, parse_value};
pub use header::{LogHeader, Severity};
pub use mock::MockLineSource;
pub use plan::{parse_plan_summary, PlanItem, PlanSummary};
pub use source::{FileLineSource, LineSource, STDIN_PATH, next_line_lossy};
pub use stats::ParseStats;
pub use tracker::ConnectionTracker;
pub use types::{CommandInfo, Connection, LogEntry};
pub use value::{PseudoDocument, Value};
