//! mlog: library side of the `mlog` binary.
//!
//! Exposes the TOML configuration and the streaming pipeline so that
//! `mlog-e2e-tests` can drive them against in-memory sources.

pub mod config;
pub mod pipeline;
