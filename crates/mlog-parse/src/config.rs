//! Parser settings, loadable from the `[parser]` table of a TOML file.

use serde::Deserialize;
use std::num::NonZeroUsize;

use crate::error::{LogError, LogResult};

/// Default bound on the connection table.
pub const DEFAULT_MAX_CONNECTIONS: usize = 100_000;

/// How the connection table is bounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// Keep every connection until its `end connection` line.
    Unbounded,
    /// Drop the least recently used connection once `max_entries` are tracked.
    LeastRecentlyUsed { max_entries: NonZeroUsize },
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        Self::LeastRecentlyUsed {
            max_entries: NonZeroUsize::new(DEFAULT_MAX_CONNECTIONS).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionKind {
    #[default]
    Lru,
    Unbounded,
}

/// `[parser]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ParserConfig {
    #[serde(default)]
    pub eviction: EvictionKind,
    /// Table size for `lru`; ignored for `unbounded`.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

fn default_max_connections() -> usize {
    DEFAULT_MAX_CONNECTIONS
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            eviction: EvictionKind::default(),
            max_connections: default_max_connections(),
        }
    }
}

impl ParserConfig {
    /// Validate and convert into the tracker's policy.
    pub fn eviction_policy(&self) -> LogResult<EvictionPolicy> {
        match self.eviction {
            EvictionKind::Unbounded => Ok(EvictionPolicy::Unbounded),
            EvictionKind::Lru => NonZeroUsize::new(self.max_connections)
                .map(|max_entries| EvictionPolicy::LeastRecentlyUsed { max_entries })
                .ok_or_else(|| LogError::Config("max_connections must be at least 1".into())),
        }
    }
}
