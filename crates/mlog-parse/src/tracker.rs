//! Connection table built from NETWORK lines.
//!
//! Connections are keyed by their line context (`[conn7]`). The table is
//! bounded by an [`EvictionPolicy`]; recency is tracked with a monotonically
//! increasing tick so the least recently used entry is the first key of
//! `recency`.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::config::EvictionPolicy;
use crate::grammar;
use crate::types::Connection;

#[derive(Debug)]
struct Tracked {
    connection: Arc<Connection>,
    last_used: u64,
}

/// Mutable map of open connections. Operations never fail.
#[derive(Debug)]
pub struct ConnectionTracker {
    policy: EvictionPolicy,
    connections: HashMap<String, Tracked>,
    recency: BTreeMap<u64, String>,
    clock: u64,
    evicted: u64,
}

impl ConnectionTracker {
    pub fn new(policy: EvictionPolicy) -> Self {
        Self {
            policy,
            connections: HashMap::new(),
            recency: BTreeMap::new(),
            clock: 0,
            evicted: 0,
        }
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    /// Register a connection accepted by the listener.
    ///
    /// A stale entry under the same id is replaced unconditionally.
    pub fn accept(&mut self, ip: &str, port: &str, numeric_id: &str) -> Arc<Connection> {
        let id = Connection::context_for(numeric_id);
        let connection = Arc::new(Connection::new(id.clone(), ip, port));
        let tick = self.tick();

        let previous = self.connections.insert(
            id.clone(),
            Tracked {
                connection: Arc::clone(&connection),
                last_used: tick,
            },
        );
        if let Some(stale) = previous {
            self.recency.remove(&stale.last_used);
            tracing::debug!(connection = %id, "replacing stale connection");
        }
        tracing::trace!(connection = %id, ip, port, "connection accepted");
        self.recency.insert(tick, id);
        self.enforce_capacity();

        connection
    }

    /// Connection tracked under `context`, marking it as recently used.
    pub fn lookup(&mut self, context: &str) -> Option<Arc<Connection>> {
        self.touch(context);
        self.get(context).cloned()
    }

    /// Connection tracked under `context`, without touching recency.
    pub fn get(&self, context: &str) -> Option<&Arc<Connection>> {
        self.connections.get(context).map(|t| &t.connection)
    }

    /// Parse `metadata` and attach it to the connection tracked under
    /// `context`. Entries that already hold the connection keep the old value.
    ///
    /// Returns false (and drops the metadata) when the connection is not
    /// tracked or the text does not parse.
    pub fn attach_metadata(&mut self, context: &str, metadata: &str) -> bool {
        if !self.connections.contains_key(context) {
            tracing::debug!(connection = %context, "dropping metadata for untracked connection");
            return false;
        }
        let document = match grammar::parse_document(metadata) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::debug!(connection = %context, error = %e, "dropping unparsable client metadata");
                return false;
            }
        };

        let tick = self.tick();
        let Some(tracked) = self.connections.get_mut(context) else {
            return false;
        };
        tracked.connection = Arc::new(tracked.connection.with_metadata(document));
        self.recency.remove(&tracked.last_used);
        tracked.last_used = tick;
        self.recency.insert(tick, context.to_string());
        true
    }

    /// Forget the connection tracked under `context`, if any.
    pub fn close(&mut self, context: &str) -> Option<Arc<Connection>> {
        let tracked = self.connections.remove(context)?;
        self.recency.remove(&tracked.last_used);
        tracing::trace!(connection = %context, "connection closed");
        Some(tracked.connection)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Number of connections dropped by the eviction policy so far.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    // ── Recency ───────────────────────────────────────────────

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn touch(&mut self, context: &str) {
        if !self.connections.contains_key(context) {
            return;
        }
        let tick = self.tick();
        if let Some(tracked) = self.connections.get_mut(context) {
            self.recency.remove(&tracked.last_used);
            tracked.last_used = tick;
            self.recency.insert(tick, context.to_string());
        }
    }

    fn enforce_capacity(&mut self) {
        let EvictionPolicy::LeastRecentlyUsed { max_entries } = self.policy else {
            return;
        };
        while self.connections.len() > max_entries.get() {
            let Some((_, victim)) = self.recency.pop_first() else {
                break;
            };
            self.connections.remove(&victim);
            self.evicted += 1;
            tracing::debug!(
                connection = %victim,
                max_entries = max_entries.get(),
                "evicted least recently used connection"
            );
        }
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new(EvictionPolicy::default())
    }
}
