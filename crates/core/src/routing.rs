// SPDX-License-Identifier: MIT

//! Agent-local peer routing table.
//!
//! Writes (connect/disconnect) acquire a short exclusive lock; reads take an
//! `Arc` snapshot so that one reasoning-loop iteration observes one
//! consistent view even if the table mutates concurrently (spec §3, §5).

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::name::AgentName;

/// Mapping of peer name to peer endpoint URL.
pub type PeerSnapshot = Arc<HashMap<String, String>>;

/// Thread-safe, snapshot-reading routing table owned by one agent.
#[derive(Debug)]
pub struct RoutingTable {
    self_name: AgentName,
    inner: RwLock<Arc<HashMap<String, String>>>,
}

/// Error returned when a mutation would violate a routing-table invariant.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum RoutingError {
    #[error("an agent cannot connect to itself")]
    SelfConnect,
}

impl RoutingTable {
    pub fn new(self_name: AgentName) -> Self {
        Self { self_name, inner: RwLock::new(Arc::new(HashMap::new())) }
    }

    /// Insert or overwrite a peer entry. Overwriting an existing peer with a
    /// different endpoint is allowed (spec §9 open question, resolved as
    /// overwrite-with-event at the call site that owns event emission).
    pub fn connect(&self, peer: &str, endpoint: &str) -> Result<bool, RoutingError> {
        if peer == self.self_name.as_str() {
            return Err(RoutingError::SelfConnect);
        }
        let mut guard = self.inner.write();
        let mut next = (**guard).clone();
        let changed = next.get(peer).map(String::as_str) != Some(endpoint);
        next.insert(peer.to_string(), endpoint.to_string());
        *guard = Arc::new(next);
        Ok(changed)
    }

    /// Remove a peer entry. No error if absent (idempotent per spec §4.2).
    pub fn disconnect(&self, peer: &str) -> bool {
        let mut guard = self.inner.write();
        if !guard.contains_key(peer) {
            return false;
        }
        let mut next = (**guard).clone();
        next.remove(peer);
        *guard = Arc::new(next);
        true
    }

    /// Take an atomic snapshot of the current table. A reasoning-loop
    /// iteration should call this once at the start of the turn and use the
    /// result throughout, per spec §5.
    pub fn snapshot(&self) -> PeerSnapshot {
        Arc::clone(&self.inner.read())
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
