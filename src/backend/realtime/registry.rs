//! Registry of live relay connections.
//!
//! Owned by `AppState`. An entry is inserted when a socket finishes its
//! upgrade and removed when its session ends; one identity may hold several
//! connections at once (e.g. the same staff account on two devices).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Snapshot of one registered connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionInfo {
    /// Connection id
    pub id: Uuid,
    /// Caller-supplied identity
    pub identity: String,
    /// When the socket was registered
    pub connected_at: DateTime<Utc>,
}

impl ConnectionInfo {
    /// Describe a connection registered now
    pub fn new(id: Uuid, identity: impl Into<String>) -> Self {
        Self {
            id,
            identity: identity.into(),
            connected_at: Utc::now(),
        }
    }
}

/// Identity-keyed registry of live connections. Clones share state.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    connections: Arc<RwLock<HashMap<String, HashMap<Uuid, ConnectionInfo>>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a live connection
    pub async fn register(&self, info: ConnectionInfo) {
        tracing::debug!(identity = %info.identity, connection_id = %info.id, "[Registry] Registered");
        let mut connections = self.connections.write().await;
        let _ = connections
            .entry(info.identity.clone())
            .or_default()
            .insert(info.id, info);
    }

    /// Forget a connection. Returns `false` if it was not registered.
    pub async fn unregister(&self, identity: &str, id: Uuid) -> bool {
        let mut connections = self.connections.write().await;
        let Some(entries) = connections.get_mut(identity) else {
            return false;
        };
        let removed = entries.remove(&id).is_some();
        if entries.is_empty() {
            let _ = connections.remove(identity);
        }
        if removed {
            tracing::debug!(identity, connection_id = %id, "[Registry] Unregistered");
        }
        removed
    }

    /// Live connections of `identity`, oldest first
    pub async fn connections_for(&self, identity: &str) -> Vec<ConnectionInfo> {
        let connections = self.connections.read().await;
        let mut entries: Vec<_> = connections
            .get(identity)
            .map(|entries| entries.values().cloned().collect())
            .unwrap_or_default();
        entries.sort_by_key(|info| info.connected_at);
        entries
    }

    /// Identities with at least one live connection, sorted
    pub async fn identities(&self) -> Vec<String> {
        let mut identities: Vec<_> = self.connections.read().await.keys().cloned().collect();
        identities.sort();
        identities
    }

    /// Total number of live connections
    pub async fn len(&self) -> usize {
        self.connections.read().await.values().map(HashMap::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
