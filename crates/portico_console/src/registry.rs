//! Connection registry.

use std::sync::Arc;
use std::time::{Duration, Instant};

use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::component::ConnectionId;
use crate::connection::ConsoleConnection;
use crate::error::LifecycleError;

/// Open connections by id.
///
/// The map lock is held only to look up, insert or remove an entry. Work on a
/// connection happens under that connection's own locks.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, Arc<ConsoleConnection>>>,
}

impl ConnectionRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracks a new connection.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::AlreadyOpen`] if `id` is already tracked.
    pub fn open(
        &self,
        id: ConnectionId,
        locale: String,
        now: Instant,
    ) -> Result<Arc<ConsoleConnection>, LifecycleError> {
        let mut connections = self.connections.write();
        if connections.contains_key(&id) {
            return Err(LifecycleError::AlreadyOpen(id));
        }
        let connection = Arc::new(ConsoleConnection::new(id.clone(), locale, now));
        connections.insert(id, Arc::clone(&connection));
        Ok(connection)
    }

    /// The open connection with this id.
    #[must_use]
    pub fn get(&self, id: &ConnectionId) -> Option<Arc<ConsoleConnection>> {
        self.connections
            .read()
            .get(id)
            .filter(|connection| connection.is_connected())
            .cloned()
    }

    /// Stops tracking `id`, returning the entry if there was one.
    pub fn remove(&self, id: &ConnectionId) -> Option<Arc<ConsoleConnection>> {
        self.connections.write().remove(id)
    }

    /// Open connection ids, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<ConnectionId> {
        let mut ids: Vec<_> = self.connections.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Connections whose last activity is at least `timeout` before `now`,
    /// sorted by id.
    #[must_use]
    pub fn idle(&self, now: Instant, timeout: Duration) -> Vec<ConnectionId> {
        let mut idle: Vec<_> = self
            .connections
            .read()
            .values()
            .filter(|connection| {
                now.saturating_duration_since(connection.last_activity()) >= timeout
            })
            .map(|connection| connection.id().clone())
            .collect();
        idle.sort();
        idle
    }

    /// Number of registered connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.read().len()
    }

    /// Returns true if no connection is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.read().is_empty()
    }
}
