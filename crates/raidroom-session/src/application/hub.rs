//! Fan-out of room events to connected clients.

use std::collections::HashMap;

use raidroom_core::id::ConnectionId;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use crate::domain::messages::{Audience, ServerEvent};

/// Outbound queue depth per connection.
pub const CONNECTION_QUEUE_CAPACITY: usize = 256;

/// Sending half of a connection's outbound queue.
pub type EventSender = mpsc::Sender<ServerEvent>;

/// Receiving half of a connection's outbound queue.
pub type EventReceiver = mpsc::Receiver<ServerEvent>;

/// Creates a bounded outbound queue for one connection.
#[must_use]
pub fn connection_channel() -> (EventSender, EventReceiver) {
    mpsc::channel(CONNECTION_QUEUE_CAPACITY)
}

/// Every connection watching the room, joined or not.
///
/// Delivery never blocks: a full queue drops the event for that client
/// only, and a closed queue unregisters the connection.
#[derive(Debug, Default)]
pub struct ConnectionHub {
    connections: HashMap<ConnectionId, EventSender>,
}

impl ConnectionHub {
    /// Creates an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a connection's queue.
    pub fn register(&mut self, id: ConnectionId, sender: EventSender) {
        debug!(connection_id = %id, "connection registered");
        self.connections.insert(id, sender);
    }

    /// Drops a connection's queue.
    pub fn unregister(&mut self, id: ConnectionId) -> bool {
        self.connections.remove(&id).is_some()
    }

    /// Number of registered connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// True if nobody is connected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Queues `event` for everyone in `audience`. Returns how many queues
    /// accepted it.
    pub fn deliver(&mut self, audience: Audience, event: &ServerEvent) -> usize {
        let mut delivered = 0;
        let mut closed = Vec::new();
        for (&id, sender) in &self.connections {
            if !audience.includes(id) {
                continue;
            }
            match sender.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(connection_id = %id, "outbound queue full, dropping event");
                }
                Err(TrySendError::Closed(_)) => closed.push(id),
            }
        }
        for id in closed {
            debug!(connection_id = %id, "outbound queue closed, unregistering");
            self.connections.remove(&id);
        }
        delivered
    }
}
