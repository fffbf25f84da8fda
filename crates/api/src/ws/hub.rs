use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::ws::Message;
use derby_core::types::Timestamp;
use derby_core::RaceState;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, RwLock};

/// Outbound messages a viewer may have queued before it counts as a slow
/// consumer and is dropped.
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 32;

/// Channel sender half for pushing messages to a viewer connection.
pub type WsSender = mpsc::Sender<Message>;

/// Metadata for a single viewer connection.
pub struct WsConnection {
    /// Channel sender for outbound messages to this connection.
    pub sender: WsSender,
    /// When this connection was established.
    pub connected_at: Timestamp,
}

/// Result of a [`BroadcastHub::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The snapshot was offered to every registered viewer.
    Sent {
        /// Viewers whose queue accepted the snapshot.
        delivered: usize,
        /// Viewers dropped because their queue was closed or full.
        evicted: usize,
    },
    /// A newer snapshot was already pushed; this one was discarded.
    Stale,
}

/// Newest snapshot handed to viewers, kept serialized.
struct LatestSnapshot {
    revision: u64,
    message: Message,
}

struct Viewers {
    connections: HashMap<String, WsConnection>,
    latest: Option<LatestSnapshot>,
}

impl Viewers {
    fn last_revision(&self) -> Option<u64> {
        self.latest.as_ref().map(|latest| latest.revision)
    }
}

/// Fan-out point for race snapshots to live viewer sockets.
///
/// Each viewer owns a bounded queue drained by its socket writer task.
/// Pushing never waits on a socket: a viewer whose queue is closed or full
/// is evicted on the spot, which drops its sender and lets the writer task
/// close the socket.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared across the application. The lock is independent of the race
/// store's lock.
pub struct BroadcastHub {
    viewers: RwLock<Viewers>,
    capacity: usize,
}

impl BroadcastHub {
    /// Create an empty hub with the default per-viewer queue size.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_OUTBOUND_CAPACITY)
    }

    /// Create an empty hub with a custom per-viewer queue size.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            viewers: RwLock::new(Viewers {
                connections: HashMap::new(),
                latest: None,
            }),
            capacity: capacity.max(1),
        }
    }

    /// Register a viewer and queue its first snapshot.
    ///
    /// The first message is `initial` or, if a newer snapshot was pushed
    /// since the caller took `initial`, that newer one. A viewer therefore
    /// never starts behind the others.
    ///
    /// Returns the receiver half of the viewer's queue so the caller can
    /// forward messages to the socket sink. Registering an existing ID
    /// replaces the previous connection.
    pub async fn register(&self, conn_id: String, initial: &RaceState) -> mpsc::Receiver<Message> {
        let (tx, rx) = mpsc::channel(self.capacity);
        let initial_message = snapshot_message(initial);

        let mut viewers = self.viewers.write().await;
        let newer = viewers
            .latest
            .as_ref()
            .filter(|latest| latest.revision > initial.revision)
            .map(|latest| (latest.revision, latest.message.clone()));

        let first = if let Some((latest_revision, message)) = newer {
            tracing::debug!(
                conn_id = %conn_id,
                initial_revision = initial.revision,
                latest_revision,
                "Viewer registered with an outdated snapshot, sending newer one",
            );
            Some(message)
        } else if let Some(message) = initial_message {
            viewers.latest = Some(LatestSnapshot {
                revision: initial.revision,
                message: message.clone(),
            });
            Some(message)
        } else {
            viewers.latest.as_ref().map(|latest| latest.message.clone())
        };

        if let Some(message) = first {
            // Fresh channel with capacity >= 1, cannot be full or closed.
            let _ = tx.try_send(message);
        }

        viewers.connections.insert(
            conn_id,
            WsConnection {
                sender: tx,
                connected_at: chrono::Utc::now(),
            },
        );
        rx
    }

    /// Remove a viewer. Returns whether it was registered; calling this for
    /// an unknown or already removed ID does nothing.
    pub async fn unregister(&self, conn_id: &str) -> bool {
        let removed = self.viewers.write().await.connections.remove(conn_id);
        if let Some(conn) = &removed {
            let connected_secs = (chrono::Utc::now() - conn.connected_at).num_seconds();
            tracing::debug!(conn_id, connected_secs, "Viewer unregistered");
        }
        removed.is_some()
    }

    /// Offer `snapshot` to every registered viewer.
    ///
    /// Snapshots older than the newest one already pushed are discarded so
    /// no viewer ever sees the history shrink. A viewer that cannot take the
    /// message is evicted; the others are unaffected.
    pub async fn push(&self, snapshot: &RaceState) -> PushOutcome {
        let Some(message) = snapshot_message(snapshot) else {
            return PushOutcome::Sent {
                delivered: 0,
                evicted: 0,
            };
        };

        let mut viewers = self.viewers.write().await;
        if viewers
            .last_revision()
            .is_some_and(|last| snapshot.revision < last)
        {
            tracing::debug!(
                revision = snapshot.revision,
                last_revision = ?viewers.last_revision(),
                "Discarding stale snapshot",
            );
            return PushOutcome::Stale;
        }
        viewers.latest = Some(LatestSnapshot {
            revision: snapshot.revision,
            message: message.clone(),
        });

        let evicted = fan_out(&mut viewers.connections, &message);
        let delivered = viewers.connections.len();
        tracing::debug!(
            revision = snapshot.revision,
            delivered,
            evicted,
            "Snapshot pushed",
        );

        PushOutcome::Sent { delivered, evicted }
    }

    /// Return the current number of registered viewers.
    pub async fn connection_count(&self) -> usize {
        self.viewers.read().await.connections.len()
    }

    /// Send a Ping frame to every viewer.
    ///
    /// Used by the heartbeat task to keep connections alive and detect
    /// stale ones.
    pub async fn ping_all(&self) {
        let mut viewers = self.viewers.write().await;
        fan_out(&mut viewers.connections, &Message::Ping(Bytes::new()));
    }

    /// Send a Close frame to every viewer, then clear the set.
    ///
    /// Used during graceful shutdown to notify all clients before the
    /// server stops.
    pub async fn shutdown_all(&self) {
        let mut viewers = self.viewers.write().await;
        let count = viewers.connections.len();
        for conn in viewers.connections.values() {
            let _ = conn.sender.try_send(Message::Close(None));
        }
        viewers.connections.clear();
        tracing::info!(count, "Closed all viewer connections");
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Offer `message` to every connection, evicting those that cannot take it.
/// Returns the number of evicted connections.
fn fan_out(connections: &mut HashMap<String, WsConnection>, message: &Message) -> usize {
    let before = connections.len();
    connections.retain(|conn_id, conn| match conn.sender.try_send(message.clone()) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            tracing::warn!(conn_id = %conn_id, "Viewer queue full, dropping slow viewer");
            false
        }
        Err(TrySendError::Closed(_)) => {
            tracing::debug!(conn_id = %conn_id, "Viewer channel closed, removing");
            false
        }
    });
    before - connections.len()
}

fn snapshot_message(snapshot: &RaceState) -> Option<Message> {
    match serde_json::to_string(snapshot) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            tracing::error!(error = %e, revision = snapshot.revision, "Failed to serialize snapshot");
            None
        }
    }
}
