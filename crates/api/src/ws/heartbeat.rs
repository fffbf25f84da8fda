use std::sync::Arc;
use std::time::Duration;

use crate::ws::BroadcastHub;

/// Interval between heartbeat pings (in seconds).
const HEARTBEAT_INTERVAL_SECS: u64 = 30;

/// Spawn a background task that sends periodic Ping frames to all viewers.
///
/// Viewers whose queue is closed are evicted as a side effect. The task runs
/// until aborted via the returned `JoinHandle` during shutdown.
pub fn start_heartbeat(hub: Arc<BroadcastHub>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(HEARTBEAT_INTERVAL_SECS));

        loop {
            interval.tick().await;
            let count = hub.connection_count().await;
            tracing::debug!(count, "WebSocket heartbeat ping");
            hub.ping_all().await;
        }
    })
}
