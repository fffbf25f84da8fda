use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};

use crate::state::AppState;

/// GET /ws -- upgrade to a read-only race feed.
///
/// The viewer receives the current snapshot on connect and a new one after
/// every race mutation. Anything the client sends is ignored.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Manage a single viewer connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Registers the connection with the hub, seeded with a snapshot.
///   2. Spawns a writer task that forwards the hub queue to the sink.
///   3. Spawns a reader task that drains and discards inbound frames.
///   4. Whichever task ends first (client close, read/write error, hub
///      eviction) stops the other, and the viewer is unregistered.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn_id = uuid::Uuid::new_v4().to_string();

    let snapshot = state.store.snapshot().await;
    let mut rx = state.hub.register(conn_id.clone(), &snapshot).await;
    tracing::info!(conn_id = %conn_id, revision = snapshot.revision, "Viewer connected");

    let (mut sink, mut stream) = socket.split();

    // Writer: forward queued messages. The queue closes when the hub evicts
    // this viewer or shuts down.
    let writer_conn_id = conn_id.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %writer_conn_id, "Viewer sink closed");
                return;
            }
        }
        let _ = sink.close().await;
    });

    // Reader: the feed is read-only, inbound frames are only watched for
    // close and errors.
    let reader_conn_id = conn_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = stream.next().await {
            match result {
                Ok(Message::Close(_)) => break,
                Ok(Message::Pong(_)) => {
                    tracing::trace!(conn_id = %reader_conn_id, "Pong received");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(conn_id = %reader_conn_id, error = %e, "Viewer receive error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.hub.unregister(&conn_id).await;
    tracing::info!(conn_id = %conn_id, "Viewer disconnected");
}
