//! Per-connection lifecycle: one writer task draining the outbound
//! queue into the socket, one reader task running the ingest loop,
//! and a supervisor that guarantees the cleanup contract — exactly
//! one registry removal and both socket halves dropped — on every
//! exit path, including dispatcher-initiated eviction.

use std::sync::Arc;

use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use fleettrack_core::{ClientInfo, ConnectionId, LocationUpdate};
use fleettrack_store::LocationStore;

use crate::persist;
use crate::registry::ConnectionRegistry;

/// Why an ingest loop ended. Logged at disconnect; never sent to the
/// peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Close frame or clean end of stream.
    Closed,
    /// Transport read error or a frame that failed to decode.
    Protocol,
    /// The broadcast queue is gone (process shutting down).
    QueueClosed,
}

/// Drive one admitted connection until it disconnects.
///
/// Eviction works through the registry: when the dispatcher removes
/// this connection's entry, the last outbound sender drops, the
/// writer ends, and the supervisor tears the reader down — same
/// cleanup path as a client-initiated close. The `remove` here is
/// then a no-op, which is why removal must stay idempotent.
pub async fn relay_connection(
    socket: WebSocket,
    id: ConnectionId,
    info: ClientInfo,
    rx: mpsc::Receiver<String>,
    registry: Arc<ConnectionRegistry>,
    store: Arc<dyn LocationStore>,
    updates: mpsc::Sender<LocationUpdate>,
) {
    info!(conn_id = %id, user_id = info.user_id, role = %info.role, "client connected");

    let (ws_tx, ws_rx) = socket.split();
    let mut writer = tokio::spawn(write_outbound(ws_tx, rx));
    let mut reader = tokio::spawn(read_inbound(ws_rx, info, store, updates));

    // Whichever side finishes first, tear down the other so both
    // socket halves drop and the peer observes a close.
    tokio::select! {
        _ = &mut writer => {
            reader.abort();
        }
        reason = &mut reader => {
            writer.abort();
            if let Ok(reason) = reason {
                debug!(conn_id = %id, user_id = info.user_id, ?reason, "ingest loop ended");
            }
        }
    }

    registry.remove(&id);
    info!(conn_id = %id, user_id = info.user_id, "client disconnected");
}

/// Forward queued broadcast payloads to the socket. Ends when every
/// sender is gone (disconnect or eviction) or the socket rejects a
/// write.
async fn write_outbound(
    mut ws_tx: SplitSink<WebSocket, WsMessage>,
    mut rx: mpsc::Receiver<String>,
) {
    while let Some(text) = rx.recv().await {
        if ws_tx.send(WsMessage::Text(text.into())).await.is_err() {
            break;
        }
    }
}

/// The ingest loop: receive, authorize, stamp, persist, broadcast.
async fn read_inbound(
    mut ws_rx: SplitStream<WebSocket>,
    info: ClientInfo,
    store: Arc<dyn LocationStore>,
    updates: mpsc::Sender<LocationUpdate>,
) -> DisconnectReason {
    loop {
        let frame = match ws_rx.next().await {
            Some(Ok(frame)) => frame,
            Some(Err(e)) => {
                debug!(user_id = info.user_id, error = %e, "read error");
                return DisconnectReason::Protocol;
            }
            None => return DisconnectReason::Closed,
        };

        let decoded = match frame {
            WsMessage::Text(text) => serde_json::from_str::<LocationUpdate>(text.as_str()),
            WsMessage::Binary(bytes) => serde_json::from_slice::<LocationUpdate>(&bytes),
            WsMessage::Close(_) => return DisconnectReason::Closed,
            // axum answers pings itself; pongs are irrelevant here.
            WsMessage::Ping(_) | WsMessage::Pong(_) => continue,
        };

        let update = match decoded {
            Ok(update) => update,
            Err(e) => {
                warn!(user_id = info.user_id, error = %e, "undecodable message, closing");
                return DisconnectReason::Protocol;
            }
        };

        // Authorization boundary: only drivers originate updates.
        if !info.role.may_publish() {
            debug!(user_id = info.user_id, role = %info.role, "discarding message from non-driver");
            continue;
        }

        // Never trust the client-supplied id.
        let update = update.stamped(info.user_id);

        persist::spawn_persist(Arc::clone(&store), update);

        // Blocking send into the shared queue: the intended
        // backpressure point when the dispatcher falls behind.
        if updates.send(update).await.is_err() {
            return DisconnectReason::QueueClosed;
        }
    }
}
