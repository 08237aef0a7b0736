//! Broadcast queue and the single dispatcher task.
//!
//! All ingest loops feed one bounded MPSC channel; one consumer
//! serializes each update once and fans it out to every admin or
//! manager connection. Buffering choice: the shared queue has
//! capacity [`BROADCAST_QUEUE_DEPTH`] (effectively unbuffered), so a
//! slow dispatcher exerts backpressure on producers one at a time and
//! never silently drops. Per-recipient elasticity lives in each
//! connection's own outbound queue instead.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use fleettrack_core::LocationUpdate;

use crate::registry::ConnectionRegistry;

/// Depth of the shared broadcast queue.
pub const BROADCAST_QUEUE_DEPTH: usize = 1;

/// Create the many-producer/one-consumer update channel.
pub fn broadcast_channel() -> (mpsc::Sender<LocationUpdate>, mpsc::Receiver<LocationUpdate>) {
    mpsc::channel(BROADCAST_QUEUE_DEPTH)
}

/// Spawn the dispatcher task. It runs until every producer handle is
/// dropped (process shutdown); nothing else stops it.
pub fn start_dispatcher(
    registry: Arc<ConnectionRegistry>,
    mut rx: mpsc::Receiver<LocationUpdate>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(update) = rx.recv().await {
            dispatch_one(&registry, &update).await;
        }
        debug!("broadcast queue closed, dispatcher stopping");
    })
}

/// Fan one update out to the current privileged snapshot.
///
/// A failed send means the recipient's writer task is gone; that
/// connection is evicted here — the only place anything other than a
/// connection's own ingest loop removes it — and delivery continues
/// with the remaining recipients. No retry.
pub(crate) async fn dispatch_one(registry: &ConnectionRegistry, update: &LocationUpdate) {
    let json = match serde_json::to_string(update) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "failed to serialize location update");
            return;
        }
    };

    let targets = registry.recipients(|info| info.role.is_privileged());
    let recipients = targets.len();
    for recipient in targets {
        if recipient.tx.send(json.clone()).await.is_err() {
            warn!(
                conn_id = %recipient.id,
                user_id = recipient.info.user_id,
                "send failed, evicting recipient"
            );
            registry.remove(&recipient.id);
        }
    }

    debug!(driver_id = update.driver_id, recipients, "fan-out complete");
}
