use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use fleettrack_core::{ClientInfo, ConnectionId};

struct ConnectionEntry {
    info: ClientInfo,
    tx: mpsc::Sender<String>,
}

/// Outbound handle for one fan-out pass: the entry's identity plus a
/// clone of its sender, valid even if the entry is removed while the
/// pass is in flight.
pub struct Recipient {
    pub id: ConnectionId,
    pub info: ClientInfo,
    pub tx: mpsc::Sender<String>,
}

/// All live connections, keyed by connection id.
///
/// One mutex covers the whole map: admit, remove, count, and the
/// fan-out snapshot all serialize through it. Coarse by intent; at
/// this scale a single exclusion domain is simpler to reason about
/// than per-entry locking, and no await ever happens under the lock.
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<ConnectionId, ConnectionEntry>>,
    send_queue: usize,
}

impl ConnectionRegistry {
    /// `send_queue` bounds each connection's outbound queue; a
    /// recipient only delays a fan-out pass once its queue is full.
    pub fn new(send_queue: usize) -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
            send_queue,
        }
    }

    /// Admit a verified connection: mint its id, create its outbound
    /// queue, insert the entry. Ids are generated here, so an admit
    /// can never collide with an existing entry.
    pub fn admit(&self, info: ClientInfo) -> (ConnectionId, mpsc::Receiver<String>) {
        let id = ConnectionId::new();
        let (tx, rx) = mpsc::channel(self.send_queue);
        self.connections
            .lock()
            .insert(id.clone(), ConnectionEntry { info, tx });
        (id, rx)
    }

    /// Remove a connection. Idempotent: the ingest loop's cleanup and
    /// the dispatcher's eviction path may both call this for the same
    /// id, in either order.
    pub fn remove(&self, id: &ConnectionId) -> bool {
        self.connections.lock().remove(id).is_some()
    }

    /// Number of currently admitted connections.
    pub fn count(&self) -> usize {
        self.connections.lock().len()
    }

    /// Atomic snapshot of the entries matching `predicate`.
    ///
    /// The lock is held only while the snapshot is built, so callers
    /// may await sends afterwards. An entry removed concurrently may
    /// still receive one in-flight send (its sender clone outlives
    /// the entry) but is never visited twice in the same pass.
    pub fn recipients<P>(&self, predicate: P) -> Vec<Recipient>
    where
        P: Fn(&ClientInfo) -> bool,
    {
        self.connections
            .lock()
            .iter()
            .filter(|(_, entry)| predicate(&entry.info))
            .map(|(id, entry)| Recipient {
                id: id.clone(),
                info: entry.info,
                tx: entry.tx.clone(),
            })
            .collect()
    }
}
