use serde::{Deserialize, Serialize};

/// One GPS fix as it travels the relay pipeline.
///
/// Inbound, `driver_id` is untrusted client input; the ingest loop
/// overwrites it with the connection's authenticated user id before
/// the update leaves that loop. Outbound, `driver_id` is
/// authoritative. Missing fields decode as zero, matching the wire
/// tolerance of the clients; only malformed JSON is a decode error.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationUpdate {
    #[serde(default)]
    pub driver_id: i64,
    #[serde(default)]
    pub lat: f64,
    #[serde(default)]
    pub lng: f64,
}

impl LocationUpdate {
    /// Replace the client-supplied driver id with the authenticated
    /// one. Every update entering the broadcast or persistence path
    /// must pass through here first.
    pub fn stamped(mut self, user_id: i64) -> Self {
        self.driver_id = user_id;
        self
    }
}
