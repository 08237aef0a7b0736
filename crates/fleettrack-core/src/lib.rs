//! Shared vocabulary for the fleettrack location relay: connection
//! identities, roles, the wire-format location update, and the
//! authentication error taxonomy.

pub mod errors;
pub mod identity;
pub mod ids;
pub mod location;

pub use errors::AuthError;
pub use identity::{ClientInfo, Role};
pub use ids::ConnectionId;
pub use location::LocationUpdate;
