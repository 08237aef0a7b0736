//! Durable storage for driver positions: the latest fix per driver,
//! upserted in place, and an append-only history trail. Both
//! operations are independently fallible; callers treat them as
//! fire-and-forget and log failures.

pub mod database;
pub mod error;
pub mod locations;
pub mod schema;

pub use database::Database;
pub use error::StoreError;
pub use locations::{LocationRepo, LocationStore};
