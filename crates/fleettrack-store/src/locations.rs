use chrono::Utc;

use crate::database::Database;
use crate::error::StoreError;

/// The two-operation persistence contract the relay core depends on.
///
/// Each call is synchronous and independently fallible; the relay
/// invokes both off its hot path and only logs failures. Implemented
/// by [`LocationRepo`]; tests substitute recording stubs.
pub trait LocationStore: Send + Sync {
    /// Set the current position for a driver to (lat, lng) as of now.
    fn upsert_current(&self, driver_id: i64, lat: f64, lng: f64) -> Result<(), StoreError>;

    /// Append (driver, lat, lng, now) to the history trail.
    fn append_history(&self, driver_id: i64, lat: f64, lng: f64) -> Result<(), StoreError>;
}

/// SQLite-backed location store.
pub struct LocationRepo {
    db: Database,
}

impl LocationRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Latest known position for a driver, if any. Used by tests and
    /// operational tooling; the relay itself never reads.
    pub fn current_position(&self, driver_id: i64) -> Result<Option<(f64, f64)>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT current_lat, current_lng FROM drivers WHERE id = ?1")?;
            let mut rows = stmt.query([driver_id])?;
            match rows.next()? {
                Some(row) => Ok(Some((row.get(0)?, row.get(1)?))),
                None => Ok(None),
            }
        })
    }

    /// Number of history rows recorded for a driver.
    pub fn history_count(&self, driver_id: i64) -> Result<i64, StoreError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM location_history WHERE driver_id = ?1",
                [driver_id],
                |row| row.get(0),
            )
            .map_err(StoreError::from)
        })
    }
}

impl LocationStore for LocationRepo {
    fn upsert_current(&self, driver_id: i64, lat: f64, lng: f64) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO drivers (id, current_lat, current_lng, last_location_update)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                     current_lat = excluded.current_lat,
                     current_lng = excluded.current_lng,
                     last_location_update = excluded.last_location_update",
                rusqlite::params![driver_id, lat, lng, now],
            )?;
            Ok(())
        })
    }

    fn append_history(&self, driver_id: i64, lat: f64, lng: f64) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO location_history (driver_id, lat, lng, recorded_at)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![driver_id, lat, lng, now],
            )?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn repo() -> LocationRepo {
        LocationRepo::new(Database::in_memory().unwrap())
    }

    #[test]
    fn upsert_inserts_then_updates_in_place() {
        let repo = repo();
        repo.upsert_current(42, 10.0, 20.0).unwrap();
        assert_eq!(repo.current_position(42).unwrap(), Some((10.0, 20.0)));

        repo.upsert_current(42, 11.0, 21.0).unwrap();
        assert_eq!(repo.current_position(42).unwrap(), Some((11.0, 21.0)));

        // Still one row, not two.
        let rows: i64 = repo
            .db
            .with_conn(|conn| {
                conn.query_row("SELECT COUNT(*) FROM drivers", [], |row| row.get(0))
                    .map_err(StoreError::from)
            })
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn history_appends() {
        let repo = repo();
        repo.append_history(42, 10.0, 20.0).unwrap();
        repo.append_history(42, 11.0, 21.0).unwrap();
        repo.append_history(7, 1.0, 2.0).unwrap();

        assert_eq!(repo.history_count(42).unwrap(), 2);
        assert_eq!(repo.history_count(7).unwrap(), 1);
        assert_eq!(repo.history_count(999).unwrap(), 0);
    }

    #[test]
    fn unknown_driver_has_no_position() {
        let repo = repo();
        assert_eq!(repo.current_position(1).unwrap(), None);
    }

    #[test]
    fn usable_as_trait_object() {
        let store: Arc<dyn LocationStore> = Arc::new(repo());
        store.upsert_current(1, 0.5, 0.5).unwrap();
        store.append_history(1, 0.5, 0.5).unwrap();
    }

    #[test]
    fn operations_fail_independently() {
        let repo = repo();
        // Drop the history table so only that operation fails.
        repo.db
            .with_conn(|conn| {
                conn.execute_batch("DROP TABLE location_history")
                    .map_err(StoreError::from)
            })
            .unwrap();

        assert!(repo.upsert_current(42, 10.0, 20.0).is_ok());
        assert!(repo.append_history(42, 10.0, 20.0).is_err());
        assert_eq!(repo.current_position(42).unwrap(), Some((10.0, 20.0)));
    }
}
