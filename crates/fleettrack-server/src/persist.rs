//! Fire-and-forget persistence boundary between the ingest loop and
//! the location store.

use std::sync::Arc;

use tracing::error;

use fleettrack_core::LocationUpdate;
use fleettrack_store::LocationStore;

/// Persist one update without blocking the caller. The spawned task
/// is untracked; the ingest loop never learns the outcome.
pub fn spawn_persist(store: Arc<dyn LocationStore>, update: LocationUpdate) {
    tokio::task::spawn_blocking(move || persist(store.as_ref(), &update));
}

/// Run both store operations; each failure is logged independently
/// and never propagated to the connection or the broadcast path.
pub(crate) fn persist(store: &dyn LocationStore, update: &LocationUpdate) {
    if let Err(e) = store.upsert_current(update.driver_id, update.lat, update.lng) {
        error!(driver_id = update.driver_id, error = %e, "failed to update current position");
    }
    if let Err(e) = store.append_history(update.driver_id, update.lat, update.lng) {
        error!(driver_id = update.driver_id, error = %e, "failed to append location history");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleettrack_store::StoreError;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingStore {
        calls: Mutex<Vec<(&'static str, i64, f64, f64)>>,
        fail_current: bool,
    }

    impl LocationStore for RecordingStore {
        fn upsert_current(&self, driver_id: i64, lat: f64, lng: f64) -> Result<(), StoreError> {
            self.calls
                .lock()
                .unwrap()
                .push(("current", driver_id, lat, lng));
            if self.fail_current {
                Err(StoreError::Database("boom".into()))
            } else {
                Ok(())
            }
        }

        fn append_history(&self, driver_id: i64, lat: f64, lng: f64) -> Result<(), StoreError> {
            self.calls
                .lock()
                .unwrap()
                .push(("history", driver_id, lat, lng));
            Ok(())
        }
    }

    #[test]
    fn persist_calls_both_operations_with_stamped_values() {
        let store = RecordingStore::default();
        let update = LocationUpdate {
            driver_id: 42,
            lat: 10.0,
            lng: 20.0,
        };

        persist(&store, &update);

        let calls = store.calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![("current", 42, 10.0, 20.0), ("history", 42, 10.0, 20.0)]
        );
    }

    #[test]
    fn current_failure_does_not_skip_history() {
        let store = RecordingStore {
            fail_current: true,
            ..Default::default()
        };
        let update = LocationUpdate {
            driver_id: 42,
            lat: 10.0,
            lng: 20.0,
        };

        persist(&store, &update);

        let calls = store.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].0, "history");
    }

    #[tokio::test]
    async fn spawn_persist_runs_off_the_caller() {
        let store = Arc::new(RecordingStore::default());
        let update = LocationUpdate {
            driver_id: 7,
            lat: 1.0,
            lng: 2.0,
        };

        spawn_persist(store.clone(), update);

        // Fire-and-forget: poll until the blocking task lands.
        for _ in 0..100 {
            if store.calls.lock().unwrap().len() == 2 {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("persistence task did not run");
    }
}
