/// SQL DDL for the fleettrack store. All statements are idempotent;
/// the schema is small enough that there is no migration machinery.
pub const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS drivers (
    id INTEGER PRIMARY KEY,
    current_lat REAL NOT NULL,
    current_lng REAL NOT NULL,
    last_location_update TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS location_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    driver_id INTEGER NOT NULL,
    lat REAL NOT NULL,
    lng REAL NOT NULL,
    recorded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_history_driver ON location_history(driver_id);
CREATE INDEX IF NOT EXISTS idx_history_driver_time ON location_history(driver_id, recorded_at);
"#;

pub const PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA busy_timeout = 5000;
PRAGMA synchronous = NORMAL;
"#;
