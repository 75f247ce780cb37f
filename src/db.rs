use rusqlite::Connection;
use std::sync::{Arc, Mutex, MutexGuard};

/// Process-wide SQLite handle. Cloned into WebSocket connection tasks; every
/// statement runs under the mutex, so SQLite never sees concurrent writers.
#[derive(Clone)]
pub struct Db {
    conn: Arc<Mutex<Connection>>,
}

impl Db {
    pub fn new(path: &str) -> Self {
        let conn = Connection::open(path).expect("Failed to open database");
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .expect("Failed to set pragmas");
        let db = Db {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.migrate();
        db
    }

    pub fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn migrate(&self) {
        let conn = self.conn();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS cities (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS meeting_rooms (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                city_id TEXT NOT NULL REFERENCES cities(id),
                created_at TEXT NOT NULL,
                UNIQUE(name, city_id)
            );

            CREATE TABLE IF NOT EXISTS ms_teams_meetings (
                id TEXT PRIMARY KEY,
                thread_id TEXT,
                meeting_id TEXT,
                invite_url TEXT,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_teams_thread ON ms_teams_meetings(thread_id);
            CREATE INDEX IF NOT EXISTS idx_teams_meeting ON ms_teams_meetings(meeting_id);

            CREATE TABLE IF NOT EXISTS meetings (
                id TEXT PRIMARY KEY,
                start_ts TEXT NOT NULL,
                end_ts TEXT NOT NULL,
                city_id TEXT REFERENCES cities(id),
                meeting_room_id TEXT REFERENCES meeting_rooms(id),
                ms_teams_meeting_id TEXT REFERENCES ms_teams_meetings(id),
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_meetings_start ON meetings(start_ts);
            CREATE INDEX IF NOT EXISTS idx_meetings_window ON meetings(start_ts, end_ts);

            CREATE TABLE IF NOT EXISTS participants (
                id TEXT PRIMARY KEY,
                meeting_id TEXT NOT NULL REFERENCES meetings(id) ON DELETE CASCADE,
                device_fingerprint TEXT NOT NULL,
                last_status TEXT,
                last_seen_at TEXT,
                created_at TEXT NOT NULL,
                UNIQUE(meeting_id, device_fingerprint)
            );
            CREATE INDEX IF NOT EXISTS idx_participants_meeting ON participants(meeting_id);

            CREATE TABLE IF NOT EXISTS engagement_samples (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                meeting_id TEXT NOT NULL REFERENCES meetings(id) ON DELETE CASCADE,
                participant_id TEXT NOT NULL REFERENCES participants(id) ON DELETE CASCADE,
                bucket TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE(participant_id, bucket)
            );
            CREATE INDEX IF NOT EXISTS idx_samples_meeting_bucket
                ON engagement_samples(meeting_id, bucket);

            CREATE TABLE IF NOT EXISTS meeting_summaries (
                meeting_id TEXT PRIMARY KEY REFERENCES meetings(id) ON DELETE CASCADE,
                max_participants INTEGER NOT NULL,
                normalized_engagement REAL NOT NULL,
                engagement_level TEXT NOT NULL,
                computed_at TEXT NOT NULL
            );",
        )
        .expect("Failed to run migrations");
    }
}
