//! Periodic engagement broadcaster.
//!
//! A single background task that every `interval_seconds` publishes a rollup
//! delta for each active meeting and announces meetings crossing their start
//! time to waiting countdown clients. Runs on its own SQLite connection so
//! request handlers never contend with it for the shared handle.

use crate::channels::ChannelHub;
use crate::meetings;
use crate::timeutil::bucketize;
use crate::ws::{protocol, services};
use chrono::Utc;
use rusqlite::Connection;
use std::collections::HashSet;
use std::env;

pub const DEFAULT_INTERVAL_SECS: u64 = 10;

pub fn interval_from_env() -> u64 {
    env::var("BROADCAST_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_INTERVAL_SECS)
}

/// Spawns the broadcaster loop. Meetings already running at process start are
/// re-announced once; `meeting_started` is idempotent for clients.
pub fn spawn_broadcast_task(db_path: String, hub: ChannelHub, interval_secs: u64) {
    tokio::spawn(async move {
        let conn = match Connection::open(&db_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("⚠️ Broadcaster: failed to open DB: {e}");
                return;
            }
        };
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .ok();

        let mut notified_started: HashSet<String> = HashSet::new();

        loop {
            tokio::time::sleep(std::time::Duration::from_secs(interval_secs)).await;
            broadcast_tick(&conn, &hub, &mut notified_started);
        }
    });
}

/// One broadcast sweep over the active meetings. Failures are logged per
/// meeting and never stop the sweep.
pub fn broadcast_tick(conn: &Connection, hub: &ChannelHub, notified_started: &mut HashSet<String>) {
    let now = Utc::now();
    let active = match meetings::get_active(conn, now) {
        Ok(meetings) => meetings,
        Err(e) => {
            eprintln!("⚠️ Broadcaster: active-meeting query failed: {e}");
            return;
        }
    };

    for meeting in active {
        if !notified_started.contains(&meeting.id) {
            hub.publish(&meeting.id, protocol::meeting_started(&meeting.id));
            notified_started.insert(meeting.id.clone());
        }

        if let Err(e) = services::publish_rollup(conn, hub, &meeting, bucketize(now)) {
            eprintln!("⚠️ Broadcaster: rollup for meeting {} failed: {e}", meeting.id);
        }
    }
}
