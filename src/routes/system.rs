use crate::db::Db;
use crate::timeutil::isoformat_utc;
use rocket::serde::json::Json;
use rocket::{State, get};

#[get("/health")]
pub fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "meeting-pulse",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[get("/stats")]
pub fn stats(db: &State<Db>) -> Json<serde_json::Value> {
    let conn = db.conn();
    let now = isoformat_utc(chrono::Utc::now());

    let meetings: i64 = conn
        .query_row("SELECT COUNT(*) FROM meetings", [], |r| r.get(0))
        .unwrap_or(0);
    let active_meetings: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM meetings WHERE start_ts <= ?1 AND end_ts > ?1",
            [&now],
            |r| r.get(0),
        )
        .unwrap_or(0);
    let participants: i64 = conn
        .query_row("SELECT COUNT(*) FROM participants", [], |r| r.get(0))
        .unwrap_or(0);
    let samples: i64 = conn
        .query_row("SELECT COUNT(*) FROM engagement_samples", [], |r| r.get(0))
        .unwrap_or(0);
    let summaries: i64 = conn
        .query_row("SELECT COUNT(*) FROM meeting_summaries", [], |r| r.get(0))
        .unwrap_or(0);

    Json(serde_json::json!({
        "meetings": meetings,
        "active_meetings": active_meetings,
        "participants": participants,
        "engagement_samples": samples,
        "meeting_summaries": summaries,
    }))
}
