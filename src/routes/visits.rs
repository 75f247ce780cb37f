use crate::db::Db;
use crate::meetings::{self, VisitError};
use crate::models::{VisitRequest, VisitResponse};
use crate::timeutil::isoformat_utc;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{State, post};

/// Resolve the current half-hour slot plus a context (Teams link/ID or
/// physical room) into a meeting. Idempotent: repeating the call inside the
/// same slot with the same context returns the same meeting id.
#[post("/visit", format = "json", data = "<body>")]
pub fn visit(
    db: &State<Db>,
    body: Json<VisitRequest>,
) -> Result<Json<VisitResponse>, (Status, Json<serde_json::Value>)> {
    // Snap in the caller's local timezone, store as UTC
    let now = chrono::Local::now();
    let conn = db.conn();

    let meeting = meetings::ensure_meeting(
        &conn,
        now,
        body.ms_teams_input.as_deref(),
        body.meeting_room_id.as_deref(),
        body.city_id.as_deref(),
        body.duration_minutes,
    )
    .map_err(|e| match e {
        VisitError::MissingContext | VisitError::InvalidDuration(_) => (
            Status::BadRequest,
            Json(serde_json::json!({"error": e.to_string()})),
        ),
        VisitError::Db(err) => (
            Status::InternalServerError,
            Json(serde_json::json!({"error": err.to_string()})),
        ),
    })?;

    Ok(Json(VisitResponse {
        meeting_id: meeting.id.clone(),
        meeting_start: isoformat_utc(meeting.start_ts),
        meeting_end: isoformat_utc(meeting.end_ts),
    }))
}
