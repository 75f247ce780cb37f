//! Meeting slot computation and idempotent discovery.

use crate::models::Meeting;
use crate::repos;
use crate::teams::{self, ParsedTeams};
use crate::timeutil::snap_to_half_hour;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rusqlite::Connection;

/// Failure resolving a visit into a meeting.
#[derive(Debug)]
pub enum VisitError {
    /// Neither a Teams context nor a meeting room was supplied.
    MissingContext,
    /// `duration_minutes` outside the supported slot lengths.
    InvalidDuration(i64),
    Db(rusqlite::Error),
}

impl std::fmt::Display for VisitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VisitError::MissingContext => {
                write!(f, "Either ms_teams_input or meeting_room_id is required")
            }
            VisitError::InvalidDuration(minutes) => {
                write!(f, "duration_minutes must be 30 or 60 (got {minutes})")
            }
            VisitError::Db(err) => write!(f, "{err}"),
        }
    }
}

impl From<rusqlite::Error> for VisitError {
    fn from(err: rusqlite::Error) -> Self {
        VisitError::Db(err)
    }
}

/// Resolve `now` plus a context into the meeting for the current slot.
///
/// The slot start is `now` snapped to the nearest half-hour in the caller's
/// timezone, stored as UTC. Repeat calls inside the same slot with the same
/// context return the same meeting (deterministic id upsert).
pub fn ensure_meeting<Tz: TimeZone>(
    conn: &Connection,
    now: DateTime<Tz>,
    ms_teams_input: Option<&str>,
    meeting_room_id: Option<&str>,
    city_id: Option<&str>,
    duration_minutes: i64,
) -> Result<Meeting, VisitError> {
    if duration_minutes != 30 && duration_minutes != 60 {
        return Err(VisitError::InvalidDuration(duration_minutes));
    }

    let parsed = teams::parse_teams_input(ms_teams_input);
    let room_id = meeting_room_id.map(str::trim).filter(|r| !r.is_empty());
    if parsed.is_empty() && room_id.is_none() {
        return Err(VisitError::MissingContext);
    }

    let start_ts: DateTime<Utc> = snap_to_half_hour(now).with_timezone(&Utc);
    let end_ts = start_ts + Duration::minutes(duration_minutes);

    create_for_slot(conn, start_ts, end_ts, &parsed, room_id, city_id)
}

/// Upsert the meeting for an already-computed slot.
fn create_for_slot(
    conn: &Connection,
    start_ts: DateTime<Utc>,
    end_ts: DateTime<Utc>,
    parsed: &ParsedTeams,
    meeting_room_id: Option<&str>,
    city_id: Option<&str>,
) -> Result<Meeting, VisitError> {
    let teams_record = repos::meetings::get_or_create_teams(conn, parsed)?;
    let teams_id = teams_record.as_ref().map(|t| t.id.as_str());

    repos::meetings::get_or_create(conn, start_ts, end_ts, teams_id, meeting_room_id, city_id)?
        .ok_or(VisitError::MissingContext)
}

/// Page of meetings for the listing endpoint (20 per page).
pub fn list_meetings(
    conn: &Connection,
    page: i64,
) -> rusqlite::Result<(Vec<crate::models::MeetingListItem>, i64)> {
    repos::meetings::list(conn, page)
}

/// Meetings whose window contains `now`. Used by the periodic broadcaster.
pub fn get_active(conn: &Connection, now: DateTime<Utc>) -> rusqlite::Result<Vec<Meeting>> {
    repos::meetings::get_active(conn, now)
}
