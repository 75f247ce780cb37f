use super::ts_column;
use crate::models::{Meeting, MeetingListItem, MsTeamsMeeting};
use crate::teams::ParsedTeams;
use crate::timeutil::{deterministic_meeting_id, isoformat_utc};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

pub const PAGE_SIZE: i64 = 20;

fn meeting_from_row(row: &Row<'_>) -> rusqlite::Result<Meeting> {
    Ok(Meeting {
        id: row.get(0)?,
        start_ts: ts_column(row, 1)?,
        end_ts: ts_column(row, 2)?,
        city_id: row.get(3)?,
        meeting_room_id: row.get(4)?,
        ms_teams_meeting_id: row.get(5)?,
        created_at: row.get(6)?,
    })
}

const MEETING_COLS: &str =
    "id, start_ts, end_ts, city_id, meeting_room_id, ms_teams_meeting_id, created_at";

/// Find or create the Teams meeting row for parsed invite data.
///
/// Deduplicates by `thread_id`, then `meeting_id`. Returns `None` when the
/// parsed input carries no identifiers at all.
pub fn get_or_create_teams(
    conn: &Connection,
    parsed: &ParsedTeams,
) -> rusqlite::Result<Option<MsTeamsMeeting>> {
    if parsed.is_empty() {
        return Ok(None);
    }

    let teams_from_row = |row: &Row<'_>| -> rusqlite::Result<MsTeamsMeeting> {
        Ok(MsTeamsMeeting {
            id: row.get(0)?,
            thread_id: row.get(1)?,
            meeting_id: row.get(2)?,
            invite_url: row.get(3)?,
            created_at: row.get(4)?,
        })
    };

    if let Some(thread_id) = &parsed.thread_id {
        let existing = conn
            .query_row(
                "SELECT id, thread_id, meeting_id, invite_url, created_at
                 FROM ms_teams_meetings WHERE thread_id = ?1",
                params![thread_id],
                teams_from_row,
            )
            .optional()?;
        if let Some(found) = existing {
            return Ok(Some(found));
        }
    }
    if let Some(meeting_id) = &parsed.meeting_id {
        let existing = conn
            .query_row(
                "SELECT id, thread_id, meeting_id, invite_url, created_at
                 FROM ms_teams_meetings WHERE meeting_id = ?1",
                params![meeting_id],
                teams_from_row,
            )
            .optional()?;
        if let Some(found) = existing {
            return Ok(Some(found));
        }
    }

    let record = MsTeamsMeeting {
        id: uuid::Uuid::new_v4().to_string(),
        thread_id: parsed.thread_id.clone(),
        meeting_id: parsed.meeting_id.clone(),
        invite_url: parsed.invite_url.clone(),
        created_at: isoformat_utc(Utc::now()),
    };
    conn.execute(
        "INSERT INTO ms_teams_meetings (id, thread_id, meeting_id, invite_url, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            &record.id,
            &record.thread_id,
            &record.meeting_id,
            &record.invite_url,
            &record.created_at
        ],
    )?;
    Ok(Some(record))
}

/// Atomic get-or-create keyed by the deterministic meeting id.
///
/// On conflict, null metadata columns are filled from the new row but values
/// already present are never overwritten. Returns `None` when neither a
/// Teams context nor a room id is available.
pub fn get_or_create(
    conn: &Connection,
    start_ts: DateTime<Utc>,
    end_ts: DateTime<Utc>,
    ms_teams_meeting_id: Option<&str>,
    meeting_room_id: Option<&str>,
    city_id: Option<&str>,
) -> rusqlite::Result<Option<Meeting>> {
    let Some(meeting_id) = deterministic_meeting_id(start_ts, ms_teams_meeting_id, meeting_room_id)
    else {
        return Ok(None);
    };

    conn.execute(
        "INSERT INTO meetings
             (id, start_ts, end_ts, city_id, meeting_room_id, ms_teams_meeting_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(id) DO UPDATE SET
             city_id = COALESCE(city_id, excluded.city_id),
             meeting_room_id = COALESCE(meeting_room_id, excluded.meeting_room_id),
             ms_teams_meeting_id = COALESCE(ms_teams_meeting_id, excluded.ms_teams_meeting_id)",
        params![
            &meeting_id,
            isoformat_utc(start_ts),
            isoformat_utc(end_ts),
            city_id,
            meeting_room_id,
            ms_teams_meeting_id,
            isoformat_utc(Utc::now()),
        ],
    )?;

    get_by_id(conn, &meeting_id)
}

pub fn get_by_id(conn: &Connection, meeting_id: &str) -> rusqlite::Result<Option<Meeting>> {
    conn.query_row(
        &format!("SELECT {MEETING_COLS} FROM meetings WHERE id = ?1"),
        params![meeting_id],
        meeting_from_row,
    )
    .optional()
}

/// Page of meetings ordered by start time descending, plus the total count.
pub fn list(conn: &Connection, page: i64) -> rusqlite::Result<(Vec<MeetingListItem>, i64)> {
    let page = page.max(1);
    let mut stmt = conn.prepare(
        "SELECT m.id, m.start_ts, m.end_ts,
                c.name AS city_name,
                r.name AS room_name,
                t.invite_url,
                (SELECT COUNT(*) FROM participants WHERE meeting_id = m.id) AS participant_count
         FROM meetings m
         LEFT JOIN cities c ON c.id = m.city_id
         LEFT JOIN meeting_rooms r ON r.id = m.meeting_room_id
         LEFT JOIN ms_teams_meetings t ON t.id = m.ms_teams_meeting_id
         ORDER BY m.start_ts DESC
         LIMIT ?1 OFFSET ?2",
    )?;
    let items = stmt
        .query_map(params![PAGE_SIZE, (page - 1) * PAGE_SIZE], |row| {
            Ok(MeetingListItem {
                id: row.get(0)?,
                start_ts: ts_column(row, 1)?,
                end_ts: ts_column(row, 2)?,
                city_name: row.get(3)?,
                meeting_room_name: row.get(4)?,
                ms_teams_invite_url: row.get(5)?,
                participant_count: row.get(6)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    let total: i64 = conn.query_row("SELECT COUNT(*) FROM meetings", [], |r| r.get(0))?;
    Ok((items, total))
}

/// Meetings where `start_ts <= now < end_ts`.
pub fn get_active(conn: &Connection, now: DateTime<Utc>) -> rusqlite::Result<Vec<Meeting>> {
    let now_str = isoformat_utc(now);
    let mut stmt = conn.prepare(&format!(
        "SELECT {MEETING_COLS} FROM meetings WHERE start_ts <= ?1 AND end_ts > ?1"
    ))?;
    let meetings = stmt
        .query_map(params![now_str], meeting_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(meetings)
}

/// Context names for countdown / summary payloads.
pub fn context_names(
    conn: &Connection,
    meeting: &Meeting,
) -> rusqlite::Result<(Option<String>, Option<String>)> {
    let city_name = match &meeting.city_id {
        Some(city_id) => conn
            .query_row(
                "SELECT name FROM cities WHERE id = ?1",
                params![city_id],
                |r| r.get(0),
            )
            .optional()?,
        None => None,
    };
    let room_name = match &meeting.meeting_room_id {
        Some(room_id) => conn
            .query_row(
                "SELECT name FROM meeting_rooms WHERE id = ?1",
                params![room_id],
                |r| r.get(0),
            )
            .optional()?,
        None => None,
    };
    Ok((city_name, room_name))
}

/// Invite URL of the meeting's Teams record, when present.
pub fn invite_url(conn: &Connection, meeting: &Meeting) -> rusqlite::Result<Option<String>> {
    match &meeting.ms_teams_meeting_id {
        Some(teams_id) => Ok(conn
            .query_row(
                "SELECT invite_url FROM ms_teams_meetings WHERE id = ?1",
                params![teams_id],
                |r| r.get::<_, Option<String>>(0),
            )
            .optional()?
            .flatten()),
        None => Ok(None),
    }
}
