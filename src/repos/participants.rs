use crate::models::{Participant, ParticipantDetail};
use crate::timeutil::isoformat_utc;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

fn participant_from_row(row: &Row<'_>) -> rusqlite::Result<Participant> {
    Ok(Participant {
        id: row.get(0)?,
        meeting_id: row.get(1)?,
        device_fingerprint: row.get(2)?,
        last_status: row.get(3)?,
        last_seen_at: row.get(4)?,
        created_at: row.get(5)?,
    })
}

const PARTICIPANT_COLS: &str =
    "id, meeting_id, device_fingerprint, last_status, last_seen_at, created_at";

pub fn get(conn: &Connection, participant_id: &str) -> rusqlite::Result<Option<Participant>> {
    conn.query_row(
        &format!("SELECT {PARTICIPANT_COLS} FROM participants WHERE id = ?1"),
        params![participant_id],
        participant_from_row,
    )
    .optional()
}

/// The same fingerprint inside the same meeting maps to one row, so a
/// reconnecting device (or second tab) resumes its participant.
pub fn find_by_fingerprint(
    conn: &Connection,
    meeting_id: &str,
    fingerprint: &str,
) -> rusqlite::Result<Option<Participant>> {
    conn.query_row(
        &format!(
            "SELECT {PARTICIPANT_COLS} FROM participants
             WHERE meeting_id = ?1 AND device_fingerprint = ?2"
        ),
        params![meeting_id, fingerprint],
        participant_from_row,
    )
    .optional()
}

pub fn create(
    conn: &Connection,
    meeting_id: &str,
    fingerprint: &str,
    now: DateTime<Utc>,
) -> rusqlite::Result<Participant> {
    let participant = Participant {
        id: uuid::Uuid::new_v4().to_string(),
        meeting_id: meeting_id.to_string(),
        device_fingerprint: fingerprint.to_string(),
        last_status: None,
        last_seen_at: Some(isoformat_utc(now)),
        created_at: isoformat_utc(now),
    };
    conn.execute(
        "INSERT INTO participants
             (id, meeting_id, device_fingerprint, last_status, last_seen_at, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            &participant.id,
            &participant.meeting_id,
            &participant.device_fingerprint,
            &participant.last_status,
            &participant.last_seen_at,
            &participant.created_at
        ],
    )?;
    Ok(participant)
}

pub fn list_for_meeting(conn: &Connection, meeting_id: &str) -> rusqlite::Result<Vec<Participant>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PARTICIPANT_COLS} FROM participants WHERE meeting_id = ?1 ORDER BY created_at"
    ))?;
    let participants = stmt
        .query_map(params![meeting_id], participant_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(participants)
}

/// Participants with their recorded sample counts, for the meeting detail view.
pub fn list_with_engagement(
    conn: &Connection,
    meeting_id: &str,
) -> rusqlite::Result<Vec<ParticipantDetail>> {
    let mut stmt = conn.prepare(
        "SELECT p.id, p.device_fingerprint, p.last_status, p.last_seen_at,
                (SELECT COUNT(*) FROM engagement_samples WHERE participant_id = p.id)
         FROM participants p WHERE p.meeting_id = ?1 ORDER BY p.created_at",
    )?;
    let participants = stmt
        .query_map(params![meeting_id], |row| {
            Ok(ParticipantDetail {
                id: row.get(0)?,
                device_fingerprint: row.get(1)?,
                last_status: row.get(2)?,
                last_seen_at: row.get(3)?,
                sample_count: row.get(4)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(participants)
}

pub fn update_last_status(
    conn: &Connection,
    participant_id: &str,
    status: &str,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE participants SET last_status = ?1 WHERE id = ?2",
        params![status, participant_id],
    )?;
    Ok(())
}

pub fn touch_last_seen(
    conn: &Connection,
    participant_id: &str,
    now: DateTime<Utc>,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE participants SET last_seen_at = ?1 WHERE id = ?2",
        params![isoformat_utc(now), participant_id],
    )?;
    Ok(())
}

/// Highest participant count the meeting has seen. Participant rows are never
/// deleted while a meeting lives, so the row count is the maximum.
pub fn max_count(conn: &Connection, meeting_id: &str) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM participants WHERE meeting_id = ?1",
        params![meeting_id],
        |r| r.get(0),
    )
}
