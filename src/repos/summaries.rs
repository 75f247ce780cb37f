use crate::models::MeetingSummary;
use crate::timeutil::isoformat_utc;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};

pub fn get(conn: &Connection, meeting_id: &str) -> rusqlite::Result<Option<MeetingSummary>> {
    conn.query_row(
        "SELECT meeting_id, max_participants, normalized_engagement, engagement_level, computed_at
         FROM meeting_summaries WHERE meeting_id = ?1",
        params![meeting_id],
        |row| {
            Ok(MeetingSummary {
                meeting_id: row.get(0)?,
                max_participants: row.get(1)?,
                normalized_engagement: row.get(2)?,
                engagement_level: row.get(3)?,
                computed_at: row.get(4)?,
            })
        },
    )
    .optional()
}

pub fn upsert(
    conn: &Connection,
    meeting_id: &str,
    max_participants: i64,
    normalized_engagement: f64,
    engagement_level: &str,
) -> rusqlite::Result<MeetingSummary> {
    let summary = MeetingSummary {
        meeting_id: meeting_id.to_string(),
        max_participants,
        normalized_engagement,
        engagement_level: engagement_level.to_string(),
        computed_at: isoformat_utc(Utc::now()),
    };
    conn.execute(
        "INSERT INTO meeting_summaries
             (meeting_id, max_participants, normalized_engagement, engagement_level, computed_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(meeting_id) DO UPDATE SET
             max_participants = excluded.max_participants,
             normalized_engagement = excluded.normalized_engagement,
             engagement_level = excluded.engagement_level,
             computed_at = excluded.computed_at",
        params![
            &summary.meeting_id,
            summary.max_participants,
            summary.normalized_engagement,
            &summary.engagement_level,
            &summary.computed_at
        ],
    )?;
    Ok(summary)
}
