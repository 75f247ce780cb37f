use super::ts_column;
use crate::models::EngagementSample;
use crate::timeutil::isoformat_utc;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, params};

fn sample_from_row(row: &Row<'_>) -> rusqlite::Result<EngagementSample> {
    Ok(EngagementSample {
        id: row.get(0)?,
        meeting_id: row.get(1)?,
        participant_id: row.get(2)?,
        bucket: ts_column(row, 3)?,
        status: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Last write wins per `(participant, bucket)`.
pub fn upsert_sample(
    conn: &Connection,
    meeting_id: &str,
    participant_id: &str,
    bucket: DateTime<Utc>,
    status: &str,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO engagement_samples (meeting_id, participant_id, bucket, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(participant_id, bucket) DO UPDATE SET
             status = excluded.status,
             created_at = excluded.created_at",
        params![
            meeting_id,
            participant_id,
            isoformat_utc(bucket),
            status,
            isoformat_utc(Utc::now())
        ],
    )?;
    Ok(())
}

/// Samples for a meeting ordered by bucket, optionally bounded inclusively.
pub fn list_samples(
    conn: &Connection,
    meeting_id: &str,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> rusqlite::Result<Vec<EngagementSample>> {
    let mut sql = String::from(
        "SELECT id, meeting_id, participant_id, bucket, status, created_at
         FROM engagement_samples WHERE meeting_id = ?1",
    );
    let mut args: Vec<String> = vec![meeting_id.to_string()];
    if let Some(start) = start {
        args.push(isoformat_utc(start));
        sql.push_str(&format!(" AND bucket >= ?{}", args.len()));
    }
    if let Some(end) = end {
        args.push(isoformat_utc(end));
        sql.push_str(&format!(" AND bucket <= ?{}", args.len()));
    }
    sql.push_str(" ORDER BY bucket ASC, id ASC");

    let mut stmt = conn.prepare(&sql)?;
    let samples = stmt
        .query_map(rusqlite::params_from_iter(args.iter()), sample_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(samples)
}
