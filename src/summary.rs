//! End-of-meeting summary computation and the `meeting_ended` envelope.

use crate::engagement::{self, smoothing::Smoothing};
use crate::models::{Meeting, MeetingSummary};
use crate::repos;
use crate::timeutil::isoformat_utc;
use rusqlite::Connection;
use serde::Serialize;

/// Meeting metadata embedded in the `meeting_ended` summary.
#[derive(Debug, Serialize)]
pub struct MeetingInfo {
    pub id: String,
    pub start_ts: String,
    pub end_ts: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_room_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ms_teams_invite_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SummaryData {
    pub meeting: MeetingInfo,
    pub duration_minutes: i64,
    pub max_participants: i64,
    pub normalized_engagement: f64,
    pub engagement_level: String,
}

/// Compute and persist the summary for an ended meeting.
///
/// Idempotent: the first watcher to fire computes and stores it, later
/// callers (and reconnecting clients) get the stored row back.
pub fn persist_summary(conn: &Connection, meeting: &Meeting) -> rusqlite::Result<MeetingSummary> {
    if let Some(existing) = repos::summaries::get(conn, &meeting.id)? {
        return Ok(existing);
    }

    let max_participants = repos::participants::max_count(conn, &meeting.id)?;
    let snapshot = engagement::build_snapshot(conn, meeting, meeting.end_ts, Smoothing::default())?;
    let raw = engagement::average_engagement(&snapshot);
    let normalized = engagement::normalize_engagement(raw, max_participants);
    let level = engagement::classify_level(normalized);

    repos::summaries::upsert(conn, &meeting.id, max_participants, normalized, level)
}

/// Assemble the `meeting_ended` summary payload from a persisted summary.
pub fn summary_data(
    conn: &Connection,
    meeting: &Meeting,
    summary: &MeetingSummary,
) -> rusqlite::Result<SummaryData> {
    let (city_name, meeting_room_name) = repos::meetings::context_names(conn, meeting)?;
    let ms_teams_invite_url = repos::meetings::invite_url(conn, meeting)?;
    Ok(SummaryData {
        meeting: MeetingInfo {
            id: meeting.id.clone(),
            start_ts: isoformat_utc(meeting.start_ts),
            end_ts: isoformat_utc(meeting.end_ts),
            city_name,
            meeting_room_name,
            ms_teams_invite_url,
        },
        duration_minutes: meeting.duration_minutes(),
        max_participants: summary.max_participants,
        normalized_engagement: summary.normalized_engagement,
        engagement_level: summary.engagement_level.clone(),
    })
}

/// Persist (or fetch) the summary and build the final broadcast payload.
pub fn finalize_meeting(conn: &Connection, meeting: &Meeting) -> rusqlite::Result<String> {
    let summary = persist_summary(conn, meeting)?;
    let data = summary_data(conn, meeting, &summary)?;
    Ok(crate::ws::protocol::meeting_ended_with_summary(
        isoformat_utc(meeting.end_ts),
        data,
    ))
}

/// `meeting_ended` payload for clients connecting after the end. Includes the
/// stored summary when one exists.
pub fn ended_payload_for_reconnect(
    conn: &Connection,
    meeting: &Meeting,
) -> rusqlite::Result<String> {
    match repos::summaries::get(conn, &meeting.id)? {
        Some(summary) => {
            let data = summary_data(conn, meeting, &summary)?;
            Ok(crate::ws::protocol::meeting_ended_with_summary(
                isoformat_utc(meeting.end_ts),
                data,
            ))
        }
        None => Ok(crate::ws::protocol::meeting_ended(isoformat_utc(
            meeting.end_ts,
        ))),
    }
}
