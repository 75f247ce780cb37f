use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// --- Entities ---

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct City {
    pub id: String,
    pub name: String,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MeetingRoom {
    pub id: String,
    pub name: String,
    pub city_id: String,
    pub created_at: String,
}

/// A deduplicated Microsoft Teams meeting reference. At least one of the
/// three identifier fields is set.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MsTeamsMeeting {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invite_url: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Meeting {
    /// Deterministic 36-char hex id derived from slot start + context.
    pub id: String,
    pub start_ts: DateTime<Utc>,
    pub end_ts: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_room_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ms_teams_meeting_id: Option<String>,
    pub created_at: String,
}

impl Meeting {
    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        now >= self.start_ts
    }

    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        now >= self.end_ts
    }

    /// Active means started but not yet ended.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.has_started(now) && !self.has_ended(now)
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end_ts - self.start_ts).num_minutes()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Participant {
    pub id: String,
    pub meeting_id: String,
    pub device_fingerprint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen_at: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EngagementSample {
    pub id: i64,
    pub meeting_id: String,
    pub participant_id: String,
    pub bucket: DateTime<Utc>,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MeetingSummary {
    pub meeting_id: String,
    pub max_participants: i64,
    pub normalized_engagement: f64,
    pub engagement_level: String,
    pub computed_at: String,
}

// --- Engagement status ---

/// Participant engagement status as reported over the WebSocket.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EngagementStatus {
    Speaking,
    Engaged,
    Disengaged,
}

impl EngagementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngagementStatus::Speaking => "speaking",
            EngagementStatus::Engaged => "engaged",
            EngagementStatus::Disengaged => "disengaged",
        }
    }
}

/// Binary engagement projection: speaking and engaged count, anything else
/// (including unknown strings from older rows) does not.
pub fn engaged_flag(status: &str) -> u8 {
    if status == "speaking" || status == "engaged" { 1 } else { 0 }
}

// --- Engagement series payloads ---

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EngagementPoint {
    pub bucket: DateTime<Utc>,
    pub value: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ParticipantSeries {
    pub participant_id: String,
    pub device_fingerprint: String,
    pub series: Vec<EngagementPoint>,
}

/// Full engagement time-series for a meeting, from slot start to
/// `min(end, now)`. Sent only to a joining client, never broadcast.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EngagementSnapshot {
    pub meeting_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub bucket_minutes: i64,
    pub participants: Vec<ParticipantSeries>,
    pub overall: Vec<EngagementPoint>,
}

/// Current-state rollup at a single bucket: each participant's last known
/// status projected to 0/100, plus the mean.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Rollup {
    pub meeting_id: String,
    pub bucket: DateTime<Utc>,
    pub overall: f64,
    pub participants: HashMap<String, f64>,
}

// --- HTTP request/response bodies ---

fn default_duration() -> i64 {
    60
}

#[derive(Debug, Deserialize)]
pub struct VisitRequest {
    #[serde(default)]
    pub ms_teams_input: Option<String>,
    #[serde(default)]
    pub city_id: Option<String>,
    #[serde(default)]
    pub meeting_room_id: Option<String>,
    #[serde(default = "default_duration")]
    pub duration_minutes: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VisitResponse {
    pub meeting_id: String,
    pub meeting_start: String,
    pub meeting_end: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateCity {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateMeetingRoom {
    pub name: String,
    pub city_id: String,
}

/// Meeting list item enriched with context names for display.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MeetingListItem {
    pub id: String,
    pub start_ts: DateTime<Utc>,
    pub end_ts: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_room_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ms_teams_invite_url: Option<String>,
    pub participant_count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MeetingListResponse {
    pub items: Vec<MeetingListItem>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

/// Participant entry in the meeting detail view.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ParticipantDetail {
    pub id: String,
    pub device_fingerprint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen_at: Option<String>,
    pub sample_count: i64,
}
