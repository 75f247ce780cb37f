//! WebSocket wire protocol: inbound discriminated union, validation hooks,
//! and outbound message envelopes.
//!
//! Inbound frames are UTF-8 JSON with a `type` discriminator. Outbound
//! builders return serialized JSON strings ready to write to the socket or
//! publish on a meeting channel.

use crate::models::{EngagementSnapshot, EngagementStatus, Meeting, Rollup};
use crate::summary::SummaryData;
use crate::timeutil::isoformat_utc;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Inbound ---

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WsRequest {
    Join {
        fingerprint: String,
    },
    Status {
        status: EngagementStatus,
    },
    Ping {
        #[serde(default)]
        client_time: Option<String>,
    },
}

/// Outcome of parsing an inbound text frame.
pub enum Parsed {
    Request(WsRequest),
    /// The frame was not valid JSON at all.
    InvalidJson,
    /// Valid JSON but not a known request shape.
    InvalidShape(String),
}

pub fn parse_request(text: &str) -> Parsed {
    let value: serde_json::Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(_) => return Parsed::InvalidJson,
    };
    match serde_json::from_value::<WsRequest>(value) {
        Ok(request) => Parsed::Request(request),
        Err(err) => Parsed::InvalidShape(err.to_string()),
    }
}

/// Meeting-state gate outcome for an inbound request.
#[derive(Debug, PartialEq, Eq)]
pub enum MeetingGate {
    NotStarted,
    Ended,
}

impl WsRequest {
    /// Meeting-state gate. Most requests need an active meeting; ping always
    /// passes so clients can keep time sync during countdown.
    pub fn validate_meeting(&self, meeting: &Meeting, now: DateTime<Utc>) -> Option<MeetingGate> {
        if matches!(self, WsRequest::Ping { .. }) {
            return None;
        }
        if !meeting.has_started(now) {
            return Some(MeetingGate::NotStarted);
        }
        if meeting.has_ended(now) {
            return Some(MeetingGate::Ended);
        }
        None
    }

    /// Participant-state gate: join once, report status only after joining.
    pub fn validate_participant(&self, joined: bool) -> Option<String> {
        match self {
            WsRequest::Join { .. } if joined => Some(error_message("Already joined")),
            WsRequest::Status { .. } if !joined => Some(error_message("Not joined")),
            _ => None,
        }
    }
}

// --- Outbound ---

#[derive(Debug, Serialize)]
struct JoinedMessage<'a> {
    r#type: &'static str,
    participant_id: &'a str,
    meeting_id: &'a str,
    snapshot: &'a EngagementSnapshot,
}

pub fn joined(participant_id: &str, meeting_id: &str, snapshot: &EngagementSnapshot) -> String {
    serde_json::to_string(&JoinedMessage {
        r#type: "joined",
        participant_id,
        meeting_id,
        snapshot,
    })
    .unwrap_or_else(|_| error_message("Internal error"))
}

#[derive(Debug, Serialize)]
struct DeltaMessage<'a> {
    r#type: &'static str,
    data: &'a Rollup,
}

/// Incremental engagement update broadcast to every subscriber.
pub fn delta(rollup: &Rollup) -> String {
    serde_json::to_string(&DeltaMessage {
        r#type: "delta",
        data: rollup,
    })
    .unwrap_or_else(|_| error_message("Internal error"))
}

pub fn pong(now: DateTime<Utc>) -> String {
    serde_json::json!({
        "type": "pong",
        "server_time": isoformat_utc(now),
    })
    .to_string()
}

pub fn error_message(message: &str) -> String {
    serde_json::json!({
        "type": "error",
        "message": message,
    })
    .to_string()
}

pub fn meeting_countdown(
    meeting: &Meeting,
    now: DateTime<Utc>,
    city_name: Option<String>,
    meeting_room_name: Option<String>,
) -> String {
    let mut payload = serde_json::json!({
        "type": "meeting_countdown",
        "meeting_id": meeting.id,
        "start_time": isoformat_utc(meeting.start_ts),
        "server_time": isoformat_utc(now),
    });
    if let Some(city) = city_name {
        payload["city_name"] = serde_json::Value::String(city);
    }
    if let Some(room) = meeting_room_name {
        payload["meeting_room_name"] = serde_json::Value::String(room);
    }
    payload.to_string()
}

/// Sent by the periodic broadcaster when a meeting crosses its start time.
pub fn meeting_started(meeting_id: &str) -> String {
    serde_json::json!({
        "type": "meeting_started",
        "meeting_id": meeting_id,
        "message": "The meeting has started.",
    })
    .to_string()
}

pub fn meeting_ended(end_time: String) -> String {
    serde_json::json!({
        "type": "meeting_ended",
        "message": "The meeting has ended.",
        "end_time": end_time,
    })
    .to_string()
}

#[derive(Debug, Serialize)]
struct MeetingEndedMessage {
    r#type: &'static str,
    message: &'static str,
    end_time: String,
    summary: SummaryData,
}

/// Terminal message carrying the persisted engagement summary.
pub fn meeting_ended_with_summary(end_time: String, summary: SummaryData) -> String {
    serde_json::to_string(&MeetingEndedMessage {
        r#type: "meeting_ended",
        message: "The meeting has ended.",
        end_time,
        summary,
    })
    .unwrap_or_else(|_| error_message("Internal error"))
}
