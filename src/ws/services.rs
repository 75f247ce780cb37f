//! WebSocket message services: join, status, ping, leave, and the router
//! that dispatches validated requests onto them.

use super::protocol::{self, MeetingGate, Parsed, WsRequest};
use crate::channels::ChannelHub;
use crate::db::Db;
use crate::engagement::{self, RecordError, smoothing::Smoothing};
use crate::models::Meeting;
use crate::repos;
use crate::timeutil::bucketize;
use chrono::{DateTime, Utc};

/// Per-connection state shared by the services.
pub struct WsContext {
    pub meeting: Meeting,
    pub participant_id: Option<String>,
}

impl WsContext {
    pub fn new(meeting: Meeting) -> Self {
        WsContext {
            meeting,
            participant_id: None,
        }
    }
}

/// Compute the rollup at `bucket` and publish it as a delta on the meeting's
/// channel. Used by join, status, leave, and the periodic broadcaster.
pub fn publish_rollup(
    conn: &rusqlite::Connection,
    hub: &ChannelHub,
    meeting: &Meeting,
    bucket: DateTime<Utc>,
) -> rusqlite::Result<()> {
    let rollup = engagement::bucket_rollup(conn, meeting, bucket)?;
    hub.publish(&meeting.id, protocol::delta(&rollup));
    Ok(())
}

/// Route one inbound text frame. Returns the direct response to write back,
/// or `None` when the request only produces channel broadcasts.
pub fn route_text(text: &str, db: &Db, hub: &ChannelHub, ctx: &mut WsContext) -> Option<String> {
    let request = match protocol::parse_request(text) {
        Parsed::Request(request) => request,
        Parsed::InvalidJson => return Some(protocol::error_message("Invalid JSON")),
        Parsed::InvalidShape(detail) => {
            return Some(protocol::error_message(&format!(
                "Invalid request: {detail}"
            )));
        }
    };

    let now = Utc::now();

    if let Some(gate) = request.validate_meeting(&ctx.meeting, now) {
        return Some(match gate {
            MeetingGate::NotStarted => {
                let conn = db.conn();
                let (city, room) = repos::meetings::context_names(&conn, &ctx.meeting)
                    .unwrap_or((None, None));
                protocol::meeting_countdown(&ctx.meeting, now, city, room)
            }
            MeetingGate::Ended => {
                protocol::meeting_ended(crate::timeutil::isoformat_utc(ctx.meeting.end_ts))
            }
        });
    }

    if let Some(error) = request.validate_participant(ctx.participant_id.is_some()) {
        return Some(error);
    }

    match request {
        WsRequest::Join { fingerprint } => Some(join(db, hub, ctx, &fingerprint, now)),
        WsRequest::Status { status } => status_update(db, hub, ctx, status.as_str(), now),
        WsRequest::Ping { .. } => Some(ping(db, ctx, now)),
    }
}

/// Join: create or reuse the participant for this fingerprint, answer with
/// the full snapshot, and broadcast a delta so other clients see the joiner.
fn join(db: &Db, hub: &ChannelHub, ctx: &mut WsContext, fingerprint: &str, now: DateTime<Utc>) -> String {
    let fingerprint = fingerprint.trim();
    if fingerprint.is_empty() {
        return protocol::error_message("Invalid request: fingerprint cannot be empty");
    }

    let result = {
        let conn = db.conn();
        repos::participants::find_by_fingerprint(&conn, &ctx.meeting.id, fingerprint)
            .and_then(|found| match found {
                Some(existing) => {
                    repos::participants::touch_last_seen(&conn, &existing.id, now)?;
                    Ok(existing)
                }
                None => repos::participants::create(&conn, &ctx.meeting.id, fingerprint, now),
            })
            .and_then(|participant| {
                let snapshot =
                    engagement::build_snapshot(&conn, &ctx.meeting, now, Smoothing::default())?;
                Ok((participant, snapshot))
            })
    };

    match result {
        Ok((participant, snapshot)) => {
            ctx.participant_id = Some(participant.id.clone());
            // Delta first so existing subscribers learn about the joiner;
            // the snapshot goes only to the joining client.
            let conn = db.conn();
            if let Err(e) = publish_rollup(&conn, hub, &ctx.meeting, bucketize(now)) {
                eprintln!("⚠️ Join delta broadcast failed for {}: {e}", ctx.meeting.id);
            }
            println!(
                "👋 Participant {} joined meeting {}",
                participant.id, ctx.meeting.id
            );
            protocol::joined(&participant.id, &ctx.meeting.id, &snapshot)
        }
        Err(e) => {
            eprintln!("⚠️ Join failed for meeting {}: {e}", ctx.meeting.id);
            protocol::error_message("Join failed")
        }
    }
}

/// Status: write the sample into the current minute bucket and broadcast the
/// resulting rollup. No direct response on success.
fn status_update(
    db: &Db,
    hub: &ChannelHub,
    ctx: &mut WsContext,
    status: &str,
    now: DateTime<Utc>,
) -> Option<String> {
    let participant_id = ctx.participant_id.clone()?;

    let conn = db.conn();
    let bucket = match engagement::record_status(&conn, &ctx.meeting, &participant_id, status, now)
    {
        Ok(bucket) => bucket,
        Err(RecordError::OutOfBounds { .. }) => {
            return Some(protocol::error_message(
                "Status recorded outside meeting bounds",
            ));
        }
        Err(RecordError::Db(e)) => {
            eprintln!("⚠️ Status record failed for {}: {e}", ctx.meeting.id);
            return Some(protocol::error_message("Internal error"));
        }
    };
    if let Err(e) = repos::participants::touch_last_seen(&conn, &participant_id, now) {
        eprintln!("⚠️ last_seen update failed for {participant_id}: {e}");
    }

    if let Err(e) = publish_rollup(&conn, hub, &ctx.meeting, bucket) {
        eprintln!("⚠️ Delta broadcast failed for {}: {e}", ctx.meeting.id);
    }
    None
}

/// Ping: refresh activity and return the server clock.
fn ping(db: &Db, ctx: &WsContext, now: DateTime<Utc>) -> String {
    if let Some(participant_id) = &ctx.participant_id {
        let conn = db.conn();
        if let Err(e) = repos::participants::touch_last_seen(&conn, participant_id, now) {
            eprintln!("⚠️ last_seen update failed for {participant_id}: {e}");
        }
    }
    protocol::pong(now)
}

/// Leave: invoked by the connection lifecycle on disconnect. Refreshes the
/// participant and tells the remaining subscribers via a delta.
pub fn handle_leave(db: &Db, hub: &ChannelHub, ctx: &WsContext) {
    let Some(participant_id) = &ctx.participant_id else {
        return;
    };
    let now = Utc::now();
    let conn = db.conn();
    if let Err(e) = repos::participants::touch_last_seen(&conn, participant_id, now) {
        eprintln!("⚠️ last_seen update failed for {participant_id}: {e}");
    }
    if let Err(e) = publish_rollup(&conn, hub, &ctx.meeting, bucketize(now)) {
        eprintln!("⚠️ Leave delta broadcast failed for {}: {e}", ctx.meeting.id);
    }
    println!(
        "👋 Participant {participant_id} left meeting {}",
        ctx.meeting.id
    );
}
