use crate::common::{seed_meeting, seed_participant, test_db};
use chrono::{Duration, Utc};
use meeting_pulse::broadcaster::broadcast_tick;
use meeting_pulse::channels::ChannelHub;
use meeting_pulse::engagement;
use std::collections::HashSet;

#[test]
fn test_tick_announces_start_then_streams_deltas() {
    let harness = test_db();
    let hub = ChannelHub::new();
    let now = Utc::now();
    let meeting = seed_meeting(
        &harness.db,
        now - Duration::minutes(5),
        now + Duration::minutes(55),
    );
    let mut subscriber = hub.subscribe(&meeting.id);
    let mut notified = HashSet::new();

    let conn = harness.db.conn();
    broadcast_tick(&conn, &hub, &mut notified);

    // First tick: meeting_started, then the rollup delta
    let started: serde_json::Value =
        serde_json::from_str(&subscriber.try_recv().unwrap()).unwrap();
    assert_eq!(started["type"], "meeting_started");
    assert_eq!(started["meeting_id"], meeting.id);

    let delta: serde_json::Value =
        serde_json::from_str(&subscriber.try_recv().unwrap()).unwrap();
    assert_eq!(delta["type"], "delta");
    assert_eq!(delta["data"]["meeting_id"], meeting.id);

    // Second tick: no repeated start announcement
    broadcast_tick(&conn, &hub, &mut notified);
    let next: serde_json::Value =
        serde_json::from_str(&subscriber.try_recv().unwrap()).unwrap();
    assert_eq!(next["type"], "delta");
}

#[test]
fn test_tick_skips_inactive_meetings() {
    let harness = test_db();
    let hub = ChannelHub::new();
    let now = Utc::now();
    let upcoming = seed_meeting(
        &harness.db,
        now + Duration::minutes(30),
        now + Duration::minutes(90),
    );
    let over = seed_meeting(
        &harness.db,
        now - Duration::minutes(90),
        now - Duration::minutes(30),
    );
    let mut upcoming_rx = hub.subscribe(&upcoming.id);
    let mut over_rx = hub.subscribe(&over.id);
    let mut notified = HashSet::new();

    let conn = harness.db.conn();
    broadcast_tick(&conn, &hub, &mut notified);

    assert!(upcoming_rx.try_recv().is_err());
    assert!(over_rx.try_recv().is_err());
    assert!(notified.is_empty());
}

#[test]
fn test_tick_delta_reflects_participant_state() {
    let harness = test_db();
    let hub = ChannelHub::new();
    let now = Utc::now();
    let meeting = seed_meeting(
        &harness.db,
        now - Duration::minutes(5),
        now + Duration::minutes(55),
    );
    let participant = seed_participant(&harness.db, &meeting, "fp-a", now);
    {
        let conn = harness.db.conn();
        engagement::record_status(&conn, &meeting, &participant.id, "speaking", now).unwrap();
    }

    let mut subscriber = hub.subscribe(&meeting.id);
    let mut notified = HashSet::new();
    let conn = harness.db.conn();
    broadcast_tick(&conn, &hub, &mut notified);

    let _started = subscriber.try_recv().unwrap();
    let delta: serde_json::Value =
        serde_json::from_str(&subscriber.try_recv().unwrap()).unwrap();
    assert_eq!(delta["data"]["participants"][&participant.id], 100.0);
    assert_eq!(delta["data"]["overall"], 100.0);
}
