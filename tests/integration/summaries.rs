use crate::common::{seed_meeting, seed_participant, test_db};
use chrono::{Duration, TimeZone, Utc};
use meeting_pulse::engagement;
use meeting_pulse::repos;
use meeting_pulse::summary;

fn meeting_window() -> (chrono::DateTime<Utc>, chrono::DateTime<Utc>) {
    let start = Utc.with_ymd_and_hms(2025, 1, 1, 14, 0, 0).unwrap();
    (start, start + Duration::hours(1))
}

#[test]
fn test_three_fully_engaged_participants_score_high() {
    let harness = test_db();
    let (start, end) = meeting_window();
    let meeting = seed_meeting(&harness.db, start, end);

    let conn = harness.db.conn();
    for fp in ["fp-a", "fp-b", "fp-c"] {
        let participant = repos::participants::create(&conn, &meeting.id, fp, start).unwrap();
        engagement::record_status(&conn, &meeting, &participant.id, "engaged", start).unwrap();
    }

    let summary = summary::persist_summary(&conn, &meeting).unwrap();
    assert_eq!(summary.max_participants, 3);
    // raw = 1.0 -> normalized = min(1.0 * 1.4, 1.25, 1.0) = 1.0
    assert!((summary.normalized_engagement - 1.0).abs() < 1e-9);
    assert_eq!(summary.engagement_level, "high");
}

#[test]
fn test_summary_is_computed_once() {
    let harness = test_db();
    let (start, end) = meeting_window();
    let meeting = seed_meeting(&harness.db, start, end);

    let conn = harness.db.conn();
    let participant = repos::participants::create(&conn, &meeting.id, "fp-a", start).unwrap();
    engagement::record_status(&conn, &meeting, &participant.id, "engaged", start).unwrap();

    let first = summary::persist_summary(&conn, &meeting).unwrap();

    // Later activity must not change the persisted summary
    let second_participant =
        repos::participants::create(&conn, &meeting.id, "fp-b", start).unwrap();
    engagement::record_status(
        &conn,
        &meeting,
        &second_participant.id,
        "disengaged",
        start + Duration::minutes(5),
    )
    .unwrap();

    let second = summary::persist_summary(&conn, &meeting).unwrap();
    assert_eq!(first.max_participants, second.max_participants);
    assert_eq!(first.normalized_engagement, second.normalized_engagement);
    assert_eq!(first.computed_at, second.computed_at);
}

#[test]
fn test_empty_meeting_scores_low() {
    let harness = test_db();
    let (start, end) = meeting_window();
    let meeting = seed_meeting(&harness.db, start, end);
    let conn = harness.db.conn();
    let summary = summary::persist_summary(&conn, &meeting).unwrap();
    assert_eq!(summary.max_participants, 0);
    assert_eq!(summary.normalized_engagement, 0.0);
    assert_eq!(summary.engagement_level, "low");
}

#[test]
fn test_finalize_builds_meeting_ended_payload() {
    let harness = test_db();
    let (start, end) = meeting_window();
    let meeting = seed_meeting(&harness.db, start, end);

    let conn = harness.db.conn();
    for fp in ["fp-a", "fp-b", "fp-c"] {
        let participant = repos::participants::create(&conn, &meeting.id, fp, start).unwrap();
        engagement::record_status(&conn, &meeting, &participant.id, "engaged", start).unwrap();
    }

    let payload = summary::finalize_meeting(&conn, &meeting).unwrap();
    let message: serde_json::Value = serde_json::from_str(&payload).unwrap();
    assert_eq!(message["type"], "meeting_ended");
    assert_eq!(message["end_time"], "2025-01-01T15:00:00Z");
    assert_eq!(message["summary"]["duration_minutes"], 60);
    assert_eq!(message["summary"]["max_participants"], 3);
    assert_eq!(message["summary"]["normalized_engagement"], 1.0);
    assert_eq!(message["summary"]["engagement_level"], "high");
    assert_eq!(message["summary"]["meeting"]["id"], meeting.id);
    assert_eq!(
        message["summary"]["meeting"]["start_ts"],
        "2025-01-01T14:00:00Z"
    );
}

#[test]
fn test_reconnect_payload_includes_stored_summary() {
    let harness = test_db();
    let (start, end) = meeting_window();
    let meeting = seed_meeting(&harness.db, start, end);

    let conn = harness.db.conn();
    // No summary yet: payload is the bare terminal message
    let bare = summary::ended_payload_for_reconnect(&conn, &meeting).unwrap();
    let message: serde_json::Value = serde_json::from_str(&bare).unwrap();
    assert_eq!(message["type"], "meeting_ended");
    assert!(message.get("summary").is_none());

    summary::persist_summary(&conn, &meeting).unwrap();
    let with_summary = summary::ended_payload_for_reconnect(&conn, &meeting).unwrap();
    let message: serde_json::Value = serde_json::from_str(&with_summary).unwrap();
    assert!(message["summary"]["engagement_level"].is_string());
}

#[test]
fn test_summary_includes_room_context_names() {
    let harness = test_db();
    let (start, end) = meeting_window();
    let conn = harness.db.conn();
    let city = repos::locations::get_or_create_city(&conn, "Hamburg").unwrap();
    let room = repos::locations::get_or_create_room(&conn, "Aquarium", &city.id).unwrap();
    let meeting =
        repos::meetings::get_or_create(&conn, start, end, None, Some(&room.id), Some(&city.id))
            .unwrap()
            .unwrap();

    let payload = summary::finalize_meeting(&conn, &meeting).unwrap();
    let message: serde_json::Value = serde_json::from_str(&payload).unwrap();
    assert_eq!(message["summary"]["meeting"]["city_name"], "Hamburg");
    assert_eq!(message["summary"]["meeting"]["meeting_room_name"], "Aquarium");
}
