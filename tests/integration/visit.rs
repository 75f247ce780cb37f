use crate::common::{test_client, test_db};
use chrono::{FixedOffset, TimeZone, Utc};
use meeting_pulse::meetings::{self, VisitError};
use rocket::http::{ContentType, Status};

// --- HTTP surface ---

#[test]
fn test_visit_is_idempotent_within_slot() {
    let client = test_client();
    let body = r#"{"ms_teams_input":"https://teams.microsoft.com/meet/abc"}"#;

    let first = client
        .post("/visit")
        .header(ContentType::JSON)
        .body(body)
        .dispatch();
    assert_eq!(first.status(), Status::Ok);
    let first: serde_json::Value = first.into_json().unwrap();

    let second = client
        .post("/visit")
        .header(ContentType::JSON)
        .body(body)
        .dispatch();
    let second: serde_json::Value = second.into_json().unwrap();

    assert_eq!(first["meeting_id"], second["meeting_id"]);
    assert_eq!(first["meeting_start"], second["meeting_start"]);
    assert_eq!(first["meeting_end"], second["meeting_end"]);
    assert_eq!(first["meeting_id"].as_str().unwrap().len(), 36);
}

#[test]
fn test_visit_same_slot_different_context_differs() {
    let client = test_client();
    let a: serde_json::Value = client
        .post("/visit")
        .header(ContentType::JSON)
        .body(r#"{"ms_teams_input":"https://teams.microsoft.com/meet/one"}"#)
        .dispatch()
        .into_json()
        .unwrap();
    let b: serde_json::Value = client
        .post("/visit")
        .header(ContentType::JSON)
        .body(r#"{"ms_teams_input":"https://teams.microsoft.com/meet/two"}"#)
        .dispatch()
        .into_json()
        .unwrap();
    assert_ne!(a["meeting_id"], b["meeting_id"]);
}

#[test]
fn test_visit_missing_context_is_400() {
    let client = test_client();
    let res = client
        .post("/visit")
        .header(ContentType::JSON)
        .body(r#"{"city_id":"c1"}"#)
        .dispatch();
    assert_eq!(res.status(), Status::BadRequest);
    let body: serde_json::Value = res.into_json().unwrap();
    assert!(body["error"].as_str().unwrap().contains("required"));
}

#[test]
fn test_visit_invalid_duration_is_400() {
    let client = test_client();
    let res = client
        .post("/visit")
        .header(ContentType::JSON)
        .body(r#"{"ms_teams_input":"12345678","duration_minutes":45}"#)
        .dispatch();
    assert_eq!(res.status(), Status::BadRequest);
    let body: serde_json::Value = res.into_json().unwrap();
    assert!(body["error"].as_str().unwrap().contains("30 or 60"));
}

#[test]
fn test_visit_half_hour_duration() {
    let client = test_client();
    let res: serde_json::Value = client
        .post("/visit")
        .header(ContentType::JSON)
        .body(r#"{"ms_teams_input":"12345678","duration_minutes":30}"#)
        .dispatch()
        .into_json()
        .unwrap();
    let start = res["meeting_start"].as_str().unwrap();
    let end = res["meeting_end"].as_str().unwrap();
    let start = chrono::DateTime::parse_from_rfc3339(start).unwrap();
    let end = chrono::DateTime::parse_from_rfc3339(end).unwrap();
    assert_eq!((end - start).num_minutes(), 30);
}

#[test]
fn test_visit_with_room_context() {
    let client = test_client();
    let city: serde_json::Value = client
        .post("/cities")
        .header(ContentType::JSON)
        .body(r#"{"name":"Hamburg"}"#)
        .dispatch()
        .into_json()
        .unwrap();
    let room: serde_json::Value = client
        .post("/meeting-rooms")
        .header(ContentType::JSON)
        .body(format!(
            r#"{{"name":"Aquarium","city_id":"{}"}}"#,
            city["id"].as_str().unwrap()
        ))
        .dispatch()
        .into_json()
        .unwrap();

    let body = format!(
        r#"{{"meeting_room_id":"{}","city_id":"{}"}}"#,
        room["id"].as_str().unwrap(),
        city["id"].as_str().unwrap()
    );
    let first = client
        .post("/visit")
        .header(ContentType::JSON)
        .body(&body)
        .dispatch();
    assert_eq!(first.status(), Status::Ok);
    let first: serde_json::Value = first.into_json().unwrap();
    let second: serde_json::Value = client
        .post("/visit")
        .header(ContentType::JSON)
        .body(&body)
        .dispatch()
        .into_json()
        .unwrap();
    assert_eq!(first["meeting_id"], second["meeting_id"]);
}

// --- Service-level slot semantics (fixed clock) ---

#[test]
fn test_slot_snapping_matrix() {
    let harness = test_db();
    let conn = harness.db.conn();
    let cases = [
        ((13, 58), "2025-01-01T14:00:00Z", "2025-01-01T15:00:00Z"),
        ((10, 10), "2025-01-01T10:00:00Z", "2025-01-01T11:00:00Z"),
        ((10, 16), "2025-01-01T10:30:00Z", "2025-01-01T11:30:00Z"),
        ((10, 44), "2025-01-01T10:30:00Z", "2025-01-01T11:30:00Z"),
        ((10, 45), "2025-01-01T11:00:00Z", "2025-01-01T12:00:00Z"),
    ];
    for ((hour, minute), want_start, want_end) in cases {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, hour, minute, 0).unwrap();
        let meeting = meetings::ensure_meeting(
            &conn,
            now,
            Some("https://teams.microsoft.com/meet/abc"),
            None,
            None,
            60,
        )
        .unwrap();
        assert_eq!(
            meeting_pulse::timeutil::isoformat_utc(meeting.start_ts),
            want_start,
            "start for {hour:02}:{minute:02}"
        );
        assert_eq!(
            meeting_pulse::timeutil::isoformat_utc(meeting.end_ts),
            want_end,
            "end for {hour:02}:{minute:02}"
        );
    }
}

#[test]
fn test_slot_snaps_in_local_timezone() {
    let harness = test_db();
    let conn = harness.db.conn();
    // 10:16 at +02:00 snaps to 10:30 local = 08:30 UTC
    let offset = FixedOffset::east_opt(2 * 3600).unwrap();
    let now = offset.with_ymd_and_hms(2025, 1, 1, 10, 16, 0).unwrap();
    let meeting =
        meetings::ensure_meeting(&conn, now, Some("12345678"), None, None, 60).unwrap();
    assert_eq!(
        meeting_pulse::timeutil::isoformat_utc(meeting.start_ts),
        "2025-01-01T08:30:00Z"
    );
}

#[test]
fn test_same_teams_link_collapses_rooms() {
    let harness = test_db();
    let conn = harness.db.conn();
    let city = meeting_pulse::repos::locations::get_or_create_city(&conn, "Hamburg").unwrap();
    let room_a =
        meeting_pulse::repos::locations::get_or_create_room(&conn, "A", &city.id).unwrap();
    let room_b =
        meeting_pulse::repos::locations::get_or_create_room(&conn, "B", &city.id).unwrap();

    let now = Utc.with_ymd_and_hms(2025, 1, 1, 14, 0, 0).unwrap();
    let teams = "https://teams.microsoft.com/meet/shared";
    let a = meetings::ensure_meeting(&conn, now, Some(teams), Some(&room_a.id), None, 60).unwrap();
    let b = meetings::ensure_meeting(&conn, now, Some(teams), Some(&room_b.id), None, 60).unwrap();
    // Teams context wins: both rooms land in the same meeting
    assert_eq!(a.id, b.id);
}

#[test]
fn test_metadata_coalesce_never_overwrites() {
    let harness = test_db();
    let conn = harness.db.conn();
    let city = meeting_pulse::repos::locations::get_or_create_city(&conn, "Hamburg").unwrap();
    let room = meeting_pulse::repos::locations::get_or_create_room(&conn, "A", &city.id).unwrap();

    let now = Utc.with_ymd_and_hms(2025, 1, 1, 14, 0, 0).unwrap();
    let teams = "https://teams.microsoft.com/meet/shared";
    let bare = meetings::ensure_meeting(&conn, now, Some(teams), None, None, 60).unwrap();
    assert!(bare.meeting_room_id.is_none());

    // Second visit fills the missing room metadata
    let filled =
        meetings::ensure_meeting(&conn, now, Some(teams), Some(&room.id), Some(&city.id), 60)
            .unwrap();
    assert_eq!(filled.id, bare.id);
    assert_eq!(filled.meeting_room_id.as_deref(), Some(room.id.as_str()));
    assert_eq!(filled.city_id.as_deref(), Some(city.id.as_str()));

    // Third visit with a different room must not overwrite
    let other = meeting_pulse::repos::locations::get_or_create_room(&conn, "B", &city.id).unwrap();
    let unchanged =
        meetings::ensure_meeting(&conn, now, Some(teams), Some(&other.id), None, 60).unwrap();
    assert_eq!(unchanged.meeting_room_id.as_deref(), Some(room.id.as_str()));
}

#[test]
fn test_missing_context_error() {
    let harness = test_db();
    let conn = harness.db.conn();
    let now = Utc.with_ymd_and_hms(2025, 1, 1, 14, 0, 0).unwrap();
    let result = meetings::ensure_meeting(&conn, now, None, None, Some("city-1"), 60);
    assert!(matches!(result, Err(VisitError::MissingContext)));

    // Whitespace-only room id is not a context either
    let result = meetings::ensure_meeting(&conn, now, None, Some("   "), None, 60);
    assert!(matches!(result, Err(VisitError::MissingContext)));
}

#[test]
fn test_invalid_duration_error() {
    let harness = test_db();
    let conn = harness.db.conn();
    let now = Utc.with_ymd_and_hms(2025, 1, 1, 14, 0, 0).unwrap();
    let result = meetings::ensure_meeting(&conn, now, Some("12345678"), None, None, 45);
    assert!(matches!(result, Err(VisitError::InvalidDuration(45))));
}
