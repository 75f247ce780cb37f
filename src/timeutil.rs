use chrono::{DateTime, Duration, NaiveDateTime, SecondsFormat, TimeZone, Timelike, Utc};
use sha2::{Digest, Sha256};

/// ISO 8601 string in UTC with trailing `Z`, second precision.
///
/// All timestamps are stored in this format, so lexicographic comparison in
/// SQL matches chronological order.
pub fn isoformat_utc<Tz: TimeZone>(ts: DateTime<Tz>) -> String {
    ts.with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse an ISO 8601 timestamp into a UTC-aware datetime.
///
/// Offset-carrying inputs are converted to UTC. Naive inputs are assumed to
/// be UTC with a warning. Returns `None` for unparseable input.
pub fn parse_utc(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    // Naive timestamp (no offset): assume UTC
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            eprintln!("⚠️ Naive timestamp '{value}' received; assuming UTC");
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    None
}

/// Clear seconds and sub-seconds: the minute bucket a timestamp falls into.
pub fn bucketize(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.with_second(0).unwrap().with_nanosecond(0).unwrap()
}

/// Round to the nearest half-hour boundary in the timestamp's own timezone.
///
/// Decision boundaries at :15 and :45:
/// - minutes 0-15  -> :00 of the current hour
/// - minutes 16-44 -> :30 of the current hour
/// - minutes 45-59 -> :00 of the next hour
pub fn snap_to_half_hour<Tz: TimeZone>(ts: DateTime<Tz>) -> DateTime<Tz> {
    let base = ts.with_second(0).unwrap().with_nanosecond(0).unwrap();
    match base.minute() {
        0..=15 => base.with_minute(0).unwrap(),
        16..=44 => base.with_minute(30).unwrap(),
        _ => base.with_minute(0).unwrap() + Duration::hours(1),
    }
}

/// Deterministic 36-char hex meeting id from the slot start and its context.
///
/// Teams context takes precedence over the room: two visits with the same
/// Teams meeting always land in the same meeting regardless of room.
/// Returns `None` when neither context id is present.
pub fn deterministic_meeting_id(
    start_ts: DateTime<Utc>,
    ms_teams_meeting_id: Option<&str>,
    meeting_room_id: Option<&str>,
) -> Option<String> {
    let key = if let Some(teams_id) = ms_teams_meeting_id {
        format!("{}|teams:{}", isoformat_utc(start_ts), teams_id)
    } else if let Some(room_id) = meeting_room_id {
        format!("{}|room:{}", isoformat_utc(start_ts), room_id)
    } else {
        return None;
    };
    let digest = Sha256::digest(key.as_bytes());
    Some(hex::encode(digest)[..36].to_string())
}
