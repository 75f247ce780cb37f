//! Engagement time-series engine.
//!
//! State lives in the database; everything here is computation over it.
//! Samples and rollups are keyed by minute buckets, participants carry their
//! last known status forward across buckets without samples.

pub mod smoothing;

use crate::models::{
    EngagementPoint, EngagementSnapshot, Meeting, ParticipantSeries, Rollup, engaged_flag,
};
use crate::repos;
use crate::timeutil::bucketize;
use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use smoothing::Smoothing;
use std::collections::HashMap;

/// Failure recording a status sample.
#[derive(Debug)]
pub enum RecordError {
    /// The bucket falls outside `[meeting_start, meeting_end]`.
    OutOfBounds { bucket: DateTime<Utc> },
    Db(rusqlite::Error),
}

impl std::fmt::Display for RecordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordError::OutOfBounds { bucket } => {
                write!(
                    f,
                    "Status at {} is outside the meeting bounds",
                    crate::timeutil::isoformat_utc(*bucket)
                )
            }
            RecordError::Db(err) => write!(f, "{err}"),
        }
    }
}

impl From<rusqlite::Error> for RecordError {
    fn from(err: rusqlite::Error) -> Self {
        RecordError::Db(err)
    }
}

/// Record a status change at `now` into its minute bucket.
///
/// Overwrites any previous sample for the same `(participant, bucket)` and
/// refreshes the participant's last known status. Returns the bucket written.
pub fn record_status(
    conn: &Connection,
    meeting: &Meeting,
    participant_id: &str,
    status: &str,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, RecordError> {
    let bucket = bucketize(now);
    let meeting_start = bucketize(meeting.start_ts);
    let meeting_end = bucketize(meeting.end_ts);
    if bucket < meeting_start || bucket > meeting_end {
        return Err(RecordError::OutOfBounds { bucket });
    }

    repos::engagement::upsert_sample(conn, &meeting.id, participant_id, bucket, status)?;
    repos::participants::update_last_status(conn, participant_id, status)?;
    Ok(bucket)
}

/// Samples grouped as participant -> bucket -> status.
fn load_sample_map(
    conn: &Connection,
    meeting_id: &str,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> rusqlite::Result<HashMap<String, Vec<(DateTime<Utc>, String)>>> {
    let samples = repos::engagement::list_samples(conn, meeting_id, start, end)?;
    let mut map: HashMap<String, Vec<(DateTime<Utc>, String)>> = HashMap::new();
    for sample in samples {
        map.entry(sample.participant_id)
            .or_default()
            .push((bucketize(sample.bucket), sample.status));
    }
    Ok(map)
}

/// Binary flag series for one participant across the bucket grid.
///
/// Buckets without a sample repeat the previous status; the carry starts from
/// the participant's last known status (or "disengaged" for fresh joins).
fn build_flags(
    buckets: &[DateTime<Utc>],
    samples: &[(DateTime<Utc>, String)],
    seed_status: &str,
) -> Vec<u8> {
    let by_bucket: HashMap<DateTime<Utc>, &str> = samples
        .iter()
        .map(|(bucket, status)| (*bucket, status.as_str()))
        .collect();
    let mut last = seed_status.to_string();
    let mut flags = Vec::with_capacity(buckets.len());
    for bucket in buckets {
        if let Some(status) = by_bucket.get(bucket) {
            last = (*status).to_string();
        }
        flags.push(engaged_flag(&last));
    }
    flags
}

/// Full snapshot: per-participant smoothed series plus the overall mean,
/// from the meeting start up to `min(end_ts, now)`.
pub fn build_snapshot(
    conn: &Connection,
    meeting: &Meeting,
    now: DateTime<Utc>,
    smoothing: Smoothing,
) -> rusqlite::Result<EngagementSnapshot> {
    let bucket_minutes = 1i64;
    let start = bucketize(meeting.start_ts);
    let end = bucketize(meeting.end_ts.min(now)).max(start);

    let mut buckets = Vec::new();
    let mut cursor = start;
    while cursor <= end {
        buckets.push(cursor);
        cursor += Duration::minutes(bucket_minutes);
    }

    // Query participants fresh so just-joined ones appear in the snapshot
    let participants = repos::participants::list_for_meeting(conn, &meeting.id)?;
    let sample_map = load_sample_map(conn, &meeting.id, Some(start), Some(end))?;

    let mut series_by_pid: HashMap<String, Vec<f64>> = HashMap::new();
    let mut payload = Vec::with_capacity(participants.len());
    for participant in &participants {
        let seed = participant.last_status.as_deref().unwrap_or("disengaged");
        let empty = Vec::new();
        let samples = sample_map.get(&participant.id).unwrap_or(&empty);
        let flags = build_flags(&buckets, samples, seed);
        let smoothed = smoothing.smooth(&flags);
        payload.push(ParticipantSeries {
            participant_id: participant.id.clone(),
            device_fingerprint: participant.device_fingerprint.clone(),
            series: buckets
                .iter()
                .zip(smoothed.iter())
                .map(|(bucket, value)| EngagementPoint {
                    bucket: *bucket,
                    value: *value,
                })
                .collect(),
        });
        series_by_pid.insert(participant.id.clone(), smoothed);
    }

    let overall = buckets
        .iter()
        .enumerate()
        .map(|(idx, bucket)| {
            let value = if series_by_pid.is_empty() {
                0.0
            } else {
                series_by_pid.values().map(|s| s[idx]).sum::<f64>() / series_by_pid.len() as f64
            };
            EngagementPoint {
                bucket: *bucket,
                value,
            }
        })
        .collect();

    Ok(EngagementSnapshot {
        meeting_id: meeting.id.clone(),
        start,
        end,
        bucket_minutes,
        participants: payload,
        overall,
    })
}

/// Current-state rollup at a bucket, used for incremental deltas.
///
/// Each participant contributes their last known status at or before the
/// bucket (seeded from `last_status`), projected to 0/100. Participants who
/// never sent a sample in this bucket keep their carried state.
pub fn bucket_rollup(
    conn: &Connection,
    meeting: &Meeting,
    bucket: DateTime<Utc>,
) -> rusqlite::Result<Rollup> {
    let bucket = bucketize(bucket);

    let participants = repos::participants::list_for_meeting(conn, &meeting.id)?;
    let mut latest: HashMap<String, String> = participants
        .iter()
        .map(|p| {
            let status = p.last_status.clone().unwrap_or_else(|| "disengaged".into());
            (p.id.clone(), status)
        })
        .collect();

    // Overlay recorded samples up to and including the bucket (bucket order)
    for sample in repos::engagement::list_samples(conn, &meeting.id, None, Some(bucket))? {
        if let Some(entry) = latest.get_mut(&sample.participant_id) {
            *entry = sample.status;
        }
    }

    let values: HashMap<String, f64> = latest
        .into_iter()
        .map(|(pid, status)| (pid, engaged_flag(&status) as f64 * 100.0))
        .collect();
    let overall = if values.is_empty() {
        0.0
    } else {
        values.values().sum::<f64>() / values.len() as f64
    };

    Ok(Rollup {
        meeting_id: meeting.id.clone(),
        bucket,
        overall,
        participants: values,
    })
}

/// Mean of the snapshot's overall series scaled to `[0, 1]`.
pub fn average_engagement(snapshot: &EngagementSnapshot) -> f64 {
    if snapshot.overall.is_empty() {
        return 0.0;
    }
    let sum: f64 = snapshot.overall.iter().map(|p| p.value).sum();
    sum / snapshot.overall.len() as f64 / 100.0
}

/// Small-meeting boost strength for normalisation.
const SIZE_BOOST_ALPHA: f64 = 0.8;
/// Hard cap on how much the boost may add over the raw score.
const SIZE_BOOST_CEILING: f64 = 0.25;

/// Size-aware normalisation: small meetings get a logarithmically shrinking
/// boost, capped both absolutely and at 1.0.
pub fn normalize_engagement(raw: f64, max_participants: i64) -> f64 {
    if max_participants <= 0 {
        return 0.0;
    }
    let boost = 1.0 + SIZE_BOOST_ALPHA / ((max_participants as f64) + 1.0).log2();
    (raw * boost).min(raw + SIZE_BOOST_CEILING).min(1.0)
}

/// Bucket a normalised engagement score into a level.
pub fn classify_level(normalized: f64) -> &'static str {
    if normalized >= 0.60 {
        "high"
    } else if normalized >= 0.40 {
        "healthy"
    } else if normalized >= 0.20 {
        "passive"
    } else {
        "low"
    }
}
