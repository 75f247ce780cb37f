// Data access only — business rules live in the services. Every function
// takes a borrowed connection so callers decide which handle (shared Db or a
// background task's own connection) the statement runs on.

pub mod engagement;
pub mod locations;
pub mod meetings;
pub mod participants;
pub mod summaries;

use chrono::{DateTime, Utc};
use rusqlite::Row;
use rusqlite::types::Type;

/// Read a stored RFC 3339 UTC timestamp column into a `DateTime<Utc>`.
pub(crate) fn ts_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    crate::timeutil::parse_utc(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("invalid timestamp '{raw}'").into(),
        )
    })
}
