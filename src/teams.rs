//! Microsoft Teams invite parsing.
//!
//! Accepts the old `meetup-join` invite URLs, the new short `/meet/` URLs,
//! bare numeric meeting IDs (with optional digit-group spaces), or nothing.
//! Pure string work; deduplication against stored Teams meetings happens in
//! the repository.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedTeams {
    pub thread_id: Option<String>,
    pub meeting_id: Option<String>,
    pub invite_url: Option<String>,
}

impl ParsedTeams {
    /// True when no identifier at all could be extracted.
    pub fn is_empty(&self) -> bool {
        self.thread_id.is_none() && self.meeting_id.is_none() && self.invite_url.is_none()
    }
}

/// Parse a Teams invite URL or meeting ID into structured identifiers.
pub fn parse_teams_input(input: Option<&str>) -> ParsedTeams {
    let Some(raw) = input else {
        return ParsedTeams::default();
    };
    let value = raw.trim();
    if value.is_empty() {
        return ParsedTeams::default();
    }

    // Numeric meeting ID, possibly spaced in groups: "385 562 023 120 47"
    if is_numeric_id(value) {
        return ParsedTeams {
            thread_id: None,
            meeting_id: Some(value.replace(' ', "")),
            invite_url: None,
        };
    }

    let lowered = value.to_lowercase();
    if lowered.starts_with("http://") || lowered.starts_with("https://") {
        // Old-style invite: .../meetup-join/<url-encoded thread>/<digits>
        if let Some(thread) = extract_old_thread(value) {
            return ParsedTeams {
                thread_id: Some(thread),
                meeting_id: None,
                invite_url: Some(value.to_string()),
            };
        }
        // New-style invite: .../meet/<meeting_id>[?context]
        if let Some(meeting_id) = extract_new_meeting_id(value) {
            return ParsedTeams {
                thread_id: None,
                meeting_id: Some(meeting_id),
                invite_url: Some(value.to_string()),
            };
        }
    }

    // Unrecognized input: keep the raw value so it is not lost
    ParsedTeams {
        thread_id: None,
        meeting_id: None,
        invite_url: Some(value.to_string()),
    }
}

/// Digits with optional interior spaces: a leading digit, at least one
/// interior digit or space, and a trailing digit. Anything shorter falls
/// through to the raw-input branch.
fn is_numeric_id(value: &str) -> bool {
    value.chars().count() >= 3
        && value.starts_with(|c: char| c.is_ascii_digit())
        && value.ends_with(|c: char| c.is_ascii_digit())
        && value.chars().all(|c| c.is_ascii_digit() || c == ' ')
}

/// Extract and percent-decode the thread id from a `meetup-join` URL.
fn extract_old_thread(url: &str) -> Option<String> {
    let idx = url.find("meetup-join/")?;
    let rest = &url[idx + "meetup-join/".len()..];
    let (thread_enc, tail) = rest.split_once('/')?;
    // The segment after the thread must start with digits (the invite nonce)
    if thread_enc.is_empty() || !tail.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    Some(urlencoding::decode(thread_enc).ok()?.into_owned())
}

/// Extract the meeting id from a `/meet/<id>` URL, dropping any query string.
/// The id runs to the `?` or end of the URL, slashes included.
fn extract_new_meeting_id(url: &str) -> Option<String> {
    let idx = url.find("/meet/")?;
    let rest = &url[idx + "/meet/".len()..];
    let id = rest.split('?').next().unwrap_or("");
    if id.is_empty() {
        return None;
    }
    Some(id.to_string())
}
