use chrono::{SecondsFormat, Utc};

use crate::domain::models::{SleepSession, TimestampMs, UNRATED_QUALITY};

pub fn format_history(sessions: &[SleepSession]) -> String {
    let mut lines = Vec::with_capacity(sessions.len());

    for session in sessions {
        let started = timestamp_to_iso8601(session.started_at);

        if session.is_open() {
            lines.push(format!("{started} in progress"));
            continue;
        }

        let ended = timestamp_to_iso8601(session.ended_at);
        if session.quality == UNRATED_QUALITY {
            lines.push(format!("{started} to {ended} unrated"));
        } else {
            lines.push(format!("{started} to {ended} quality {}", session.quality));
        }
    }

    lines.join("\n")
}

pub fn timestamp_to_iso8601(timestamp: TimestampMs) -> String {
    let datetime = chrono::DateTime::<Utc>::from_timestamp_millis(timestamp.0)
        .unwrap_or_else(|| chrono::DateTime::<Utc>::from(std::time::UNIX_EPOCH));
    datetime.to_rfc3339_opts(SecondsFormat::Millis, true)
}
