use chrono::{NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use regex::Regex;
use std::sync::OnceLock;

use crate::constants::timestamp::LOG_TIMESTAMP_FORMAT;
use crate::types::LocalTimestamp;

/// Outcome of inspecting a line's leading bracketed timestamp.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimestampPrefix {
    /// The line does not start with a bracketed token (continuation lines).
    Absent,
    /// A bracketed token is present but is not a valid timestamp.
    Malformed,
    /// A valid wall-clock timestamp.
    Parsed(NaiveDateTime),
}

impl TimestampPrefix {
    /// Parsed timestamp, if any.
    pub fn parsed(self) -> Option<NaiveDateTime> {
        match self {
            Self::Parsed(value) => Some(value),
            _ => None,
        }
    }
}

fn embedded_timestamp_re() -> &'static Regex {
    static EMBEDDED_TIMESTAMP_RE: OnceLock<Regex> = OnceLock::new();
    EMBEDDED_TIMESTAMP_RE.get_or_init(|| {
        Regex::new(r"\[([\d-]+ [\d:]+)\]").expect("valid embedded timestamp regex")
    })
}

/// Return the text of the line's leading `[...]` token, if it has one.
pub fn leading_bracket_token(line: &str) -> Option<&str> {
    let rest = line.strip_prefix('[')?;
    let end = rest.find(']')?;
    Some(&rest[..end])
}

/// Classify the line's leading bracketed token as absent, malformed, or parsed.
pub fn inspect_prefix(line: &str) -> TimestampPrefix {
    match leading_bracket_token(line) {
        None => TimestampPrefix::Absent,
        Some(token) => match NaiveDateTime::parse_from_str(token, LOG_TIMESTAMP_FORMAT) {
            Ok(value) => TimestampPrefix::Parsed(value),
            Err(_) => TimestampPrefix::Malformed,
        },
    }
}

/// Parse the leading `[YYYY-MM-DD HH:MM:SS]` timestamp. Returns `None` when
/// the prefix is missing or does not parse.
pub fn parse_wall_clock(line: &str) -> Option<NaiveDateTime> {
    inspect_prefix(line).parsed()
}

/// Attach the civil time zone to a wall-clock timestamp.
///
/// Times repeated by a daylight-saving fall-back resolve to the earlier
/// instant. Times skipped by a spring-forward gap return `None`.
pub fn localize(wall_clock: NaiveDateTime, zone: Tz) -> Option<LocalTimestamp> {
    zone.from_local_datetime(&wall_clock).earliest()
}

/// Parse the leading timestamp and localize it to `zone`.
pub fn parse_local_timestamp(line: &str, zone: Tz) -> Option<LocalTimestamp> {
    parse_wall_clock(line).and_then(|wall_clock| localize(wall_clock, zone))
}

/// Find the first bracketed date-time anywhere in the line and return it
/// verbatim (no validation), as the discrepancy report shows it.
pub fn find_timestamp_text(line: &str) -> Option<&str> {
    embedded_timestamp_re()
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|token| token.as_str())
}

/// Render a localized timestamp at second precision in the log format.
pub fn format_second(timestamp: &LocalTimestamp) -> String {
    timestamp.format(LOG_TIMESTAMP_FORMAT).to_string()
}
