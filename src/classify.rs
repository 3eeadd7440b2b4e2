//! Log-line classification.
//!
//! Each physical trace line maps to exactly one [`LineEvent`]. Markers are
//! checked in a fixed order (start, update, payload, completion) so the kinds
//! stay mutually exclusive even when a line happens to contain two markers.

use regex::Regex;
use std::sync::OnceLock;

use crate::constants::markers::{
    TRANSACTION_COMPLETE, TRANSACTION_START, UPDATE_ATTEMPT, XML_DOCUMENT_START,
};
use crate::identifier::normalize_account_id;
use crate::timestamp::{TimestampPrefix, inspect_prefix};
use crate::types::{AccountId, LineNumber, VisitCount};

/// Event kind recognized on one trace line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LineEvent {
    /// `Starting API call for Purdue ID: <id>` opens a transaction.
    TransactionStart {
        /// Canonical identifier of the account.
        account: AccountId,
    },
    /// `PUT Request URL: .../users/<id>?...` marks the external update.
    UpdateAttempt {
        /// Canonical identifier from the request path.
        account: AccountId,
    },
    /// The line starts an XML document; the block is assembled by the reader.
    ResponsePayload {
        /// Byte offset of the `<?xml` marker within the line.
        offset: usize,
    },
    /// `Logged check-in for user: <id>` with an optional `Visit #<n>`.
    TransactionComplete {
        /// Canonical identifier of the account.
        account: AccountId,
        /// Visit number, when the line carries one.
        visit: Option<VisitCount>,
    },
    /// Anything else, including marker lines whose identifier is not valid.
    Other,
}

/// One physical line of a debug trace with its derived fields.
#[derive(Clone, Debug)]
pub struct LogLine {
    /// One-based line number within the trace.
    pub number: LineNumber,
    /// Raw text without the line terminator.
    pub text: String,
    /// Leading timestamp inspection result.
    pub prefix: TimestampPrefix,
    /// Classified event kind.
    pub event: LineEvent,
}

impl LogLine {
    /// Derive timestamp and classification for a raw line.
    pub fn parse(number: LineNumber, text: impl Into<String>) -> Self {
        let text = text.into();
        let prefix = inspect_prefix(&text);
        let event = classify_line(&text);
        Self {
            number,
            text,
            prefix,
            event,
        }
    }

    /// True if this line begins a new log record (carries any bracketed prefix).
    pub fn starts_record(&self) -> bool {
        !matches!(self.prefix, TimestampPrefix::Absent)
    }
}

fn start_re() -> &'static Regex {
    static START_RE: OnceLock<Regex> = OnceLock::new();
    START_RE.get_or_init(|| {
        Regex::new(r"Starting API call for [^:]*:\s*(\w+)").expect("valid start regex")
    })
}

fn update_re() -> &'static Regex {
    static UPDATE_RE: OnceLock<Regex> = OnceLock::new();
    UPDATE_RE.get_or_init(|| {
        Regex::new(r"PUT Request URL: .*?/users/(\w+)\?").expect("valid update regex")
    })
}

fn complete_re() -> &'static Regex {
    static COMPLETE_RE: OnceLock<Regex> = OnceLock::new();
    COMPLETE_RE.get_or_init(|| {
        Regex::new(r"Logged check-in for user:\s*(\w+)").expect("valid completion regex")
    })
}

fn visit_re() -> &'static Regex {
    static VISIT_RE: OnceLock<Regex> = OnceLock::new();
    VISIT_RE.get_or_init(|| Regex::new(r"Visit #(\d+)").expect("valid visit regex"))
}

/// Classify a single line by its textual markers.
pub fn classify_line(line: &str) -> LineEvent {
    if line.contains(TRANSACTION_START) {
        return capture_account(start_re(), line)
            .map(|account| LineEvent::TransactionStart { account })
            .unwrap_or(LineEvent::Other);
    }
    if line.contains(UPDATE_ATTEMPT) {
        return capture_account(update_re(), line)
            .map(|account| LineEvent::UpdateAttempt { account })
            .unwrap_or(LineEvent::Other);
    }
    if let Some(offset) = line.find(XML_DOCUMENT_START) {
        return LineEvent::ResponsePayload { offset };
    }
    if line.contains(TRANSACTION_COMPLETE) {
        return capture_account(complete_re(), line)
            .map(|account| LineEvent::TransactionComplete {
                account,
                visit: extract_visit_count(line),
            })
            .unwrap_or(LineEvent::Other);
    }
    LineEvent::Other
}

/// Extract `n` from `Visit #n`.
pub fn extract_visit_count(line: &str) -> Option<VisitCount> {
    visit_re()
        .captures(line)
        .and_then(|caps| caps[1].parse::<VisitCount>().ok())
}

fn capture_account(pattern: &Regex, line: &str) -> Option<AccountId> {
    pattern
        .captures(line)
        .and_then(|caps| normalize_account_id(&caps[1]))
}
