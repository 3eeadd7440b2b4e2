use chrono::DateTime;
use chrono_tz::Tz;

/// Canonical account identifier produced by the identifier normalizer.
/// Examples: `12345678`, `2345678901`
pub type AccountId = String;
/// Raw identifier text as it appears in a log line, before normalization.
/// Examples: `0012345678`, `12345678901`, `00-1234-5678`
pub type RawIdentifier = String;
/// Category (user group) label read from a response payload.
/// Examples: `Student`, `Faculty`, `GRAD`
pub type CategoryLabel = String;
/// Visit number carried by a completion line.
/// Example: `3` from `Visit #3`
pub type VisitCount = u32;
/// One-based physical line number within a debug trace.
pub type LineNumber = usize;
/// Timestamp localized to the configured civil time zone.
/// Example: `2025-02-14 09:30:12 EST`
pub type LocalTimestamp = DateTime<Tz>;
/// Raw bracketed timestamp text kept verbatim for reporting.
/// Example: `2025-02-14 09:30:12`
pub type TimestampText = String;
/// Raw XML payload block assembled from one or more trace lines.
/// Example: `<?xml version="1.0"?><user><user_group>Student</user_group></user>`
pub type PayloadText = String;
