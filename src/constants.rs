/// Constants used by identifier normalization.
pub mod identifier {
    /// Minimum canonical identifier length (inclusive).
    pub const MIN_ACCOUNT_DIGITS: usize = 8;
    /// Maximum canonical identifier length (inclusive).
    pub const MAX_ACCOUNT_DIGITS: usize = 10;
    /// Two-digit suffixes stripped from otherwise valid identifiers.
    pub const ARTIFACT_SUFFIXES: [&str; 2] = ["01", "02"];
}

/// Constants used by timestamp extraction and localization.
pub mod timestamp {
    /// `chrono` format of the bracketed log-line timestamp.
    pub const LOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
    /// IANA zone the originating system writes its wall-clock timestamps in.
    pub const DEFAULT_TIME_ZONE: &str = "America/Indianapolis";
}

/// Textual markers recognized by the log-line classifier.
pub mod markers {
    /// Marker opening a transaction (`Starting API call for Purdue ID: 12345678`).
    pub const TRANSACTION_START: &str = "Starting API call for";
    /// Marker of the external update request line.
    pub const UPDATE_ATTEMPT: &str = "PUT Request URL:";
    /// Marker that begins an XML document.
    pub const XML_DOCUMENT_START: &str = "<?xml";
    /// Marker of the completion line written after a successful check-in.
    pub const TRANSACTION_COMPLETE: &str = "Logged check-in for user:";
    /// Leaf element holding the account's category in response payloads.
    pub const CATEGORY_ELEMENT: &str = "user_group";
    /// Leaf element naming the account a response payload belongs to.
    pub const PRIMARY_ID_ELEMENT: &str = "primary_id";
}

/// Constants used by the transaction correlator.
pub mod correlate {
    /// Maximum seconds between a transaction start and its terminal events.
    pub const DEFAULT_TIMEOUT_SECS: i64 = 60;
}

/// Constants used by the canonical check-in store.
pub mod store {
    /// Field delimiter of canonical store rows.
    pub const FIELD_DELIMITER: char = ',';
    /// Placeholder identifier the web application writes when lookup failed.
    pub const UNKNOWN_ACCOUNT: &str = "UNKNOWN";
    /// Prefix of placeholder identifiers written for failed requests.
    pub const ERROR_ACCOUNT_PREFIX: &str = "ERROR";
}

/// Constants used by the discrepancy reporter.
pub mod report {
    /// Default debug trace read by the reporter.
    pub const DEFAULT_DEBUG_LOG: &str = "logs/debug.log";
    /// Default canonical store read by the reporter.
    pub const DEFAULT_CHECKIN_LOG: &str = "logs/checkin_log.csv";
}

/// Constants used by the agreement-note audit.
pub mod audit {
    /// Note text identifying the user agreement.
    pub const AGREEMENT_NOTE_TEXT: &str = "Agreed to Knowledge Lab User Agreement";
    /// Segment the agreement note is expected to live in.
    pub const EXPECTED_NOTE_SEGMENT: &str = "Internal";
    /// Element wrapping a single account note.
    pub const NOTE_ELEMENT: &str = "user_note";
    /// Element holding a note's text.
    pub const NOTE_TEXT_ELEMENT: &str = "note_text";
    /// Attribute holding a note's segment.
    pub const NOTE_SEGMENT_ATTRIBUTE: &str = "segment_type";
    /// File extension of exported account records.
    pub const RECORD_EXTENSION: &str = "xml";
}

/// Log message prefixes used by the CLI runners and pipelines.
pub mod logging {
    /// Prefix for recovery pipeline events.
    pub const RECOVER_TAG: &str = "[checkin:recover]";
    /// Prefix for discrepancy reporter events.
    pub const COMPARE_TAG: &str = "[checkin:compare]";
    /// Prefix for agreement audit events.
    pub const AUDIT_TAG: &str = "[checkin:audit]";
}
