use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::AccountId;

/// Error type for trace input, canonical store, and collaborator failures.
///
/// Data-level noise (bad timestamps, unparseable payloads, identifiers that
/// fail normalization) is never reported through this type.
#[derive(Debug, Error)]
pub enum RecoveryError {
    /// A required input file does not exist.
    #[error("input file not found: {}", path.display())]
    InputMissing {
        /// Path that was looked up.
        path: PathBuf,
    },
    /// A canonical store row could not be parsed.
    #[error("canonical store line {line} is malformed: {details}")]
    StoreFormat {
        /// One-based line number.
        line: usize,
        /// What was wrong with the row.
        details: String,
    },
    /// A remote account record could not be fetched.
    #[error("remote record for account '{account}' is unavailable: {reason}")]
    RemoteUnavailable {
        /// Account whose record was requested.
        account: AccountId,
        /// Collaborator-reported failure.
        reason: String,
    },
    /// Underlying filesystem failure.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// Settings the run cannot proceed with.
    #[error("configuration error: {0}")]
    Configuration(String),
}
