#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Reusable CLI runners behind the shipped binaries.
pub mod apps;
/// Agreement-note audit over the canonical store's accounts.
pub mod audit;
/// Log-line classification.
pub mod classify;
/// Recovery and report configuration types.
pub mod config;
/// Centralized constants used across parsing, correlation, and reporting.
pub mod constants;
/// Transaction correlation over a debug trace.
pub mod correlate;
/// Account identifier normalization.
pub mod identifier;
/// XML payload helpers.
pub mod payload;
/// Deduplicated recovery pipeline.
pub mod recovery;
/// Trace-versus-store discrepancy report.
pub mod report;
/// Canonical check-in store readers and writers.
pub mod store;
/// Bracketed log timestamp parsing and localization.
pub mod timestamp;
/// Input transports for debug traces (filesystem today).
pub mod transport;
/// Shared type aliases.
pub mod types;

mod errors;

pub use audit::{
    AgreementStatus, AuditSummary, ExportDirectory, InMemoryDirectory, UserDirectory,
};
pub use config::{PendingPolicy, RecoveryConfig, ReportConfig};
pub use correlate::{CompletedTransaction, CorrelationStats, Correlator, DedupKey};
pub use errors::RecoveryError;
pub use identifier::normalize_account_id;
pub use recovery::{RecoverySummary, RecoveryWriter, recover_file, recover_trace};
pub use report::{DiscrepancyReport, TraceAccounts, build_report};
pub use store::{CheckinLog, CheckinStore, CsvCheckinStore, MemoryCheckinStore};
pub use transport::fs::{DebugTrace, TraceEntry};
pub use types::{AccountId, CategoryLabel, LocalTimestamp, RawIdentifier, VisitCount};
