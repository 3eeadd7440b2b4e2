//! Discrepancy report: accounts seen in the debug trace but absent from the
//! canonical store.

use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeSet;
use std::io::{self, Write};
use std::path::Path;
use tracing::info;

use crate::config::ReportConfig;
use crate::constants::logging::COMPARE_TAG;
use crate::errors::RecoveryError;
use crate::identifier::find_account_id;
use crate::store::CheckinLog;
use crate::timestamp::find_timestamp_text;
use crate::transport::fs::DebugTrace;
use crate::types::{AccountId, TimestampText};

/// Where an account was first seen in the trace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FirstSighting {
    /// Bracketed timestamp text of the line, verbatim.
    pub timestamp: Option<TimestampText>,
    /// The originating line, trimmed.
    pub line: String,
}

/// Accounts mentioned in the trace, keyed by canonical identifier, in
/// order of first appearance.
#[derive(Clone, Debug, Default)]
pub struct TraceAccounts {
    sightings: IndexMap<AccountId, FirstSighting>,
}

impl TraceAccounts {
    /// Scan lines for `Purdue ID: n` / `user: n` mentions, keeping the first
    /// sighting per canonical identifier.
    pub fn collect<'a>(lines: impl IntoIterator<Item = &'a str>) -> Self {
        let mut accounts = Self::default();
        for line in lines {
            let Some(account) = find_account_id(line) else {
                continue;
            };
            accounts
                .sightings
                .entry(account)
                .or_insert_with(|| FirstSighting {
                    timestamp: find_timestamp_text(line).map(str::to_string),
                    line: line.trim().to_string(),
                });
        }
        accounts
    }

    /// Number of unique canonical identifiers.
    pub fn len(&self) -> usize {
        self.sightings.len()
    }

    /// True if no identifiers were found.
    pub fn is_empty(&self) -> bool {
        self.sightings.is_empty()
    }

    /// First sighting of `account`.
    pub fn sighting(&self, account: &str) -> Option<&FirstSighting> {
        self.sightings.get(account)
    }
}

/// One account present in the trace but missing from the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MissingAccount {
    /// Canonical identifier.
    pub account: AccountId,
    /// First sighting in the trace.
    #[serde(flatten)]
    pub first_seen: FirstSighting,
}

/// Comparison result between the trace and the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DiscrepancyReport {
    /// Missing accounts sorted ascending by identifier.
    pub missing: Vec<MissingAccount>,
    /// Unique identifiers in the trace.
    pub trace_unique: usize,
    /// Unique identifiers in the store.
    pub store_unique: usize,
}

impl DiscrepancyReport {
    /// Compare trace accounts against store accounts.
    pub fn compare(trace: &TraceAccounts, store: &BTreeSet<AccountId>) -> Self {
        let mut missing: Vec<MissingAccount> = trace
            .sightings
            .iter()
            .filter(|(account, _)| !store.contains(*account))
            .map(|(account, sighting)| MissingAccount {
                account: account.clone(),
                first_seen: sighting.clone(),
            })
            .collect();
        missing.sort_by(|a, b| a.account.cmp(&b.account));
        Self {
            missing,
            trace_unique: trace.len(),
            store_unique: store.len(),
        }
    }

    /// Write the human-readable report, naming the inputs by file name.
    pub fn write_text(&self, config: &ReportConfig, out: &mut dyn Write) -> io::Result<()> {
        let trace_name = display_name(&config.debug_log);
        let store_name = display_name(&config.checkin_log);
        if self.missing.is_empty() {
            writeln!(
                out,
                "\nNo missing IDs found - all IDs in {trace_name} are present in {store_name}"
            )?;
        } else {
            writeln!(
                out,
                "\nFound {} IDs in {trace_name} that are missing from {store_name}:",
                self.missing.len()
            )?;
            for entry in &self.missing {
                writeln!(out, "\nMissing ID: {}", entry.account)?;
                writeln!(
                    out,
                    "Timestamp: {}",
                    entry.first_seen.timestamp.as_deref().unwrap_or("-")
                )?;
                writeln!(out, "Log entry: {}", entry.first_seen.line)?;
            }
        }
        writeln!(out, "\nTotal unique IDs in {trace_name}: {}", self.trace_unique)?;
        writeln!(out, "Total unique IDs in {store_name}: {}", self.store_unique)?;
        Ok(())
    }

    /// Write the report as pretty-printed JSON.
    pub fn write_json(&self, out: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut *out, self)?;
        writeln!(out)
    }
}

/// Load both inputs named by `config` and compare them.
pub fn build_report(config: &ReportConfig) -> Result<DiscrepancyReport, RecoveryError> {
    let trace = DebugTrace::open(&config.debug_log)?;
    let store = CheckinLog::read(&config.checkin_log)?;
    let trace_accounts = TraceAccounts::collect(trace.raw_lines());
    let store_accounts = store.account_ids();
    let report = DiscrepancyReport::compare(&trace_accounts, &store_accounts);
    info!(
        "{} {} trace ids, {} store ids, {} missing ({} store rows skipped)",
        COMPARE_TAG,
        report.trace_unique,
        report.store_unique,
        report.missing.len(),
        store.skipped()
    );
    Ok(report)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRACE: &str = "\
[2025-02-14 09:30:12] [INFO] Starting API call for Purdue ID: 0011111111
[2025-02-14 09:30:14] [INFO] Logged check-in for user: 11111111 (Visit #1)
[2025-02-14 09:31:00] [INFO] Starting API call for Purdue ID: 22222222
[2025-02-14 09:32:00] [INFO] Starting API call for Purdue ID: 33333333
[2025-02-14 09:33:00] [INFO] Starting API call for Purdue ID: 1234
";

    fn store(ids: &[&str]) -> BTreeSet<AccountId> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn collect_keeps_first_sighting_per_account() {
        let accounts = TraceAccounts::collect(TRACE.lines());
        assert_eq!(accounts.len(), 3);
        let first = accounts.sighting("11111111").unwrap();
        assert_eq!(first.timestamp.as_deref(), Some("2025-02-14 09:30:12"));
        assert!(first.line.ends_with("Purdue ID: 0011111111"));
    }

    #[test]
    fn compare_reports_trace_only_accounts_sorted() {
        let accounts = TraceAccounts::collect(TRACE.lines());
        let report = DiscrepancyReport::compare(&accounts, &store(&["22222222"]));
        let missing: Vec<&str> = report.missing.iter().map(|m| m.account.as_str()).collect();
        assert_eq!(missing, vec!["11111111", "33333333"]);
        assert_eq!(report.trace_unique, 3);
        assert_eq!(report.store_unique, 1);
        assert_eq!(
            report.missing[1].first_seen.timestamp.as_deref(),
            Some("2025-02-14 09:32:00")
        );
    }

    #[test]
    fn text_report_names_inputs() {
        let accounts = TraceAccounts::collect(TRACE.lines());
        let report =
            DiscrepancyReport::compare(&accounts, &store(&["11111111", "22222222", "33333333"]));
        let mut out = Vec::new();
        report.write_text(&ReportConfig::default(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("No missing IDs found - all IDs in debug.log are present in checkin_log.csv"));
        assert!(text.contains("Total unique IDs in debug.log: 3"));
        assert!(text.contains("Total unique IDs in checkin_log.csv: 3"));
    }

    #[test]
    fn json_report_flattens_sightings() {
        let accounts = TraceAccounts::collect(TRACE.lines());
        let report = DiscrepancyReport::compare(&accounts, &store(&[]));
        let mut out = Vec::new();
        report.write_json(&mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["trace_unique"], 3);
        assert_eq!(value["missing"][0]["account"], "11111111");
        assert_eq!(value["missing"][0]["timestamp"], "2025-02-14 09:30:12");
    }
}
