use std::collections::HashSet;
use std::io::{self, Write};
use std::path::Path;
use tracing::{debug, info};

use crate::config::RecoveryConfig;
use crate::constants::logging::RECOVER_TAG;
use crate::correlate::{CompletedTransaction, CorrelationStats, Correlator, DedupKey};
use crate::errors::RecoveryError;
use crate::store::{CheckinLog, CheckinStore, CsvCheckinStore};
use crate::timestamp::format_second;
use crate::transport::fs::DebugTrace;

/// Result of offering one completed transaction to the writer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The record was new and has been appended.
    Appended,
    /// The key was already emitted; nothing was written.
    Duplicate,
}

/// Deduplicating front end of a [`CheckinStore`].
///
/// Keys start empty unless seeded, so uniqueness only holds within the
/// keys this writer has seen.
pub struct RecoveryWriter<S> {
    store: S,
    seen: HashSet<DedupKey>,
}

impl<S: CheckinStore> RecoveryWriter<S> {
    /// Wrap `store` with an empty key set.
    pub fn new(store: S) -> Self {
        Self {
            store,
            seen: HashSet::new(),
        }
    }

    /// Treat `keys` as already emitted.
    pub fn with_seen_keys(mut self, keys: impl IntoIterator<Item = DedupKey>) -> Self {
        self.seen.extend(keys);
        self
    }

    /// Append `record` unless its key was already emitted.
    pub fn offer(&mut self, record: &CompletedTransaction) -> Result<WriteOutcome, RecoveryError> {
        let key = record.dedup_key();
        if self.seen.contains(&key) {
            return Ok(WriteOutcome::Duplicate);
        }
        self.store.append(record)?;
        self.seen.insert(key);
        Ok(WriteOutcome::Appended)
    }

    /// Number of known keys.
    pub fn seen_len(&self) -> usize {
        self.seen.len()
    }

    /// Borrow the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Release the underlying store.
    pub fn into_store(self) -> S {
        self.store
    }
}

/// Counters for one recovery run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RecoverySummary {
    /// Correlation counters.
    pub correlation: CorrelationStats,
    /// Records appended to the destination.
    pub recovered: usize,
    /// Completed transactions dropped as duplicates.
    pub duplicates: usize,
    /// Keys seeded from the destination before the pass.
    pub seeded_keys: usize,
}

impl RecoverySummary {
    /// Write a human-readable summary.
    pub fn write_text(&self, out: &mut dyn Write) -> io::Result<()> {
        let stats = &self.correlation;
        writeln!(out, "Lines scanned: {}", stats.lines)?;
        writeln!(out, "Transactions opened: {}", stats.opened)?;
        writeln!(out, "Transactions completed: {}", stats.completed)?;
        writeln!(out, "Entries recovered: {}", self.recovered)?;
        writeln!(out, "Duplicates skipped: {}", self.duplicates)?;
        writeln!(
            out,
            "Abandoned: {} expired, {} superseded, {} incomplete, {} still open",
            stats.expired, stats.superseded, stats.incomplete, stats.left_open
        )?;
        Ok(())
    }
}

/// Correlate `trace` and hand every completed transaction to `writer`.
pub fn recover_trace<S: CheckinStore>(
    trace: &DebugTrace,
    config: &RecoveryConfig,
    writer: &mut RecoveryWriter<S>,
) -> Result<RecoverySummary, RecoveryError> {
    let mut correlator = Correlator::new(config);
    let mut summary = RecoverySummary::default();
    for entry in trace.entries() {
        let Some(record) = correlator.observe(&entry) else {
            continue;
        };
        match writer.offer(&record)? {
            WriteOutcome::Appended => {
                summary.recovered += 1;
                info!(
                    "{} recovered entry for {} at {}",
                    RECOVER_TAG,
                    record.account,
                    format_second(&record.started_at)
                );
            }
            WriteOutcome::Duplicate => {
                summary.duplicates += 1;
                debug!(
                    "{} duplicate entry for {} at {} skipped",
                    RECOVER_TAG,
                    record.account,
                    format_second(&record.started_at)
                );
            }
        }
    }
    summary.correlation = correlator.finish();
    Ok(summary)
}

/// Recover check-ins from the debug trace at `input` into the CSV at `output`.
pub fn recover_file(
    input: &Path,
    output: &Path,
    config: &RecoveryConfig,
) -> Result<RecoverySummary, RecoveryError> {
    let config = config.clone().validated()?;
    info!("{} processing debug log: {}", RECOVER_TAG, input.display());
    info!("{} output will be written to: {}", RECOVER_TAG, output.display());

    let trace = DebugTrace::open(input)?;
    let seeded: HashSet<DedupKey> = if config.seed_keys_from_output {
        CheckinLog::read_or_empty(output)?.dedup_keys()
    } else {
        HashSet::new()
    };
    let seeded_keys = seeded.len();

    let mut writer = RecoveryWriter::new(CsvCheckinStore::open(output)?).with_seen_keys(seeded);
    let mut summary = recover_trace(&trace, &config, &mut writer)?;
    summary.seeded_keys = seeded_keys;

    info!(
        "{} done: {} recovered, {} duplicates, {} lines",
        RECOVER_TAG, summary.recovered, summary.duplicates, summary.correlation.lines
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCheckinStore;
    use chrono::TimeZone;
    use chrono_tz::America::Indianapolis;

    fn record(account: &str, second: u32) -> CompletedTransaction {
        CompletedTransaction {
            account: account.to_string(),
            started_at: Indianapolis
                .with_ymd_and_hms(2025, 2, 14, 9, 30, second)
                .unwrap(),
            category: "Student".to_string(),
            visit_count: 2,
        }
    }

    #[test]
    fn writer_drops_repeated_keys_within_a_run() {
        let mut writer = RecoveryWriter::new(MemoryCheckinStore::new());
        assert_eq!(writer.offer(&record("12345678", 1)).unwrap(), WriteOutcome::Appended);
        assert_eq!(writer.offer(&record("12345678", 1)).unwrap(), WriteOutcome::Duplicate);
        assert_eq!(writer.offer(&record("12345678", 2)).unwrap(), WriteOutcome::Appended);
        assert_eq!(writer.seen_len(), 2);
        assert_eq!(writer.store().rows().len(), 2);
    }

    #[test]
    fn writer_key_ignores_category_and_count() {
        let mut writer = RecoveryWriter::new(MemoryCheckinStore::new());
        writer.offer(&record("12345678", 1)).unwrap();
        let mut variant = record("12345678", 1);
        variant.category = "Faculty".to_string();
        variant.visit_count = 9;
        assert_eq!(writer.offer(&variant).unwrap(), WriteOutcome::Duplicate);
    }

    #[test]
    fn seeded_keys_suppress_output() {
        let seeded = record("12345678", 1).dedup_key();
        let mut writer = RecoveryWriter::new(MemoryCheckinStore::new()).with_seen_keys([seeded]);
        assert_eq!(writer.offer(&record("12345678", 1)).unwrap(), WriteOutcome::Duplicate);
        assert!(writer.into_store().rows().is_empty());
    }

    #[test]
    fn summary_text_lists_counters() {
        let summary = RecoverySummary {
            recovered: 2,
            duplicates: 1,
            ..RecoverySummary::default()
        };
        let mut out = Vec::new();
        summary.write_text(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Entries recovered: 2"));
        assert!(text.contains("Duplicates skipped: 1"));
    }
}
