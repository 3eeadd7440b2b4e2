//! Transaction correlation over a debug trace.
//!
//! The correlator consumes [`TraceEntry`] values in file order and keeps at
//! most one [`PendingTransaction`] per account in an insertion-ordered table.
//! Entries older than the timeout are swept whenever the trace clock
//! advances. A completion line for an account with a live pending entry is
//! terminal for that entry: it either yields a [`CompletedTransaction`] or
//! discards the entry when a precondition is missing.
//!
//! A response payload is attributed to the pending transaction named by its
//! `primary_id`; a payload without one goes to the most recently opened
//! transaction.
//!
//! Time context: a line with a parsed timestamp sets the clock, a line with
//! no bracketed prefix (payload continuation) inherits it, and a line with a
//! malformed prefix clears it. Any elapsed-time check against an unknown
//! clock counts as a timeout.

use chrono::{NaiveDateTime, TimeDelta, Timelike};
use indexmap::IndexMap;
use tracing::debug;

use crate::config::{PendingPolicy, RecoveryConfig};
use crate::classify::LineEvent;
use crate::constants::logging::RECOVER_TAG;
use crate::payload::read_response;
use crate::timestamp::{TimestampPrefix, format_second, localize};
use crate::transport::fs::TraceEntry;
use crate::types::{AccountId, CategoryLabel, LineNumber, LocalTimestamp, VisitCount};

/// In-progress transaction for one account.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingTransaction {
    /// Canonical account identifier.
    pub account: AccountId,
    /// Start time; `None` when the start line had no usable clock.
    pub started_at: Option<LocalTimestamp>,
    /// Line that opened the transaction.
    pub started_line: LineNumber,
    /// Whether the external update request was seen.
    pub update_attempted: bool,
    /// Category read from a response payload.
    pub category: Option<CategoryLabel>,
}

impl PendingTransaction {
    fn open(account: AccountId, started_at: Option<LocalTimestamp>, line: LineNumber) -> Self {
        Self {
            account,
            started_at,
            started_line: line,
            update_attempted: false,
            category: None,
        }
    }
}

/// Key identifying one recovered record: account plus start second.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DedupKey {
    /// Canonical account identifier.
    pub account: AccountId,
    /// Local wall-clock start time truncated to the second.
    pub second: NaiveDateTime,
}

impl DedupKey {
    /// Build a key, truncating any sub-second component.
    pub fn new(account: impl Into<AccountId>, wall_clock: NaiveDateTime) -> Self {
        Self {
            account: account.into(),
            second: wall_clock.with_nanosecond(0).unwrap_or(wall_clock),
        }
    }
}

/// A fully correlated check-in.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletedTransaction {
    /// Canonical account identifier.
    pub account: AccountId,
    /// Transaction start time (not the completion line's time).
    pub started_at: LocalTimestamp,
    /// Account category from the response payload.
    pub category: CategoryLabel,
    /// Visit number from the completion line.
    pub visit_count: VisitCount,
}

impl CompletedTransaction {
    /// Deduplication key for this record.
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey::new(self.account.clone(), self.started_at.naive_local())
    }

    /// Canonical store row: `identifier,YYYY-MM-DD HH:MM:SS,category,count`.
    pub fn to_row(&self) -> String {
        format!(
            "{},{},{},{}",
            self.account,
            format_second(&self.started_at),
            self.category,
            self.visit_count
        )
    }
}

/// Counters describing one correlation pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CorrelationStats {
    /// Physical lines observed.
    pub lines: usize,
    /// Transactions opened by start lines.
    pub opened: usize,
    /// Completion lines that produced a record.
    pub completed: usize,
    /// Matching completion lines that failed a precondition.
    pub incomplete: usize,
    /// Completion lines with no live pending transaction for their account.
    pub unmatched_completions: usize,
    /// Pending transactions dropped by the timeout sweep.
    pub expired: usize,
    /// Pending transactions replaced by a later start.
    pub superseded: usize,
    /// Pending transactions still open at end of trace.
    pub left_open: usize,
    /// Payload blocks that did not yield a category.
    pub payloads_without_category: usize,
}

/// Why a matching completion line did not produce a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MissingPrecondition {
    /// The start line had no usable timestamp.
    StartTime,
    /// No response payload supplied a category.
    Category,
    /// No update request was seen for the account.
    UpdateAttempt,
    /// The completion line carried no parseable visit count.
    VisitCount,
}

/// Per-account transaction state machine over a single trace pass.
pub struct Correlator {
    timeout: TimeDelta,
    zone: chrono_tz::Tz,
    policy: PendingPolicy,
    pending: IndexMap<AccountId, PendingTransaction>,
    clock: Option<LocalTimestamp>,
    stats: CorrelationStats,
}

impl Correlator {
    /// Create a correlator from run settings.
    pub fn new(config: &RecoveryConfig) -> Self {
        Self {
            timeout: config.timeout,
            zone: config.time_zone,
            policy: config.pending_policy,
            pending: IndexMap::new(),
            clock: None,
            stats: CorrelationStats::default(),
        }
    }

    /// Live pending transaction for `account`, if any.
    pub fn pending_for(&self, account: &str) -> Option<&PendingTransaction> {
        self.pending.get(account)
    }

    /// Live pending transactions, oldest start first.
    pub fn pending(&self) -> impl Iterator<Item = &PendingTransaction> {
        self.pending.values()
    }

    /// Counters so far.
    pub fn stats(&self) -> CorrelationStats {
        self.stats
    }

    /// Feed the next trace entry; returns a record when a transaction completes.
    pub fn observe(&mut self, entry: &TraceEntry) -> Option<CompletedTransaction> {
        self.stats.lines += 1;
        let now = self.advance_clock(entry.line.prefix);
        if now.is_some() {
            self.sweep(now);
        }

        match &entry.line.event {
            LineEvent::TransactionStart { account } => {
                self.open(account.clone(), now, entry.line.number);
                None
            }
            LineEvent::UpdateAttempt { account } => {
                if let Some(pending) = self.pending.get_mut(account) {
                    pending.update_attempted = true;
                }
                None
            }
            LineEvent::ResponsePayload { .. } => {
                if let Some(payload) = entry.payload.as_deref() {
                    self.categorize(payload, now, entry.line.number);
                }
                None
            }
            LineEvent::TransactionComplete { account, visit } => {
                self.complete(account, *visit, now, entry.line.number)
            }
            LineEvent::Other => None,
        }
    }

    /// End the pass, counting transactions that never completed.
    pub fn finish(mut self) -> CorrelationStats {
        self.stats.left_open = self.pending.len();
        self.stats
    }

    fn advance_clock(&mut self, prefix: TimestampPrefix) -> Option<LocalTimestamp> {
        match prefix {
            TimestampPrefix::Absent => {}
            TimestampPrefix::Malformed => self.clock = None,
            TimestampPrefix::Parsed(wall_clock) => self.clock = localize(wall_clock, self.zone),
        }
        self.clock
    }

    fn within_window(
        &self,
        started_at: Option<LocalTimestamp>,
        now: Option<LocalTimestamp>,
    ) -> bool {
        match (started_at, now) {
            (Some(start), Some(now)) => now.signed_duration_since(start) <= self.timeout,
            _ => false,
        }
    }

    fn sweep(&mut self, now: Option<LocalTimestamp>) {
        let before = self.pending.len();
        let timeout = self.timeout;
        self.pending.retain(|account, pending| {
            let keep = match (pending.started_at, now) {
                (Some(start), Some(now)) => now.signed_duration_since(start) <= timeout,
                _ => false,
            };
            if !keep {
                debug!(
                    "{} pending transaction for {} (line {}) expired",
                    RECOVER_TAG, account, pending.started_line
                );
            }
            keep
        });
        self.stats.expired += before - self.pending.len();
    }

    fn open(&mut self, account: AccountId, now: Option<LocalTimestamp>, line: LineNumber) {
        if self.policy == PendingPolicy::SingleSlot {
            let before = self.pending.len();
            self.pending.retain(|other, _| *other == account);
            self.stats.superseded += before - self.pending.len();
        }
        if self.pending.shift_remove(&account).is_some() {
            self.stats.superseded += 1;
        }
        self.pending
            .insert(account.clone(), PendingTransaction::open(account, now, line));
        self.stats.opened += 1;
    }

    fn categorize(&mut self, payload: &str, now: Option<LocalTimestamp>, line: LineNumber) {
        let response = read_response(payload);
        let target = match response.account.as_deref() {
            Some(owner) => self.pending.get_index_of(owner),
            None => self.pending.len().checked_sub(1),
        };
        let Some(index) = target else {
            debug!("{} payload at line {} matches no pending transaction", RECOVER_TAG, line);
            return;
        };
        let Some(started_at) = self.pending.get_index(index).map(|(_, pending)| pending.started_at)
        else {
            return;
        };
        if !self.within_window(started_at, now) {
            return;
        }
        match response.category {
            Some(category) => {
                if let Some((_, pending)) = self.pending.get_index_mut(index) {
                    pending.category = Some(category);
                }
            }
            None => {
                self.stats.payloads_without_category += 1;
                debug!("{} payload at line {} has no readable category", RECOVER_TAG, line);
            }
        }
    }

    fn complete(
        &mut self,
        account: &str,
        visit: Option<VisitCount>,
        now: Option<LocalTimestamp>,
        line: LineNumber,
    ) -> Option<CompletedTransaction> {
        let Some(started_at) = self.pending.get(account).map(|pending| pending.started_at) else {
            self.stats.unmatched_completions += 1;
            return None;
        };
        if !self.within_window(started_at, now) {
            return None;
        }
        let pending = self.pending.shift_remove(account)?;
        match check_preconditions(pending, visit) {
            Ok(completed) => {
                self.stats.completed += 1;
                Some(completed)
            }
            Err(missing) => {
                self.stats.incomplete += 1;
                debug!(
                    "{} completion for {} at line {} discarded: missing {:?}",
                    RECOVER_TAG, account, line, missing
                );
                None
            }
        }
    }
}

fn check_preconditions(
    pending: PendingTransaction,
    visit: Option<VisitCount>,
) -> Result<CompletedTransaction, MissingPrecondition> {
    let started_at = pending.started_at.ok_or(MissingPrecondition::StartTime)?;
    let category = pending.category.ok_or(MissingPrecondition::Category)?;
    if !pending.update_attempted {
        return Err(MissingPrecondition::UpdateAttempt);
    }
    let visit_count = visit.ok_or(MissingPrecondition::VisitCount)?;
    Ok(CompletedTransaction {
        account: pending.account,
        started_at,
        category,
        visit_count,
    })
}

/// Run a correlator over `entries`, collecting every completed transaction.
pub fn correlate_all<I>(
    entries: I,
    config: &RecoveryConfig,
) -> (Vec<CompletedTransaction>, CorrelationStats)
where
    I: IntoIterator<Item = TraceEntry>,
{
    let mut correlator = Correlator::new(config);
    let completed = entries
        .into_iter()
        .filter_map(|entry| correlator.observe(&entry))
        .collect();
    (completed, correlator.finish())
}
