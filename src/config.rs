use chrono::TimeDelta;
use chrono_tz::Tz;
use std::path::PathBuf;

use crate::constants::correlate::DEFAULT_TIMEOUT_SECS;
use crate::constants::report::{DEFAULT_CHECKIN_LOG, DEFAULT_DEBUG_LOG};
use crate::errors::RecoveryError;

/// How pending transactions for different accounts coexist.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PendingPolicy {
    /// One pending transaction per account; interleaved accounts are kept
    /// apart and evicted only by the timeout sweep.
    #[default]
    Keyed,
    /// A start for one account abandons every other account's pending
    /// transaction, matching a strictly serialized originating system.
    SingleSlot,
}

/// Settings for one recovery run.
#[derive(Clone, Debug)]
pub struct RecoveryConfig {
    /// Maximum elapsed time from a transaction start to its payload and completion.
    pub timeout: TimeDelta,
    /// Civil time zone the trace timestamps are written in.
    pub time_zone: Tz,
    /// Pending-state policy for interleaved accounts.
    pub pending_policy: PendingPolicy,
    /// Rebuild dedup keys from the destination before appending.
    ///
    /// Off by default: keys are seeded empty, so re-running over the same
    /// trace appends records already present from an earlier run.
    pub seed_keys_from_output: bool,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            timeout: TimeDelta::seconds(DEFAULT_TIMEOUT_SECS),
            time_zone: chrono_tz::America::Indianapolis,
            pending_policy: PendingPolicy::default(),
            seed_keys_from_output: false,
        }
    }
}

impl RecoveryConfig {
    /// Override the correlation timeout in whole seconds.
    pub fn with_timeout_secs(mut self, secs: i64) -> Self {
        self.timeout = TimeDelta::seconds(secs);
        self
    }

    /// Override the civil time zone.
    pub fn with_time_zone(mut self, time_zone: Tz) -> Self {
        self.time_zone = time_zone;
        self
    }

    /// Override the pending-state policy.
    pub fn with_pending_policy(mut self, pending_policy: PendingPolicy) -> Self {
        self.pending_policy = pending_policy;
        self
    }

    /// Enable or disable dedup seeding from the destination.
    pub fn with_seed_keys_from_output(mut self, seed: bool) -> Self {
        self.seed_keys_from_output = seed;
        self
    }

    /// Reject settings the correlator cannot run with.
    pub fn validated(self) -> Result<Self, RecoveryError> {
        if self.timeout <= TimeDelta::zero() {
            return Err(RecoveryError::Configuration(
                "correlation timeout must be greater than zero".to_string(),
            ));
        }
        Ok(self)
    }
}

/// Input locations for the discrepancy reporter.
#[derive(Clone, Debug)]
pub struct ReportConfig {
    /// Debug trace to scan for identifiers.
    pub debug_log: PathBuf,
    /// Canonical check-in store to compare against.
    pub checkin_log: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            debug_log: PathBuf::from(DEFAULT_DEBUG_LOG),
            checkin_log: PathBuf::from(DEFAULT_CHECKIN_LOG),
        }
    }
}
