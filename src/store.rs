//! Canonical check-in store: the append-only CSV of confirmed check-ins.
//!
//! Rows have no header. The web application writes three fields
//! (`identifier,timestamp,category`); recovered rows carry a fourth visit
//! count. Readers accept both shapes.

use chrono::NaiveDateTime;
use std::collections::{BTreeSet, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::constants::logging::RECOVER_TAG;
use crate::constants::store::{ERROR_ACCOUNT_PREFIX, FIELD_DELIMITER, UNKNOWN_ACCOUNT};
use crate::constants::timestamp::LOG_TIMESTAMP_FORMAT;
use crate::correlate::{CompletedTransaction, DedupKey};
use crate::errors::RecoveryError;
use crate::identifier::normalize_account_id;
use crate::types::{AccountId, CategoryLabel, LineNumber, RawIdentifier, VisitCount};

/// Append-only destination for recovered check-ins.
pub trait CheckinStore {
    /// Append one record as a canonical row.
    fn append(&mut self, record: &CompletedTransaction) -> Result<(), RecoveryError>;
}

/// In-memory store that keeps appended rows in order.
#[derive(Debug, Default)]
pub struct MemoryCheckinStore {
    rows: Vec<String>,
}

impl MemoryCheckinStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows appended so far.
    pub fn rows(&self) -> &[String] {
        &self.rows
    }
}

impl CheckinStore for MemoryCheckinStore {
    fn append(&mut self, record: &CompletedTransaction) -> Result<(), RecoveryError> {
        self.rows.push(record.to_row());
        Ok(())
    }
}

/// File-backed store opened once in append mode.
///
/// Each row is written with its own call, so rows appended before a crash
/// stay on disk. There is no locking: one writer per file.
#[derive(Debug)]
pub struct CsvCheckinStore {
    path: PathBuf,
    file: File,
}

impl CsvCheckinStore {
    /// Open (or create) the store at `path` for appending.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, RecoveryError> {
        let path = path.into();
        ensure_parent_dir(&path)?;
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file })
    }

    /// Destination path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CheckinStore for CsvCheckinStore {
    fn append(&mut self, record: &CompletedTransaction) -> Result<(), RecoveryError> {
        let mut row = record.to_row();
        row.push('\n');
        self.file.write_all(row.as_bytes())?;
        Ok(())
    }
}

/// One parsed row of the canonical store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckinRow {
    /// One-based line number in the store.
    pub line: LineNumber,
    /// Identifier exactly as written (trimmed).
    pub account: RawIdentifier,
    /// Recorded check-in time, when it parses.
    pub recorded_at: Option<NaiveDateTime>,
    /// Category, when present.
    pub category: Option<CategoryLabel>,
    /// Visit count, present on recovered rows.
    pub visit_count: Option<VisitCount>,
}

impl CheckinRow {
    /// Parse one non-blank store line by splitting on the field delimiter.
    pub fn parse(line: LineNumber, text: &str) -> Result<Self, RecoveryError> {
        let mut fields = text.trim().split(FIELD_DELIMITER).map(str::trim);
        let account = fields.next().unwrap_or_default();
        if account.is_empty() {
            return Err(RecoveryError::StoreFormat {
                line,
                details: "missing identifier field".to_string(),
            });
        }
        let recorded_at = fields
            .next()
            .and_then(|raw| NaiveDateTime::parse_from_str(raw, LOG_TIMESTAMP_FORMAT).ok());
        let category = fields
            .next()
            .filter(|raw| !raw.is_empty())
            .map(str::to_string);
        let visit_count = fields.next().and_then(|raw| raw.parse::<VisitCount>().ok());
        Ok(Self {
            line,
            account: account.to_string(),
            recorded_at,
            category,
            visit_count,
        })
    }

    /// Canonical identifier, if the row names a real account that normalizes.
    pub fn account_id(&self) -> Option<AccountId> {
        if self.is_placeholder() {
            return None;
        }
        normalize_account_id(&self.account)
    }

    /// True for placeholder identifiers written when a lookup failed.
    pub fn is_placeholder(&self) -> bool {
        self.account == UNKNOWN_ACCOUNT || self.account.starts_with(ERROR_ACCOUNT_PREFIX)
    }

    /// Dedup key, when both identifier and timestamp are usable.
    pub fn dedup_key(&self) -> Option<DedupKey> {
        Some(DedupKey::new(self.account_id()?, self.recorded_at?))
    }
}

/// The canonical store loaded for reading.
#[derive(Clone, Debug, Default)]
pub struct CheckinLog {
    rows: Vec<CheckinRow>,
    skipped: usize,
}

impl CheckinLog {
    /// Read the store at `path`; a missing file is an error.
    pub fn read(path: &Path) -> Result<Self, RecoveryError> {
        if !path.is_file() {
            return Err(RecoveryError::InputMissing {
                path: path.to_path_buf(),
            });
        }
        let bytes = fs::read(path)?;
        Ok(Self::from_text(&String::from_utf8_lossy(&bytes)))
    }

    /// Read the store at `path`, treating a missing file as empty.
    pub fn read_or_empty(path: &Path) -> Result<Self, RecoveryError> {
        if path.exists() {
            Self::read(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse store text, skipping blank and malformed lines.
    pub fn from_text(text: &str) -> Self {
        let mut log = Self::default();
        for (idx, text) in text.lines().enumerate() {
            if text.trim().is_empty() {
                continue;
            }
            match CheckinRow::parse(idx + 1, text) {
                Ok(row) => log.rows.push(row),
                Err(err) => {
                    debug!("{} skipping store row: {}", RECOVER_TAG, err);
                    log.skipped += 1;
                }
            }
        }
        log
    }

    /// Parsed rows in file order.
    pub fn rows(&self) -> &[CheckinRow] {
        &self.rows
    }

    /// Number of malformed lines skipped.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Canonical identifiers present in the store.
    pub fn account_ids(&self) -> BTreeSet<AccountId> {
        self.rows.iter().filter_map(CheckinRow::account_id).collect()
    }

    /// Raw identifiers of real accounts, placeholders excluded.
    pub fn unique_accounts(&self) -> BTreeSet<RawIdentifier> {
        self.rows
            .iter()
            .filter(|row| !row.is_placeholder())
            .map(|row| row.account.clone())
            .collect()
    }

    /// Dedup keys of every row that has one.
    pub fn dedup_keys(&self) -> HashSet<DedupKey> {
        self.rows.iter().filter_map(CheckinRow::dedup_key).collect()
    }
}

fn ensure_parent_dir(path: &Path) -> Result<(), RecoveryError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}
