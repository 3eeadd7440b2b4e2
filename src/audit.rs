//! Agreement-note audit over the accounts in the canonical store.
//!
//! The remote library system is reached only through [`UserDirectory`].
//! Each account is checked independently: a failed fetch or an unreadable
//! record is counted and the batch moves on.

use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::constants::audit::{
    AGREEMENT_NOTE_TEXT, EXPECTED_NOTE_SEGMENT, NOTE_ELEMENT, NOTE_SEGMENT_ATTRIBUTE,
    NOTE_TEXT_ELEMENT, RECORD_EXTENSION,
};
use crate::constants::logging::AUDIT_TAG;
use crate::errors::RecoveryError;
use crate::payload::{element_text, find_element, parse_document};
use crate::store::CheckinLog;

/// Read access to account records held by the remote library system.
pub trait UserDirectory {
    /// Fetch the full XML record for `account`.
    fn fetch_user(&self, account: &str) -> Result<String, RecoveryError>;
}

/// Directory backed by a map of account to XML record.
#[derive(Clone, Debug, Default)]
pub struct InMemoryDirectory {
    records: HashMap<String, String>,
}

impl InMemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the record for `account`.
    pub fn with_record(mut self, account: impl Into<String>, xml: impl Into<String>) -> Self {
        self.records.insert(account.into(), xml.into());
        self
    }
}

impl UserDirectory for InMemoryDirectory {
    fn fetch_user(&self, account: &str) -> Result<String, RecoveryError> {
        self.records
            .get(account)
            .cloned()
            .ok_or_else(|| RecoveryError::RemoteUnavailable {
                account: account.to_string(),
                reason: "no such user".to_string(),
            })
    }
}

/// Directory of exported account records, one `<account>.xml` file each.
#[derive(Clone, Debug)]
pub struct ExportDirectory {
    root: PathBuf,
}

impl ExportDirectory {
    /// Use the records under `root`; the directory must exist.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, RecoveryError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(RecoveryError::InputMissing { path: root });
        }
        Ok(Self { root })
    }

    /// Directory the records are read from.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl UserDirectory for ExportDirectory {
    fn fetch_user(&self, account: &str) -> Result<String, RecoveryError> {
        let path = self.root.join(format!("{account}.{RECORD_EXTENSION}"));
        fs::read_to_string(&path).map_err(|err| RecoveryError::RemoteUnavailable {
            account: account.to_string(),
            reason: format!("{}: {}", path.display(), err),
        })
    }
}

/// Agreement-note state of one account record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AgreementStatus {
    /// The note exists in the expected segment.
    Compliant,
    /// The note exists in another (or no) segment.
    WrongSegment(Option<String>),
    /// The record has no agreement note.
    Missing,
}

/// Inspect a user record; `None` when the XML is unreadable.
pub fn agreement_status(user_xml: &str) -> Option<AgreementStatus> {
    let document = parse_document(user_xml)?;
    let note = document
        .descendants()
        .filter(|node| node.is_element() && node.has_tag_name(NOTE_ELEMENT))
        .find(|note| {
            find_element(*note, NOTE_TEXT_ELEMENT)
                .and_then(element_text)
                .is_some_and(|text| text.contains(AGREEMENT_NOTE_TEXT))
        });
    let Some(note) = note else {
        return Some(AgreementStatus::Missing);
    };
    match note.attribute(NOTE_SEGMENT_ATTRIBUTE) {
        Some(EXPECTED_NOTE_SEGMENT) => Some(AgreementStatus::Compliant),
        other => Some(AgreementStatus::WrongSegment(other.map(str::to_string))),
    }
}

/// Tallies for one audit batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AuditSummary {
    /// Accounts attempted.
    pub processed: usize,
    /// Accounts whose note is in the expected segment.
    pub compliant: usize,
    /// Accounts whose note is in another segment.
    pub wrong_segment: usize,
    /// Accounts without the note.
    pub missing_note: usize,
    /// Accounts that could not be fetched or read.
    pub failed: usize,
}

impl AuditSummary {
    /// Write a human-readable summary.
    pub fn write_text(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "Total users processed: {}", self.processed)?;
        writeln!(out, "Users with note in expected segment: {}", self.compliant)?;
        writeln!(out, "Users with note in wrong segment: {}", self.wrong_segment)?;
        writeln!(out, "Users without agreement note: {}", self.missing_note)?;
        writeln!(out, "Users with errors: {}", self.failed)
    }
}

/// Audit every real account recorded in `log`.
pub fn audit_store<D>(directory: &D, log: &CheckinLog) -> AuditSummary
where
    D: UserDirectory + ?Sized,
{
    let accounts = log.unique_accounts();
    info!("{} auditing {} accounts", AUDIT_TAG, accounts.len());
    audit_accounts(directory, accounts.iter().map(String::as_str))
}

/// Check every account's agreement note through `directory`.
pub fn audit_accounts<'a, D>(
    directory: &D,
    accounts: impl IntoIterator<Item = &'a str>,
) -> AuditSummary
where
    D: UserDirectory + ?Sized,
{
    let mut summary = AuditSummary::default();
    for account in accounts {
        summary.processed += 1;
        let xml = match directory.fetch_user(account) {
            Ok(xml) => xml,
            Err(err) => {
                warn!("{} {}", AUDIT_TAG, err);
                summary.failed += 1;
                continue;
            }
        };
        match agreement_status(&xml) {
            Some(AgreementStatus::Compliant) => summary.compliant += 1,
            Some(AgreementStatus::WrongSegment(segment)) => {
                info!(
                    "{} user {} has agreement note in {} segment",
                    AUDIT_TAG,
                    account,
                    segment.as_deref().unwrap_or("no")
                );
                summary.wrong_segment += 1;
            }
            Some(AgreementStatus::Missing) => summary.missing_note += 1,
            None => {
                warn!("{} user {} record is not readable XML", AUDIT_TAG, account);
                summary.failed += 1;
            }
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_xml(note: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<user>
  <primary_id>12345678</primary_id>
  <user_notes>{note}</user_notes>
</user>"#
        )
    }

    fn agreement_note(segment: &str) -> String {
        format!(
            r#"<user_note segment_type="{segment}"><note_type>CIRCULATION</note_type><note_text>Agreed to Knowledge Lab User Agreement</note_text></user_note>"#
        )
    }

    #[test]
    fn status_detects_segment_and_absence() {
        assert_eq!(
            agreement_status(&user_xml(&agreement_note("Internal"))),
            Some(AgreementStatus::Compliant)
        );
        assert_eq!(
            agreement_status(&user_xml(&agreement_note("External"))),
            Some(AgreementStatus::WrongSegment(Some("External".to_string())))
        );
        assert_eq!(
            agreement_status(&user_xml(
                "<user_note><note_text>Paid fine</note_text></user_note>"
            )),
            Some(AgreementStatus::Missing)
        );
        assert_eq!(agreement_status("<user>"), None);
    }

    #[test]
    fn audit_counts_failures_and_continues() {
        let directory = InMemoryDirectory::new()
            .with_record("11111111", user_xml(&agreement_note("Internal")))
            .with_record("22222222", user_xml(&agreement_note("External")))
            .with_record("33333333", user_xml(""))
            .with_record("44444444", "not xml");
        let summary = audit_accounts(
            &directory,
            ["11111111", "22222222", "33333333", "44444444", "55555555"],
        );
        assert_eq!(
            summary,
            AuditSummary {
                processed: 5,
                compliant: 1,
                wrong_segment: 1,
                missing_note: 1,
                failed: 2,
            }
        );

        let mut out = Vec::new();
        summary.write_text(&mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("Users with errors: 2"));
    }

    #[test]
    fn export_directory_reads_one_file_per_account() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(
            temp.path().join("11111111.xml"),
            user_xml(&agreement_note("Internal")),
        )
        .unwrap();
        let directory = ExportDirectory::open(temp.path()).unwrap();
        assert_eq!(directory.root(), temp.path());

        let summary = audit_accounts(&directory, ["11111111", "22222222"]);
        assert_eq!(summary.compliant, 1);
        assert_eq!(summary.failed, 1);
        assert!(matches!(
            directory.fetch_user("22222222"),
            Err(RecoveryError::RemoteUnavailable { .. })
        ));

        assert!(matches!(
            ExportDirectory::open(temp.path().join("absent")),
            Err(RecoveryError::InputMissing { .. })
        ));
    }

    #[test]
    fn store_audit_skips_placeholder_accounts() {
        let log = CheckinLog::from_text(
            "11111111,2025-02-14 09:30:12,Student\nUNKNOWN,2025-02-14 09:31:00,\n11111111,2025-02-15 10:00:00,Student\nERROR_404,2025-02-14 09:32:00,\n",
        );
        let directory =
            InMemoryDirectory::new().with_record("11111111", user_xml(&agreement_note("Internal")));
        let summary = audit_store(&directory, &log);
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.compliant, 1);
        assert_eq!(summary.failed, 0);
    }
}
