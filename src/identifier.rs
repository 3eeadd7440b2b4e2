//! Account identifier normalization and identifier-mention extraction.
//!
//! Every identifier compared across the debug trace and the canonical store
//! goes through [`normalize_account_id`], so differently rendered forms of
//! the same account collapse to one key.

use regex::Regex;
use std::sync::OnceLock;

use crate::constants::identifier::{ARTIFACT_SUFFIXES, MAX_ACCOUNT_DIGITS, MIN_ACCOUNT_DIGITS};
use crate::types::{AccountId, RawIdentifier};

/// Which textual pattern an identifier mention was found through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MentionKind {
    /// Explicit `Purdue ID: n` form used by API call lines.
    ExplicitLabel,
    /// Bare `user: n` form used by check-in lines.
    UserLabel,
}

/// Raw identifier found in a free-text line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountMention {
    /// Pattern that matched.
    pub kind: MentionKind,
    /// Digits captured by the pattern, not yet normalized.
    pub raw: RawIdentifier,
}

fn explicit_label_re() -> &'static Regex {
    static EXPLICIT_LABEL_RE: OnceLock<Regex> = OnceLock::new();
    EXPLICIT_LABEL_RE
        .get_or_init(|| Regex::new(r"Purdue ID: (\d+)").expect("valid explicit label regex"))
}

fn user_label_re() -> &'static Regex {
    static USER_LABEL_RE: OnceLock<Regex> = OnceLock::new();
    USER_LABEL_RE.get_or_init(|| Regex::new(r"user: (\d+)").expect("valid user label regex"))
}

/// Canonicalize a raw identifier, or return `None` when it is not one.
///
/// Non-digits and leading zeros are dropped; the remainder must be 8 to 10
/// digits long. A single trailing run of zeros, or a trailing `01`/`02`, is
/// then stripped and the result must still be at least 8 digits.
pub fn normalize_account_id(raw: &str) -> Option<AccountId> {
    let digits: String = raw.chars().filter(|ch| ch.is_ascii_digit()).collect();
    let significant = digits.trim_start_matches('0');
    if !(MIN_ACCOUNT_DIGITS..=MAX_ACCOUNT_DIGITS).contains(&significant.len()) {
        return None;
    }
    let stripped = strip_artifact_suffix(significant);
    if stripped.len() < MIN_ACCOUNT_DIGITS {
        return None;
    }
    Some(stripped.to_string())
}

fn strip_artifact_suffix(digits: &str) -> &str {
    if digits.ends_with('0') {
        return digits.trim_end_matches('0');
    }
    ARTIFACT_SUFFIXES
        .iter()
        .find_map(|suffix| digits.strip_suffix(suffix))
        .unwrap_or(digits)
}

/// Find the first identifier mention in a line.
///
/// The explicit `Purdue ID:` form wins over the bare `user:` form when a
/// line carries both.
pub fn find_account_mention(line: &str) -> Option<AccountMention> {
    if let Some(caps) = explicit_label_re().captures(line) {
        return Some(AccountMention {
            kind: MentionKind::ExplicitLabel,
            raw: caps[1].to_string(),
        });
    }
    user_label_re().captures(line).map(|caps| AccountMention {
        kind: MentionKind::UserLabel,
        raw: caps[1].to_string(),
    })
}

/// Find the first identifier mention in a line and normalize it.
pub fn find_account_id(line: &str) -> Option<AccountId> {
    find_account_mention(line).and_then(|mention| normalize_account_id(&mention.raw))
}
