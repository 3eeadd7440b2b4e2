use std::fs;
use std::path::{Path, PathBuf};

use crate::classify::{LineEvent, LogLine};
use crate::constants::markers::XML_DOCUMENT_START;
use crate::errors::RecoveryError;
use crate::types::PayloadText;

/// A closed, already-written debug trace loaded for a single pass.
pub struct DebugTrace {
    path: Option<PathBuf>,
    lines: Vec<String>,
}

impl DebugTrace {
    /// Load the trace at `path`.
    ///
    /// A missing file is reported as [`RecoveryError::InputMissing`]. Bytes
    /// that are not valid UTF-8 are replaced rather than rejected.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, RecoveryError> {
        let path = path.into();
        if !path.is_file() {
            return Err(RecoveryError::InputMissing { path });
        }
        let bytes = fs::read(&path)?;
        let text = String::from_utf8_lossy(&bytes);
        Ok(Self {
            lines: text.lines().map(str::to_string).collect(),
            path: Some(path),
        })
    }

    /// Build a trace from in-memory text.
    pub fn from_text(text: &str) -> Self {
        Self {
            path: None,
            lines: text.lines().map(str::to_string).collect(),
        }
    }

    /// Source path, when loaded from disk.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of physical lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// True if the trace holds no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Raw physical lines in file order.
    pub fn raw_lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// Classified entries in file order, with XML payload blocks assembled.
    pub fn entries(&self) -> TraceEntries<'_> {
        TraceEntries {
            lines: &self.lines,
            pos: 0,
        }
    }
}

/// A classified trace line plus its assembled payload, for payload lines.
#[derive(Clone, Debug)]
pub struct TraceEntry {
    /// The classified line.
    pub line: LogLine,
    /// XML block starting at this line's `<?xml` marker.
    pub payload: Option<PayloadText>,
}

/// Iterator over [`TraceEntry`] values.
///
/// Every physical line is yielded once, including the continuation lines of
/// a payload block, so classification never skips a line.
pub struct TraceEntries<'a> {
    lines: &'a [String],
    pos: usize,
}

impl Iterator for TraceEntries<'_> {
    type Item = TraceEntry;

    fn next(&mut self) -> Option<Self::Item> {
        let text = self.lines.get(self.pos)?;
        let line = LogLine::parse(self.pos + 1, text.as_str());
        let payload = match line.event {
            LineEvent::ResponsePayload { offset } => {
                Some(assemble_payload(&text[offset..], &self.lines[self.pos + 1..]))
            }
            _ => None,
        };
        self.pos += 1;
        Some(TraceEntry { line, payload })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.lines.len().saturating_sub(self.pos);
        (remaining, Some(remaining))
    }
}

/// Join `head` with following lines until the next XML document, the next
/// bracketed log record, or end of input.
fn assemble_payload(head: &str, following: &[String]) -> PayloadText {
    let mut block = String::from(head);
    for next in following {
        if next.contains(XML_DOCUMENT_START) || next.starts_with('[') {
            break;
        }
        block.push('\n');
        block.push_str(next);
    }
    block
}
