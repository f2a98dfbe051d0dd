//! Line edit-script model shared by in-process backends.

use std::borrow::Cow;
use std::collections::BTreeSet;

/// Replace CRLF terminators with LF.
///
/// Every backend sees text normalized this way, so two revisions that differ
/// only in line terminators diff to nothing.
pub fn normalize_line_endings(text: &str) -> Cow<'_, str> {
    if text.contains("\r\n") {
        Cow::Owned(text.replace("\r\n", "\n"))
    } else {
        Cow::Borrowed(text)
    }
}

/// Split normalized text into lines.
///
/// A trailing newline yields a final empty line, so `"a\n"` and `"a"` are
/// distinguishable.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split('\n').collect()
}

/// Kind of an edit block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    /// Lines present unchanged on both sides.
    Copy,
    /// Lines present only on the old side.
    Delete,
    /// Lines present only on the new side.
    Add,
    /// Old lines replaced by new lines.
    Change,
}

/// Contiguous run of lines sharing one edit kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditBlock<'a> {
    /// Kind of the block.
    pub kind: EditKind,
    /// Lines taken from the old side (empty for `Add`).
    pub old: Vec<&'a str>,
    /// Lines taken from the new side (empty for `Delete`; equal to `old` for `Copy`).
    pub new: Vec<&'a str>,
}

impl<'a> EditBlock<'a> {
    /// Unchanged lines.
    pub fn copy(lines: Vec<&'a str>) -> Self {
        Self {
            kind: EditKind::Copy,
            new: lines.clone(),
            old: lines,
        }
    }

    /// Block for an arbitrary replacement; picks `Delete`, `Add` or `Change`
    /// depending on which sides are empty. Returns `None` if both are empty.
    pub fn replace(old: Vec<&'a str>, new: Vec<&'a str>) -> Option<Self> {
        let kind = match (old.is_empty(), new.is_empty()) {
            (true, true) => return None,
            (false, true) => EditKind::Delete,
            (true, false) => EditKind::Add,
            (false, false) => EditKind::Change,
        };
        Some(Self { kind, old, new })
    }

    /// Whether the block represents a modification.
    pub fn is_edit(&self) -> bool {
        self.kind != EditKind::Copy
    }
}

/// Backend-independent summary of a diff: which old lines were removed and
/// which new lines were inserted, as 1-based line numbers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LineChanges {
    /// Old-side line numbers that do not survive.
    pub deleted: BTreeSet<usize>,
    /// New-side line numbers that did not exist before.
    pub added: BTreeSet<usize>,
}

impl LineChanges {
    /// Summarise an edit script.
    pub fn from_blocks(blocks: &[EditBlock<'_>]) -> Self {
        let mut changes = Self::default();
        let mut old_line = 1;
        let mut new_line = 1;
        for block in blocks {
            if block.is_edit() {
                changes.deleted.extend(old_line..old_line + block.old.len());
                changes.added.extend(new_line..new_line + block.new.len());
            }
            old_line += block.old.len();
            new_line += block.new.len();
        }
        changes
    }

    /// Whether the summary contains no changes.
    pub fn is_empty(&self) -> bool {
        self.deleted.is_empty() && self.added.is_empty()
    }
}
