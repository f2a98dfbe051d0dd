//! HTML table rendering of an edit script.
//!
//! Rows follow the two-column layout used by wiki diff views. Hunk headers
//! carry `<!--LINE n-->` placeholders instead of localised labels so that a
//! cached body can be served to readers in any language.

use std::fmt::Write as _;

use html_escape::encode_text;
use revdiff_backend_api::{EditBlock, EditKind};

use crate::lcs::matched_pairs;

const LEADING_CONTEXT: usize = 2;
const TRAILING_CONTEXT: usize = 2;

/// Render `blocks` as table rows. An edit script without edits renders empty.
pub fn format_table(blocks: &[EditBlock<'_>]) -> String {
    let mut out = String::new();
    let mut old_line = 1;
    let mut new_line = 1;
    let mut in_hunk = false;
    let mut pending: &[&str] = &[];

    for (index, block) in blocks.iter().enumerate() {
        let is_last = index + 1 == blocks.len();
        match block.kind {
            EditKind::Copy => {
                let lines = block.old.as_slice();
                if in_hunk {
                    if lines.len() <= LEADING_CONTEXT + TRAILING_CONTEXT && !is_last {
                        context_rows(&mut out, lines);
                    } else {
                        context_rows(&mut out, &lines[..lines.len().min(TRAILING_CONTEXT)]);
                        in_hunk = false;
                    }
                }
                if !in_hunk {
                    pending = &lines[lines.len().saturating_sub(LEADING_CONTEXT)..];
                }
            }
            _ => {
                if !in_hunk {
                    hunk_header(
                        &mut out,
                        old_line - pending.len(),
                        new_line - pending.len(),
                    );
                    context_rows(&mut out, pending);
                    pending = &[];
                    in_hunk = true;
                }
                edit_rows(&mut out, block);
            }
        }
        old_line += block.old.len();
        new_line += block.new.len();
    }

    out
}

fn hunk_header(out: &mut String, old_line: usize, new_line: usize) {
    let _ = write!(
        out,
        "<tr>\n  <td colspan=\"2\" class=\"diff-lineno\"><!--LINE {old_line}--></td>\n  \
         <td colspan=\"2\" class=\"diff-lineno\"><!--LINE {new_line}--></td>\n</tr>\n"
    );
}

fn context_rows(out: &mut String, lines: &[&str]) {
    for line in lines {
        let cell = format!("<div>{}</div>", encode_text(line));
        let _ = write!(
            out,
            "<tr>\n  <td class=\"diff-marker\">&#160;</td>\n  <td class=\"diff-context\">{cell}</td>\n  \
             <td class=\"diff-marker\">&#160;</td>\n  <td class=\"diff-context\">{cell}</td>\n</tr>\n"
        );
    }
}

fn edit_rows(out: &mut String, block: &EditBlock<'_>) {
    let paired = if block.kind == EditKind::Change {
        block.old.len().min(block.new.len())
    } else {
        0
    };

    for (old, new) in block.old.iter().zip(&block.new).take(paired) {
        let (deleted, added) = word_diff(old, new);
        let _ = write!(
            out,
            "<tr>\n{}{}</tr>\n",
            deleted_cell(&deleted),
            added_cell(&added)
        );
    }
    for old in &block.old[paired..] {
        let _ = write!(
            out,
            "<tr>\n{}{}</tr>\n",
            deleted_cell(&encode_text(old)),
            empty_cell()
        );
    }
    for new in &block.new[paired..] {
        let _ = write!(
            out,
            "<tr>\n{}{}</tr>\n",
            empty_cell(),
            added_cell(&encode_text(new))
        );
    }
}

fn deleted_cell(html: &str) -> String {
    format!(
        "  <td class=\"diff-marker\">\u{2212}</td>\n  <td class=\"diff-deletedline\"><div>{html}</div></td>\n"
    )
}

fn added_cell(html: &str) -> String {
    format!("  <td class=\"diff-marker\">+</td>\n  <td class=\"diff-addedline\"><div>{html}</div></td>\n")
}

fn empty_cell() -> &'static str {
    "  <td colspan=\"2\" class=\"diff-empty\">&#160;</td>\n"
}

/// Highlight the words that differ between a deleted and an added line.
fn word_diff(old: &str, new: &str) -> (String, String) {
    let old_words = tokenize(old);
    let new_words = tokenize(new);
    let pairs = matched_pairs(&old_words, &new_words);

    let mut old_keep = vec![false; old_words.len()];
    let mut new_keep = vec![false; new_words.len()];
    for (i, j) in pairs {
        old_keep[i] = true;
        new_keep[j] = true;
    }

    (
        highlight(&old_words, &old_keep, "del"),
        highlight(&new_words, &new_keep, "ins"),
    )
}

fn highlight(words: &[&str], keep: &[bool], tag: &str) -> String {
    let mut out = String::new();
    let mut open = false;
    for (word, kept) in words.iter().zip(keep) {
        if !kept && !open {
            let _ = write!(out, "<{tag} class=\"diffchange diffchange-inline\">");
            open = true;
        } else if *kept && open {
            let _ = write!(out, "</{tag}>");
            open = false;
        }
        out.push_str(&encode_text(word));
    }
    if open {
        let _ = write!(out, "</{tag}>");
    }
    out
}

/// Split a line into runs of word characters, runs of whitespace and single
/// punctuation characters.
fn tokenize(line: &str) -> Vec<&str> {
    #[derive(PartialEq, Clone, Copy)]
    enum Class {
        Word,
        Space,
        Other,
    }
    let class = |c: char| {
        if c.is_alphanumeric() || c == '_' {
            Class::Word
        } else if c.is_whitespace() {
            Class::Space
        } else {
            Class::Other
        }
    };

    let mut tokens = Vec::new();
    let mut start = 0;
    let mut current: Option<Class> = None;
    for (offset, c) in line.char_indices() {
        let next = class(c);
        let split = match current {
            Some(prev) => prev != next || next == Class::Other,
            None => false,
        };
        if split {
            tokens.push(&line[start..offset]);
            start = offset;
        }
        current = Some(next);
    }
    if start < line.len() {
        tokens.push(&line[start..]);
    }
    tokens
}
