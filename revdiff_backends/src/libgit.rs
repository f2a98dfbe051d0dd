use git2::{DiffOptions, Patch};
use revdiff_backend_api::{
    split_lines, BackendError, BackendResult, DiffBackend, EditBlock, LineDiffer,
};

use crate::lcs::canonicalize;
use crate::table::format_table;

/// In-process backend running libgit2's minimal Myers diff.
///
/// libgit2 locates the changed region; the lines inside it are aligned the
/// same way as [`BuiltinBackend`](crate::BuiltinBackend), so both backends mark
/// identical lines.
#[derive(Debug, Clone, Copy)]
pub struct LibGit2Backend {
    enabled: bool,
}

impl LibGit2Backend {
    /// Construct the backend; a disabled backend reports itself unavailable.
    #[must_use]
    pub const fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl Default for LibGit2Backend {
    fn default() -> Self {
        Self::new(true)
    }
}

impl DiffBackend for LibGit2Backend {
    fn id(&self) -> &'static str {
        "libgit2"
    }

    fn label(&self) -> &'static str {
        "libgit2"
    }

    fn is_available(&self) -> bool {
        self.enabled
    }

    fn compute(&self, old: &str, new: &str) -> BackendResult<String> {
        if !self.enabled {
            return Err(BackendError::Unavailable {
                backend: self.id(),
            });
        }
        let old_lines = split_lines(old);
        let new_lines = split_lines(new);
        let blocks = self.edits(&old_lines, &new_lines)?;
        Ok(format_table(&blocks))
    }
}

impl LineDiffer for LibGit2Backend {
    fn edits<'a>(&self, old: &[&'a str], new: &[&'a str]) -> BackendResult<Vec<EditBlock<'a>>> {
        // Every line is newline-terminated so libgit2 counts exactly the lines
        // produced by `split_lines`.
        let old_buffer = terminated(old);
        let new_buffer = terminated(new);

        let mut opts = DiffOptions::new();
        opts.context_lines(0)
            .interhunk_lines(0)
            .minimal(true)
            .force_text(true);

        let patch = Patch::from_buffers(
            old_buffer.as_bytes(),
            None,
            new_buffer.as_bytes(),
            None,
            Some(&mut opts),
        )
        .map_err(|err| BackendError::message(format!("libgit2 diff failed: {err}")))?;

        let mut blocks = Vec::new();
        let (mut old_pos, mut new_pos) = (0, 0);
        for index in 0..patch.num_hunks() {
            let (hunk, _) = patch
                .hunk(index)
                .map_err(|err| BackendError::message(format!("libgit2 hunk {index}: {err}")))?;
            let old_len = hunk.old_lines() as usize;
            let new_len = hunk.new_lines() as usize;
            let old_start = hunk_start(hunk.old_start(), old_len);
            let new_start = hunk_start(hunk.new_start(), new_len);

            if old_start < old_pos
                || new_start < new_pos
                || old_start - old_pos != new_start - new_pos
            {
                return Err(BackendError::message(format!(
                    "libgit2 hunk {index} is misaligned"
                )));
            }
            if old_start > old_pos {
                blocks.push(EditBlock::copy(slice(old, old_pos, old_start)?.to_vec()));
            }

            let removed = slice(old, old_start, old_start + old_len)?.to_vec();
            let inserted = slice(new, new_start, new_start + new_len)?.to_vec();
            blocks.extend(EditBlock::replace(removed, inserted));

            old_pos = old_start + old_len;
            new_pos = new_start + new_len;
        }

        if old_pos < old.len() {
            blocks.push(EditBlock::copy(old[old_pos..].to_vec()));
        }
        Ok(canonicalize(old, new, &blocks))
    }
}

fn terminated(lines: &[&str]) -> String {
    let mut buffer = String::with_capacity(lines.iter().map(|line| line.len() + 1).sum());
    for line in lines {
        buffer.push_str(line);
        buffer.push('\n');
    }
    buffer
}

/// Zero-based index of the first line touched by a hunk. Pure insertions
/// report the line *after which* they insert.
fn hunk_start(start: u32, len: usize) -> usize {
    let start = start as usize;
    if len == 0 {
        start
    } else {
        start.saturating_sub(1)
    }
}

fn slice<'s, 'a>(lines: &'s [&'a str], from: usize, to: usize) -> BackendResult<&'s [&'a str]> {
    lines
        .get(from..to)
        .ok_or_else(|| BackendError::message(format!("libgit2 hunk range {from}..{to} out of bounds")))
}
