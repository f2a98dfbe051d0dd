use std::borrow::Cow;

mod edit;
mod registry;
mod types;

pub use edit::{normalize_line_endings, split_lines, EditBlock, EditKind, LineChanges};
pub use registry::BackendRegistry;
pub use types::{BackendError, BackendResult, BackendSummary};

/// Strategy turning two normalized texts into a formatted diff body.
pub trait DiffBackend: Send + Sync {
    /// Stable identifier used for lookup and logging.
    fn id(&self) -> &'static str;

    /// Human-friendly label, also used in debug trailers.
    fn label(&self) -> &'static str;

    /// Name written into debug trailers; defaults to the label.
    fn generator(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.label())
    }

    /// Whether the backend can run in the current environment.
    fn is_available(&self) -> bool;

    /// Compute a formatted diff body.
    ///
    /// Both inputs have already had their line terminators normalized.
    ///
    /// # Errors
    ///
    /// Implementors surface tool, I/O or timeout failures; callers fall
    /// through to the next backend.
    fn compute(&self, old: &str, new: &str) -> BackendResult<String>;
}

/// Backends that expose their line-level edit script, so the semantic content
/// of a diff can be compared independently of its markup.
pub trait LineDiffer {
    /// Align `old` against `new`.
    ///
    /// # Errors
    ///
    /// Returns backend-defined errors when the alignment cannot be computed.
    fn edits<'a>(&self, old: &[&'a str], new: &[&'a str]) -> BackendResult<Vec<EditBlock<'a>>>;
}
