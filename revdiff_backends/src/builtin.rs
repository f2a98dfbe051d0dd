use revdiff_backend_api::{
    split_lines, BackendResult, DiffBackend, EditBlock, LineDiffer,
};

use crate::lcs::edit_script;
use crate::table::format_table;

/// Built-in longest-common-subsequence backend. Always available and never
/// fails, which makes it the last resort of every backend chain.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinBackend;

impl BuiltinBackend {
    /// Diff two normalized texts.
    #[must_use]
    pub fn diff(&self, old: &str, new: &str) -> String {
        let old_lines = split_lines(old);
        let new_lines = split_lines(new);
        format_table(&edit_script(&old_lines, &new_lines))
    }
}

impl DiffBackend for BuiltinBackend {
    fn id(&self) -> &'static str {
        "builtin"
    }

    fn label(&self) -> &'static str {
        "internal"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn compute(&self, old: &str, new: &str) -> BackendResult<String> {
        Ok(self.diff(old, new))
    }
}

impl LineDiffer for BuiltinBackend {
    fn edits<'a>(&self, old: &[&'a str], new: &[&'a str]) -> BackendResult<Vec<EditBlock<'a>>> {
        Ok(edit_script(old, new))
    }
}
