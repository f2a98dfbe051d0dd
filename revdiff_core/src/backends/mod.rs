//! Diff backend entry points.

mod chain;

pub use revdiff_backend_api::{
    normalize_line_endings, BackendError, BackendRegistry, BackendResult, BackendSummary,
    DiffBackend,
};
#[cfg(feature = "libgit2")]
pub use revdiff_backends::LibGit2Backend;
pub use revdiff_backends::{default_registry, BuiltinBackend, ExternalBackend};

pub use chain::{BackendChain, DebugTrailer};
