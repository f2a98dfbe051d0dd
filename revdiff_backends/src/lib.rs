//! Diff backends shipped with revdiff.

mod builtin;
mod external;
mod lcs;
#[cfg(feature = "libgit2")]
mod libgit;
mod table;

pub use builtin::BuiltinBackend;
pub use external::ExternalBackend;
#[cfg(feature = "libgit2")]
pub use libgit::LibGit2Backend;
pub use table::format_table;

use revdiff_backend_api::BackendRegistry;

/// Build a registry holding the optional backends in preference order:
/// the in-process libgit2 backend (when compiled in and enabled), then the
/// external tool. The built-in backend is not registered here; callers keep
/// it as the guaranteed last resort.
#[must_use]
pub fn default_registry(in_process: bool, external: ExternalBackend) -> BackendRegistry {
    let mut registry = BackendRegistry::new();

    #[cfg(feature = "libgit2")]
    registry.register(LibGit2Backend::new(in_process));
    #[cfg(not(feature = "libgit2"))]
    let _ = in_process;

    registry.register(external);
    registry
}
