//! Shared revision diff data models consumed by the core library and backend crates.

pub mod diff;
pub mod revision;
pub mod visibility;

pub use diff::*;
pub use revision::*;
pub use visibility::*;
