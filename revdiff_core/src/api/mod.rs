//! Public data models shared with the presentation layer.

pub use revdiff_api::{
    ArchivedRevision, ContentBlob, ContentModel, DeletionFlags, DeletionNotice, DiffProblem,
    DiffRequest, DiffResponse, DiffResult, DiffSide, MultiEditNotice, NewRef, NewSpec, OldRef,
    PageId, Permission, ProblemReason, ResolvedIds, RevisionId, RevisionRecord,
    RevisionSpecifier, SideProblem,
};
