use serde::{Deserialize, Serialize};

use super::revision::{ArchivedRevision, PageId, RevisionId, RevisionSpecifier};
use super::visibility::DeletionNotice;

/// A diff request as received from the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffRequest {
    /// Page the request was made against; `NewSpec::Id(0)` means its current revision.
    pub page: PageId,
    /// The revisions to compare.
    pub spec: RevisionSpecifier,
    /// Skip the cache read; the fresh body is still written back.
    #[serde(default)]
    pub refresh_cache: bool,
    /// Show deleted text when the requester is allowed to.
    #[serde(default)]
    pub unhide: bool,
}

impl DiffRequest {
    /// Plain request with cache reads enabled and deleted text kept hidden.
    pub const fn new(page: PageId, spec: RevisionSpecifier) -> Self {
        Self {
            page,
            spec,
            refresh_cache: false,
            unhide: false,
        }
    }

    /// Bypass the cache read.
    #[must_use]
    pub const fn refreshing(mut self) -> Self {
        self.refresh_cache = true;
        self
    }

    /// Ask to reveal deleted text.
    #[must_use]
    pub const fn unhiding(mut self) -> Self {
        self.unhide = true;
        self
    }
}

/// Formatted diff body and whether it came from the cache.
///
/// `body == None` means no diff could be produced; `Some("")` means the two
/// revisions are textually identical.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DiffResult {
    /// Localised diff body.
    #[serde(default)]
    pub body: Option<String>,
    /// The body was served from the cache.
    #[serde(default)]
    pub cache_hit: bool,
}

impl DiffResult {
    /// Result carrying no body.
    pub const fn none() -> Self {
        Self {
            body: None,
            cache_hit: false,
        }
    }

    /// Freshly computed body.
    pub fn fresh(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
            cache_hit: false,
        }
    }
}

/// Which side of the comparison a problem refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffSide {
    /// Older revision.
    Old,
    /// Newer revision.
    New,
}

/// Why a side prevented the diff from being produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ProblemReason {
    /// Revision or its content could not be found.
    NotFound,
    /// Revision text is deleted or suppressed.
    Denied {
        /// Text is suppressed rather than merely deleted.
        suppressed: bool,
        /// The requester may view it by asking to unhide.
        override_available: bool,
    },
    /// No diff backend handles this content model.
    Unsupported {
        /// Name of the content model.
        model: String,
    },
}

/// A single failing side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideProblem {
    /// Side that failed.
    pub side: DiffSide,
    /// Requested id when one was known.
    #[serde(default)]
    pub id: Option<u64>,
    /// Failure reason.
    pub reason: ProblemReason,
    /// Archived copy the requester may look up instead.
    #[serde(default)]
    pub archived: Option<ArchivedRevision>,
}

impl SideProblem {
    /// Problem without an archive reference.
    pub const fn new(side: DiffSide, id: Option<u64>, reason: ProblemReason) -> Self {
        Self {
            side,
            id,
            reason,
            archived: None,
        }
    }
}

/// Structured explanation of why `DiffResult::body` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DiffProblem {
    /// Failing sides, old before new.
    #[serde(default)]
    pub sides: Vec<SideProblem>,
}

impl DiffProblem {
    /// Problem made of the given sides.
    pub fn new(sides: Vec<SideProblem>) -> Self {
        Self { sides }
    }

    /// Whether every denied side could be revealed with an explicit unhide.
    pub fn override_available(&self) -> bool {
        let mut denied = self.sides.iter().filter_map(|side| match side.reason {
            ProblemReason::Denied {
                override_available, ..
            } => Some(override_available),
            _ => None,
        });
        let mut any = false;
        let all = denied.all(|available| {
            any = true;
            available
        });
        any && all
    }

    /// Whether any denied side is suppressed.
    pub fn suppressed(&self) -> bool {
        self.sides.iter().any(|side| {
            matches!(
                side.reason,
                ProblemReason::Denied {
                    suppressed: true,
                    ..
                }
            )
        })
    }
}

/// Count of edits made between the two compared revisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiEditNotice {
    /// Number of intervening revisions.
    pub edits: u64,
    /// Distinct authors, clamped at the configured limit.
    pub authors: u64,
    /// The author count exceeded the limit.
    pub many_authors: bool,
}

/// Everything the presentation layer needs to render a comparison.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DiffResponse {
    /// Resolved old revision id.
    #[serde(default)]
    pub old_id: Option<RevisionId>,
    /// Resolved new revision id.
    #[serde(default)]
    pub new_id: Option<RevisionId>,
    /// Body and cache status.
    pub result: DiffResult,
    /// Present whenever `result.body` is `None`.
    #[serde(default)]
    pub problem: Option<DiffProblem>,
    /// Present when deleted text is being shown on request.
    #[serde(default)]
    pub deletion_notice: Option<DeletionNotice>,
    /// Intervening-edit summary for same-page comparisons.
    #[serde(default)]
    pub multi_notice: Option<MultiEditNotice>,
    /// The two revisions belong to different pages.
    #[serde(default)]
    pub cross_page: bool,
    /// Change tags of the old revision.
    #[serde(default)]
    pub old_tags: Vec<String>,
    /// Change tags of the new revision.
    #[serde(default)]
    pub new_tags: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn denied(side: DiffSide, suppressed: bool, override_available: bool) -> SideProblem {
        SideProblem::new(
            side,
            Some(1),
            ProblemReason::Denied {
                suppressed,
                override_available,
            },
        )
    }

    #[test]
    fn override_requires_every_denied_side() {
        let both = DiffProblem::new(vec![
            denied(DiffSide::Old, false, true),
            denied(DiffSide::New, false, false),
        ]);
        assert!(!both.override_available());

        let one = DiffProblem::new(vec![denied(DiffSide::Old, true, true)]);
        assert!(one.override_available());
        assert!(one.suppressed());
    }

    #[test]
    fn not_found_is_not_overridable() {
        let problem = DiffProblem::new(vec![SideProblem::new(
            DiffSide::New,
            Some(9),
            ProblemReason::NotFound,
        )]);
        assert!(!problem.override_available());
        assert!(!problem.suppressed());
    }

    #[test]
    fn reason_is_internally_tagged() {
        let json = serde_json::to_string(&ProblemReason::Unsupported {
            model: "image".into(),
        })
        .expect("serialize reason");
        assert_eq!(json, r#"{"kind":"unsupported","model":"image"}"#);
    }

    #[test]
    fn request_flags_default_off() {
        let json = r#"{"page": 4, "spec": {"old": 12, "new": "prev"}}"#;
        let request: DiffRequest = serde_json::from_str(json).expect("deserialize request");
        assert_eq!(request, DiffRequest::new(PageId(4), RevisionSpecifier::prev(12)));
        assert!(request.unhiding().unhide);
        assert!(!request.unhiding().refresh_cache);
    }

    #[test]
    fn response_defaults_are_applied() {
        let json = r#"{"result": {"body": ""}}"#;
        let response: DiffResponse = serde_json::from_str(json).expect("deserialize response");
        assert_eq!(response.result.body.as_deref(), Some(""));
        assert!(!response.result.cache_hit);
        assert!(response.problem.is_none());
        assert!(response.old_tags.is_empty());
    }
}
