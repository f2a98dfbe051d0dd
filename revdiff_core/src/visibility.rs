use crate::api::{
    DeletionFlags, DeletionNotice, DiffSide, Permission, ProblemReason, RevisionRecord,
    SideProblem,
};
use crate::store::Capabilities;

/// Rule deciding whether a requester may read a revision's text.
pub trait VisibilityPolicy: Send + Sync {
    /// Whether `record`'s text is readable with `capabilities`.
    fn can_view(&self, record: &RevisionRecord, capabilities: &dyn Capabilities) -> bool;
}

/// Standard revision-deletion rule: deleted text needs `DeletedText`,
/// suppressed text needs `ViewSuppressed`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RevisionDeletionPolicy;

impl VisibilityPolicy for RevisionDeletionPolicy {
    fn can_view(&self, record: &RevisionRecord, capabilities: &dyn Capabilities) -> bool {
        if !record.is_deleted(DeletionFlags::TEXT) {
            return true;
        }
        let permission = if record.is_deleted(DeletionFlags::RESTRICTED) {
            Permission::ViewSuppressed
        } else {
            Permission::DeletedText
        };
        capabilities.requester_can(permission, Some(record))
    }
}

/// Outcome of gating a revision pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Nothing is deleted.
    Visible,
    /// Deleted text is shown because the requester asked and may.
    Revealed(DeletionNotice),
    /// At least one side stays hidden.
    Hidden(Vec<SideProblem>),
}

/// Applies a [`VisibilityPolicy`] for one requester.
#[derive(Clone, Copy)]
pub struct VisibilityGate<'a> {
    policy: &'a dyn VisibilityPolicy,
    capabilities: &'a dyn Capabilities,
}

impl<'a> VisibilityGate<'a> {
    /// Gate for the given requester.
    pub fn new(policy: &'a dyn VisibilityPolicy, capabilities: &'a dyn Capabilities) -> Self {
        Self {
            policy,
            capabilities,
        }
    }

    /// Whether the requester may read `record`'s text.
    pub fn can_view(&self, record: &RevisionRecord) -> bool {
        self.policy.can_view(record, self.capabilities)
    }

    /// Whether the requester holds `permission` outside any record.
    pub fn requester_can(&self, permission: Permission) -> bool {
        self.capabilities.requester_can(permission, None)
    }

    /// Problem describing `record` as unreadable.
    pub fn denied(&self, side: DiffSide, record: &RevisionRecord) -> SideProblem {
        SideProblem::new(
            side,
            Some(record.id().get()),
            ProblemReason::Denied {
                suppressed: record.is_deleted(DeletionFlags::RESTRICTED),
                override_available: self.can_view(record),
            },
        )
    }

    /// Gates a pair. The old side is absent when the new revision has no
    /// predecessor.
    ///
    /// Deleted text is only revealed when `unhide` is set and every deleted
    /// side is readable; otherwise each deleted side is reported.
    pub fn verdict(
        &self,
        old: Option<&RevisionRecord>,
        new: &RevisionRecord,
        unhide: bool,
    ) -> Verdict {
        let sides = [(DiffSide::Old, old), (DiffSide::New, Some(new))];
        let deleted: Vec<_> = sides
            .iter()
            .filter_map(|(side, record)| record.map(|r| (*side, r)))
            .filter(|(_, record)| record.is_deleted(DeletionFlags::TEXT))
            .collect();
        if deleted.is_empty() {
            return Verdict::Visible;
        }
        let allowed = deleted.iter().all(|(_, record)| self.can_view(record));
        if unhide && allowed {
            return Verdict::Revealed(DeletionNotice {
                suppressed: deleted
                    .iter()
                    .any(|(_, record)| record.is_deleted(DeletionFlags::RESTRICTED)),
            });
        }
        Verdict::Hidden(
            deleted
                .into_iter()
                .map(|(side, record)| self.denied(side, record))
                .collect(),
        )
    }
}
