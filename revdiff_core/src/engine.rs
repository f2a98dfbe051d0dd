use std::sync::Arc;

use crate::api::{
    ContentBlob, DiffProblem, DiffRequest, DiffResponse, DiffResult, DiffSide, MultiEditNotice,
    Permission, ProblemReason, ResolvedIds, RevisionId, RevisionRecord, SideProblem,
};
use crate::backends::BackendChain;
use crate::cache::{DiffCache, DiffCacheKey, DEFAULT_TTL};
use crate::config::EngineConfig;
use crate::loader::{OldRevision, RevisionLoader};
use crate::localise::{localise_line_numbers, LineLocaliser};
use crate::notice;
use crate::store::{Capabilities, ContentStore, RevisionStore};
use crate::text::{TextLoader, TextState};
use crate::visibility::{Verdict, VisibilityGate, VisibilityPolicy};
use crate::{Error, Result};

type RecordPair = (Option<Arc<RevisionRecord>>, Arc<RevisionRecord>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Absence {
    Record,
    Text,
}

/// Collaborators one request runs against.
#[derive(Clone, Copy)]
pub struct DiffContext<'a> {
    /// Revision history lookups.
    pub history: &'a dyn RevisionStore,
    /// Revision content lookups.
    pub content: &'a dyn ContentStore,
    /// Requester permissions.
    pub capabilities: &'a dyn Capabilities,
    /// Revision-level visibility rule.
    pub policy: &'a dyn VisibilityPolicy,
    /// Shared body cache.
    pub cache: &'a DiffCache,
    /// Backend fall-through.
    pub backends: &'a BackendChain,
    /// Requester's line label language.
    pub localiser: &'a dyn LineLocaliser,
    /// Engine settings.
    pub config: &'a EngineConfig,
}

/// Per-request diff pipeline.
///
/// Every loading step is lazy and memoised, so the accessors can be called in
/// any order and any number of times.
pub struct DifferenceEngine<'a> {
    ctx: DiffContext<'a>,
    request: DiffRequest,
    revisions: RevisionLoader<'a>,
    text: TextLoader<'a>,
    cache_hit: bool,
    problem: Option<DiffProblem>,
}

impl<'a> DifferenceEngine<'a> {
    /// Engine for one request.
    pub fn new(ctx: DiffContext<'a>, request: DiffRequest) -> Self {
        tracing::debug!(
            page = request.page.0,
            old = request.spec.old,
            new = ?request.spec.new,
            refresh = request.refresh_cache,
            unhide = request.unhide,
            "diff engine created"
        );
        Self {
            ctx,
            request,
            revisions: RevisionLoader::new(ctx.history, request.page, request.spec),
            text: TextLoader::new(ctx.content),
            cache_hit: false,
            problem: None,
        }
    }

    /// Request this engine serves.
    pub const fn request(&self) -> DiffRequest {
        self.request
    }

    /// Whether the last body came from the cache.
    pub const fn was_cache_hit(&self) -> bool {
        self.cache_hit
    }

    /// Why the last body was `None`, if it was.
    pub const fn problem(&self) -> Option<&DiffProblem> {
        self.problem.as_ref()
    }

    /// Resolved id pair.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] when history lookups fail.
    pub fn resolved_ids(&mut self) -> Result<ResolvedIds> {
        self.revisions.load_ids()
    }

    /// Loads both revision records; `false` when either is missing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] when history lookups fail.
    pub fn load_revision_data(&mut self) -> Result<bool> {
        self.revisions.load_records()
    }

    /// Loads revision data and the text of both sides.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] when history lookups fail.
    pub fn load_text(&mut self) -> Result<bool> {
        if !self.load_revision_data()? {
            return Ok(false);
        }
        let (old, new) = self.records()?;
        let gate = self.gate();
        Ok(self.text.load_both(old.as_deref(), &new, &gate))
    }

    /// Loads only the new revision's text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] when history lookups fail.
    pub fn load_new_text(&mut self) -> Result<bool> {
        self.revisions.load_records()?;
        let Some(new) = self.revisions.new_record().cloned() else {
            return Ok(false);
        };
        let gate = self.gate();
        Ok(self.text.load_new_only(&new, &gate))
    }

    /// Content of the new revision without computing a diff.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] when history lookups fail.
    pub fn new_revision_text(&mut self) -> Result<Option<ContentBlob>> {
        if !self.load_new_text()? {
            return Ok(None);
        }
        Ok(self.text.new_text().cloned())
    }

    /// Full comparison: records, visibility, notices and the diff body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] when history lookups fail. Missing, hidden and
    /// unsupported revisions are reported through [`DiffResponse::problem`].
    pub fn compare(&mut self) -> Result<DiffResponse> {
        let mut response = DiffResponse::default();
        let loaded = self.load_revision_data()?;
        if let Some(ids) = self.revisions.ids() {
            response.old_id = ids.old.id();
            response.new_id = ids.new.id();
        }
        if !loaded {
            response.problem = Some(self.missing_problem());
            return Ok(response);
        }

        let (old, new) = self.records()?;
        response.old_tags = self.revisions.old_tags().to_vec();
        response.new_tags = self.revisions.new_tags().to_vec();
        if let Some(old) = &old {
            response.cross_page = old.page() != new.page();
            if response.cross_page {
                tracing::debug!(old = %old.id(), new = %new.id(), "cross-page comparison");
            } else {
                response.multi_notice = self.multi_notice(old, &new);
            }
        }

        match self.gate().verdict(old.as_deref(), &new, self.request.unhide) {
            Verdict::Visible => {}
            Verdict::Revealed(notice) => response.deletion_notice = Some(notice),
            Verdict::Hidden(sides) => {
                response.problem = Some(DiffProblem::new(sides));
                return Ok(response);
            }
        }

        response.result = self.diff_body()?;
        if response.result.body.is_none() {
            response.problem = self.problem.clone();
        }
        Ok(response)
    }

    /// Localised diff body, served from the cache when possible.
    ///
    /// A missing predecessor or a self-comparison yields an empty body that is
    /// never cached. On `None`, [`Self::problem`] explains why.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] when history lookups fail.
    pub fn diff_body(&mut self) -> Result<DiffResult> {
        self.cache_hit = false;
        self.problem = None;
        if !self.load_revision_data()? {
            self.problem = Some(self.missing_problem());
            return Ok(DiffResult::none());
        }

        let (old, new) = self.records()?;
        let gate = self.gate();
        let sides = [(DiffSide::Old, old.as_deref()), (DiffSide::New, Some(&*new))];
        let denied: Vec<SideProblem> = sides
            .into_iter()
            .filter_map(|(side, record)| {
                record
                    .filter(|record| !gate.can_view(record))
                    .map(|record| gate.denied(side, record))
            })
            .collect();
        if !denied.is_empty() {
            self.problem = Some(DiffProblem::new(denied));
            return Ok(DiffResult::none());
        }

        let Some(old) = old else {
            tracing::debug!(new = %new.id(), "no predecessor; empty diff");
            return Ok(DiffResult::fresh(""));
        };
        if old.id() == new.id() {
            tracing::debug!(id = %new.id(), "self comparison; empty diff");
            return Ok(DiffResult::fresh(""));
        }

        let key = DiffCacheKey::new(old.id(), new.id());
        if self.request.refresh_cache {
            tracing::debug!(%key, "diff cache read bypassed");
        } else if let Some(cached) = self.ctx.cache.get(&key).filter(|body| !body.is_empty()) {
            tracing::debug!(%key, "diff cache hit");
            self.cache_hit = true;
            let mut body = self.localise(&cached);
            body.push_str(&format!(
                "\n<!-- diff cache key {} -->\n",
                self.ctx.cache.key_string(&key)
            ));
            return Ok(DiffResult {
                body: Some(body),
                cache_hit: true,
            });
        } else {
            tracing::debug!(%key, "diff cache miss");
        }

        if !self.load_text()? {
            self.problem = Some(self.missing_problem());
            return Ok(DiffResult::none());
        }
        let (Some(old_text), Some(new_text)) = (self.text.old(), self.text.new_text()) else {
            return Err(Error::ContractViolation("text reported loaded without both sides"));
        };
        let body = match self.diff_contents(old_text, new_text) {
            Ok(body) => body,
            Err(mut problem) => {
                problem.id = Some(match problem.side {
                    DiffSide::Old => old.id().get(),
                    DiffSide::New => new.id().get(),
                });
                self.problem = Some(DiffProblem::new(vec![problem]));
                return Ok(DiffResult::none());
            }
        };
        // An empty body means identical text and is never cached.
        if !body.is_empty() {
            self.ctx.cache.set(&key, &body, DEFAULT_TTL);
        }
        Ok(DiffResult::fresh(self.localise(&body)))
    }

    /// Diffs two content blobs directly, bypassing lookups and the cache.
    ///
    /// The body still carries line placeholders.
    ///
    /// # Errors
    ///
    /// Returns an `Unsupported` problem, without an id, for the first side
    /// whose content model has no text representation.
    pub fn diff_contents(
        &self,
        old: &ContentBlob,
        new: &ContentBlob,
    ) -> std::result::Result<String, SideProblem> {
        for (side, blob) in [(DiffSide::Old, old), (DiffSide::New, new)] {
            if !blob.model.is_text() {
                tracing::debug!(?side, model = blob.model.name(), "unsupported content model");
                return Err(SideProblem::new(
                    side,
                    None,
                    ProblemReason::Unsupported {
                        model: blob.model.name().to_owned(),
                    },
                ));
            }
        }
        Ok(self.ctx.backends.compute(&old.text, &new.text))
    }

    fn records(&self) -> Result<RecordPair> {
        let new = self
            .revisions
            .new_record()
            .cloned()
            .ok_or(Error::ContractViolation("revisions reported loaded without a new record"))?;
        let old = self
            .revisions
            .old()
            .and_then(OldRevision::record)
            .cloned();
        Ok((old, new))
    }

    fn gate(&self) -> VisibilityGate<'a> {
        VisibilityGate::new(self.ctx.policy, self.ctx.capabilities)
    }

    fn localise(&self, body: &str) -> String {
        localise_line_numbers(body, self.ctx.localiser, self.ctx.config.reduced_line_numbers)
            .into_owned()
    }

    fn multi_notice(&self, old: &RevisionRecord, new: &RevisionRecord) -> Option<MultiEditNotice> {
        notice::count_between(
            self.ctx.history,
            old,
            new,
            self.ctx.config.multi_notice_author_limit,
        )
        .unwrap_or_else(|err| {
            tracing::warn!(error = %err, "failed to count intervening edits");
            None
        })
    }

    fn missing_problem(&self) -> DiffProblem {
        let ids = self.revisions.ids();
        let text_state = self.text.state();
        let mut sides = Vec::new();

        let old = match self.revisions.old() {
            Some(OldRevision::Missing) => Some(Absence::Record),
            Some(OldRevision::Loaded(_))
                if text_state == TextState::Both && self.text.old().is_none() =>
            {
                Some(Absence::Text)
            }
            _ => None,
        };
        if let Some(absence) = old {
            sides.push(self.not_found(DiffSide::Old, ids.and_then(|ids| ids.old.id()), absence));
        }

        let new = match self.revisions.new_record() {
            None => Some(Absence::Record),
            Some(_) if text_state != TextState::None && self.text.new_text().is_none() => {
                Some(Absence::Text)
            }
            Some(_) => None,
        };
        if let Some(absence) = new {
            sides.push(self.not_found(DiffSide::New, ids.and_then(|ids| ids.new.id()), absence));
        }
        DiffProblem::new(sides)
    }

    fn not_found(&self, side: DiffSide, id: Option<RevisionId>, absence: Absence) -> SideProblem {
        let mut problem = SideProblem::new(side, id.map(RevisionId::get), ProblemReason::NotFound);
        if absence == Absence::Record && self.gate().requester_can(Permission::DeletedHistory) {
            problem.archived = id.and_then(|id| {
                self.ctx.history.archived(id).unwrap_or_else(|err| {
                    tracing::warn!(%id, error = %err, "failed to look up archived revision");
                    None
                })
            });
        }
        problem
    }
}
