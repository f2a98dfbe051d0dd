use std::fmt;
use std::sync::Arc;

use crate::api::{DiffRequest, DiffResponse};
use crate::backends::{BackendChain, BackendSummary};
use crate::cache::{DiffCache, MemoryCache, ObjectCache};
use crate::config::EngineConfig;
use crate::engine::{DiffContext, DifferenceEngine};
use crate::localise::{LineLocaliser, LineNumberTemplate};
use crate::store::{Capabilities, ContentStore, RevisionStore};
use crate::visibility::{RevisionDeletionPolicy, VisibilityPolicy};
use crate::Result;

/// Long-lived handle owning the collaborators shared by every request.
///
/// Requests only borrow the session, so one session can serve many threads.
pub struct DiffSession {
    history: Arc<dyn RevisionStore>,
    content: Arc<dyn ContentStore>,
    policy: Arc<dyn VisibilityPolicy>,
    cache: DiffCache,
    backends: BackendChain,
    localiser: Arc<dyn LineLocaliser>,
    config: EngineConfig,
}

impl DiffSession {
    /// Session over the given stores, with an in-process cache, the standard
    /// deletion policy, English line labels and the configured backend chain.
    #[must_use]
    pub fn new(
        config: EngineConfig,
        history: Arc<dyn RevisionStore>,
        content: Arc<dyn ContentStore>,
    ) -> Self {
        let cache = DiffCache::new(Arc::new(MemoryCache::new()), config.cache_key_prefix.clone());
        Self {
            history,
            content,
            policy: Arc::new(RevisionDeletionPolicy),
            cache,
            backends: config.backend_chain(),
            localiser: Arc::new(LineNumberTemplate::english()),
            config,
        }
    }

    /// Replace the object cache.
    #[must_use]
    pub fn with_cache(mut self, store: Arc<dyn ObjectCache>) -> Self {
        self.cache = DiffCache::new(store, self.config.cache_key_prefix.clone());
        self
    }

    /// Replace the visibility policy.
    #[must_use]
    pub fn with_policy(mut self, policy: Arc<dyn VisibilityPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the backend chain.
    #[must_use]
    pub fn with_backends(mut self, backends: BackendChain) -> Self {
        self.backends = backends;
        self
    }

    /// Replace the default line label language.
    #[must_use]
    pub fn with_localiser(mut self, localiser: Arc<dyn LineLocaliser>) -> Self {
        self.localiser = localiser;
        self
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Backends in the order they are tried.
    #[must_use]
    pub fn backend_summaries(&self) -> Vec<BackendSummary> {
        self.backends.summaries()
    }

    /// Engine for one request, rendering line labels with `localiser`.
    pub fn engine<'s>(
        &'s self,
        request: DiffRequest,
        capabilities: &'s dyn Capabilities,
        localiser: &'s dyn LineLocaliser,
    ) -> DifferenceEngine<'s> {
        DifferenceEngine::new(
            DiffContext {
                history: self.history.as_ref(),
                content: self.content.as_ref(),
                capabilities,
                policy: self.policy.as_ref(),
                cache: &self.cache,
                backends: &self.backends,
                localiser,
                config: &self.config,
            },
            request,
        )
    }

    /// Runs a full comparison with the session's default line labels.
    ///
    /// # Errors
    ///
    /// Propagates revision storage failures from [`DifferenceEngine::compare`].
    pub fn compare(
        &self,
        request: DiffRequest,
        capabilities: &dyn Capabilities,
    ) -> Result<DiffResponse> {
        self.engine(request, capabilities, self.localiser.as_ref())
            .compare()
    }
}

impl fmt::Debug for DiffSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiffSession")
            .field("cache", &self.cache)
            .field("backends", &self.backends)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
