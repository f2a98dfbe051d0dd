use std::fmt;
use std::sync::Arc;

use super::{normalize_line_endings, BackendRegistry, BackendSummary, BuiltinBackend, DiffBackend};

/// HTML comment appended to freshly computed bodies naming who produced them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebugTrailer {
    hostname: Option<String>,
}

impl DebugTrailer {
    /// Trailer optionally naming the host.
    pub const fn new(hostname: Option<String>) -> Self {
        Self { hostname }
    }

    /// Renders `<!-- diff generator: ... -->` for `generator`, stamped with the
    /// current UTC time.
    pub fn render(&self, generator: &str) -> String {
        let mut fields = vec![generator.to_owned()];
        if let Some(host) = &self.hostname {
            fields.push(format!("[{host}]"));
        }
        fields.push(chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string());
        let data = html_escape::encode_text(&fields.join(" ")).into_owned();
        format!("<!-- diff generator: {} -->\n", data.replace("--", "&#45;&#45;"))
    }
}

/// Ordered backend fall-through ending in the built-in engine.
///
/// Backends are tried in registry order; unavailable ones are skipped and
/// failing ones are logged before moving on. The built-in engine cannot fail,
/// so [`Self::compute`] always yields a body.
#[derive(Clone)]
pub struct BackendChain {
    registry: Arc<BackendRegistry>,
    fallback: BuiltinBackend,
    trailer: Option<DebugTrailer>,
}

impl BackendChain {
    /// Chain over `registry`, without debug trailers.
    #[must_use]
    pub fn new(registry: BackendRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            fallback: BuiltinBackend,
            trailer: None,
        }
    }

    /// Chain with only the built-in engine.
    #[must_use]
    pub fn builtin_only() -> Self {
        Self::new(BackendRegistry::new())
    }

    /// Append a debug trailer to every computed body.
    #[must_use]
    pub fn with_debug_trailer(mut self, trailer: DebugTrailer) -> Self {
        self.trailer = Some(trailer);
        self
    }

    /// Summaries of the optional backends plus the built-in fallback.
    #[must_use]
    pub fn summaries(&self) -> Vec<BackendSummary> {
        let mut summaries = self.registry.summaries();
        summaries.push(BackendSummary {
            id: self.fallback.id().to_owned(),
            label: self.fallback.label().to_owned(),
            available: true,
        });
        summaries
    }

    /// Diff two texts.
    ///
    /// Line endings are normalized first. Identical texts produce an empty
    /// body without consulting any backend.
    #[must_use]
    pub fn compute(&self, old: &str, new: &str) -> String {
        let old = normalize_line_endings(old);
        let new = normalize_line_endings(new);
        if old == new {
            return String::new();
        }
        for backend in self.registry.iter() {
            if !backend.is_available() {
                tracing::trace!(backend = backend.id(), "diff backend unavailable; skipping");
                continue;
            }
            match backend.compute(&old, &new) {
                Ok(body) => {
                    tracing::debug!(backend = backend.id(), "diff computed");
                    return self.finish(body, &backend.generator());
                }
                Err(err) => {
                    tracing::warn!(
                        backend = backend.id(),
                        error = %err,
                        "diff backend failed; falling through"
                    );
                }
            }
        }
        tracing::debug!(backend = self.fallback.id(), "diff computed");
        let body = self.fallback.diff(&old, &new);
        self.finish(body, &self.fallback.generator())
    }

    fn finish(&self, mut body: String, generator: &str) -> String {
        if let Some(trailer) = &self.trailer {
            body.push_str(&trailer.render(generator));
        }
        body
    }
}

impl Default for BackendChain {
    fn default() -> Self {
        Self::builtin_only()
    }
}

impl fmt::Debug for BackendChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let backends: Vec<&str> = self.registry.ids().collect();
        f.debug_struct("BackendChain")
            .field("backends", &backends)
            .field("trailer", &self.trailer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::backends::{BackendError, BackendResult};

    struct Scripted {
        id: &'static str,
        available: bool,
        outcome: Option<&'static str>,
        calls: Arc<AtomicUsize>,
    }

    impl Scripted {
        fn new(id: &'static str, available: bool, outcome: Option<&'static str>) -> Self {
            Self {
                id,
                available,
                outcome,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl DiffBackend for Scripted {
        fn id(&self) -> &'static str {
            self.id
        }

        fn label(&self) -> &'static str {
            self.id
        }

        fn is_available(&self) -> bool {
            self.available
        }

        fn compute(&self, _old: &str, _new: &str) -> BackendResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.map(str::to_owned).ok_or_else(|| BackendError::Failure {
                message: format!("{} failed", self.id),
            })
        }
    }

    #[test]
    fn first_available_backend_wins() {
        let skipped = Scripted::new("off", false, Some("never"));
        let skipped_calls = Arc::clone(&skipped.calls);
        let mut registry = BackendRegistry::new();
        registry.register(skipped);
        registry.register(Scripted::new("on", true, Some("from on")));
        let chain = BackendChain::new(registry);
        assert_eq!(chain.compute("a", "b"), "from on");
        assert_eq!(skipped_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn failures_fall_through_to_builtin() {
        let failing = Scripted::new("broken", true, None);
        let calls = Arc::clone(&failing.calls);
        let mut registry = BackendRegistry::new();
        registry.register(failing);
        let chain = BackendChain::new(registry);
        let body = chain.compute("a\n", "b\n");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(body.contains("diff-deletedline"));
        assert!(body.contains("diff-addedline"));
    }

    #[test]
    fn identical_after_normalization_is_empty() {
        let called = Scripted::new("on", true, Some("never"));
        let calls = Arc::clone(&called.calls);
        let mut registry = BackendRegistry::new();
        registry.register(called);
        let chain = BackendChain::new(registry).with_debug_trailer(DebugTrailer::default());
        assert_eq!(chain.compute("a\r\nb", "a\nb"), "");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn trailer_names_generator_and_host() {
        let chain = BackendChain::builtin_only()
            .with_debug_trailer(DebugTrailer::new(Some("db1".to_owned())));
        let body = chain.compute("a", "b");
        let trailer = body.lines().last().unwrap();
        assert!(trailer.starts_with("<!-- diff generator: internal [db1] "));
        assert!(trailer.ends_with(" -->"));
    }

    #[test]
    fn summaries_end_with_builtin() {
        let mut registry = BackendRegistry::new();
        registry.register(Scripted::new("off", false, None));
        let summaries = BackendChain::new(registry).summaries();
        assert_eq!(summaries.len(), 2);
        assert!(!summaries[0].available);
        assert_eq!(summaries[1].id, "builtin");
    }
}
