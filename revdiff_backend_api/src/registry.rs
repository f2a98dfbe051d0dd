//! Ordered registry of diff backends.

use std::fmt;
use std::sync::Arc;

use crate::{BackendSummary, DiffBackend};

/// Backends in preference order; the first available one runs first.
#[derive(Default, Clone)]
pub struct BackendRegistry {
    backends: Vec<Arc<dyn DiffBackend>>,
}

impl BackendRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a backend after those already registered.
    pub fn register<B>(&mut self, backend: B)
    where
        B: DiffBackend + 'static,
    {
        self.register_arc(Arc::new(backend));
    }

    /// Append a shared backend. A backend with the same id is replaced in place.
    pub fn register_arc(&mut self, backend: Arc<dyn DiffBackend>) {
        if let Some(slot) = self
            .backends
            .iter_mut()
            .find(|existing| existing.id() == backend.id())
        {
            *slot = backend;
        } else {
            self.backends.push(backend);
        }
    }

    /// Retrieve a backend by identifier.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<dyn DiffBackend>> {
        self.backends
            .iter()
            .find(|backend| backend.id() == id)
            .cloned()
    }

    /// Backends in preference order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn DiffBackend>> + '_ {
        self.backends.iter()
    }

    /// Registered identifiers in preference order.
    pub fn ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.backends.iter().map(|backend| backend.id())
    }

    /// Summaries for every registered backend.
    #[must_use]
    pub fn summaries(&self) -> Vec<BackendSummary> {
        self.backends
            .iter()
            .map(|backend| BackendSummary {
                id: backend.id().to_string(),
                label: backend.label().to_string(),
                available: backend.is_available(),
            })
            .collect()
    }

    /// Number of registered backends.
    #[must_use]
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("backends", &self.ids().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BackendResult;

    struct Named(&'static str, &'static str);

    impl DiffBackend for Named {
        fn id(&self) -> &'static str {
            self.0
        }

        fn label(&self) -> &'static str {
            self.1
        }

        fn is_available(&self) -> bool {
            true
        }

        fn compute(&self, _old: &str, _new: &str) -> BackendResult<String> {
            Ok(self.1.to_string())
        }
    }

    #[test]
    fn keeps_registration_order() {
        let mut registry = BackendRegistry::new();
        registry.register(Named("b", "B"));
        registry.register(Named("a", "A"));
        assert_eq!(registry.ids().collect::<Vec<_>>(), vec!["b", "a"]);
    }

    #[test]
    fn same_id_replaces_in_place() {
        let mut registry = BackendRegistry::new();
        registry.register(Named("a", "first"));
        registry.register(Named("b", "B"));
        registry.register(Named("a", "second"));

        assert_eq!(registry.len(), 2);
        let summaries = registry.summaries();
        assert_eq!(summaries[0].label, "second");
        assert_eq!(summaries[1].id, "b");
    }
}
