use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::api::RevisionId;

/// Version of the formatted body layout. Bumping it retires every cached body.
pub const DIFF_FORMAT_VERSION: &str = "1.11a";

/// Default lifetime of a cached body: seven days.
pub const DEFAULT_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Errors from an object cache backend.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The cache could not be reached.
    #[error("cache unavailable: {message}")]
    Unavailable {
        /// Detail from the cache backend.
        message: String,
    },
    /// Internal state lock was poisoned.
    #[error("cache state poisoned")]
    Poisoned,
}

/// Key/value store with per-entry expiry.
pub trait ObjectCache: Send + Sync {
    /// Cached value, if present and not expired.
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Stores `value` for `ttl`.
    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;
}

/// Cache key for a diff body.
///
/// Built only from concrete ids, so a sentinel can never be cached.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DiffCacheKey {
    version: String,
    old: RevisionId,
    new: RevisionId,
}

impl DiffCacheKey {
    /// Key for the current body format.
    pub fn new(old: RevisionId, new: RevisionId) -> Self {
        Self::versioned(DIFF_FORMAT_VERSION, old, new)
    }

    /// Key for an explicit body format version.
    pub fn versioned(version: impl Into<String>, old: RevisionId, new: RevisionId) -> Self {
        Self {
            version: version.into(),
            old,
            new,
        }
    }

    /// Full key string under `prefix`.
    pub fn render(&self, prefix: &str) -> String {
        format!("{prefix}:{self}")
    }
}

impl fmt::Display for DiffCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "diff:version:{}:oldid:{}:newid:{}",
            self.version, self.old, self.new
        )
    }
}

/// Source of the current time for expiry decisions.
pub trait Clock: Send + Sync {
    /// Time elapsed since the Unix epoch.
    fn now(&self) -> Duration;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicU64,
}

impl ManualClock {
    /// Clock starting at the epoch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let millis = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_millis(self.millis.load(Ordering::SeqCst))
    }
}

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Duration,
}

/// Process-local [`ObjectCache`].
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryCache {
    /// Cache expiring against the wall clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Cache expiring against `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |entries| entries.len())
    }

    /// Whether nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entries", &self.len())
            .finish_non_exhaustive()
    }
}

impl ObjectCache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let expires_at = self.clock.now().saturating_add(ttl);
        let mut entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
        entries.insert(
            key.to_owned(),
            Entry {
                value: value.to_owned(),
                expires_at,
            },
        );
        Ok(())
    }
}

/// Diff-body view over an [`ObjectCache`].
///
/// Cache failures are logged and treated as misses; they never fail a request.
#[derive(Clone)]
pub struct DiffCache {
    store: Arc<dyn ObjectCache>,
    prefix: String,
}

impl DiffCache {
    /// Wraps `store`, namespacing keys under `prefix`.
    pub fn new(store: Arc<dyn ObjectCache>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    /// Full key string as written to the store.
    pub fn key_string(&self, key: &DiffCacheKey) -> String {
        key.render(&self.prefix)
    }

    /// Cached body, or `None` on miss or failure.
    pub fn get(&self, key: &DiffCacheKey) -> Option<String> {
        let key = self.key_string(key);
        match self.store.get(&key) {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!(%key, error = %err, "diff cache read failed");
                None
            }
        }
    }

    /// Stores a body; failures are logged and dropped.
    pub fn set(&self, key: &DiffCacheKey, body: &str, ttl: Duration) {
        let key = self.key_string(key);
        if let Err(err) = self.store.set(&key, body, ttl) {
            tracing::warn!(%key, error = %err, "diff cache write failed");
        }
    }
}

impl fmt::Debug for DiffCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiffCache")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}
