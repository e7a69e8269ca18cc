//! Bounded memo of token-limit truncations.
//!
//! Truncating a long context to a token budget means a full tokenizer pass.
//! The same (text, budget, content kind) triple comes up repeatedly when a
//! user regenerates one section several times, so results are memoized.
//!
//! Entries are evicted oldest-inserted first: lookups use `peek`, which does
//! not refresh recency. Correctness never depends on the cache; a miss only
//! costs a tokenizer pass.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use lru::LruCache;

/// Key for one truncation: text identity, token budget, content kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TruncationKey {
    text_len: usize,
    text_hash: u64,
    budget: usize,
    kind: String,
}

impl TruncationKey {
    /// Build the key for truncating `text` to `budget` tokens for `kind`.
    #[must_use]
    pub fn new(text: &str, budget: usize, kind: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        Self {
            text_len: text.len(),
            text_hash: hasher.finish(),
            budget,
            kind: kind.to_string(),
        }
    }
}

/// Fixed-capacity, thread-safe truncation cache.
///
/// Construct one per pipeline (or per test) and share it through an `Arc`.
///
/// ```rust
/// use std::num::NonZeroUsize;
/// use quire::{TruncationCache, TruncationKey};
///
/// let cache = TruncationCache::new(NonZeroUsize::new(2).unwrap());
/// cache.insert(TruncationKey::new("a", 10, "synopsis"), "a".into());
/// cache.insert(TruncationKey::new("b", 10, "synopsis"), "b".into());
/// cache.insert(TruncationKey::new("c", 10, "synopsis"), "c".into());
///
/// // "a" was inserted first, so it went first.
/// assert!(cache.get(&TruncationKey::new("a", 10, "synopsis")).is_none());
/// assert_eq!(cache.len(), 2);
/// ```
pub struct TruncationCache {
    entries: Mutex<LruCache<TruncationKey, String>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl TruncationCache {
    /// Create a cache holding at most `capacity` entries.
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Create a cache, or `None` when `capacity` is zero (cache disabled).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Option<Self> {
        NonZeroUsize::new(capacity).map(Self::new)
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<TruncationKey, String>> {
        // A panic mid-insert cannot leave the map torn, so keep using it.
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Look up a cached truncation.
    pub fn get(&self, key: &TruncationKey) -> Option<String> {
        let found = self.lock().peek(key).cloned();
        let counter = if found.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Store a truncation, evicting the oldest entry when full.
    pub fn insert(&self, key: TruncationKey, value: String) {
        self.lock().put(key, value);
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.lock().cap().get()
    }

    /// Lookups that found an entry.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Lookups that found nothing.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for TruncationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TruncationCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("hits", &self.hits())
            .field("misses", &self.misses())
            .finish()
    }
}
