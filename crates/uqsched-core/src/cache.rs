//! Evaluation cache for slow-coordinate intermediates.
//!
//! Keys are built from the oracle's integer lattice indices, never from the
//! floating-point coordinates, so two requests for the same slow coordinates
//! always meet on the same entry. Every access goes through one mutex; cache
//! operations are O(1) map lookups and cost nothing next to a simulation.
//!
//! There is no eviction. Entries live until [`Cache::flush`], which keeps the
//! memory bounded by the number of distinct slow coordinates an oracle visits
//! during one construction.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::quantity::Intermediate;

/// Canonical big-endian encoding of a slow-coordinate index tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key(Box<[u8]>);

impl Key {
    /// Encode `indices` as concatenated big-endian `u64`s.
    pub fn new(indices: &[u64]) -> Self {
        let mut bytes = Vec::with_capacity(indices.len() * 8);
        for index in indices {
            bytes.extend_from_slice(&index.to_be_bytes());
        }
        Self(bytes.into_boxed_slice())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Hit and miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

struct Inner {
    entries: HashMap<Key, Intermediate>,
    hits: u64,
    misses: u64,
}

/// Thread-safe map from slow-coordinate keys to intermediates.
pub struct Cache {
    inner: Mutex<Inner>,
}

impl Cache {
    /// Create an empty cache sized for about `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::with_capacity(capacity),
                hits: 0,
                misses: 0,
            }),
        }
    }

    /// Look up `key`, counting a hit or a miss.
    pub fn get(&self, key: &Key) -> Option<Intermediate> {
        let mut inner = self.lock();
        match inner.entries.get(key).cloned() {
            Some(value) => {
                inner.hits += 1;
                Some(value)
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    /// Store `value` under `key`, replacing any previous entry.
    pub fn set(&self, key: Key, value: Intermediate) {
        self.lock().entries.insert(key, value);
    }

    /// Drop every entry. The next map is sized like the old one.
    pub fn flush(&self) {
        let mut inner = self.lock();
        let size = inner.entries.len();
        inner.entries = HashMap::with_capacity(size);
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            entries: inner.entries.len(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock only means another thread panicked mid-access; the
        // map itself is still consistent because every update is one insert.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
