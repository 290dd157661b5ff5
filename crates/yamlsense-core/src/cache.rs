//! Per-document cache of parse results.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use url::Url;

use crate::document::TextDocument;

/// Default number of documents kept in the cache.
pub const DEFAULT_CAPACITY: usize = 10;

/// Default idle time after which an entry is dropped.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

struct CacheEntry<T> {
    version: i32,
    value: Arc<T>,
    last_access: Instant,
}

/// Caches the parse result of each open document, keyed by URI.
///
/// An entry is only served for the exact document version it was parsed
/// from. The cache holds at most `capacity` entries (least recently used goes
/// first) and drops entries idle for longer than `ttl` whenever it is
/// accessed.
pub struct ParseCache<T> {
    entries: HashMap<Url, CacheEntry<T>>,
    capacity: usize,
    ttl: Duration,
    parses: u64,
}

impl<T> ParseCache<T> {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
            ttl,
            parses: 0,
        }
    }

    /// Parse result for `document`, parsing with `parse` on a miss.
    pub fn get<F>(&mut self, document: &TextDocument, parse: F) -> Arc<T>
    where
        F: FnOnce(&TextDocument) -> T,
    {
        self.get_at(document, Instant::now(), parse)
    }

    /// [`ParseCache::get`] with an explicit clock reading.
    pub fn get_at<F>(&mut self, document: &TextDocument, now: Instant, parse: F) -> Arc<T>
    where
        F: FnOnce(&TextDocument) -> T,
    {
        self.evict_expired(now);

        if let Some(entry) = self.entries.get_mut(&document.uri) {
            if entry.version == document.version {
                entry.last_access = now;
                return Arc::clone(&entry.value);
            }
        }

        let value = Arc::new(parse(document));
        self.parses += 1;
        self.entries.insert(
            document.uri.clone(),
            CacheEntry {
                version: document.version,
                value: Arc::clone(&value),
                last_access: now,
            },
        );

        if self.entries.len() > self.capacity {
            self.evict_least_recent();
        }

        value
    }

    /// Drop the entry for a closed document.
    pub fn on_document_removed(&mut self, uri: &Url) {
        self.entries.remove(uri);
    }

    /// Drop every entry.
    pub fn dispose(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, uri: &Url) -> bool {
        self.entries.contains_key(uri)
    }

    /// Number of times the parse function has been invoked.
    pub fn parse_count(&self) -> u64 {
        self.parses
    }

    fn evict_expired(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.last_access) <= ttl);
    }

    fn evict_least_recent(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_access)
            .map(|(uri, _)| uri.clone());
        if let Some(uri) = oldest {
            self.entries.remove(&uri);
        }
    }
}

impl<T> Default for ParseCache<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TTL)
    }
}
