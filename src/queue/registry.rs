//! Queue Registry (spec.md §4.4): an ordered, rotating collection of queue
//! identifiers with O(1) lookup and a round-robin cursor.
//!
//! Re-architected per spec.md §9 away from "replace the whole sorted map to
//! force reordering": insertion order is preserved explicitly and the
//! cursor alone provides fair rotation, so no rebuild is ever needed.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::model::QueueWithinCrawl;
use crate::queue::metadata::QueueMetadata;

struct Inner {
    order: Vec<QueueWithinCrawl>,
    index: HashMap<QueueWithinCrawl, Arc<QueueMetadata>>,
    cursor: usize,
    deleting: HashSet<QueueWithinCrawl>,
}

/// Guards `order`, `index`, `cursor`, and `deleting` with a single mutex,
/// held only for the duration of one map operation or cursor step — never
/// across a KV-store call (spec.md §5).
pub struct QueueRegistry {
    inner: Mutex<Inner>,
}

impl Default for QueueRegistry {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Inner {
                order: Vec::new(),
                index: HashMap::new(),
                cursor: 0,
                deleting: HashSet::new(),
            }),
        }
    }
}

impl QueueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `q` with metadata `factory()` if absent. Returns the metadata
    /// handle and whether it was freshly created.
    pub fn get_or_insert(
        &self,
        q: &QueueWithinCrawl,
        factory: impl FnOnce() -> QueueMetadata,
    ) -> (Arc<QueueMetadata>, bool) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(existing) = inner.index.get(q) {
            return (existing.clone(), false);
        }
        let metadata = Arc::new(factory());
        inner.order.push(q.clone());
        inner.index.insert(q.clone(), metadata.clone());
        (metadata, true)
    }

    pub fn get(&self, q: &QueueWithinCrawl) -> Option<Arc<QueueMetadata>> {
        self.inner.lock().unwrap().index.get(q).cloned()
    }

    /// Remove `q` from both the index and the rotation order.
    pub fn remove(&self, q: &QueueWithinCrawl) -> Option<Arc<QueueMetadata>> {
        let mut inner = self.inner.lock().unwrap();
        let removed = inner.index.remove(q);
        if removed.is_some() {
            if let Some(pos) = inner.order.iter().position(|k| k == q) {
                inner.order.remove(pos);
                if inner.cursor > pos {
                    inner.cursor -= 1;
                }
            }
        }
        removed
    }

    /// Snapshot of registered queues in insertion order. A copy; the caller
    /// holds no lock while iterating it.
    pub fn keys(&self) -> Vec<QueueWithinCrawl> {
        self.inner.lock().unwrap().order.clone()
    }

    /// Snapshot of registered queues starting at the current cursor
    /// position and wrapping around, for round-robin dispatch (spec.md §4.7).
    pub fn keys_from_cursor(&self) -> Vec<QueueWithinCrawl> {
        let inner = self.inner.lock().unwrap();
        if inner.order.is_empty() {
            return Vec::new();
        }
        let start = inner.cursor % inner.order.len();
        inner.order[start..]
            .iter()
            .chain(inner.order[..start].iter())
            .cloned()
            .collect()
    }

    /// Advance the cursor by one position, wrapping at the end. Called once
    /// per queue visited during a `get` call, regardless of whether it
    /// emitted a URL (spec.md §4.7 step 4).
    pub fn advance(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.order.is_empty() {
            return;
        }
        inner.cursor = (inner.cursor + 1) % inner.order.len();
    }

    pub fn mark_deleting(&self, q: &QueueWithinCrawl) {
        self.inner.lock().unwrap().deleting.insert(q.clone());
    }

    pub fn unmark_deleting(&self, q: &QueueWithinCrawl) {
        self.inner.lock().unwrap().deleting.remove(q);
    }

    pub fn is_deleting(&self, q: &QueueWithinCrawl) -> bool {
        self.inner.lock().unwrap().deleting.contains(q)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(n: &str) -> QueueWithinCrawl {
        QueueWithinCrawl::new("DEFAULT", n)
    }

    #[test]
    fn get_or_insert_is_idempotent() {
        let reg = QueueRegistry::new();
        let (_, created) = reg.get_or_insert(&q("a"), QueueMetadata::new);
        assert!(created);
        let (_, created_again) = reg.get_or_insert(&q("a"), QueueMetadata::new);
        assert!(!created_again);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn cursor_rotates_and_wraps() {
        let reg = QueueRegistry::new();
        reg.get_or_insert(&q("a"), QueueMetadata::new);
        reg.get_or_insert(&q("b"), QueueMetadata::new);
        reg.get_or_insert(&q("c"), QueueMetadata::new);

        assert_eq!(reg.keys_from_cursor(), vec![q("a"), q("b"), q("c")]);
        reg.advance();
        assert_eq!(reg.keys_from_cursor(), vec![q("b"), q("c"), q("a")]);
        reg.advance();
        reg.advance();
        assert_eq!(reg.keys_from_cursor(), vec![q("a"), q("b"), q("c")]);
    }

    #[test]
    fn remove_keeps_cursor_consistent() {
        let reg = QueueRegistry::new();
        reg.get_or_insert(&q("a"), QueueMetadata::new);
        reg.get_or_insert(&q("b"), QueueMetadata::new);
        reg.get_or_insert(&q("c"), QueueMetadata::new);
        reg.advance(); // cursor at b
        reg.advance(); // cursor at c
        reg.remove(&q("a"));
        assert_eq!(reg.keys_from_cursor(), vec![q("c"), q("b")]);
    }

    #[test]
    fn deleting_set_tracks_membership() {
        let reg = QueueRegistry::new();
        assert!(!reg.is_deleting(&q("a")));
        reg.mark_deleting(&q("a"));
        assert!(reg.is_deleting(&q("a")));
        reg.unmark_deleting(&q("a"));
        assert!(!reg.is_deleting(&q("a")));
    }
}
