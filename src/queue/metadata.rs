//! Per-queue metadata (spec.md §3.3, §4.3): active/completed counters and
//! the in-flight hold table, guarded by one mutex per queue so dispatch and
//! ingest never block each other's neighbors (spec.md §5).

use std::collections::HashMap;
use std::sync::Mutex;

struct Inner {
    active: u64,
    completed: u64,
    held: HashMap<String, i64>,
}

pub struct QueueMetadata {
    inner: Mutex<Inner>,
}

impl Default for QueueMetadata {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Inner {
                active: 0,
                completed: 0,
                held: HashMap::new(),
            }),
        }
    }
}

impl QueueMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct with counts recovered from the store (spec.md §4.5).
    pub fn with_counts(active: u64, completed: u64) -> Self {
        Self {
            inner: Mutex::new(Inner {
                active,
                completed,
                held: HashMap::new(),
            }),
        }
    }

    pub fn increment_active(&self) {
        self.inner.lock().unwrap().active += 1;
    }

    pub fn decrement_active(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.active = inner.active.saturating_sub(1);
    }

    pub fn increment_completed(&self) {
        self.inner.lock().unwrap().completed += 1;
    }

    pub fn hold_until(&self, url: &str, deadline: i64) {
        self.inner.lock().unwrap().held.insert(url.to_string(), deadline);
    }

    /// True iff `url` is held past `now`. Purges the entry lazily if it has
    /// already expired, bounding hold-table growth (spec.md §5 memory note).
    pub fn is_held(&self, url: &str, now: i64) -> bool {
        let mut inner = self.inner.lock().unwrap();
        match inner.held.get(url) {
            Some(&deadline) if deadline > now => true,
            Some(_) => {
                inner.held.remove(url);
                false
            }
            None => false,
        }
    }

    /// Check-then-set under a single lock acquisition: never releases the
    /// lock between the hold check and placing a new hold, closing the race
    /// the teacher's design notes call out explicitly (spec.md §9).
    pub fn try_claim(&self, url: &str, now: i64, new_deadline: i64) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let currently_held = match inner.held.get(url) {
            Some(&deadline) => deadline > now,
            None => false,
        };
        if currently_held {
            return false;
        }
        inner.held.insert(url.to_string(), new_deadline);
        true
    }

    pub fn remove_from_processed(&self, url: &str) {
        self.inner.lock().unwrap().held.remove(url);
    }

    pub fn count_active(&self) -> u64 {
        self.inner.lock().unwrap().active
    }

    pub fn count_completed(&self) -> u64 {
        self.inner.lock().unwrap().completed
    }

    pub fn size(&self) -> u64 {
        let inner = self.inner.lock().unwrap();
        inner.active + inner.completed
    }

    /// Overwrite the counters, used by recovery once the authoritative
    /// counts have been computed from the `URL` family (spec.md §4.5).
    pub fn reset_counts(&self, active: u64, completed: u64) {
        let mut inner = self.inner.lock().unwrap();
        inner.active = active;
        inner.completed = completed;
    }

    /// Number of unexpired hold entries (used by `getStats`'s `inProcess`).
    pub fn in_process(&self, now: i64) -> u64 {
        let inner = self.inner.lock().unwrap();
        inner.held.values().filter(|&&deadline| deadline > now).count() as u64
    }

    /// Purge every expired hold entry. Intended for a periodic sweep rather
    /// than the hot dispatch path (spec.md §5 memory note).
    pub fn sweep_expired_holds(&self, now: i64) {
        let mut inner = self.inner.lock().unwrap();
        inner.held.retain(|_, &mut deadline| deadline > now);
    }
}
