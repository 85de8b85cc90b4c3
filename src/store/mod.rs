//! KV Store Adapter (spec.md §4.2): an ordered two-family key/value store.
//!
//! The trait is intentionally small and synchronous — exactly the shape of
//! the teacher's `CrawlRepository` (point get/put/delete plus a couple of
//! range operations, backed by a plain `rusqlite::Connection`). Async
//! pipeline code calls through `tokio::task::spawn_blocking`, the same way
//! the teacher bridges its synchronous repositories into async handlers.

mod sqlite;

pub use sqlite::SqliteKvStore;

use crate::error::StoreResult;

/// The two logical column families required by spec.md §3.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    /// Existence family: one entry per known URL.
    Url,
    /// Scheduling family: one entry per URL currently due to be fetched.
    Sched,
}

impl Family {
    pub fn as_str(self) -> &'static str {
        match self {
            Family::Url => "url",
            Family::Sched => "sched",
        }
    }
}

/// A bounded forward scan result: rows in key order starting at/after the
/// requested key, plus whether more rows exist beyond this batch.
pub struct ScanBatch {
    pub rows: Vec<(Vec<u8>, Vec<u8>)>,
    pub more: bool,
}

/// Abstracts a two-family ordered store (spec.md §4.2).
pub trait KVStore: Send + Sync {
    fn get(&self, family: Family, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;
    fn put(&self, family: Family, key: &[u8], value: &[u8]) -> StoreResult<()>;
    fn delete(&self, family: Family, key: &[u8]) -> StoreResult<()>;

    /// Forward scan starting at `start_key` (inclusive), capped at `limit`
    /// rows. Callers page through a queue's prefix by re-invoking with the
    /// last-seen key (lexicographically incremented by appending a 0x00
    /// byte) as the next `start_key`; see [`next_key_exclusive`].
    fn scan(&self, family: Family, start_key: &[u8], limit: usize) -> StoreResult<ScanBatch>;

    /// Atomic range delete over `[start_inclusive, end_exclusive)` in both
    /// families is composed by the caller issuing one `delete_range` per
    /// family; each call is atomic at the per-call level (spec.md §4.2).
    /// `end_exclusive == None` means "through the end of the family".
    fn delete_range(
        &self,
        family: Family,
        start_inclusive: &[u8],
        end_exclusive: Option<&[u8]>,
    ) -> StoreResult<u64>;
}

/// Smallest key strictly greater than `key`, used to page scans forward
/// without re-observing the last row.
pub fn next_key_exclusive(key: &[u8]) -> Vec<u8> {
    let mut next = key.to_vec();
    next.push(0);
    next
}
