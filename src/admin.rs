//! Admin Ops (spec.md §4.8): list-queues, stats, delete-queue, delete-crawl.
//!
//! Grounded on `src/repository/crawl/state.rs::get_crawl_state` (aggregate
//! stats assembled from in-memory counters plus a scan) and
//! `src/repository/crawl/mod.rs`'s `clear_source`/`clear_source_all` pair,
//! which delete a source's rows and then fall back to a crawl-wide sweep —
//! the same single-queue-vs-whole-scope shape as `deleteQueue`/`deleteCrawl`.

use std::collections::HashMap;

use crate::codec;
use crate::error::StoreResult;
use crate::model::QueueWithinCrawl;
use crate::queue::QueueRegistry;
use crate::store::{next_key_exclusive, Family, KVStore};

const SCAN_BATCH: usize = 2048;

/// Aggregate counts returned by `getStats` (spec.md §4.8).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stats {
    pub number_of_queues: u64,
    pub size: u64,
    pub in_process: u64,
    /// Per-status breakdown derived by iterating scheduled entries:
    /// `"ready"` (nfd <= now), `"scheduled"` (nfd > now), `"completed"`
    /// (from the queue's completed counter, which has no SCHED entry).
    pub status_counts: HashMap<String, u64>,
}

/// Registered queues in total order (spec.md §3.1), used to find range
/// boundaries for delete and a deterministic traversal order for listing.
fn sorted_queues(registry: &QueueRegistry) -> Vec<QueueWithinCrawl> {
    let mut keys = registry.keys();
    keys.sort();
    keys
}

/// Identifiers of dispatchable queues: those whose head `SCHED` entry has
/// `nfd <= now`. `max == 0` means unlimited, consistent with `GetParams`.
///
/// The limit is treated as inclusive of `max` (Open Question #1): the
/// returned list never exceeds `max` entries, never `max + 1`.
pub fn list_queues(
    store: &dyn KVStore,
    registry: &QueueRegistry,
    max: u32,
    now: i64,
) -> StoreResult<Vec<QueueWithinCrawl>> {
    let mut out = Vec::new();

    for q in sorted_queues(registry) {
        if max != 0 && out.len() as u32 >= max {
            break;
        }
        let prefix = codec::encode_queue_prefix(&q);
        let head = store.scan(Family::Sched, &prefix, 1)?;
        let Some((key, _)) = head.rows.first() else {
            continue;
        };
        if !key.starts_with(&prefix) {
            continue;
        }
        let Some((_, nfd, _)) = codec::parse_scheduling(key) else {
            continue;
        };
        if nfd <= now {
            out.push(q);
        }
    }

    Ok(out)
}

/// Stat a single queue if `queue` is given, otherwise every registered queue
/// (Open Question #3: a named queue stats that one; an absent one stats all,
/// rather than looking up an empty value as the buggy source variant does).
pub fn get_stats(
    store: &dyn KVStore,
    registry: &QueueRegistry,
    queue: Option<&QueueWithinCrawl>,
    now: i64,
) -> StoreResult<Stats> {
    let scope: Vec<QueueWithinCrawl> = match queue {
        Some(q) => vec![q.clone()],
        None => registry.keys(),
    };

    let mut stats = Stats::default();
    stats.number_of_queues = scope.len() as u64;

    for q in &scope {
        let Some(metadata) = registry.get(q) else {
            continue;
        };
        stats.size += metadata.size();
        stats.in_process += metadata.in_process(now);
        *stats.status_counts.entry("completed".to_string()).or_insert(0) += metadata.count_completed();

        let prefix = codec::encode_queue_prefix(q);
        let mut cursor = prefix.clone();
        'scan: loop {
            let batch = store.scan(Family::Sched, &cursor, SCAN_BATCH)?;
            if batch.rows.is_empty() {
                break;
            }
            for (key, _value) in &batch.rows {
                if !key.starts_with(&prefix) {
                    break 'scan;
                }
                let Some((_, nfd, _)) = codec::parse_scheduling(key) else {
                    continue;
                };
                let status = if nfd <= now { "ready" } else { "scheduled" };
                *stats.status_counts.entry(status.to_string()).or_insert(0) += 1;
            }
            match batch.rows.last() {
                Some((last_key, _)) if batch.more => cursor = next_key_exclusive(last_key),
                _ => break,
            }
        }
    }

    Ok(stats)
}

/// Delete one queue: mark it deleting so concurrent puts are dropped (spec.md
/// §4.6 step 3), range-delete both families over its byte range, then remove
/// it from the registry. Returns the number of URLs removed (active +
/// completed), i.e. the number of existence entries deleted.
pub fn delete_queue(store: &dyn KVStore, registry: &QueueRegistry, q: &QueueWithinCrawl) -> StoreResult<u64> {
    registry.mark_deleting(q);

    let start = codec::encode_queue_prefix(q);
    let end = sorted_queues(registry)
        .into_iter()
        .filter(|k| k > q)
        .min()
        .map(|next_q| codec::encode_queue_prefix(&next_q));

    let removed = store.delete_range(Family::Url, &start, end.as_deref())?;
    store.delete_range(Family::Sched, &start, end.as_deref())?;

    registry.remove(q);
    registry.unmark_deleting(q);

    Ok(removed)
}

/// Delete every queue under one crawl. Same range strategy as
/// [`delete_queue`], but scoped to the crawl id prefix `esc(crawlId) "_"` with
/// the next crawl id (in sorted order among registered queues) as the
/// exclusive upper bound, or end-of-store if this is the last crawl.
pub fn delete_crawl(store: &dyn KVStore, registry: &QueueRegistry, crawl_id: &str) -> StoreResult<u64> {
    let crawl_id = crate::model::normalize_crawl_id(crawl_id);
    let mut prefix = codec::esc(&crawl_id).into_bytes();
    prefix.push(b'_');

    let end = sorted_queues(registry)
        .into_iter()
        .filter(|k| k.crawl_id > crawl_id)
        .map(|k| k.crawl_id)
        .min()
        .map(|next_crawl_id| {
            let mut end_prefix = codec::esc(&next_crawl_id).into_bytes();
            end_prefix.push(b'_');
            end_prefix
        });

    let removed = store.delete_range(Family::Url, &prefix, end.as_deref())?;
    store.delete_range(Family::Sched, &prefix, end.as_deref())?;

    for q in registry.keys() {
        if q.crawl_id == crawl_id {
            registry.remove(&q);
        }
    }

    Ok(removed)
}
