//! Recovery (spec.md §4.5): rebuild the `QueueRegistry` and per-queue
//! `active`/`completed` counts from the durable store at startup, asserting
//! the two column families agree.
//!
//! Grounded on `src/repository/crawl/state.rs::get_crawl_state` (aggregate
//! scan rebuilding derived counts from one table) and `cli::commands::db`'s
//! `cmd_migrate`, which fails fast with a clear diagnostic on a schema
//! mismatch rather than silently limping forward.

use std::collections::{HashMap, HashSet};

use crate::codec;
use crate::error::RecoveryError;
use crate::model::QueueWithinCrawl;
use crate::queue::{QueueMetadata, QueueRegistry};
use crate::store::{next_key_exclusive, Family, KVStore};

const SCAN_BATCH: usize = 2048;

/// Run recovery against `store`, populating `registry`. Must be called once
/// at startup before the frontier serves any request.
pub fn recover(store: &dyn KVStore, registry: &QueueRegistry) -> Result<(), RecoveryError> {
    let scheduled_counts = scan_scheduled_counts(store, registry)?;
    let finalized = scan_active_and_completed(store, registry, &scheduled_counts)?;

    // Queues that carry SCHED entries but have no URL entries at all would
    // violate I1 (every scheduling entry has a matching existence entry);
    // catch that here rather than silently reporting active = 0.
    for (q, &scheduled) in &scheduled_counts {
        if finalized.contains(q) {
            continue;
        }
        if scheduled != 0 {
            return Err(RecoveryError::Inconsistent {
                crawl_id: q.crawl_id.clone(),
                queue_key: q.queue_key.clone(),
                active: 0,
                scheduled,
            });
        }
    }

    Ok(())
}

/// Step A (spec.md §4.5): iterate `SCHED` in key order, registering every
/// queue encountered and counting its scheduling entries.
fn scan_scheduled_counts(
    store: &dyn KVStore,
    registry: &QueueRegistry,
) -> Result<HashMap<QueueWithinCrawl, u64>, RecoveryError> {
    let mut counts: HashMap<QueueWithinCrawl, u64> = HashMap::new();
    let mut cursor: Vec<u8> = Vec::new();

    loop {
        let batch = store.scan(Family::Sched, &cursor, SCAN_BATCH)?;
        for (key, _value) in &batch.rows {
            if let Some(q) = codec::parse_queue(key) {
                *counts.entry(q.clone()).or_insert(0) += 1;
                registry.get_or_insert(&q, QueueMetadata::new);
            }
        }
        match batch.rows.last() {
            Some((last_key, _)) if batch.more => cursor = next_key_exclusive(last_key),
            _ => break,
        }
    }
    Ok(counts)
}

/// Step B (spec.md §4.5): iterate `URL` in key order, computing the
/// authoritative active/completed counts and cross-checking each queue's
/// active count against the `SCHED`-derived count when its key range ends.
fn scan_active_and_completed(
    store: &dyn KVStore,
    registry: &QueueRegistry,
    scheduled_counts: &HashMap<QueueWithinCrawl, u64>,
) -> Result<HashSet<QueueWithinCrawl>, RecoveryError> {
    let mut finalized = HashSet::new();
    let mut current: Option<QueueWithinCrawl> = None;
    let mut active = 0u64;
    let mut completed = 0u64;
    let mut cursor: Vec<u8> = Vec::new();

    loop {
        let batch = store.scan(Family::Url, &cursor, SCAN_BATCH)?;
        for (key, value) in &batch.rows {
            let Some(q) = codec::parse_queue(key) else {
                continue;
            };
            if current.as_ref() != Some(&q) {
                if let Some(prev) = current.take() {
                    finalize_queue(&prev, active, completed, scheduled_counts, registry)?;
                    finalized.insert(prev);
                }
                current = Some(q.clone());
                active = 0;
                completed = 0;
                registry.get_or_insert(&q, QueueMetadata::new);
            }
            if value.is_empty() {
                completed += 1;
            } else {
                active += 1;
            }
        }
        match batch.rows.last() {
            Some((last_key, _)) if batch.more => cursor = next_key_exclusive(last_key),
            _ => break,
        }
    }
    if let Some(prev) = current.take() {
        finalize_queue(&prev, active, completed, scheduled_counts, registry)?;
        finalized.insert(prev);
    }

    Ok(finalized)
}

fn finalize_queue(
    q: &QueueWithinCrawl,
    active: u64,
    completed: u64,
    scheduled_counts: &HashMap<QueueWithinCrawl, u64>,
    registry: &QueueRegistry,
) -> Result<(), RecoveryError> {
    let scheduled = scheduled_counts.get(q).copied().unwrap_or(0);
    if active != scheduled {
        return Err(RecoveryError::Inconsistent {
            crawl_id: q.crawl_id.clone(),
            queue_key: q.queue_key.clone(),
            active,
            scheduled,
        });
    }
    let metadata = registry.get_or_insert(q, QueueMetadata::new).0;
    metadata.reset_counts(active, completed);
    Ok(())
}
