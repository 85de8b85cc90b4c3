//! Get Pipeline (spec.md §4.7): fair round-robin dispatch across queues,
//! honoring scheduled time, per-queue caps, and the in-flight hold table.
//!
//! Grounded on `src/repository/crawl/claim.rs::claim_pending_urls` (claim
//! semantics under a lock) and `crates/foia/src/work_queue/runner.rs`'s
//! chunked polling loop, adapted to the lock-table hold model of §4.7
//! rather than a claimed-row model.

use crate::codec;
use crate::error::StoreResult;
use crate::model::{QueueWithinCrawl, UrlInfo};
use crate::queue::QueueRegistry;
use crate::store::{next_key_exclusive, Family, KVStore};

const DEFAULT_DELAY_SECS: i64 = 30;
const SCAN_BATCH: usize = 256;

/// Parameters for one `get` call (spec.md §4.7). `0` means "unlimited" for
/// the two caps and "use the default" for the delay.
#[derive(Debug, Clone, Default)]
pub struct GetParams {
    pub max_queues: u32,
    pub max_urls_per_queue: u32,
    pub delay_requestable_secs: u32,
    pub target_queue: Option<QueueWithinCrawl>,
}

/// Dispatch URLs for one `get` call, returning them in queue-visit order.
pub fn dispatch(
    store: &dyn KVStore,
    registry: &QueueRegistry,
    params: &GetParams,
    now: i64,
) -> StoreResult<Vec<UrlInfo>> {
    let delay = if params.delay_requestable_secs == 0 {
        DEFAULT_DELAY_SECS
    } else {
        params.delay_requestable_secs as i64
    };

    let (candidates, rotate_cursor) = match &params.target_queue {
        Some(q) => (vec![q.clone()], false),
        None => (registry.keys_from_cursor(), true),
    };

    let mut out = Vec::new();
    let mut queues_matched: u32 = 0;

    for q in candidates {
        if params.max_queues != 0 && queues_matched >= params.max_queues {
            break;
        }

        let Some(metadata) = registry.get(&q) else {
            if rotate_cursor {
                registry.advance();
            }
            continue;
        };

        let mut sent_for_queue: u32 = 0;
        let prefix = codec::encode_queue_prefix(&q);
        let mut cursor = prefix.clone();

        'queue: loop {
            let batch = store.scan(Family::Sched, &cursor, SCAN_BATCH)?;
            if batch.rows.is_empty() {
                break;
            }

            for (key, value) in &batch.rows {
                if !key.starts_with(&prefix) {
                    break 'queue;
                }
                let Some((_, nfd, url)) = codec::parse_scheduling(key) else {
                    continue;
                };
                if nfd > now {
                    break 'queue;
                }
                // try_claim alone performs the check-then-set under one lock
                // acquisition (spec.md §9 hold-map-race protocol); a separate
                // preceding is_held check would reopen the race window.
                let info: UrlInfo = match serde_json::from_slice(value) {
                    Ok(info) => info,
                    Err(e) => {
                        tracing::warn!(url = %url, error = %e, "failed to deserialize scheduled URL; skipping");
                        continue;
                    }
                };
                if !metadata.try_claim(&url, now, now + delay) {
                    continue;
                }
                out.push(info);
                sent_for_queue += 1;
                if params.max_urls_per_queue != 0 && sent_for_queue == params.max_urls_per_queue {
                    break 'queue;
                }
            }

            if !batch.more {
                break;
            }
            cursor = next_key_exclusive(batch.rows.last().map(|(k, _)| k.as_slice()).unwrap());
        }

        if sent_for_queue > 0 {
            queues_matched += 1;
        }
        if rotate_cursor {
            registry.advance();
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::put;
    use crate::model::UrlItem;
    use crate::store::SqliteKvStore;
    use tempfile::tempdir;

    fn setup() -> (SqliteKvStore, QueueRegistry, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let store = SqliteKvStore::open(dir.path().join("f.db")).unwrap();
        (store, QueueRegistry::new(), dir)
    }

    fn discovered(url: &str) -> UrlItem {
        UrlItem::Discovered {
            info: crate::model::UrlInfo::new(url),
        }
    }

    #[test]
    fn insert_then_dispatch_then_empty() {
        let (store, registry, _dir) = setup();
        put::apply(&store, &registry, discovered("http://a/x"), 1000).unwrap();

        let params = GetParams {
            max_queues: 1,
            max_urls_per_queue: 1,
            delay_requestable_secs: 30,
            target_queue: None,
        };
        let first = dispatch(&store, &registry, &params, 1000).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].url, "http://a/x");

        let second = dispatch(&store, &registry, &params, 1000).unwrap();
        assert!(second.is_empty());
    }

    #[test]
    fn hold_expires_after_delay() {
        let (store, registry, _dir) = setup();
        put::apply(&store, &registry, discovered("http://a/x"), 1000).unwrap();

        let params = GetParams {
            max_queues: 1,
            max_urls_per_queue: 1,
            delay_requestable_secs: 30,
            target_queue: None,
        };
        let first = dispatch(&store, &registry, &params, 1000).unwrap();
        assert_eq!(first.len(), 1);

        let during_hold = dispatch(&store, &registry, &params, 1010).unwrap();
        assert!(during_hold.is_empty());

        let after_hold = dispatch(&store, &registry, &params, 1031).unwrap();
        assert_eq!(after_hold.len(), 1);
    }

    #[test]
    fn round_robin_visits_every_queue_once_per_sweep() {
        let (store, registry, _dir) = setup();
        put::apply(&store, &registry, discovered("http://h1/1"), 1000).unwrap();
        put::apply(&store, &registry, discovered("http://h2/1"), 1000).unwrap();
        put::apply(&store, &registry, discovered("http://h1/2"), 1000).unwrap();

        let params = GetParams {
            max_queues: 0,
            max_urls_per_queue: 1,
            delay_requestable_secs: 30,
            target_queue: None,
        };
        let urls = dispatch(&store, &registry, &params, 1000).unwrap();
        let hosts: Vec<&str> = urls.iter().map(|u| u.url.as_str()).collect();
        assert_eq!(hosts.len(), 2);
        assert!(hosts.contains(&"http://h1/1"));
        assert!(hosts.contains(&"http://h2/1"));
    }

    #[test]
    fn future_dated_urls_are_not_dispatched() {
        let (store, registry, _dir) = setup();
        put::apply(&store, &registry, discovered("http://a/x"), 1000).unwrap();
        let known = UrlItem::Known {
            info: crate::model::UrlInfo::new("http://a/x"),
            refetchable_from_date: 5000,
        };
        put::apply(&store, &registry, known, 2000).unwrap();

        let params = GetParams {
            max_queues: 0,
            max_urls_per_queue: 0,
            delay_requestable_secs: 30,
            target_queue: None,
        };
        assert!(dispatch(&store, &registry, &params, 2000).unwrap().is_empty());
        let dispatched = dispatch(&store, &registry, &params, 5001).unwrap();
        assert_eq!(dispatched.len(), 1);
    }

    #[test]
    fn target_queue_restricts_to_one_queue_without_rotating_cursor() {
        let (store, registry, _dir) = setup();
        put::apply(&store, &registry, discovered("http://h1/1"), 1000).unwrap();
        put::apply(&store, &registry, discovered("http://h2/1"), 1000).unwrap();

        let target = QueueWithinCrawl::new("DEFAULT", "h1");
        let params = GetParams {
            max_queues: 0,
            max_urls_per_queue: 0,
            delay_requestable_secs: 30,
            target_queue: Some(target),
        };
        let urls = dispatch(&store, &registry, &params, 1000).unwrap();
        assert_eq!(urls.len(), 1);
        assert_eq!(urls[0].url, "http://h1/1");
        assert_eq!(registry.keys_from_cursor()[0].queue_key, "h1");
    }

    #[test]
    fn scheduled_value_is_only_a_claim_not_a_mutation() {
        let (store, registry, _dir) = setup();
        put::apply(&store, &registry, discovered("http://a/x"), 1000).unwrap();
        let q = QueueWithinCrawl::new("DEFAULT", "a");
        let before = store
            .scan(Family::Sched, &codec::encode_queue_prefix(&q), 10)
            .unwrap()
            .rows;

        let params = GetParams {
            max_queues: 1,
            max_urls_per_queue: 1,
            delay_requestable_secs: 30,
            target_queue: None,
        };
        dispatch(&store, &registry, &params, 1000).unwrap();

        let after = store
            .scan(Family::Sched, &codec::encode_queue_prefix(&q), 10)
            .unwrap()
            .rows;
        assert_eq!(before, after);
    }
}
