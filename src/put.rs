//! Put Pipeline (spec.md §4.6): ingestion of `Discovered`/`Known` items,
//! maintaining both key families and per-queue metadata.
//!
//! Grounded on `src/repository/crawl/url.rs` (`add_url` insert-if-absent,
//! `update_url`/`mark_url_for_refresh` reschedule) and the `WorkQueue`
//! claim/complete lifecycle shape in `crates/foia/src/work_queue/mod.rs`.

use crate::codec;
use crate::error::StoreResult;
use crate::model::{normalize_crawl_id, derive_queue_key_from_host, QueueWithinCrawl, UrlItem, MAX_QUEUE_KEY_BYTES};
use crate::queue::{QueueMetadata, QueueRegistry};
use crate::store::{Family, KVStore};

/// Apply one `UrlItem` against `store`/`registry`. Always returns the URL to
/// ack unless the store itself failed — per spec.md §7, a store error drops
/// the ack entirely rather than acking a possibly-inconsistent write.
pub fn apply(
    store: &dyn KVStore,
    registry: &QueueRegistry,
    item: UrlItem,
    now: i64,
) -> StoreResult<String> {
    let info = item.info().clone();
    let url = info.url.clone();

    let crawl_id = normalize_crawl_id(&info.crawl_id);

    let queue_key = if info.key.is_empty() {
        match derive_queue_key_from_host(&info.url) {
            Some(key) => key,
            None => {
                tracing::warn!(url = %url, "no host and no queue key supplied; dropping");
                return Ok(url);
            }
        }
    } else {
        info.key.clone()
    };

    if queue_key.len() > MAX_QUEUE_KEY_BYTES {
        tracing::warn!(url = %url, key_len = queue_key.len(), "queue key exceeds 255 bytes; dropping");
        return Ok(url);
    }

    let q = QueueWithinCrawl::new(crawl_id, queue_key);

    if registry.is_deleting(&q) {
        tracing::warn!(url = %url, queue = %q, "queue is being deleted; dropping");
        return Ok(url);
    }

    let next_fetch_date = match &item {
        UrlItem::Discovered { .. } => now,
        UrlItem::Known {
            refetchable_from_date,
            ..
        } => *refetchable_from_date,
    };

    let existence_key = codec::encode_existence(&q, &info.url);
    let prior = store.get(Family::Url, &existence_key)?;

    match (&prior, &item) {
        (None, UrlItem::Discovered { .. }) => {
            let metadata = registry.get_or_insert(&q, QueueMetadata::new).0;
            insert_new(store, &q, &info, next_fetch_date, &existence_key)?;
            metadata.increment_active();
        }
        (Some(_), UrlItem::Discovered { .. }) => {
            tracing::debug!(url = %url, "already known; ignoring duplicate discovery");
        }
        (prior, UrlItem::Known { .. }) => {
            let metadata = registry.get_or_insert(&q, QueueMetadata::new).0;

            if let Some(prior_value) = prior {
                if !prior_value.is_empty() {
                    store.delete(Family::Sched, prior_value)?;
                    metadata.remove_from_processed(&url);
                    metadata.decrement_active();
                }
            }

            if next_fetch_date == 0 {
                store.put(Family::Url, &existence_key, &[])?;
                metadata.increment_completed();
            } else {
                insert_new(store, &q, &info, next_fetch_date, &existence_key)?;
                metadata.increment_active();
            }
        }
    }

    Ok(url)
}

fn insert_new(
    store: &dyn KVStore,
    q: &QueueWithinCrawl,
    info: &crate::model::UrlInfo,
    next_fetch_date: i64,
    existence_key: &[u8],
) -> StoreResult<()> {
    let sched_key = codec::encode_scheduling(q, next_fetch_date, &info.url);
    let value = serde_json::to_vec(info)?;
    store.put(Family::Sched, &sched_key, &value)?;
    store.put(Family::Url, existence_key, &sched_key)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UrlInfo;
    use crate::store::SqliteKvStore;
    use tempfile::tempdir;

    fn setup() -> (SqliteKvStore, QueueRegistry, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let store = SqliteKvStore::open(dir.path().join("f.db")).unwrap();
        (store, QueueRegistry::new(), dir)
    }

    fn discovered(url: &str) -> UrlItem {
        UrlItem::Discovered {
            info: UrlInfo::new(url),
        }
    }

    #[test]
    fn insert_new_url_creates_both_families() {
        let (store, registry, _dir) = setup();
        let url = apply(&store, &registry, discovered("http://a/x"), 1000).unwrap();
        assert_eq!(url, "http://a/x");

        let q = QueueWithinCrawl::new("DEFAULT", "a");
        let metadata = registry.get(&q).unwrap();
        assert_eq!(metadata.count_active(), 1);

        let existence_key = codec::encode_existence(&q, "http://a/x");
        let sched_key = store.get(Family::Url, &existence_key).unwrap().unwrap();
        assert!(store.get(Family::Sched, &sched_key).unwrap().is_some());
    }

    #[test]
    fn duplicate_discovered_is_idempotent() {
        let (store, registry, _dir) = setup();
        apply(&store, &registry, discovered("http://a/x"), 1000).unwrap();
        apply(&store, &registry, discovered("http://a/x"), 1000).unwrap();

        let q = QueueWithinCrawl::new("DEFAULT", "a");
        assert_eq!(registry.get(&q).unwrap().count_active(), 1);
    }

    #[test]
    fn known_with_zero_refetch_marks_completed() {
        let (store, registry, _dir) = setup();
        apply(&store, &registry, discovered("http://a/x"), 1000).unwrap();

        let known = UrlItem::Known {
            info: UrlInfo::new("http://a/x"),
            refetchable_from_date: 0,
        };
        apply(&store, &registry, known, 2000).unwrap();

        let q = QueueWithinCrawl::new("DEFAULT", "a");
        let metadata = registry.get(&q).unwrap();
        assert_eq!(metadata.count_active(), 0);
        assert_eq!(metadata.count_completed(), 1);

        let existence_key = codec::encode_existence(&q, "http://a/x");
        assert_eq!(
            store.get(Family::Url, &existence_key).unwrap(),
            Some(Vec::new())
        );
    }

    #[test]
    fn known_with_future_date_reschedules() {
        let (store, registry, _dir) = setup();
        apply(&store, &registry, discovered("http://a/x"), 1000).unwrap();

        let known = UrlItem::Known {
            info: UrlInfo::new("http://a/x"),
            refetchable_from_date: 5000,
        };
        apply(&store, &registry, known, 2000).unwrap();

        let q = QueueWithinCrawl::new("DEFAULT", "a");
        assert_eq!(registry.get(&q).unwrap().count_active(), 1);

        let existence_key = codec::encode_existence(&q, "http://a/x");
        let sched_key = store.get(Family::Url, &existence_key).unwrap().unwrap();
        let (_, nfd, _) = codec::parse_scheduling(&sched_key).unwrap();
        assert_eq!(nfd, 5000);
    }

    #[test]
    fn queue_key_too_long_is_dropped_without_error() {
        let (store, registry, _dir) = setup();
        let mut info = UrlInfo::new("http://a/x");
        info.key = "k".repeat(300);
        let url = apply(&store, &registry, UrlItem::Discovered { info }, 1000).unwrap();
        assert_eq!(url, "http://a/x");
        assert!(registry.is_empty());
    }

    #[test]
    fn deleting_queue_rejects_new_puts() {
        let (store, registry, _dir) = setup();
        let q = QueueWithinCrawl::new("DEFAULT", "a");
        registry.mark_deleting(&q);
        apply(&store, &registry, discovered("http://a/x"), 1000).unwrap();
        assert!(registry.get(&q).is_none());
    }

    #[test]
    fn underscore_identifiers_escape_correctly() {
        let (store, registry, _dir) = setup();
        let mut info = UrlInfo::new("http://a/x");
        info.key = "q_1".to_string();
        info.crawl_id = "c_2".to_string();
        apply(&store, &registry, UrlItem::Discovered { info }, 1000).unwrap();

        let q = QueueWithinCrawl::new("c_2", "q_1");
        let existence_key = codec::encode_existence(&q, "http://a/x");
        assert!(existence_key.starts_with(b"c%5F2_q%5F1_"));
        assert_eq!(codec::parse_queue(&existence_key).unwrap(), q);
    }
}
