//! The `Frontier` facade (spec.md §6.1): async entry points wrapping the
//! synchronous store/registry/pipeline calls via `tokio::task::spawn_blocking`,
//! the same bridge the teacher uses to call its rusqlite repositories from
//! async handlers (spec.md §5 expansion).

use std::sync::Arc;

use crate::admin::{self, Stats};
use crate::config::Config;
use crate::error::{FrontierError, Result};
use crate::get::{self, GetParams};
use crate::model::{QueueWithinCrawl, UrlInfo, UrlItem};
use crate::put;
use crate::queue::QueueRegistry;
use crate::recovery;
use crate::store::SqliteKvStore;

/// Owns the store and the in-memory queue registry; the one long-lived
/// object a transport layer holds onto for the life of the process.
pub struct Frontier {
    store: Arc<SqliteKvStore>,
    registry: Arc<QueueRegistry>,
}

impl Frontier {
    /// Open the store at `config.store_path`, run recovery, and return a
    /// ready-to-serve handle. Per spec.md §6.4, a recovery failure here must
    /// abort startup rather than serve from inconsistent state.
    pub async fn open(config: &Config) -> Result<Self> {
        if config.store_purge {
            let _ = std::fs::remove_file(&config.store_path);
        }

        let store = SqliteKvStore::open(&config.store_path).map_err(FrontierError::from)?;
        let registry = QueueRegistry::new();
        recovery::recover(&store, &registry).map_err(FrontierError::from)?;

        Ok(Self {
            store: Arc::new(store),
            registry: Arc::new(registry),
        })
    }

    /// `PutUrls` (spec.md §6.1): apply one item, returning the URL to ack.
    pub async fn put(&self, item: UrlItem, now: i64) -> Result<String> {
        let store = self.store.clone();
        let registry = self.registry.clone();
        let url = tokio::task::spawn_blocking(move || put::apply(&*store, &registry, item, now))
            .await
            .expect("put pipeline task panicked")?;
        Ok(url)
    }

    /// `GetUrls` (spec.md §6.1): dispatch up to the caller's caps.
    pub async fn get(&self, params: GetParams, now: i64) -> Result<Vec<UrlInfo>> {
        let store = self.store.clone();
        let registry = self.registry.clone();
        let urls =
            tokio::task::spawn_blocking(move || get::dispatch(&*store, &registry, &params, now))
                .await
                .expect("get pipeline task panicked")?;
        Ok(urls)
    }

    /// `ListQueues` (spec.md §6.1, §4.8).
    pub async fn list_queues(&self, max: u32, now: i64) -> Result<Vec<QueueWithinCrawl>> {
        let store = self.store.clone();
        let registry = self.registry.clone();
        let queues = tokio::task::spawn_blocking(move || admin::list_queues(&*store, &registry, max, now))
            .await
            .expect("list_queues task panicked")?;
        Ok(queues)
    }

    /// `Stats` (spec.md §4.8).
    pub async fn stats(&self, queue: Option<QueueWithinCrawl>, now: i64) -> Result<Stats> {
        let store = self.store.clone();
        let registry = self.registry.clone();
        let stats =
            tokio::task::spawn_blocking(move || admin::get_stats(&*store, &registry, queue.as_ref(), now))
                .await
                .expect("get_stats task panicked")?;
        Ok(stats)
    }

    /// `DeleteQueue` (spec.md §4.8). Returns the number of URLs removed.
    pub async fn delete_queue(&self, queue: QueueWithinCrawl) -> Result<u64> {
        let store = self.store.clone();
        let registry = self.registry.clone();
        let removed =
            tokio::task::spawn_blocking(move || admin::delete_queue(&*store, &registry, &queue))
                .await
                .expect("delete_queue task panicked")?;
        Ok(removed)
    }

    /// `DeleteCrawl` (spec.md §4.8). Returns the number of URLs removed.
    pub async fn delete_crawl(&self, crawl_id: String) -> Result<u64> {
        let store = self.store.clone();
        let registry = self.registry.clone();
        let removed =
            tokio::task::spawn_blocking(move || admin::delete_crawl(&*store, &registry, &crawl_id))
                .await
                .expect("delete_crawl task panicked")?;
        Ok(removed)
    }

    /// Flush and close the store cleanly (spec.md §6.4).
    pub async fn close(self) -> Result<()> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.close())
            .await
            .expect("store close task panicked")?;
        Ok(())
    }
}
