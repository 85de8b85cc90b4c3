//! Data model: identifiers and the wire types carried by Put/Get (spec.md §3.1, §6.1).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// `CrawlId` normalizes to this when the caller supplies an empty string.
pub const DEFAULT_CRAWL_ID: &str = "DEFAULT";

/// Max length, in bytes, of a `QueueKey` (spec.md §3.1).
pub const MAX_QUEUE_KEY_BYTES: usize = 255;

/// Normalize a crawl identifier: empty input becomes [`DEFAULT_CRAWL_ID`].
pub fn normalize_crawl_id(crawl_id: &str) -> String {
    if crawl_id.is_empty() {
        DEFAULT_CRAWL_ID.to_string()
    } else {
        crawl_id.to_string()
    }
}

/// `(CrawlId, QueueKey)`, totally ordered lexicographically on crawl id then
/// queue key (field order matches derive order, so the derived `Ord` is
/// exactly the order spec.md §3.1 requires).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QueueWithinCrawl {
    pub crawl_id: String,
    pub queue_key: String,
}

impl QueueWithinCrawl {
    pub fn new(crawl_id: impl Into<String>, queue_key: impl Into<String>) -> Self {
        Self {
            crawl_id: crawl_id.into(),
            queue_key: queue_key.into(),
        }
    }
}

impl std::fmt::Display for QueueWithinCrawl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.crawl_id, self.queue_key)
    }
}

/// A URL's payload as carried by Put/Get and stored as the `SCHED` value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlInfo {
    pub url: String,
    /// Empty when the caller wants it derived from the URL's host.
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub crawl_id: String,
    #[serde(default)]
    pub metadata: HashMap<String, Vec<String>>,
}

impl UrlInfo {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            key: String::new(),
            crawl_id: String::new(),
            metadata: HashMap::new(),
        }
    }
}

/// `PutUrls` item (spec.md §6.1): either a freshly discovered URL or a
/// previously known one being rescheduled or marked done.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UrlItem {
    Discovered { info: UrlInfo },
    Known { info: UrlInfo, refetchable_from_date: i64 },
}

impl UrlItem {
    pub fn info(&self) -> &UrlInfo {
        match self {
            UrlItem::Discovered { info } => info,
            UrlItem::Known { info, .. } => info,
        }
    }
}

/// Derive a queue key from a URL's host, per spec.md §4.6 step 2.
///
/// Returns `None` when the URL cannot be parsed or has no host (e.g. a bare
/// path or a `data:` URL); the caller must then ack-and-drop the item.
pub fn derive_queue_key_from_host(raw_url: &str) -> Option<String> {
    let parsed = url::Url::parse(raw_url).ok()?;
    parsed.host_str().map(|h| h.to_string())
}
