//! End-to-end scenarios against the public `Frontier` facade, exercising the
//! put/get/admin pipelines the way a transport layer would rather than
//! reaching into their internals directly.

use urlfrontier::config::Config;
use urlfrontier::frontier::Frontier;
use urlfrontier::get::GetParams;
use urlfrontier::model::{QueueWithinCrawl, UrlInfo, UrlItem};

fn config(dir: &std::path::Path) -> Config {
    Config {
        store_path: dir.join("frontier.db"),
        ..Config::default()
    }
}

fn discovered(url: &str) -> UrlItem {
    UrlItem::Discovered {
        info: UrlInfo::new(url),
    }
}

fn get_params() -> GetParams {
    GetParams {
        max_queues: 0,
        max_urls_per_queue: 0,
        delay_requestable_secs: 30,
        target_queue: None,
    }
}

#[tokio::test]
async fn insert_then_dispatch_then_empty() {
    let dir = tempfile::tempdir().unwrap();
    let frontier = Frontier::open(&config(dir.path())).await.unwrap();

    frontier.put(discovered("http://a/x"), 1000).await.unwrap();

    let params = GetParams {
        max_queues: 1,
        max_urls_per_queue: 1,
        ..get_params()
    };
    let first = frontier.get(params.clone(), 1000).await.unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].url, "http://a/x");

    let second = frontier.get(params, 1000).await.unwrap();
    assert!(second.is_empty());

    frontier.close().await.unwrap();
}

#[tokio::test]
async fn known_with_zero_refetch_marks_completed_and_stops_dispatch() {
    let dir = tempfile::tempdir().unwrap();
    let frontier = Frontier::open(&config(dir.path())).await.unwrap();

    frontier.put(discovered("http://a/x"), 1000).await.unwrap();
    let known = UrlItem::Known {
        info: UrlInfo::new("http://a/x"),
        refetchable_from_date: 0,
    };
    frontier.put(known, 1100).await.unwrap();

    let stats = frontier
        .stats(Some(QueueWithinCrawl::new("DEFAULT", "a")), 1100)
        .await
        .unwrap();
    assert_eq!(*stats.status_counts.get("completed").unwrap_or(&0), 1);

    let urls = frontier.get(get_params(), 1100).await.unwrap();
    assert!(urls.is_empty());

    frontier.close().await.unwrap();
}

#[tokio::test]
async fn known_with_future_date_reschedules() {
    let dir = tempfile::tempdir().unwrap();
    let frontier = Frontier::open(&config(dir.path())).await.unwrap();

    frontier.put(discovered("http://a/x"), 1000).await.unwrap();
    let known = UrlItem::Known {
        info: UrlInfo::new("http://a/x"),
        refetchable_from_date: 4600,
    };
    frontier.put(known, 1000).await.unwrap();

    assert!(frontier.get(get_params(), 1000).await.unwrap().is_empty());
    let dispatched = frontier.get(get_params(), 4601).await.unwrap();
    assert_eq!(dispatched.len(), 1);

    frontier.close().await.unwrap();
}

#[tokio::test]
async fn round_robin_fairness_across_two_queues() {
    let dir = tempfile::tempdir().unwrap();
    let frontier = Frontier::open(&config(dir.path())).await.unwrap();

    frontier.put(discovered("http://h1/1"), 1000).await.unwrap();
    frontier.put(discovered("http://h2/1"), 1000).await.unwrap();
    frontier.put(discovered("http://h1/2"), 1000).await.unwrap();

    let params = GetParams {
        max_urls_per_queue: 1,
        ..get_params()
    };
    let urls = frontier.get(params, 1000).await.unwrap();
    let seen: Vec<&str> = urls.iter().map(|u| u.url.as_str()).collect();
    assert_eq!(seen.len(), 2);
    assert!(seen.contains(&"http://h1/1"));
    assert!(seen.contains(&"http://h2/1"));

    frontier.close().await.unwrap();
}

#[tokio::test]
async fn delete_queue_leaves_other_queues_intact() {
    let dir = tempfile::tempdir().unwrap();
    let frontier = Frontier::open(&config(dir.path())).await.unwrap();

    frontier.put(discovered("http://a/1"), 1000).await.unwrap();
    frontier.put(discovered("http://a/2"), 1000).await.unwrap();
    frontier.put(discovered("http://b/1"), 1000).await.unwrap();

    let removed = frontier
        .delete_queue(QueueWithinCrawl::new("DEFAULT", "a"))
        .await
        .unwrap();
    assert_eq!(removed, 2);

    // Idempotent: a second delete of the same queue removes nothing.
    let removed_again = frontier
        .delete_queue(QueueWithinCrawl::new("DEFAULT", "a"))
        .await
        .unwrap();
    assert_eq!(removed_again, 0);

    let remaining = frontier.get(get_params(), 1000).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].url, "http://b/1");

    frontier.close().await.unwrap();
}

#[tokio::test]
async fn recovery_reproduces_counts_after_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());

    {
        let frontier = Frontier::open(&cfg).await.unwrap();
        frontier.put(discovered("http://a/1"), 1000).await.unwrap();
        frontier.put(discovered("http://a/2"), 1000).await.unwrap();
        let known = UrlItem::Known {
            info: UrlInfo::new("http://a/1"),
            refetchable_from_date: 0,
        };
        frontier.put(known, 1100).await.unwrap();
        frontier.close().await.unwrap();
    }

    let frontier = Frontier::open(&cfg).await.unwrap();
    let stats = frontier
        .stats(Some(QueueWithinCrawl::new("DEFAULT", "a")), 1100)
        .await
        .unwrap();
    assert_eq!(*stats.status_counts.get("completed").unwrap_or(&0), 1);
    assert_eq!(stats.size, 1);

    frontier.close().await.unwrap();
}

#[tokio::test]
async fn list_queues_only_reports_dispatchable_heads() {
    let dir = tempfile::tempdir().unwrap();
    let frontier = Frontier::open(&config(dir.path())).await.unwrap();

    frontier.put(discovered("http://ready/1"), 1000).await.unwrap();
    let future = UrlItem::Discovered {
        info: UrlInfo::new("http://later/1"),
    };
    frontier.put(future, 1000).await.unwrap();
    let reschedule = UrlItem::Known {
        info: UrlInfo::new("http://later/1"),
        refetchable_from_date: 5000,
    };
    frontier.put(reschedule, 1000).await.unwrap();

    let queues = frontier.list_queues(0, 1000).await.unwrap();
    assert_eq!(queues, vec![QueueWithinCrawl::new("DEFAULT", "ready")]);

    frontier.close().await.unwrap();
}
