//! Key codec: builds and parses the two key families described in
//! spec.md §3.2 / §4.1.
//!
//! `_` is the field separator, so identifiers are escaped before being
//! embedded in a key. Because escaping removes every raw `_` from an
//! identifier, the first two raw `_` bytes in a key are always the real
//! separators — no lookahead or balancing is needed to split them back out.

use crate::model::QueueWithinCrawl;

const SEP: u8 = b'_';
const ESCAPED_SEP: &str = "%5F";

/// Escape `_` so it cannot be confused with the field separator.
pub fn esc(s: &str) -> String {
    s.replace('_', ESCAPED_SEP)
}

/// Reverse [`esc`].
pub fn unesc(s: &str) -> String {
    s.replace(ESCAPED_SEP, "_")
}

/// `esc(crawlid) "_" esc(queue) "_"`
pub fn encode_queue_prefix(q: &QueueWithinCrawl) -> Vec<u8> {
    let mut out = esc(&q.crawl_id).into_bytes();
    out.push(SEP);
    out.extend(esc(&q.queue_key).into_bytes());
    out.push(SEP);
    out
}

/// Existence key: `encode_queue_prefix(q) || url`.
pub fn encode_existence(q: &QueueWithinCrawl, url: &str) -> Vec<u8> {
    let mut out = encode_queue_prefix(q);
    out.extend(url.as_bytes());
    out
}

/// Scheduling key: `encode_queue_prefix(q) || pad10(next_fetch_date) "_" url`.
pub fn encode_scheduling(q: &QueueWithinCrawl, next_fetch_date: i64, url: &str) -> Vec<u8> {
    let mut out = encode_queue_prefix(q);
    out.extend(pad10(next_fetch_date).into_bytes());
    out.push(SEP);
    out.extend(url.as_bytes());
    out
}

/// Zero-padded 10-digit decimal so lexicographic order equals numeric order.
///
/// Negative values are clamped to 0: a `nextFetchDate` should never be
/// negative (it's epoch seconds), but a malformed caller must not be able
/// to corrupt ordering by underflowing the padding.
pub fn pad10(v: i64) -> String {
    format!("{:010}", v.max(0))
}

/// Split the first two unescaped `_` bytes off `key`, returning
/// `(crawl_id, queue_key, rest)` with the escape reversed on the first two
/// fields. `rest` still includes its leading bytes verbatim.
fn split_queue_prefix(key: &[u8]) -> Option<(String, String, &[u8])> {
    let first = key.iter().position(|&b| b == SEP)?;
    let second = key[first + 1..].iter().position(|&b| b == SEP)? + first + 1;

    let crawl_raw = std::str::from_utf8(&key[..first]).ok()?;
    let queue_raw = std::str::from_utf8(&key[first + 1..second]).ok()?;
    let rest = &key[second + 1..];

    Some((unesc(crawl_raw), unesc(queue_raw), rest))
}

/// Parse the `QueueWithinCrawl` out of either an existence or a scheduling key.
pub fn parse_queue(key: &[u8]) -> Option<QueueWithinCrawl> {
    let (crawl_id, queue_key, _) = split_queue_prefix(key)?;
    Some(QueueWithinCrawl::new(crawl_id, queue_key))
}

/// Parse a full existence key into `(queue, url)`.
pub fn parse_existence(key: &[u8]) -> Option<(QueueWithinCrawl, String)> {
    let (crawl_id, queue_key, rest) = split_queue_prefix(key)?;
    let url = std::str::from_utf8(rest).ok()?.to_string();
    Some((QueueWithinCrawl::new(crawl_id, queue_key), url))
}

/// Parse a full scheduling key into `(queue, next_fetch_date, url)`.
pub fn parse_scheduling(key: &[u8]) -> Option<(QueueWithinCrawl, i64, String)> {
    let (crawl_id, queue_key, rest) = split_queue_prefix(key)?;
    if rest.len() < 11 || rest[10] != SEP {
        return None;
    }
    let date_str = std::str::from_utf8(&rest[..10]).ok()?;
    let nfd: i64 = date_str.parse().ok()?;
    let url = std::str::from_utf8(&rest[11..]).ok()?.to_string();
    Some((QueueWithinCrawl::new(crawl_id, queue_key), nfd, url))
}
