//! Crate-wide error types.

use thiserror::Error;

/// Errors raised by the KV store adapter (`src/store`).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors raised while recovering queue state from the store at startup.
#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("store error during recovery: {0}")]
    Store(#[from] StoreError),
    #[error(
        "recovery inconsistency in queue {crawl_id}/{queue_key}: active count {active} from URL family does not match {scheduled} scheduling entries"
    )]
    Inconsistent {
        crawl_id: String,
        queue_key: String,
        active: u64,
        scheduled: u64,
    },
}

/// Errors surfaced at the admin/CLI boundary. Per-URL faults inside Put/Get
/// are logged and isolated (spec.md §7); this enum is for operations that
/// can legitimately fail as a whole.
#[derive(Debug, Error)]
pub enum FrontierError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Recovery(#[from] RecoveryError),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FrontierError>;
