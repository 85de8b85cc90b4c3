//! In-memory queue state: per-queue metadata (§4.3) and the registry that
//! tracks all queues for a node (§4.4).

pub mod metadata;
pub mod registry;

pub use metadata::QueueMetadata;
pub use registry::QueueRegistry;
