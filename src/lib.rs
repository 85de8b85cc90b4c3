//! URL Frontier core: the per-host/per-queue scheduling engine described in
//! spec.md — durable existence/scheduling keyspaces, round-robin fair
//! dispatch, and startup recovery. The streaming RPC transport, auth, and
//! cluster membership are external collaborators (spec.md §1); the `cli`
//! module is a stand-in driver for exercising the core directly.

pub mod admin;
pub mod cli;
pub mod codec;
pub mod config;
pub mod error;
pub mod frontier;
pub mod get;
pub mod model;
pub mod put;
pub mod queue;
pub mod recovery;
pub mod store;
