//! Local-first synchronization between the cache and a remote backend.
//!
//! Reads try the remote, reconcile with the cache and write the merged result
//! back; on any remote failure they return the cache unchanged. Writes hit the
//! cache first, then make a best-effort remote upsert.

mod auth;
mod gateway;
mod reconcile;

pub use auth::*;
pub use gateway::*;
pub use reconcile::*;
