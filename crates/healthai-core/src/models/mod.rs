//! Domain models for the health-tracking client.

mod adherence;
mod health_log;
mod medication;
mod profile;

pub use adherence::*;
pub use health_log::*;
pub use medication::*;
pub use profile::*;

/// Records that carry a stable `id` and reconcile by it.
pub trait Identified {
    fn id(&self) -> &str;
}

/// Generate a fresh record id.
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
