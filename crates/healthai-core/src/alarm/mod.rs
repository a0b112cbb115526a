//! Minute-resolution medication reminder evaluation.

mod clock;
mod scheduler;

pub use clock::*;
pub use scheduler::*;
