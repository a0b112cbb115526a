//! Structured records and chat types for the generative health classifier.
//!
//! The classifier itself is opaque behind [`Classifier`]; this crate owns the
//! shapes it returns (medication and symptom scans, prescription listings)
//! and the tolerant parsing of model output into them.

pub mod consult;
pub mod scan;

pub use consult::*;
pub use scan::*;
