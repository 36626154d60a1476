//! judgearc-core — Trial sequencing, judgment storage, and progress aggregation.
//!
//! This crate defines the judgment data model, the record store seam and its
//! backends, the rater-facing trial state machine, and the progress report
//! computed from the content catalog and stored judgments.

pub mod batch;
pub mod catalog;
pub mod error;
pub mod keys;
pub mod model;
pub mod progress;
pub mod review;
pub mod store;
pub mod traits;
pub mod trial;
pub mod writer;
