//! judgearc-client — Submission transports.
//!
//! Implements the `JudgmentSubmitter` trait over HTTP and against a local
//! record store, and loads the configuration that selects between them.

pub mod config;
pub mod error;
pub mod http;
pub mod mock;

pub use config::{create_submitter, load_config, JudgearcConfig, SubmitterConfig};
pub use error::SubmitError;
pub use http::HttpSubmitter;
