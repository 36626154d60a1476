//! Error types for trial sessions, batch descriptors, and submissions.
//!
//! `SubmitError` lives here rather than in `judgearc-client` so the trial
//! runner can classify failed submissions without string matching.

use thiserror::Error;

use crate::trial::TrialPhase;

/// Errors raised by trial-runner transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrialError {
    /// The rationale was absent or blank.
    #[error("Enter a valid rationale")]
    EmptyRationale,

    /// The rationale exceeded the word limit.
    #[error("Trim your rationale down to {max} words (got {words})")]
    RationaleTooLong { words: usize, max: usize },

    /// The action is not allowed in the current phase.
    #[error("cannot {action} while {phase}")]
    InvalidTransition {
        action: &'static str,
        phase: TrialPhase,
    },

    /// `advance` was called before a rationale was recorded for the trial.
    #[error("a rationale must be submitted before advancing")]
    RationaleMissing,

    /// The judgment level is outside the rubric.
    #[error("invalid judgment level {0}")]
    InvalidLevel(u8),
}

impl TrialError {
    /// Returns `true` for errors the rater fixes by editing the rationale.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            TrialError::EmptyRationale | TrialError::RationaleTooLong { .. }
        )
    }
}

/// Problems found in a batch descriptor before a session starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    #[error("batch contains no responses")]
    Empty,

    #[error("batch has {resp_ids} response ids but {sub_nums} sub-numbers")]
    Misaligned { resp_ids: usize, sub_nums: usize },

    #[error("sub-number {0} appears more than once")]
    DuplicateSubNum(u32),

    #[error("response {0} has no text")]
    MissingResponse(u64),
}

/// Errors that can occur when delivering a submission to the record store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// No authenticated rater; the write path refuses the submission.
    #[error("authentication required, try logging in")]
    AuthenticationRequired,

    /// The store answered with a non-success response.
    #[error("submission rejected: {0}")]
    Rejected(String),

    /// The store could not persist the record.
    #[error("persistence failure: {0}")]
    PersistenceFailure(String),

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    Network(String),

    /// The endpoint returned an unexpected HTTP status.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },
}

impl SubmitError {
    /// Returns `true` if resending the same submission cannot succeed.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            SubmitError::AuthenticationRequired | SubmitError::Rejected(_)
        )
    }
}
