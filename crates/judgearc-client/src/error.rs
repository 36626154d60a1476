//! Transport error mapping.

pub use judgearc_core::error::SubmitError;

/// Classify a reqwest failure that happened before any status was received.
pub(crate) fn from_transport(err: &reqwest::Error, timeout_secs: u64) -> SubmitError {
    if err.is_timeout() {
        SubmitError::Timeout(timeout_secs)
    } else {
        SubmitError::Network(err.to_string())
    }
}

/// Classify a non-success HTTP status.
pub(crate) fn from_status(status: u16, body: String) -> SubmitError {
    match status {
        401 | 403 => SubmitError::AuthenticationRequired,
        400 | 422 => SubmitError::Rejected(body),
        _ => SubmitError::Api {
            status,
            message: body,
        },
    }
}
