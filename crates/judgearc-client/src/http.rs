//! HTTP submission transport.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, instrument};

use judgearc_core::model::{Submission, SubmissionResponse};
use judgearc_core::traits::JudgmentSubmitter;

use crate::error::{from_status, from_transport, SubmitError};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Posts each submission as JSON to `{base_url}/judgments`.
pub struct HttpSubmitter {
    base_url: String,
    auth_token: Option<String>,
    nonce: Option<String>,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl HttpSubmitter {
    pub fn new(
        base_url: &str,
        auth_token: Option<String>,
        nonce: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token: auth_token.filter(|t| !t.is_empty()),
            nonce: nonce.filter(|n| !n.is_empty()),
            timeout_secs,
            client,
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/judgments", self.base_url)
    }
}

#[derive(Serialize)]
struct JudgmentRequest<'a> {
    #[serde(flatten)]
    submission: &'a Submission,
    #[serde(rename = "_ajax_nonce", skip_serializing_if = "Option::is_none")]
    nonce: Option<&'a str>,
}

#[async_trait]
impl JudgmentSubmitter for HttpSubmitter {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self, submission), fields(sub_num = submission.sub_num))]
    async fn submit(&self, submission: &Submission) -> Result<SubmissionResponse, SubmitError> {
        let body = JudgmentRequest {
            submission,
            nonce: self.nonce.as_deref(),
        };

        let mut req = self
            .client
            .post(self.endpoint())
            .header("content-type", "application/json");
        if let Some(token) = &self.auth_token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }

        let response = req
            .json(&body)
            .send()
            .await
            .map_err(|e| from_transport(&e, self.timeout_secs))?;

        let status = response.status().as_u16();
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(from_status(status, body));
        }

        let parsed: SubmissionResponse =
            response.json().await.map_err(|e| SubmitError::Api {
                status,
                message: format!("failed to parse response: {e}"),
            })?;

        if !parsed.is_success() {
            return Err(SubmitError::PersistenceFailure(
                "endpoint answered with a non-success response".into(),
            ));
        }
        debug!(id = parsed.data.as_ref().map(|r| r.id), "submission confirmed");
        Ok(parsed)
    }
}
