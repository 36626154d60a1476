//! The record write path: turns a [`Submission`] into a stored judgment and
//! reflects the persisted record back to the caller.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use crate::error::SubmitError;
use crate::model::{ElapsedTime, Judgment, Submission, SubmissionResponse};
use crate::traits::{ContentCatalog, JudgmentQuery, JudgmentStore, JudgmentSubmitter};

/// Server-side handler for judgment submissions.
#[derive(Clone)]
pub struct RecordWriter {
    store: Arc<dyn JudgmentStore>,
    catalog: Arc<dyn ContentCatalog>,
}

impl RecordWriter {
    pub fn new(store: Arc<dyn JudgmentStore>, catalog: Arc<dyn ContentCatalog>) -> Self {
        Self { store, catalog }
    }

    pub fn store(&self) -> &Arc<dyn JudgmentStore> {
        &self.store
    }

    /// Persist one submission for the authenticated rater `user`.
    ///
    /// Store failures come back as an error response rather than `Err`, the
    /// way the endpoint answers the client. `Err` is reserved for requests
    /// that never reach the store.
    #[instrument(skip(self, submission), fields(sub_num = submission.sub_num))]
    pub async fn save(
        &self,
        user: Option<u64>,
        submission: &Submission,
    ) -> Result<SubmissionResponse, SubmitError> {
        let user_id = user.ok_or(SubmitError::AuthenticationRequired)?;
        let resp_title = self.resolve_title(submission)?;

        let judgment = Judgment {
            user_id,
            sub_num: submission.sub_num,
            comp_num: submission.comp_num,
            task_num: submission.task_num,
            resp_title: resp_title.clone(),
            judg_type: submission.judg_type,
            judg_level: submission.judg_level,
            judg_time: ElapsedTime::normalize(submission.judg_time),
            ration_time: ElapsedTime::normalize(submission.ration_time),
            rationale: submission.rationale.clone(),
        };

        if let Err(err) = self.store.insert(judgment).await {
            warn!(store = self.store.name(), "failed to insert judgment: {err:#}");
            return Ok(SubmissionResponse::error());
        }

        let query = JudgmentQuery::all().user(user_id).title(resp_title);
        match self.store.query_all(&query).await {
            Ok(mut records) => match records.pop() {
                Some(record) => {
                    debug!(id = record.id, "judgment saved");
                    Ok(SubmissionResponse::success(record))
                }
                None => {
                    warn!("inserted judgment not found on read-back");
                    Ok(SubmissionResponse::error())
                }
            },
            Err(err) => {
                warn!(store = self.store.name(), "failed to read back judgment: {err:#}");
                Ok(SubmissionResponse::error())
            }
        }
    }

    fn resolve_title(&self, submission: &Submission) -> Result<String, SubmitError> {
        if let Some(title) = submission.resp_id.and_then(|id| self.catalog.title_of(id)) {
            return Ok(title);
        }
        submission
            .resp_title
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| match submission.resp_id {
                Some(id) => SubmitError::Rejected(format!("unknown response id {id}")),
                None => SubmitError::Rejected("no response id or title supplied".into()),
            })
    }
}

/// Submits straight into a [`RecordWriter`] as a fixed rater.
pub struct StoreSubmitter {
    writer: RecordWriter,
    user_id: Option<u64>,
}

impl StoreSubmitter {
    pub fn new(writer: RecordWriter, user_id: Option<u64>) -> Self {
        Self { writer, user_id }
    }
}

#[async_trait]
impl JudgmentSubmitter for StoreSubmitter {
    fn name(&self) -> &str {
        "store"
    }

    async fn submit(&self, submission: &Submission) -> Result<SubmissionResponse, SubmitError> {
        let response = self.writer.save(self.user_id, submission).await?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(SubmitError::PersistenceFailure(format!(
                "{} store did not accept the judgment",
                self.writer.store().name()
            )))
        }
    }
}
