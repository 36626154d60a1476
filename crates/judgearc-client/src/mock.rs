//! Mock submitter for testing.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use judgearc_core::model::{ElapsedTime, Judgment, JudgmentRecord, Submission, SubmissionResponse};
use judgearc_core::traits::JudgmentSubmitter;

use crate::error::SubmitError;

/// A submitter that records what it is sent and answers from memory.
pub struct MockSubmitter {
    user_id: u64,
    /// When set, every call fails with this error.
    failure: Option<SubmitError>,
    call_count: AtomicU32,
    received: Mutex<Vec<Submission>>,
}

impl MockSubmitter {
    /// A mock that accepts everything as rater `user_id`.
    pub fn new(user_id: u64) -> Self {
        Self {
            user_id,
            failure: None,
            call_count: AtomicU32::new(0),
            received: Mutex::new(Vec::new()),
        }
    }

    /// A mock that rejects every submission with `error`.
    pub fn failing(error: SubmitError) -> Self {
        Self {
            failure: Some(error),
            ..Self::new(0)
        }
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Submissions received so far, in arrival order.
    pub fn submissions(&self) -> Vec<Submission> {
        self.received
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn last_submission(&self) -> Option<Submission> {
        self.submissions().pop()
    }
}

#[async_trait]
impl JudgmentSubmitter for MockSubmitter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn submit(&self, submission: &Submission) -> Result<SubmissionResponse, SubmitError> {
        let id = self.call_count.fetch_add(1, Ordering::Relaxed) + 1;
        if let Ok(mut received) = self.received.lock() {
            received.push(submission.clone());
        }

        if let Some(error) = &self.failure {
            return Err(error.clone());
        }

        let resp_title = submission.resp_title.clone().unwrap_or_else(|| {
            format!(
                "c{}-t{}-sub{}",
                submission.comp_num, submission.task_num, submission.sub_num
            )
        });
        Ok(SubmissionResponse::success(JudgmentRecord {
            id: i64::from(id),
            created_at: Utc::now(),
            judgment: Judgment {
                user_id: self.user_id,
                sub_num: submission.sub_num,
                comp_num: submission.comp_num,
                task_num: submission.task_num,
                resp_title,
                judg_type: submission.judg_type,
                judg_level: submission.judg_level,
                judg_time: ElapsedTime::normalize(submission.judg_time),
                ration_time: ElapsedTime::normalize(submission.ration_time),
                rationale: submission.rationale.clone(),
            },
        }))
    }
}
