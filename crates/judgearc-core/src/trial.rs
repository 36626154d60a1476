//! Rater-facing trial state machine.
//!
//! A [`TrialRunner`] walks one rater through a [`TrialBatch`]: each trial
//! presents a response, records a judgment level, then a timed rationale, and
//! on advance spawns exactly one submission for the finished trial.
//!
//! ```text
//! Presenting --choose_judgment--> AwaitingRationale --advance--> Presenting (next)
//!                                        |                   \-> Done
//!                                 submit_rationale
//! ```
//!
//! Submissions are fire-and-forget: their outcome only updates the
//! [`SubmissionStatus`] watch channel and never re-enters the transition
//! table, so a failed submission does not roll the session back. Failures
//! are also queued until read with [`TrialRunner::take_failures`], since a
//! later `Pending` status replaces them on the channel.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::batch::TrialBatch;
use crate::error::{BatchError, SubmitError, TrialError};
use crate::model::{word_count, JudgLevel, Submission, SubmissionResponse, MAX_RATIONALE_WORDS};
use crate::traits::JudgmentSubmitter;

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Source of whole-second wall-clock time.
pub trait Clock: Send + Sync {
    /// Current unix time, floored to whole seconds.
    fn now_secs(&self) -> i64;
}

/// Wall clock. Subject to clock adjustments during a session.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// Manually driven clock for tests and replays.
#[derive(Debug, Clone, Default)]
pub struct ManualClock(Arc<AtomicI64>);

impl ManualClock {
    pub fn new(start: i64) -> Self {
        Self(Arc::new(AtomicI64::new(start)))
    }

    pub fn set(&self, secs: i64) {
        self.0.store(secs, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: i64) {
        self.0.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_secs(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Whole seconds between two markers, never negative.
pub fn elapsed_secs(since: i64, now: i64) -> u64 {
    u64::try_from(now.saturating_sub(since)).unwrap_or(0)
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Where the session is in the current trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialPhase {
    /// Response and rubric shown, no rationale box.
    Presenting,
    /// Judgment chosen, rationale box shown.
    AwaitingRationale,
    /// Every trial completed.
    Done,
}

impl fmt::Display for TrialPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrialPhase::Presenting => write!(f, "presenting"),
            TrialPhase::AwaitingRationale => write!(f, "awaiting rationale"),
            TrialPhase::Done => write!(f, "done"),
        }
    }
}

/// The judgment selected for the current trial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChosenJudgment {
    pub level: JudgLevel,
    pub label: String,
}

/// Mutable session state, owned by the runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialState {
    /// 1-based index of the current trial.
    pub trial: usize,
    /// Response being judged.
    pub resp_id: u64,
    pub choice: Option<ChosenJudgment>,
    /// Seconds from presentation to judgment.
    pub judg_time: u64,
    /// Seconds from judgment to rationale.
    pub ration_time: u64,
    pub rationale_visible: bool,
    pub all_done: bool,
    /// One entry per trial that has a rationale.
    pub rationales: Vec<String>,
    /// Unix seconds of the last timing marker.
    marker: i64,
}

impl TrialState {
    fn new(first_resp_id: u64, now: i64) -> Self {
        Self {
            trial: 1,
            resp_id: first_resp_id,
            choice: None,
            judg_time: 0,
            ration_time: 0,
            rationale_visible: false,
            all_done: false,
            rationales: Vec::new(),
            marker: now,
        }
    }

    pub fn phase(&self) -> TrialPhase {
        if self.all_done {
            TrialPhase::Done
        } else if self.rationale_visible {
            TrialPhase::AwaitingRationale
        } else {
            TrialPhase::Presenting
        }
    }

    /// Whether the current trial already has a rationale.
    pub fn has_rationale(&self) -> bool {
        self.rationales.len() >= self.trial
    }
}

// ---------------------------------------------------------------------------
// Submission tracking
// ---------------------------------------------------------------------------

/// Latest known state of the background submissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionStatus {
    Idle,
    Pending { trial: usize },
    Confirmed { trial: usize, record_id: Option<i64> },
    Failed { trial: usize, error: SubmitError },
}

impl SubmissionStatus {
    pub fn trial(&self) -> usize {
        match self {
            SubmissionStatus::Idle => 0,
            SubmissionStatus::Pending { trial }
            | SubmissionStatus::Confirmed { trial, .. }
            | SubmissionStatus::Failed { trial, .. } => *trial,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, SubmissionStatus::Failed { .. })
    }
}

/// Result of one background submission, collected by [`TrialRunner::flush`].
#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub trial: usize,
    pub submission: Submission,
    pub result: Result<SubmissionResponse, SubmitError>,
}

/// A failed submission not yet reported to the rater.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedSubmission {
    pub trial: usize,
    pub error: SubmitError,
}

struct PendingSubmission {
    trial: usize,
    submission: Submission,
    handle: JoinHandle<Result<SubmissionResponse, SubmitError>>,
}

// Failures replace any status; other updates never overwrite a newer trial.
fn publish_status(tx: &watch::Sender<SubmissionStatus>, next: SubmissionStatus) {
    tx.send_if_modified(|current| {
        if next.is_failure() || next.trial() >= current.trial() {
            *current = next;
            true
        } else {
            false
        }
    });
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Drives one rater through one batch.
///
/// Transitions are synchronous and take `&mut self`. [`advance`](Self::advance)
/// spawns its submission with `tokio::spawn`, so the runner must be used
/// from within a Tokio runtime.
pub struct TrialRunner {
    session_id: Uuid,
    batch: Arc<TrialBatch>,
    submitter: Arc<dyn JudgmentSubmitter>,
    clock: Arc<dyn Clock>,
    state: TrialState,
    status_tx: Arc<watch::Sender<SubmissionStatus>>,
    pending: Vec<PendingSubmission>,
    unreported: Arc<Mutex<Vec<FailedSubmission>>>,
    submissions_issued: usize,
}

impl TrialRunner {
    /// Start a session at trial 1. The batch is validated first.
    pub fn new(
        batch: TrialBatch,
        submitter: Arc<dyn JudgmentSubmitter>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, BatchError> {
        batch.validate()?;
        let first = batch.resp_ids[0];
        let state = TrialState::new(first, clock.now_secs());
        let (status_tx, _) = watch::channel(SubmissionStatus::Idle);
        let session_id = Uuid::new_v4();

        debug!(
            %session_id,
            trials = batch.len(),
            submitter = submitter.name(),
            "trial session started"
        );

        Ok(Self {
            session_id,
            batch: Arc::new(batch),
            submitter,
            clock,
            state,
            status_tx: Arc::new(status_tx),
            pending: Vec::new(),
            unreported: Arc::new(Mutex::new(Vec::new())),
            submissions_issued: 0,
        })
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn batch(&self) -> &TrialBatch {
        &self.batch
    }

    pub fn state(&self) -> &TrialState {
        &self.state
    }

    pub fn phase(&self) -> TrialPhase {
        self.state.phase()
    }

    pub fn is_done(&self) -> bool {
        self.state.all_done
    }

    /// Text of the response currently presented.
    pub fn current_response(&self) -> Option<&str> {
        self.batch.response_text(self.state.resp_id)
    }

    /// Number of submissions spawned so far.
    pub fn submissions_issued(&self) -> usize {
        self.submissions_issued
    }

    pub fn last_submission_status(&self) -> SubmissionStatus {
        self.status_tx.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SubmissionStatus> {
        self.status_tx.subscribe()
    }

    /// Drain failures that settled since the last call, in settle order.
    pub fn take_failures(&self) -> Vec<FailedSubmission> {
        self.unreported
            .lock()
            .map(|mut failures| std::mem::take(&mut *failures))
            .unwrap_or_default()
    }

    /// Record the rater's judgment for the presented response.
    pub fn choose_judgment(
        &mut self,
        level_num: u8,
        label: impl Into<String>,
    ) -> Result<(), TrialError> {
        self.expect_phase(TrialPhase::Presenting, "choose a judgment")?;
        let level = JudgLevel::try_from(level_num).map_err(|_| TrialError::InvalidLevel(level_num))?;

        let now = self.clock.now_secs();
        self.state.judg_time = elapsed_secs(self.state.marker, now);
        self.state.marker = now;
        self.state.choice = Some(ChosenJudgment {
            level,
            label: label.into(),
        });
        self.state.rationale_visible = true;

        debug!(
            session_id = %self.session_id,
            trial = self.state.trial,
            level = level.number(),
            judg_time = self.state.judg_time,
            "judgment chosen"
        );
        Ok(())
    }

    /// Validate and record the rationale for the current trial.
    ///
    /// Does not advance; a second call before [`advance`](Self::advance)
    /// replaces the earlier rationale.
    pub fn submit_rationale(&mut self, text: Option<&str>) -> Result<(), TrialError> {
        self.expect_phase(TrialPhase::AwaitingRationale, "submit a rationale")?;

        let text = text
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(TrialError::EmptyRationale)?;
        let words = word_count(text);
        if words > MAX_RATIONALE_WORDS {
            return Err(TrialError::RationaleTooLong {
                words,
                max: MAX_RATIONALE_WORDS,
            });
        }

        let now = self.clock.now_secs();
        self.state.ration_time = elapsed_secs(self.state.marker, now);
        if self.state.has_rationale() {
            self.state.rationales[self.state.trial - 1] = text.to_string();
        } else {
            self.state.rationales.push(text.to_string());
        }

        debug!(
            session_id = %self.session_id,
            trial = self.state.trial,
            words,
            ration_time = self.state.ration_time,
            "rationale recorded"
        );
        Ok(())
    }

    /// Finish the current trial: move on (or to `Done`), then spawn its
    /// submission, then reset the timing marker.
    pub fn advance(&mut self) -> Result<TrialPhase, TrialError> {
        self.expect_phase(TrialPhase::AwaitingRationale, "advance")?;
        if !self.state.has_rationale() {
            return Err(TrialError::RationaleMissing);
        }
        let submission = self.completed_submission()?;
        let finished_trial = self.state.trial;

        if self.state.trial < self.batch.len() {
            self.state.trial += 1;
            self.state.rationale_visible = false;
            if let Some(next) = self.batch.resp_id(self.state.trial) {
                self.state.resp_id = next;
            }
        } else {
            self.state.all_done = true;
            self.state.rationale_visible = false;
        }

        self.spawn_submission(finished_trial, submission);
        self.state.marker = self.clock.now_secs();

        debug!(
            session_id = %self.session_id,
            finished_trial,
            phase = %self.phase(),
            "trial advanced"
        );
        Ok(self.phase())
    }

    /// Wait for every spawned submission and return the outcomes in trial
    /// order. Later calls only return submissions spawned since.
    pub async fn flush(&mut self) -> Vec<SubmissionOutcome> {
        let pending = std::mem::take(&mut self.pending);
        let (meta, handles): (Vec<_>, Vec<_>) = pending
            .into_iter()
            .map(|p| ((p.trial, p.submission), p.handle))
            .unzip();

        join_all(handles)
            .await
            .into_iter()
            .zip(meta)
            .map(|(joined, (trial, submission))| SubmissionOutcome {
                trial,
                submission,
                result: joined.unwrap_or_else(|e| {
                    Err(SubmitError::PersistenceFailure(format!(
                        "submission task failed: {e}"
                    )))
                }),
            })
            .collect()
    }

    fn expect_phase(&self, expected: TrialPhase, action: &'static str) -> Result<(), TrialError> {
        let phase = self.phase();
        if phase == expected {
            Ok(())
        } else {
            Err(TrialError::InvalidTransition { action, phase })
        }
    }

    fn completed_submission(&self) -> Result<Submission, TrialError> {
        let state = &self.state;
        let choice = state.choice.as_ref().ok_or(TrialError::InvalidTransition {
            action: "advance",
            phase: TrialPhase::Presenting,
        })?;
        Ok(Submission {
            sub_num: self.batch.sub_num(state.trial).unwrap_or_default(),
            comp_num: self.batch.comp_num,
            task_num: self.batch.task_num,
            resp_id: Some(state.resp_id),
            resp_title: None,
            judg_type: self.batch.judg_type(),
            judg_level: choice.level,
            judg_time: state.judg_time,
            rationale: state.rationales[state.trial - 1].clone(),
            ration_time: state.ration_time,
        })
    }

    fn spawn_submission(&mut self, trial: usize, submission: Submission) {
        let submitter = Arc::clone(&self.submitter);
        let status_tx = Arc::clone(&self.status_tx);
        let unreported = Arc::clone(&self.unreported);
        let session_id = self.session_id;
        let payload = submission.clone();

        publish_status(&status_tx, SubmissionStatus::Pending { trial });
        let handle = tokio::spawn(async move {
            let result = submitter.submit(&payload).await;
            match &result {
                Ok(response) => publish_status(
                    &status_tx,
                    SubmissionStatus::Confirmed {
                        trial,
                        record_id: response.data.as_ref().map(|r| r.id),
                    },
                ),
                Err(error) => {
                    warn!(%session_id, trial, "submission failed: {error}");
                    if let Ok(mut failures) = unreported.lock() {
                        failures.push(FailedSubmission {
                            trial,
                            error: error.clone(),
                        });
                    }
                    publish_status(
                        &status_tx,
                        SubmissionStatus::Failed {
                            trial,
                            error: error.clone(),
                        },
                    );
                }
            }
            result
        });

        self.pending.push(PendingSubmission {
            trial,
            submission,
            handle,
        });
        self.submissions_issued += 1;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;

    use super::*;
    use crate::batch::{ReviewPair, ScenarioContext};
    use crate::model::{JudgType, ResponseType};

    #[derive(Default)]
    struct RecordingSubmitter {
        received: Mutex<Vec<Submission>>,
        fail: bool,
    }

    #[async_trait]
    impl JudgmentSubmitter for RecordingSubmitter {
        fn name(&self) -> &str {
            "recording"
        }

        async fn submit(&self, submission: &Submission) -> Result<SubmissionResponse, SubmitError> {
            self.received.lock().unwrap().push(submission.clone());
            if self.fail {
                Err(SubmitError::PersistenceFailure("disk full".into()))
            } else {
                Ok(SubmissionResponse {
                    kind: ResponseType::Success,
                    data: None,
                })
            }
        }
    }

    fn batch(n: usize) -> TrialBatch {
        let resp_ids: Vec<u64> = (0..n as u64).map(|i| 100 + i).collect();
        let responses: HashMap<u64, String> = resp_ids
            .iter()
            .map(|id| (*id, format!("response {id}")))
            .collect();
        TrialBatch {
            sub_nums: (1..=n as u32).map(|i| i * 10).collect(),
            resp_ids,
            responses,
            scenario: ScenarioContext {
                title: "1-TaskA".into(),
                content: String::new(),
            },
            competency: Default::default(),
            comp_num: 2,
            task_num: 3,
            review: None,
        }
    }

    fn start(n: usize, fail: bool) -> (TrialRunner, Arc<RecordingSubmitter>, ManualClock) {
        let submitter = Arc::new(RecordingSubmitter {
            received: Mutex::new(Vec::new()),
            fail,
        });
        let clock = ManualClock::new(1_000);
        let runner = TrialRunner::new(
            batch(n),
            submitter.clone(),
            Arc::new(clock.clone()),
        )
        .unwrap();
        (runner, submitter, clock)
    }

    fn complete_trial(runner: &mut TrialRunner, level: u8) -> TrialPhase {
        runner.choose_judgment(level, "Proficient").unwrap();
        runner.submit_rationale(Some("cites the scenario")).unwrap();
        runner.advance().unwrap()
    }

    fn words(n: usize) -> String {
        vec!["word"; n].join(" ")
    }

    #[tokio::test]
    async fn n_advances_reach_done_with_n_ordered_submissions() {
        let (mut runner, submitter, _clock) = start(4, false);
        assert_eq!(runner.phase(), TrialPhase::Presenting);
        assert_eq!(runner.state().trial, 1);

        for expected_trial in 2..=4 {
            assert_eq!(complete_trial(&mut runner, 2), TrialPhase::Presenting);
            assert_eq!(runner.state().trial, expected_trial);
        }
        assert_eq!(complete_trial(&mut runner, 3), TrialPhase::Done);
        assert!(runner.is_done());
        assert_eq!(runner.submissions_issued(), 4);

        let outcomes = runner.flush().await;
        assert_eq!(outcomes.len(), 4);
        let trials: Vec<_> = outcomes.iter().map(|o| o.trial).collect();
        assert_eq!(trials, vec![1, 2, 3, 4]);
        let subs: Vec<_> = outcomes.iter().map(|o| o.submission.sub_num).collect();
        assert_eq!(subs, vec![10, 20, 30, 40]);
        let ids: Vec<_> = outcomes.iter().map(|o| o.submission.resp_id).collect();
        assert_eq!(ids, vec![Some(100), Some(101), Some(102), Some(103)]);
        assert!(outcomes.iter().all(|o| o.result.is_ok()));
        assert_eq!(submitter.received.lock().unwrap().len(), 4);
        assert_eq!(
            runner.last_submission_status(),
            SubmissionStatus::Confirmed {
                trial: 4,
                record_id: None
            }
        );
    }

    #[tokio::test]
    async fn submission_carries_trial_fields() {
        let (mut runner, _submitter, clock) = start(2, false);
        clock.advance(7);
        runner.choose_judgment(3, "Master").unwrap();
        clock.advance(4);
        runner.submit_rationale(Some("  thorough and specific  ")).unwrap();
        clock.advance(2);
        runner.advance().unwrap();

        let outcome = runner.flush().await.remove(0);
        let s = outcome.submission;
        assert_eq!(s.sub_num, 10);
        assert_eq!(s.comp_num, 2);
        assert_eq!(s.task_num, 3);
        assert_eq!(s.resp_id, Some(100));
        assert_eq!(s.judg_type, JudgType::Code);
        assert_eq!(s.judg_level, JudgLevel::Master);
        assert_eq!(s.judg_time, 7);
        assert_eq!(s.ration_time, 4);
        assert_eq!(s.rationale, "thorough and specific");
    }

    #[tokio::test]
    async fn timing_marker_resets_on_advance() {
        let (mut runner, _submitter, clock) = start(2, false);
        clock.set(0);
        // marker was taken at construction (1000); reset it via the first trial
        runner.choose_judgment(1, "Less Skilled").unwrap();
        runner.submit_rationale(Some("missing detail")).unwrap();
        runner.advance().unwrap();

        clock.set(7);
        runner.choose_judgment(2, "Proficient").unwrap();
        assert_eq!(runner.state().judg_time, 7);
        clock.set(9);
        runner.submit_rationale(Some("adequate")).unwrap();
        assert_eq!(runner.state().ration_time, 2);
    }

    #[tokio::test]
    async fn clock_moving_backwards_yields_zero() {
        let (mut runner, _submitter, clock) = start(1, false);
        clock.set(500);
        runner.choose_judgment(2, "Proficient").unwrap();
        assert_eq!(runner.state().judg_time, 0);
        assert_eq!(elapsed_secs(0, 7), 7);
    }

    #[tokio::test]
    async fn empty_rationale_is_rejected_without_state_change() {
        let (mut runner, _submitter, _clock) = start(2, false);
        runner.choose_judgment(2, "Proficient").unwrap();
        let before = runner.state().clone();

        assert_eq!(runner.submit_rationale(Some("")), Err(TrialError::EmptyRationale));
        assert_eq!(runner.submit_rationale(None), Err(TrialError::EmptyRationale));
        assert_eq!(runner.submit_rationale(Some("   ")), Err(TrialError::EmptyRationale));
        assert_eq!(runner.state(), &before);
    }

    #[tokio::test]
    async fn rationale_word_limit() {
        let (mut runner, _submitter, _clock) = start(1, false);
        runner.choose_judgment(2, "Proficient").unwrap();

        assert_eq!(
            runner.submit_rationale(Some(&words(126))),
            Err(TrialError::RationaleTooLong {
                words: 126,
                max: 125
            })
        );
        assert!(runner.state().rationales.is_empty());
        runner.submit_rationale(Some(&words(125))).unwrap();
        assert_eq!(runner.state().rationales.len(), 1);
    }

    #[tokio::test]
    async fn resubmitted_rationale_replaces_current_entry() {
        let (mut runner, _submitter, _clock) = start(2, false);
        runner.choose_judgment(2, "Proficient").unwrap();
        runner.submit_rationale(Some("first draft")).unwrap();
        runner.submit_rationale(Some("second draft")).unwrap();
        assert_eq!(runner.state().rationales, vec!["second draft"]);
        runner.advance().unwrap();

        let outcome = runner.flush().await.remove(0);
        assert_eq!(outcome.submission.rationale, "second draft");
    }

    #[tokio::test]
    async fn transitions_outside_their_phase_fail() {
        let (mut runner, _submitter, _clock) = start(1, false);

        assert!(matches!(
            runner.submit_rationale(Some("early")),
            Err(TrialError::InvalidTransition { .. })
        ));
        assert!(matches!(
            runner.advance(),
            Err(TrialError::InvalidTransition { .. })
        ));

        runner.choose_judgment(2, "Proficient").unwrap();
        assert!(matches!(
            runner.choose_judgment(3, "Master"),
            Err(TrialError::InvalidTransition { .. })
        ));
        assert_eq!(runner.advance(), Err(TrialError::RationaleMissing));
        assert_eq!(runner.submissions_issued(), 0);
    }

    #[tokio::test]
    async fn done_is_terminal() {
        let (mut runner, _submitter, _clock) = start(1, false);
        assert_eq!(complete_trial(&mut runner, 1), TrialPhase::Done);

        let err = runner.choose_judgment(1, "Less Skilled").unwrap_err();
        assert_eq!(
            err,
            TrialError::InvalidTransition {
                action: "choose a judgment",
                phase: TrialPhase::Done
            }
        );
        assert!(runner.advance().is_err());
        assert_eq!(runner.submissions_issued(), 1);
    }

    #[tokio::test]
    async fn invalid_level_is_rejected() {
        let (mut runner, _submitter, _clock) = start(1, false);
        assert_eq!(
            runner.choose_judgment(4, "Expert"),
            Err(TrialError::InvalidLevel(4))
        );
        assert_eq!(runner.phase(), TrialPhase::Presenting);
    }

    #[tokio::test]
    async fn failed_submission_does_not_roll_back() {
        let (mut runner, _submitter, _clock) = start(2, true);
        complete_trial(&mut runner, 2);
        assert_eq!(runner.state().trial, 2);

        let outcomes = runner.flush().await;
        assert!(outcomes[0].result.is_err());
        assert_eq!(runner.state().trial, 2);
        assert_eq!(runner.phase(), TrialPhase::Presenting);
        assert!(runner.last_submission_status().is_failure());
    }

    #[tokio::test]
    async fn failure_stays_reportable_after_next_advance() {
        let (mut runner, _submitter, _clock) = start(3, true);
        let mut status = runner.subscribe_status();
        complete_trial(&mut runner, 2);
        status.wait_for(|s| s.is_failure()).await.unwrap();

        complete_trial(&mut runner, 2);
        assert!(!matches!(
            runner.last_submission_status(),
            SubmissionStatus::Failed { trial: 1, .. }
        ));

        let failures = runner.take_failures();
        assert_eq!(failures[0].trial, 1);
        assert_eq!(
            failures[0].error,
            SubmitError::PersistenceFailure("disk full".into())
        );

        runner.flush().await;
        let rest = runner.take_failures();
        assert!(rest.iter().all(|f| f.trial == 2));
        assert!(runner.take_failures().is_empty());
    }

    #[tokio::test]
    async fn review_batch_submits_review_type() {
        let submitter = Arc::new(RecordingSubmitter::default());
        let mut b = batch(1);
        b.review = Some(ReviewPair {
            judge1: 5,
            judge2: 6,
        });
        let mut runner =
            TrialRunner::new(b, submitter, Arc::new(ManualClock::new(0))).unwrap();
        complete_trial(&mut runner, 2);
        let outcome = runner.flush().await.remove(0);
        assert_eq!(outcome.submission.judg_type, JudgType::Review);
    }

    #[tokio::test]
    async fn invalid_batch_is_refused() {
        let mut b = batch(2);
        b.sub_nums.pop();
        let result = TrialRunner::new(
            b,
            Arc::new(RecordingSubmitter::default()),
            Arc::new(SystemClock),
        );
        assert!(matches!(result, Err(BatchError::Misaligned { .. })));
    }

    #[tokio::test]
    async fn current_response_follows_trial() {
        let (mut runner, _submitter, _clock) = start(2, false);
        assert_eq!(runner.current_response(), Some("response 100"));
        complete_trial(&mut runner, 2);
        assert_eq!(runner.current_response(), Some("response 101"));
    }
}
