//! Batch descriptors: the ordered set of responses assigned to one rater.
//!
//! A batch is produced by the content catalog side and handed to a
//! [`TrialRunner`](crate::trial::TrialRunner) at session start.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::BatchError;
use crate::model::JudgType;

/// Scenario shown above every response in the batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioContext {
    pub title: String,
    #[serde(default)]
    pub content: String,
}

/// Competency rubric shown alongside the scenario.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetencyContext {
    /// Competency titles; the overall title is last.
    #[serde(default)]
    pub titles: Vec<String>,
    /// Rubric level definitions, one per judgment level.
    #[serde(default)]
    pub definitions: Vec<String>,
}

impl CompetencyContext {
    /// The title displayed as the rubric heading.
    pub fn heading(&self) -> Option<&str> {
        self.titles.last().map(String::as_str)
    }
}

/// The two coders whose prior judgments are compared in a review session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPair {
    pub judge1: u64,
    pub judge2: u64,
}

/// Session-scoped batch descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialBatch {
    /// Response ids in presentation order.
    pub resp_ids: Vec<u64>,
    /// Sub-numbers aligned with `resp_ids`.
    pub sub_nums: Vec<u32>,
    /// Full response text keyed by id.
    #[serde(default)]
    pub responses: HashMap<u64, String>,
    #[serde(default)]
    pub scenario: ScenarioContext,
    #[serde(default)]
    pub competency: CompetencyContext,
    pub comp_num: u32,
    pub task_num: u32,
    /// Present for review sessions.
    #[serde(default)]
    pub review: Option<ReviewPair>,
}

impl TrialBatch {
    pub fn len(&self) -> usize {
        self.resp_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resp_ids.is_empty()
    }

    /// Judgment type recorded for trials of this batch.
    pub fn judg_type(&self) -> JudgType {
        if self.review.is_some() {
            JudgType::Review
        } else {
            JudgType::Code
        }
    }

    /// Response id for a 1-based trial index.
    pub fn resp_id(&self, trial: usize) -> Option<u64> {
        trial.checked_sub(1).and_then(|i| self.resp_ids.get(i)).copied()
    }

    /// Sub-number for a 1-based trial index.
    pub fn sub_num(&self, trial: usize) -> Option<u32> {
        trial.checked_sub(1).and_then(|i| self.sub_nums.get(i)).copied()
    }

    pub fn response_text(&self, resp_id: u64) -> Option<&str> {
        self.responses.get(&resp_id).map(String::as_str)
    }

    /// Check the structural invariants a session relies on.
    pub fn validate(&self) -> Result<(), BatchError> {
        if self.resp_ids.is_empty() {
            return Err(BatchError::Empty);
        }
        if self.resp_ids.len() != self.sub_nums.len() {
            return Err(BatchError::Misaligned {
                resp_ids: self.resp_ids.len(),
                sub_nums: self.sub_nums.len(),
            });
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.sub_nums.iter().find(|n| !seen.insert(**n)) {
            return Err(BatchError::DuplicateSubNum(*dup));
        }
        if let Some(missing) = self
            .resp_ids
            .iter()
            .find(|id| !self.responses.contains_key(*id))
        {
            return Err(BatchError::MissingResponse(*missing));
        }
        Ok(())
    }

    /// Load a batch descriptor from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read batch from {}", path.display()))?;
        let batch: TrialBatch =
            serde_json::from_str(&content).context("failed to parse batch JSON")?;
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch_json() -> &'static str {
        r#"{
            "respIds": [101, 102],
            "subNums": [1, 2],
            "responses": {"101": "First answer", "102": "Second answer"},
            "scenario": {"title": "1-TaskA", "content": "A customer calls..."},
            "competency": {
                "titles": ["1-Less", "1-Proficient", "1-Master", "1-Overall"],
                "definitions": ["vague", "clear", "insightful"]
            },
            "compNum": 1,
            "taskNum": 1
        }"#
    }

    #[test]
    fn parses_camel_case_descriptor() {
        let batch: TrialBatch = serde_json::from_str(batch_json()).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.resp_id(1), Some(101));
        assert_eq!(batch.sub_num(2), Some(2));
        assert_eq!(batch.resp_id(0), None);
        assert_eq!(batch.response_text(102), Some("Second answer"));
        assert_eq!(batch.competency.heading(), Some("1-Overall"));
        assert_eq!(batch.judg_type(), JudgType::Code);
        assert!(batch.validate().is_ok());
    }

    #[test]
    fn review_pair_switches_judg_type() {
        let mut batch: TrialBatch = serde_json::from_str(batch_json()).unwrap();
        batch.review = Some(ReviewPair {
            judge1: 3,
            judge2: 4,
        });
        assert_eq!(batch.judg_type(), JudgType::Review);
    }

    #[test]
    fn validation_failures() {
        let mut batch: TrialBatch = serde_json::from_str(batch_json()).unwrap();
        batch.sub_nums = vec![1];
        assert_eq!(
            batch.validate(),
            Err(BatchError::Misaligned {
                resp_ids: 2,
                sub_nums: 1
            })
        );

        batch.sub_nums = vec![4, 4];
        assert_eq!(batch.validate(), Err(BatchError::DuplicateSubNum(4)));

        batch.sub_nums = vec![1, 2];
        batch.responses.remove(&102);
        assert_eq!(batch.validate(), Err(BatchError::MissingResponse(102)));

        batch.resp_ids.clear();
        assert_eq!(batch.validate(), Err(BatchError::Empty));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.json");
        std::fs::write(&path, batch_json()).unwrap();
        let batch = TrialBatch::load_json(&path).unwrap();
        assert_eq!(batch.scenario.title, "1-TaskA");
    }
}
