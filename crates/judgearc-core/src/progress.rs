//! Coding and review progress per competency and task.
//!
//! The catalog and the judgment store share no foreign keys; rows are joined
//! through the title derivations in [`crate::keys`].

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::keys;
use crate::model::JudgType;
use crate::traits::{ContentCatalog, ContentKind, JudgmentQuery, JudgmentStore, TitleFilter};

/// Counts for one ct-pair of a competency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskProgress {
    pub ct_pair: String,
    pub task_num: Option<String>,
    /// Display name; `None` when no published scenario carries the number.
    pub task_name: Option<String>,
    /// Full scenario title the name came from.
    pub task_title: Option<String>,
    pub total_responses: usize,
    pub coded: usize,
    pub reviewed: usize,
}

impl TaskProgress {
    pub fn remaining_to_code(&self) -> usize {
        self.total_responses.saturating_sub(self.coded)
    }

    pub fn remaining_to_review(&self) -> usize {
        self.total_responses.saturating_sub(self.reviewed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetencyProgress {
    pub comp_num: String,
    pub comp_name: String,
    pub rows: Vec<TaskProgress>,
}

/// Snapshot of coding progress, derived on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub generated_at: DateTime<Utc>,
    pub competencies: Vec<CompetencyProgress>,
}

impl ProgressReport {
    /// Every task row paired with its competency, in report order.
    pub fn rows(&self) -> impl Iterator<Item = (&CompetencyProgress, &TaskProgress)> {
        self.competencies
            .iter()
            .flat_map(|c| c.rows.iter().map(move |r| (c, r)))
    }

    pub fn total_responses(&self) -> usize {
        self.rows().map(|(_, r)| r.total_responses).sum()
    }

    pub fn total_coded(&self) -> usize {
        self.rows().map(|(_, r)| r.coded).sum()
    }

    pub fn total_reviewed(&self) -> usize {
        self.rows().map(|(_, r)| r.reviewed).sum()
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        serde_json::from_str(&content).context("failed to parse report JSON")
    }

    /// Render as Markdown, one table per competency.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        md.push_str("# Coding Progress\n\n");
        md.push_str(&format!(
            "Generated {}. {} responses, {} coded, {} reviewed.\n\n",
            self.generated_at.format("%Y-%m-%d %H:%M UTC"),
            self.total_responses(),
            self.total_coded(),
            self.total_reviewed()
        ));

        for comp in &self.competencies {
            md.push_str(&format!("## Competency {}\n\n", comp.comp_name));
            if comp.rows.is_empty() {
                md.push_str("No published responses.\n\n");
                continue;
            }
            md.push_str("| Task | Scenario | Responses | Coded | Reviewed |\n");
            md.push_str("|------|----------|-----------|-------|----------|\n");
            for row in &comp.rows {
                md.push_str(&format!(
                    "| {} | {} | {} | {} | {} |\n",
                    row.task_num.as_deref().unwrap_or("?"),
                    row.task_name.as_deref().unwrap_or(""),
                    row.total_responses,
                    row.coded,
                    row.reviewed
                ));
            }
            md.push('\n');
        }
        md
    }
}

/// Scenario names keyed by task number. Later titles overwrite earlier ones.
fn task_names(catalog: &dyn ContentCatalog) -> HashMap<String, String> {
    let mut names = HashMap::new();
    let filter = TitleFilter::NotPrefix(keys::PRACTICE_PREFIX.to_string());
    for title in catalog.published_titles(ContentKind::Scenario, &filter) {
        match keys::task_number(&title) {
            Some(num) => {
                if let Some(previous) = names.insert(num.to_string(), title.clone()) {
                    debug!(task_num = num, %previous, replacement = %title, "task number reused");
                }
            }
            None => warn!(%title, "scenario title has no task number, skipping"),
        }
    }
    names
}

/// Ordered distinct ct-pairs per response competency number.
fn ct_pairs_by_competency(catalog: &dyn ContentCatalog) -> HashMap<String, Vec<String>> {
    let mut pairs: HashMap<String, Vec<String>> = HashMap::new();
    let filter = TitleFilter::Contains(keys::SUBMISSION_MARKER.to_string());
    for title in catalog.published_titles(ContentKind::Response, &filter) {
        let (Some(comp), Some(pair)) = (keys::response_comp_number(&title), keys::ct_pair(&title))
        else {
            warn!(%title, "response title has no competency/task key, skipping");
            continue;
        };
        let entry = pairs.entry(comp.to_string()).or_default();
        if !entry.iter().any(|p| p == pair) {
            entry.push(pair.to_string());
        }
    }
    pairs
}

/// Joins the catalog and the judgment store into a [`ProgressReport`].
pub struct ProgressAggregator {
    catalog: Arc<dyn ContentCatalog>,
    store: Arc<dyn JudgmentStore>,
}

impl ProgressAggregator {
    pub fn new(catalog: Arc<dyn ContentCatalog>, store: Arc<dyn JudgmentStore>) -> Self {
        Self { catalog, store }
    }

    pub async fn report(&self) -> Result<ProgressReport> {
        let catalog = self.catalog.as_ref();
        let tasks = task_names(catalog);
        let pairs = ct_pairs_by_competency(catalog);
        let overall = TitleFilter::Suffix(keys::OVERALL_SUFFIX.to_string());

        let mut competencies = Vec::new();
        for title in catalog.published_titles(ContentKind::Competency, &overall) {
            let (Some(comp_name), Some(comp_num)) =
                (keys::competency_name(&title), keys::competency_number(&title))
            else {
                warn!(%title, "competency title has no number, skipping");
                continue;
            };

            let mut rows = Vec::new();
            match pairs.get(comp_num) {
                Some(ct_pairs) => {
                    for ct_pair in ct_pairs {
                        rows.push(self.task_row(comp_num, ct_pair, &tasks).await?);
                    }
                }
                None => warn!(comp_num, "competency has no published responses"),
            }

            competencies.push(CompetencyProgress {
                comp_num: comp_num.to_string(),
                comp_name: comp_name.to_string(),
                rows,
            });
        }

        Ok(ProgressReport {
            generated_at: Utc::now(),
            competencies,
        })
    }

    async fn task_row(
        &self,
        comp_num: &str,
        ct_pair: &str,
        tasks: &HashMap<String, String>,
    ) -> Result<TaskProgress> {
        let task_num = keys::ct_pair_task_number(ct_pair);
        let task_title = task_num.and_then(|n| tasks.get(n)).cloned();
        if task_title.is_none() {
            warn!(ct_pair, "no published scenario for task, name left blank");
        }

        let response_prefix = keys::response_prefix(ct_pair);
        let total_responses = self
            .catalog
            .published_titles(ContentKind::Response, &TitleFilter::Prefix(response_prefix))
            .len();

        let (coded, reviewed) = match task_num {
            Some(task_num) => {
                let prefix = keys::judgment_prefix(comp_num, task_num);
                let coded = self
                    .distinct_titles(JudgmentQuery::all().title_prefix(prefix.clone()))
                    .await?;
                let reviewed = self
                    .distinct_titles(
                        JudgmentQuery::all()
                            .title_prefix(prefix)
                            .judg_type(JudgType::Review),
                    )
                    .await?;
                (coded, reviewed)
            }
            None => (0, 0),
        };

        Ok(TaskProgress {
            ct_pair: ct_pair.to_string(),
            task_num: task_num.map(str::to_string),
            task_name: task_title.as_deref().map(|t| keys::task_name(t).to_string()),
            task_title,
            total_responses,
            coded,
            reviewed,
        })
    }

    async fn distinct_titles(&self, query: JudgmentQuery) -> Result<usize> {
        let records = self
            .store
            .query_all(&query)
            .await
            .with_context(|| format!("failed to query {} store", self.store.name()))?;
        let titles: BTreeSet<_> = records.iter().map(|r| r.judgment.resp_title.as_str()).collect();
        Ok(titles.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::model::{ElapsedTime, JudgLevel, Judgment};
    use crate::store::MemoryStore;

    fn judgment(user_id: u64, title: &str, judg_type: JudgType) -> Judgment {
        Judgment {
            user_id,
            sub_num: 1,
            comp_num: 1,
            task_num: 1,
            resp_title: title.into(),
            judg_type,
            judg_level: JudgLevel::Proficient,
            judg_time: ElapsedTime::Seconds(9),
            ration_time: ElapsedTime::Seconds(20),
            rationale: "fine".into(),
        }
    }

    fn aggregator(titles: &[(ContentKind, &str)]) -> (ProgressAggregator, Arc<MemoryStore>) {
        let catalog = Arc::new(MemoryCatalog::from_titles(titles.iter().copied()));
        let store = Arc::new(MemoryStore::new());
        (ProgressAggregator::new(catalog, store.clone()), store)
    }

    fn basic() -> (ProgressAggregator, Arc<MemoryStore>) {
        aggregator(&[
            (ContentKind::Competency, "1-Overall"),
            (ContentKind::Scenario, "1-TaskA"),
            (ContentKind::Response, "c1-t1-sub1"),
            (ContentKind::Response, "c1-t1-sub2"),
        ])
    }

    #[tokio::test]
    async fn counts_follow_judgments() {
        let (agg, store) = basic();

        let report = agg.report().await.unwrap();
        assert_eq!(report.competencies.len(), 1);
        let comp = &report.competencies[0];
        assert_eq!(comp.comp_name, "1");
        assert_eq!(comp.comp_num, "1");
        let row = &comp.rows[0];
        assert_eq!(row.ct_pair, "c1-t1");
        assert_eq!(row.task_num.as_deref(), Some("1"));
        assert_eq!(row.task_name.as_deref(), Some("TaskA"));
        assert_eq!(row.task_title.as_deref(), Some("1-TaskA"));
        assert_eq!((row.total_responses, row.coded, row.reviewed), (2, 0, 0));

        store.insert(judgment(1, "c1-t1-sub1", JudgType::Code)).await.unwrap();
        let report = agg.report().await.unwrap();
        let row = &report.competencies[0].rows[0];
        assert_eq!((row.total_responses, row.coded, row.reviewed), (2, 1, 0));

        store.insert(judgment(2, "c1-t1-sub1", JudgType::Review)).await.unwrap();
        let report = agg.report().await.unwrap();
        let row = &report.competencies[0].rows[0];
        assert_eq!((row.coded, row.reviewed), (1, 1));
        assert_eq!(row.remaining_to_code(), 1);
    }

    #[tokio::test]
    async fn coded_counts_distinct_titles() {
        let (agg, store) = basic();
        for user in 1..=3 {
            store.insert(judgment(user, "c1-t1-sub2", JudgType::Code)).await.unwrap();
        }
        let report = agg.report().await.unwrap();
        assert_eq!(report.competencies[0].rows[0].coded, 1);
    }

    #[tokio::test]
    async fn rows_ordered_by_competency_then_ct_pair() {
        let (agg, store) = aggregator(&[
            (ContentKind::Competency, "2-Teamwork-Overall"),
            (ContentKind::Competency, "2-Teamwork-Master"),
            (ContentKind::Competency, "1-Overall"),
            (ContentKind::Scenario, "0-Practice"),
            (ContentKind::Scenario, "1-TaskA"),
            (ContentKind::Scenario, "2-TaskB"),
            (ContentKind::Response, "c1-t2-sub1"),
            (ContentKind::Response, "c2-t1-sub1"),
            (ContentKind::Response, "c1-t1-sub1"),
            (ContentKind::Response, "c1-t2-sub2"),
            (ContentKind::Response, "c1-t2-draft"),
        ]);
        store.insert(judgment(1, "c1-t2-sub9", JudgType::Code)).await.unwrap();

        let report = agg.report().await.unwrap();
        let names: Vec<_> = report.competencies.iter().map(|c| c.comp_name.as_str()).collect();
        assert_eq!(names, vec!["2-Teamwork", "1"]);

        let pairs: Vec<_> = report.rows().map(|(_, r)| r.ct_pair.as_str()).collect();
        assert_eq!(pairs, vec!["c2-t1", "c1-t2", "c1-t1"]);

        let c1t2 = &report.competencies[1].rows[0];
        assert_eq!(c1t2.task_name.as_deref(), Some("TaskB"));
        // the draft title carries no submission marker but shares the prefix
        assert_eq!(c1t2.total_responses, 3);
        assert_eq!(c1t2.coded, 1);
        assert_eq!(report.total_coded(), 1);
    }

    #[tokio::test]
    async fn inconsistencies_do_not_abort() {
        let (agg, _store) = aggregator(&[
            (ContentKind::Competency, "1-Overall"),
            (ContentKind::Competency, "3-Overall"),
            (ContentKind::Response, "c1-t7-sub1"),
            (ContentKind::Response, "csub"),
        ]);
        let report = agg.report().await.unwrap();
        assert_eq!(report.competencies.len(), 2);

        let row = &report.competencies[0].rows[0];
        assert_eq!(row.task_num.as_deref(), Some("7"));
        assert_eq!(row.task_name, None);
        assert_eq!(row.total_responses, 1);

        assert!(report.competencies[1].rows.is_empty());
    }

    #[tokio::test]
    async fn empty_task_number_still_counts_judgments() {
        let (agg, store) = aggregator(&[
            (ContentKind::Competency, "1-Overall"),
            (ContentKind::Response, "c1-t-sub1"),
            (ContentKind::Response, "c1-t-sub2"),
        ]);
        store.insert(judgment(1, "c1-t-sub1", JudgType::Review)).await.unwrap();

        let report = agg.report().await.unwrap();
        let row = &report.competencies[0].rows[0];
        assert_eq!(row.ct_pair, "c1-t");
        assert_eq!(row.task_num.as_deref(), Some(""));
        assert_eq!(row.task_name, None);
        assert_eq!((row.total_responses, row.coded, row.reviewed), (2, 1, 1));
    }

    #[tokio::test]
    async fn task_number_collision_last_wins() {
        let (agg, _store) = aggregator(&[
            (ContentKind::Competency, "1-Overall"),
            (ContentKind::Scenario, "1-TaskA"),
            (ContentKind::Scenario, "1-TaskA revised"),
            (ContentKind::Response, "c1-t1-sub1"),
        ]);
        let report = agg.report().await.unwrap();
        assert_eq!(
            report.competencies[0].rows[0].task_name.as_deref(),
            Some("TaskA revised")
        );
    }

    #[tokio::test]
    async fn json_and_markdown() {
        let (agg, store) = basic();
        store.insert(judgment(1, "c1-t1-sub1", JudgType::Code)).await.unwrap();
        let report = agg.report().await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        report.save_json(&path).unwrap();
        assert_eq!(ProgressReport::load_json(&path).unwrap(), report);

        let md = report.to_markdown();
        assert!(md.contains("## Competency 1"));
        assert!(md.contains("| 1 | TaskA | 2 | 1 | 0 |"));
    }
}
