//! Review mode: pairs each response in a batch with the codings two judges
//! already made, so a reviewer can reconcile them.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::batch::TrialBatch;
use crate::model::{JudgType, JudgmentRecord};
use crate::traits::{ContentCatalog, JudgmentQuery, JudgmentStore};

/// The two prior codings of one response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comparison {
    pub resp_id: u64,
    pub resp_title: String,
    pub judge1: Option<JudgmentRecord>,
    pub judge2: Option<JudgmentRecord>,
}

impl Comparison {
    /// Both judges coded the response at the same level.
    pub fn agrees(&self) -> bool {
        match (&self.judge1, &self.judge2) {
            (Some(a), Some(b)) => a.judgment.judg_level == b.judgment.judg_level,
            _ => false,
        }
    }
}

/// Build the comparison seeds for a review batch, in trial order.
///
/// Returns an empty list for batches without a review pair. Responses whose
/// title the catalog cannot resolve are skipped.
pub async fn seed_comparisons(
    store: &dyn JudgmentStore,
    catalog: &dyn ContentCatalog,
    batch: &TrialBatch,
) -> Result<Vec<Comparison>> {
    let Some(pair) = batch.review else {
        return Ok(Vec::new());
    };

    let mut comparisons = Vec::with_capacity(batch.len());
    for &resp_id in &batch.resp_ids {
        let Some(resp_title) = catalog.title_of(resp_id) else {
            warn!(resp_id, "response not in catalog, no comparison seeded");
            continue;
        };
        let judge1 = latest_coding(store, pair.judge1, &resp_title).await?;
        let judge2 = latest_coding(store, pair.judge2, &resp_title).await?;
        comparisons.push(Comparison {
            resp_id,
            resp_title,
            judge1,
            judge2,
        });
    }
    Ok(comparisons)
}

async fn latest_coding(
    store: &dyn JudgmentStore,
    user_id: u64,
    resp_title: &str,
) -> Result<Option<JudgmentRecord>> {
    let query = JudgmentQuery::all()
        .user(user_id)
        .title(resp_title)
        .judg_type(JudgType::Code);
    let mut records = store
        .query_all(&query)
        .await
        .with_context(|| format!("failed to load codings of judge {user_id}"))?;
    Ok(records.pop())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::batch::{ReviewPair, ScenarioContext};
    use crate::catalog::MemoryCatalog;
    use crate::model::{ElapsedTime, JudgLevel, Judgment};
    use crate::store::MemoryStore;
    use crate::traits::ContentKind;

    fn coding(user_id: u64, title: &str, level: JudgLevel, judg_type: JudgType) -> Judgment {
        Judgment {
            user_id,
            sub_num: 1,
            comp_num: 1,
            task_num: 1,
            resp_title: title.into(),
            judg_type,
            judg_level: level,
            judg_time: ElapsedTime::Seconds(4),
            ration_time: ElapsedTime::Seconds(8),
            rationale: "seen".into(),
        }
    }

    fn batch(review: Option<ReviewPair>) -> TrialBatch {
        TrialBatch {
            resp_ids: vec![1, 2, 3],
            sub_nums: vec![1, 2, 3],
            responses: HashMap::from([
                (1, "a".to_string()),
                (2, "b".to_string()),
                (3, "c".to_string()),
            ]),
            scenario: ScenarioContext::default(),
            competency: Default::default(),
            comp_num: 1,
            task_num: 1,
            review,
        }
    }

    #[tokio::test]
    async fn seeds_latest_coding_per_judge() {
        let catalog = MemoryCatalog::from_titles([
            (ContentKind::Response, "c1-t1-sub1"),
            (ContentKind::Response, "c1-t1-sub2"),
        ]);
        let store = MemoryStore::new();
        for j in [
            coding(5, "c1-t1-sub1", JudgLevel::LessSkilled, JudgType::Code),
            coding(5, "c1-t1-sub1", JudgLevel::Master, JudgType::Code),
            coding(6, "c1-t1-sub1", JudgLevel::Master, JudgType::Code),
            coding(6, "c1-t1-sub2", JudgLevel::Proficient, JudgType::Code),
            coding(6, "c1-t1-sub2", JudgLevel::Master, JudgType::Review),
        ] {
            store.insert(j).await.unwrap();
        }

        let pair = ReviewPair {
            judge1: 5,
            judge2: 6,
        };
        let seeds = seed_comparisons(&store, &catalog, &batch(Some(pair)))
            .await
            .unwrap();

        // id 3 is not in the catalog
        assert_eq!(seeds.len(), 2);
        assert_eq!(seeds[0].resp_title, "c1-t1-sub1");
        assert_eq!(
            seeds[0].judge1.as_ref().unwrap().judgment.judg_level,
            JudgLevel::Master
        );
        assert!(seeds[0].agrees());

        assert!(seeds[1].judge1.is_none());
        assert_eq!(
            seeds[1].judge2.as_ref().unwrap().judgment.judg_level,
            JudgLevel::Proficient
        );
        assert!(!seeds[1].agrees());
    }

    #[tokio::test]
    async fn code_batch_has_no_seeds() {
        let catalog = MemoryCatalog::from_titles([(ContentKind::Response, "c1-t1-sub1")]);
        let seeds = seed_comparisons(&MemoryStore::new(), &catalog, &batch(None))
            .await
            .unwrap();
        assert!(seeds.is_empty());
    }
}
