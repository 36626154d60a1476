use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::model::{Judgment, JudgmentRecord};
use crate::traits::{JudgmentQuery, JudgmentStore};

/// Volatile store used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<JudgmentRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl JudgmentStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn insert(&self, judgment: Judgment) -> anyhow::Result<()> {
        let mut records = self.records.write().await;
        let id = records.last().map_or(1, |r| r.id + 1);
        records.push(JudgmentRecord {
            id,
            created_at: Utc::now(),
            judgment,
        });
        Ok(())
    }

    async fn query_all(&self, query: &JudgmentQuery) -> anyhow::Result<Vec<JudgmentRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|r| query.matches(&r.judgment))
            .cloned()
            .collect())
    }
}
