//! In-memory content catalog with JSON persistence.
//!
//! The authoritative catalog is an external content-management system; this
//! module provides the read surface the aggregator and write path need, backed
//! by a JSON export of that system.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::traits::{ContentCatalog, ContentKind, TitleFilter};

/// Publication state of a catalog item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishStatus {
    Publish,
    Draft,
    Trash,
}

fn default_status() -> PublishStatus {
    PublishStatus::Publish
}

/// One published (or unpublished) content item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: u64,
    pub kind: ContentKind,
    pub title: String,
    #[serde(default = "default_status")]
    pub status: PublishStatus,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    entries: Vec<CatalogEntry>,
}

/// Catalog held in memory, ordered by ascending id.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    entries: Vec<CatalogEntry>,
    by_id: HashMap<u64, usize>,
}

impl MemoryCatalog {
    pub fn new(mut entries: Vec<CatalogEntry>) -> Self {
        entries.sort_by_key(|e| e.id);
        let by_id = entries
            .iter()
            .enumerate()
            .map(|(idx, e)| (e.id, idx))
            .collect();
        Self { entries, by_id }
    }

    /// Build a catalog of published items from `(kind, title)` pairs, with ids
    /// assigned in order starting at 1.
    pub fn from_titles<'a>(items: impl IntoIterator<Item = (ContentKind, &'a str)>) -> Self {
        let entries = items
            .into_iter()
            .enumerate()
            .map(|(idx, (kind, title))| CatalogEntry {
                id: idx as u64 + 1,
                kind,
                title: title.to_string(),
                status: PublishStatus::Publish,
                content: String::new(),
            })
            .collect();
        Self::new(entries)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn get(&self, id: u64) -> Option<&CatalogEntry> {
        self.by_id.get(&id).map(|&idx| &self.entries[idx])
    }

    /// Load a catalog export from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog from {}", path.display()))?;
        let file: CatalogFile =
            serde_json::from_str(&content).context("failed to parse catalog JSON")?;
        Ok(Self::new(file.entries))
    }

    /// Save the catalog as JSON.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let file = CatalogFile {
            entries: self.entries.clone(),
        };
        let json = serde_json::to_string_pretty(&file).context("failed to serialize catalog")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write catalog to {}", path.display()))?;
        Ok(())
    }
}

impl ContentCatalog for MemoryCatalog {
    fn published_titles(&self, kind: ContentKind, filter: &TitleFilter) -> Vec<String> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .filter(|e| e.kind == kind && e.status == PublishStatus::Publish)
            .filter(|e| filter.matches(&e.title))
            .filter(|e| seen.insert(e.title.as_str()))
            .map(|e| e.title.clone())
            .collect()
    }

    fn title_of(&self, id: u64) -> Option<String> {
        self.get(id).map(|e| e.title.clone())
    }
}
