//! Core trait definitions for the record store, content catalog, and
//! submission transport.
//!
//! Backends live in [`crate::store`] and [`crate::catalog`]; the HTTP
//! submitter is implemented by the `judgearc-client` crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SubmitError;
use crate::model::{JudgType, Judgment, JudgmentRecord, Submission, SubmissionResponse};

// ---------------------------------------------------------------------------
// Judgment record store
// ---------------------------------------------------------------------------

/// Append-only persistence for judgment records.
///
/// Implementations must accept concurrent inserts from independent sessions.
/// No deduplication is performed: inserting the same judgment twice yields
/// two records.
#[async_trait]
pub trait JudgmentStore: Send + Sync {
    /// Backend name for logs (e.g. "sqlite").
    fn name(&self) -> &str;

    /// Append one immutable record. Errors only on storage failure.
    async fn insert(&self, judgment: Judgment) -> anyhow::Result<()>;

    /// All records matching `query`, in ascending insertion order.
    async fn query_all(&self, query: &JudgmentQuery) -> anyhow::Result<Vec<JudgmentRecord>>;
}

/// How a record's `resp_title` must match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "lowercase")]
pub enum TitleMatch {
    Exact(String),
    Prefix(String),
    Contains(String),
}

impl TitleMatch {
    pub fn matches(&self, title: &str) -> bool {
        match self {
            TitleMatch::Exact(t) => title == t,
            TitleMatch::Prefix(p) => title.starts_with(p.as_str()),
            TitleMatch::Contains(s) => title.contains(s.as_str()),
        }
    }
}

/// A conjunction of optional record filters. The default matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgmentQuery {
    #[serde(default)]
    pub user_id: Option<u64>,
    #[serde(default)]
    pub resp_title: Option<TitleMatch>,
    #[serde(default)]
    pub judg_type: Option<JudgType>,
}

impl JudgmentQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn user(mut self, user_id: u64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.resp_title = Some(TitleMatch::Exact(title.into()));
        self
    }

    pub fn title_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.resp_title = Some(TitleMatch::Prefix(prefix.into()));
        self
    }

    pub fn title_contains(mut self, needle: impl Into<String>) -> Self {
        self.resp_title = Some(TitleMatch::Contains(needle.into()));
        self
    }

    pub fn judg_type(mut self, judg_type: JudgType) -> Self {
        self.judg_type = Some(judg_type);
        self
    }

    /// Evaluate the predicate against one judgment.
    pub fn matches(&self, judgment: &Judgment) -> bool {
        self.user_id.map_or(true, |u| judgment.user_id == u)
            && self
                .resp_title
                .as_ref()
                .map_or(true, |m| m.matches(&judgment.resp_title))
            && self.judg_type.map_or(true, |t| judgment.judg_type == t)
    }
}

// ---------------------------------------------------------------------------
// Content catalog
// ---------------------------------------------------------------------------

/// Kinds of published content the catalog holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Competency,
    Scenario,
    Response,
}

/// Title filter applied when listing published content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TitleFilter {
    Any,
    Prefix(String),
    NotPrefix(String),
    Suffix(String),
    Contains(String),
}

impl TitleFilter {
    pub fn matches(&self, title: &str) -> bool {
        match self {
            TitleFilter::Any => true,
            TitleFilter::Prefix(p) => title.starts_with(p.as_str()),
            TitleFilter::NotPrefix(p) => !title.starts_with(p.as_str()),
            TitleFilter::Suffix(s) => title.ends_with(s.as_str()),
            TitleFilter::Contains(s) => title.contains(s.as_str()),
        }
    }
}

/// Read-only view of the published content catalog.
pub trait ContentCatalog: Send + Sync {
    /// Distinct titles of published content of `kind` matching `filter`, in
    /// catalog order.
    fn published_titles(&self, kind: ContentKind, filter: &TitleFilter) -> Vec<String>;

    /// Title of the content item with the given id, if any.
    fn title_of(&self, id: u64) -> Option<String>;
}

// ---------------------------------------------------------------------------
// Submission transport
// ---------------------------------------------------------------------------

/// Delivers a completed trial to the record store's write path.
#[async_trait]
pub trait JudgmentSubmitter: Send + Sync {
    /// Transport name for logs (e.g. "http").
    fn name(&self) -> &str;

    /// Deliver one submission. A non-success response is an error.
    async fn submit(&self, submission: &Submission) -> Result<SubmissionResponse, SubmitError>;
}
