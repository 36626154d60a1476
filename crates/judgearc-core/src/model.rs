//! Core data model types for judgearc.
//!
//! These are the types shared by the trial runner, the record store, and the
//! progress aggregator: judgment records, their submission payloads, and the
//! enums that classify them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Maximum number of whitespace-delimited words accepted in a rationale.
pub const MAX_RATIONALE_WORDS: usize = 125;

/// Elapsed-time values at or above this threshold are stored as a clock string.
pub const CLOCK_THRESHOLD_SECS: u64 = 60;

/// Whether a judgment is a first-pass coding or an adjudicated review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JudgType {
    Code,
    #[serde(alias = "rev")]
    Review,
}

impl JudgType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JudgType::Code => "code",
            JudgType::Review => "review",
        }
    }

    /// Every stored spelling that parses as this type, lowercased.
    pub fn spellings(&self) -> &'static [&'static str] {
        match self {
            JudgType::Code => &["code"],
            JudgType::Review => &["review", "rev"],
        }
    }
}

impl fmt::Display for JudgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JudgType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "code" => Ok(JudgType::Code),
            "review" | "rev" => Ok(JudgType::Review),
            other => Err(format!("unknown judgment type: {other}")),
        }
    }
}

/// The three-point rubric rating assigned to a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum JudgLevel {
    LessSkilled = 1,
    Proficient = 2,
    Master = 3,
}

impl JudgLevel {
    pub const ALL: [JudgLevel; 3] = [
        JudgLevel::LessSkilled,
        JudgLevel::Proficient,
        JudgLevel::Master,
    ];

    /// Rubric label shown to raters.
    pub fn label(&self) -> &'static str {
        match self {
            JudgLevel::LessSkilled => "Less Skilled",
            JudgLevel::Proficient => "Proficient",
            JudgLevel::Master => "Master",
        }
    }

    pub fn number(&self) -> u8 {
        *self as u8
    }
}

impl From<JudgLevel> for u8 {
    fn from(level: JudgLevel) -> Self {
        level as u8
    }
}

impl TryFrom<u8> for JudgLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(JudgLevel::LessSkilled),
            2 => Ok(JudgLevel::Proficient),
            3 => Ok(JudgLevel::Master),
            other => Err(format!("judgment level must be 1, 2 or 3, got {other}")),
        }
    }
}

impl fmt::Display for JudgLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.number(), self.label())
    }
}

/// A stored elapsed time.
///
/// Values below [`CLOCK_THRESHOLD_SECS`] stay as raw seconds. Larger values are
/// reinterpreted as a time of day with the raw value taken as minutes past
/// midnight, so 75 becomes `"01:15:00"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ElapsedTime {
    Seconds(u64),
    Clock(String),
}

impl ElapsedTime {
    pub fn normalize(secs: u64) -> Self {
        if secs < CLOCK_THRESHOLD_SECS {
            return ElapsedTime::Seconds(secs);
        }
        // hours default to 0, minutes = value; wraps like a wall clock
        let minutes = secs % (24 * 60);
        ElapsedTime::Clock(format!("{:02}:{:02}:00", minutes / 60, minutes % 60))
    }
}

impl fmt::Display for ElapsedTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElapsedTime::Seconds(s) => write!(f, "{s}"),
            ElapsedTime::Clock(c) => f.write_str(c),
        }
    }
}

impl FromStr for ElapsedTime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(secs) = s.parse::<u64>() {
            return Ok(ElapsedTime::Seconds(secs));
        }
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() == 3 && parts.iter().all(|p| p.parse::<u32>().is_ok()) {
            Ok(ElapsedTime::Clock(s.to_string()))
        } else {
            Err(format!("invalid elapsed time: {s}"))
        }
    }
}

/// One rater's coding of one response, as written to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Judgment {
    /// The rater who made the judgment.
    pub user_id: u64,
    /// Ordinal position of the response within its batch.
    pub sub_num: u32,
    pub comp_num: u32,
    pub task_num: u32,
    /// Catalog title of the judged response.
    pub resp_title: String,
    pub judg_type: JudgType,
    pub judg_level: JudgLevel,
    pub judg_time: ElapsedTime,
    pub ration_time: ElapsedTime,
    pub rationale: String,
}

/// A persisted judgment with its store-assigned identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgmentRecord {
    /// Monotonic insertion id.
    pub id: i64,
    /// When the store accepted the record.
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub judgment: Judgment,
}

/// The payload a trial runner sends for one completed trial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub sub_num: u32,
    pub comp_num: u32,
    pub task_num: u32,
    /// Catalog id of the judged response.
    #[serde(default)]
    pub resp_id: Option<u64>,
    /// Used when no `resp_id` is supplied.
    #[serde(default)]
    pub resp_title: Option<String>,
    pub judg_type: JudgType,
    pub judg_level: JudgLevel,
    /// Seconds from presentation to judgment.
    pub judg_time: u64,
    pub rationale: String,
    /// Seconds from judgment to rationale.
    pub ration_time: u64,
}

/// Outcome classification of a submission response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    Success,
    Error,
}

// The legacy endpoint answers `"type": false` on failure, so anything other
// than the string "success" is an error.
impl<'de> Deserialize<'de> for ResponseType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(match value.as_str() {
            Some("success") => ResponseType::Success,
            _ => ResponseType::Error,
        })
    }
}

/// Structured result returned by the write path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResponse {
    #[serde(rename = "type")]
    pub kind: ResponseType,
    /// The persisted record reflected back on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<JudgmentRecord>,
}

impl SubmissionResponse {
    pub fn success(record: JudgmentRecord) -> Self {
        Self {
            kind: ResponseType::Success,
            data: Some(record),
        }
    }

    pub fn error() -> Self {
        Self {
            kind: ResponseType::Error,
            data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.kind == ResponseType::Success
    }
}

/// Count whitespace-delimited words.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
