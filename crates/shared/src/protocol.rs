use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextListResponse {
    pub texts: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextContentResponse {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub filename: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadUrlResponse {
    pub filename: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateResponse {
    pub success: bool,
    pub word: String,
    #[serde(default)]
    pub translations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TranslateResponse {
    pub fn found(word: impl Into<String>, translations: Vec<String>) -> Self {
        Self {
            success: true,
            word: word.into(),
            translations,
            error: None,
        }
    }

    pub fn missing(word: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            word: word.into(),
            translations: Vec::new(),
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabListResponse {
    pub vocab: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationOutcome {
    Success,
    Error,
}

/// Body for mutations whose callers only re-fetch afterwards; failures ride
/// along as a message instead of an HTTP error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationStatus {
    pub status: MutationOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl MutationStatus {
    pub fn success() -> Self {
        Self {
            status: MutationOutcome::Success,
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: MutationOutcome::Error,
            message: Some(message.into()),
        }
    }
}

/// A vocabulary word with its captured translations and SM-2 review state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabEntry {
    pub word: String,
    pub translations: Vec<String>,
    pub easiness_factor: f64,
    pub interval_days: f64,
    pub repetition_count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_review_date: Option<DateTime<Utc>>,
    pub next_review_date: DateTime<Utc>,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DueReviewsResponse {
    pub due_words: Vec<VocabEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewSubmitResponse {
    pub status: MutationOutcome,
    pub word: String,
    pub easiness_factor: f64,
    pub interval_days: f64,
    pub repetition_count: i64,
    pub next_review_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewStatsResponse {
    pub total_words: i64,
    pub mastered_words: i64,
    pub learning_words: i64,
    pub avg_recall: f64,
    pub words_due_today: i64,
}
