mod scheduler;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dictionary::Dictionary;
use shared::{
    domain::{LanguagePair, ReviewQuality},
    error::ApiError,
    protocol::{MutationOutcome, ReviewStatsResponse, ReviewSubmitResponse, TranslateResponse, VocabEntry},
    text::clean_word,
};
use storage::{ReviewUpdate, Storage};
use tracing::{debug, info};

pub const MAX_TEXT_NAME_CHARS: usize = 200;

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
    pub dictionary: Arc<Dictionary>,
    pub pair: LanguagePair,
}

pub async fn health(ctx: &ApiContext) -> Result<(), ApiError> {
    ctx.storage.health_check().await.map_err(internal)
}

pub async fn store_text(
    ctx: &ApiContext,
    name: &str,
    bytes: &[u8],
    now: DateTime<Utc>,
) -> Result<String, ApiError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::validation("text name must not be empty"));
    }
    if name.chars().count() > MAX_TEXT_NAME_CHARS {
        return Err(ApiError::validation(format!(
            "text name must be at most {MAX_TEXT_NAME_CHARS} characters"
        )));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(ApiError::validation(
            "text name must not contain path separators",
        ));
    }
    let content = std::str::from_utf8(bytes)
        .map_err(|_| ApiError::validation("text content must be valid UTF-8"))?;

    ctx.storage
        .upsert_text(name, content, now)
        .await
        .map_err(internal)?;
    info!(name = %name, chars = content.chars().count(), "text stored");
    Ok(name.to_string())
}

/// Filename for a URL import: the last `/`-separated piece of the raw URL,
/// with a fixed fallback when that piece is empty.
pub fn filename_from_url(url: &str) -> String {
    let candidate = url.rsplit('/').next().unwrap_or_default();
    if candidate.is_empty() {
        "url-text.txt".to_string()
    } else {
        candidate.to_string()
    }
}

pub async fn text_content(ctx: &ApiContext, name: &str) -> Result<String, ApiError> {
    ctx.storage
        .load_text(name)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::not_found(format!("no stored text named `{name}`")))
}

pub async fn list_texts(ctx: &ApiContext) -> Result<Vec<String>, ApiError> {
    let texts = ctx.storage.list_texts().await.map_err(internal)?;
    Ok(texts.into_iter().map(|t| t.name).collect())
}

pub fn translate(
    ctx: &ApiContext,
    pair: &LanguagePair,
    word: &str,
) -> Result<TranslateResponse, ApiError> {
    if pair != &ctx.pair {
        return Err(ApiError::not_found(format!(
            "unsupported language pair `{pair}`"
        )));
    }
    let translations = ctx.dictionary.lookup(word);
    if translations.is_empty() {
        debug!(word = %word, "no translation found");
        return Ok(TranslateResponse::missing(word, "No translation found"));
    }
    Ok(TranslateResponse::found(word, translations))
}

/// Adds a word with its current dictionary translations. Returns whether the
/// word was new; adding an existing word is a success no-op.
pub async fn add_vocab_word(
    ctx: &ApiContext,
    word: &str,
    now: DateTime<Utc>,
) -> Result<bool, ApiError> {
    let cleaned = clean_word(word);
    if cleaned.is_empty() {
        return Err(ApiError::validation("word is empty after cleaning"));
    }
    let translations = ctx.dictionary.lookup(&cleaned);
    let inserted = ctx
        .storage
        .insert_vocab_word(&cleaned, &translations, now)
        .await
        .map_err(internal)?;
    if inserted {
        info!(word = %cleaned, translations = translations.len(), "vocabulary word added");
    }
    Ok(inserted)
}

pub async fn vocab_words(ctx: &ApiContext) -> Result<Vec<String>, ApiError> {
    ctx.storage.list_vocab_words().await.map_err(internal)
}

/// Returns whether the word was present.
pub async fn remove_vocab_word(ctx: &ApiContext, word: &str) -> Result<bool, ApiError> {
    let removed = ctx.storage.delete_vocab_word(word).await.map_err(internal)?;
    if removed {
        info!(word = %word, "vocabulary word removed");
    }
    Ok(removed)
}

pub async fn all_vocab_entries(ctx: &ApiContext) -> Result<Vec<VocabEntry>, ApiError> {
    ctx.storage.all_vocab_entries().await.map_err(internal)
}

/// Renames a word and replaces its translations; the comma-separated form
/// mirrors how the edit form submits them.
pub async fn edit_vocab_word(
    ctx: &ApiContext,
    old_word: &str,
    new_word: &str,
    translation: &str,
) -> Result<bool, ApiError> {
    let new_word = new_word.trim();
    if new_word.is_empty() {
        return Err(ApiError::validation("new word must not be empty"));
    }
    let translations: Vec<String> = translation
        .split(", ")
        .map(str::to_string)
        .filter(|t| !t.is_empty())
        .collect();
    ctx.storage
        .rename_vocab_word(old_word, new_word, &translations)
        .await
        .map_err(internal)
}

pub async fn due_reviews(ctx: &ApiContext, now: DateTime<Utc>) -> Result<Vec<VocabEntry>, ApiError> {
    ctx.storage.due_vocab_entries(now).await.map_err(internal)
}

pub async fn submit_review(
    ctx: &ApiContext,
    word: &str,
    quality: ReviewQuality,
    now: DateTime<Utc>,
) -> Result<ReviewSubmitResponse, ApiError> {
    let entry = ctx
        .storage
        .vocab_entry(word)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::not_found(format!("`{word}` is not in the vocabulary")))?;

    let state = scheduler::ReviewState::of(&entry).advance(quality);
    let next_review_date = state.next_review(now);
    let updated = ctx
        .storage
        .update_review_state(
            word,
            ReviewUpdate {
                easiness_factor: state.easiness_factor,
                interval_days: state.interval_days,
                repetition_count: state.repetition_count,
                last_review_date: now,
                next_review_date,
            },
        )
        .await
        .map_err(internal)?;
    if !updated {
        return Err(ApiError::not_found(format!(
            "`{word}` is not in the vocabulary"
        )));
    }

    info!(
        word = %word,
        quality = quality.value(),
        interval_days = state.interval_days,
        "review graded"
    );
    Ok(ReviewSubmitResponse {
        status: MutationOutcome::Success,
        word: word.to_string(),
        easiness_factor: state.easiness_factor,
        interval_days: state.interval_days,
        repetition_count: state.repetition_count,
        next_review_date,
    })
}

pub async fn review_stats(
    ctx: &ApiContext,
    now: DateTime<Utc>,
) -> Result<ReviewStatsResponse, ApiError> {
    let entries = ctx.storage.all_vocab_entries().await.map_err(internal)?;
    Ok(scheduler::stats(&entries, now))
}

pub async fn practice_words(ctx: &ApiContext) -> Result<Vec<VocabEntry>, ApiError> {
    ctx.storage.practice_entries().await.map_err(internal)
}

fn internal(err: anyhow::Error) -> ApiError {
    ApiError::internal(err.to_string())
}
