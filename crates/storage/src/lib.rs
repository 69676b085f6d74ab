use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::protocol::VocabEntry;

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone)]
pub struct StoredText {
    pub name: String,
    pub added_at: DateTime<Utc>,
}

/// Review-state fields written back after grading a word.
#[derive(Debug, Clone, Copy)]
pub struct ReviewUpdate {
    pub easiness_factor: f64,
    pub interval_days: f64,
    pub repetition_count: i64,
    pub last_review_date: DateTime<Utc>,
    pub next_review_date: DateTime<Utc>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn upsert_text(&self, name: &str, content: &str, now: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            "INSERT INTO texts (name, content, added_at) VALUES (?, ?, ?)
             ON CONFLICT(name) DO UPDATE SET content=excluded.content",
        )
        .bind(name)
        .bind(content)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn load_text(&self, name: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT content FROM texts WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get::<String, _>(0)))
    }

    pub async fn list_texts(&self) -> Result<Vec<StoredText>> {
        let rows = sqlx::query("SELECT name, added_at FROM texts ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| StoredText {
                name: r.get::<String, _>(0),
                added_at: r.get::<DateTime<Utc>, _>(1),
            })
            .collect())
    }

    /// Inserts a word with fresh review state unless it is already present.
    /// Returns whether a row was actually inserted.
    pub async fn insert_vocab_word(
        &self,
        word: &str,
        translations: &[String],
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let translations_json =
            serde_json::to_string(translations).context("encoding translations")?;
        let inserted = sqlx::query(
            "INSERT INTO vocab (word, translations, next_review_date, added_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(word) DO NOTHING",
        )
        .bind(word)
        .bind(translations_json)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(inserted > 0)
    }

    /// Words in insertion order, matching how the vocabulary pane lists them.
    pub async fn list_vocab_words(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT word FROM vocab ORDER BY rowid ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|r| r.get::<String, _>(0)).collect())
    }

    pub async fn delete_vocab_word(&self, word: &str) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM vocab WHERE word = ?")
            .bind(word)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(deleted > 0)
    }

    pub async fn vocab_entry(&self, word: &str) -> Result<Option<VocabEntry>> {
        let row = sqlx::query(
            "SELECT word, translations, easiness_factor, interval_days, repetition_count,
                    last_review_date, next_review_date, added_at
             FROM vocab
             WHERE word = ?",
        )
        .bind(word)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| vocab_entry_from_row(&r)).transpose()
    }

    pub async fn all_vocab_entries(&self) -> Result<Vec<VocabEntry>> {
        let rows = sqlx::query(
            "SELECT word, translations, easiness_factor, interval_days, repetition_count,
                    last_review_date, next_review_date, added_at
             FROM vocab
             ORDER BY rowid ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        collect_entries(rows)
    }

    /// Entries whose next review is due at or before `now`, soonest first.
    pub async fn due_vocab_entries(&self, now: DateTime<Utc>) -> Result<Vec<VocabEntry>> {
        let rows = sqlx::query(
            "SELECT word, translations, easiness_factor, interval_days, repetition_count,
                    last_review_date, next_review_date, added_at
             FROM vocab
             WHERE next_review_date <= ?
             ORDER BY next_review_date ASC",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        collect_entries(rows)
    }

    /// Every entry in random order, for practice sessions.
    pub async fn practice_entries(&self) -> Result<Vec<VocabEntry>> {
        let rows = sqlx::query(
            "SELECT word, translations, easiness_factor, interval_days, repetition_count,
                    last_review_date, next_review_date, added_at
             FROM vocab
             ORDER BY RANDOM()",
        )
        .fetch_all(&self.pool)
        .await?;
        collect_entries(rows)
    }

    pub async fn update_review_state(&self, word: &str, update: ReviewUpdate) -> Result<bool> {
        let updated = sqlx::query(
            "UPDATE vocab
             SET easiness_factor = ?, interval_days = ?, repetition_count = ?,
                 last_review_date = ?, next_review_date = ?
             WHERE word = ?",
        )
        .bind(update.easiness_factor)
        .bind(update.interval_days)
        .bind(update.repetition_count)
        .bind(update.last_review_date)
        .bind(update.next_review_date)
        .bind(word)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(updated > 0)
    }

    /// Renames a word and replaces its translations, keeping review state.
    /// An existing row under the new name is replaced.
    pub async fn rename_vocab_word(
        &self,
        old_word: &str,
        new_word: &str,
        translations: &[String],
    ) -> Result<bool> {
        let translations_json =
            serde_json::to_string(translations).context("encoding translations")?;
        let mut tx = self.pool.begin().await?;
        if new_word != old_word {
            sqlx::query("DELETE FROM vocab WHERE word = ?")
                .bind(new_word)
                .execute(&mut *tx)
                .await?;
        }
        let updated = sqlx::query("UPDATE vocab SET word = ?, translations = ? WHERE word = ?")
            .bind(new_word)
            .bind(translations_json)
            .bind(old_word)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;
        Ok(updated > 0)
    }
}

fn collect_entries(rows: Vec<SqliteRow>) -> Result<Vec<VocabEntry>> {
    let mut entries = Vec::with_capacity(rows.len());
    for row in &rows {
        entries.push(vocab_entry_from_row(row)?);
    }
    Ok(entries)
}

fn vocab_entry_from_row(row: &SqliteRow) -> Result<VocabEntry> {
    let translations: Vec<String> = serde_json::from_str(&row.get::<String, _>(1))
        .context("decoding stored translations")?;
    Ok(VocabEntry {
        word: row.get::<String, _>(0),
        translations,
        easiness_factor: row.get::<f64, _>(2),
        interval_days: row.get::<f64, _>(3),
        repetition_count: row.get::<i64, _>(4),
        last_review_date: row.get::<Option<DateTime<Utc>>, _>(5),
        next_review_date: row.get::<DateTime<Utc>, _>(6),
        added_at: row.get::<DateTime<Utc>, _>(7),
    })
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
