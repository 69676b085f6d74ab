//! SM-2 spaced-repetition scheduling.

use chrono::{DateTime, Duration, Utc};
use shared::domain::ReviewQuality;
use shared::protocol::{ReviewStatsResponse, VocabEntry};

const MIN_EASINESS: f64 = 1.3;
const MASTERED_EASINESS: f64 = 2.5;
const MASTERED_REPETITIONS: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ReviewState {
    pub easiness_factor: f64,
    pub interval_days: f64,
    pub repetition_count: i64,
}

impl ReviewState {
    pub(crate) fn of(entry: &VocabEntry) -> Self {
        Self {
            easiness_factor: entry.easiness_factor,
            interval_days: entry.interval_days,
            repetition_count: entry.repetition_count,
        }
    }

    /// One grading step. The interval is scaled by the easiness factor as it
    /// was *before* this review, then the factor itself is adjusted.
    pub(crate) fn advance(mut self, quality: ReviewQuality) -> Self {
        let q = f64::from(quality.value());
        if quality.value() >= 3 {
            self.interval_days = match self.repetition_count {
                0 => 1.0,
                1 => 6.0,
                _ => self.interval_days * self.easiness_factor,
            };
            self.repetition_count += 1;
        } else {
            self.interval_days = 1.0;
            self.repetition_count = 0;
        }
        self.easiness_factor += 0.1 - (5.0 - q) * (0.08 + (5.0 - q) * 0.02);
        if self.easiness_factor < MIN_EASINESS {
            self.easiness_factor = MIN_EASINESS;
        }
        self
    }

    /// Intervals accumulate fractionally but scheduling lands on whole days.
    pub(crate) fn next_review(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::days(self.interval_days.trunc() as i64)
    }
}

pub(crate) fn is_mastered(entry: &VocabEntry) -> bool {
    entry.easiness_factor >= MASTERED_EASINESS && entry.repetition_count >= MASTERED_REPETITIONS
}

pub(crate) fn stats(entries: &[VocabEntry], now: DateTime<Utc>) -> ReviewStatsResponse {
    let total_words = entries.len() as i64;
    let mastered_words = entries.iter().filter(|e| is_mastered(e)).count() as i64;

    let reviewed_factors: Vec<f64> = entries
        .iter()
        .filter(|e| e.last_review_date.is_some())
        .map(|e| e.easiness_factor)
        .collect();
    let avg_recall = if reviewed_factors.is_empty() {
        0.0
    } else {
        let mean = reviewed_factors.iter().sum::<f64>() / reviewed_factors.len() as f64;
        (mean * 10.0).round() / 10.0
    };

    ReviewStatsResponse {
        total_words,
        mastered_words,
        learning_words: total_words - mastered_words,
        avg_recall,
        words_due_today: entries
            .iter()
            .filter(|e| e.next_review_date <= now)
            .count() as i64,
    }
}
