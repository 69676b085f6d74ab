use super::*;
use chrono::Duration;

fn ts(rfc3339: &str) -> DateTime<Utc> {
    rfc3339.parse().expect("timestamp")
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("nested").join("reader.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );
}

#[tokio::test]
async fn stores_and_loads_text() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage
        .upsert_text("maerchen.txt", "Es war einmal...", Utc::now())
        .await
        .expect("upsert");

    let content = storage.load_text("maerchen.txt").await.expect("load");
    assert_eq!(content.as_deref(), Some("Es war einmal..."));
    assert!(storage.load_text("missing.txt").await.expect("load").is_none());
}

#[tokio::test]
async fn upsert_replaces_content_for_same_name() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage
        .upsert_text("a.txt", "alt", Utc::now())
        .await
        .expect("first");
    storage
        .upsert_text("a.txt", "neu", Utc::now())
        .await
        .expect("second");

    let content = storage.load_text("a.txt").await.expect("load");
    assert_eq!(content.as_deref(), Some("neu"));
    assert_eq!(storage.list_texts().await.expect("list").len(), 1);
}

#[tokio::test]
async fn lists_texts_sorted_by_name() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    for name in ["zebra.txt", "anfang.txt", "mitte.txt"] {
        storage
            .upsert_text(name, "inhalt", Utc::now())
            .await
            .expect("upsert");
    }

    let names: Vec<String> = storage
        .list_texts()
        .await
        .expect("list")
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(names, vec!["anfang.txt", "mitte.txt", "zebra.txt"]);
}

#[tokio::test]
async fn vocab_insert_is_idempotent() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let now = Utc::now();
    let inserted = storage
        .insert_vocab_word("Haus", &["house".to_string()], now)
        .await
        .expect("first insert");
    assert!(inserted);

    let inserted_again = storage
        .insert_vocab_word("Haus", &["hut".to_string()], now)
        .await
        .expect("second insert");
    assert!(!inserted_again);

    let entry = storage
        .vocab_entry("Haus")
        .await
        .expect("entry")
        .expect("present");
    assert_eq!(entry.translations, vec!["house".to_string()]);
}

#[tokio::test]
async fn vocab_words_keep_insertion_order() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let now = Utc::now();
    for word in ["zuerst", "dann", "zuletzt"] {
        storage
            .insert_vocab_word(word, &[], now)
            .await
            .expect("insert");
    }

    let words = storage.list_vocab_words().await.expect("list");
    assert_eq!(words, vec!["zuerst", "dann", "zuletzt"]);
}

#[tokio::test]
async fn new_entry_starts_with_fresh_review_state() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let now = ts("2026-08-25T10:00:00Z");
    storage
        .insert_vocab_word("Welt", &["world".to_string()], now)
        .await
        .expect("insert");

    let entry = storage
        .vocab_entry("Welt")
        .await
        .expect("entry")
        .expect("present");
    assert_eq!(entry.easiness_factor, 2.5);
    assert_eq!(entry.interval_days, 0.0);
    assert_eq!(entry.repetition_count, 0);
    assert!(entry.last_review_date.is_none());
    assert_eq!(entry.next_review_date, now);
    assert_eq!(entry.added_at, now);
}

#[tokio::test]
async fn delete_reports_whether_word_existed() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage
        .insert_vocab_word("Baum", &[], Utc::now())
        .await
        .expect("insert");

    assert!(storage.delete_vocab_word("Baum").await.expect("delete"));
    assert!(!storage.delete_vocab_word("Baum").await.expect("redelete"));
    assert!(storage.list_vocab_words().await.expect("list").is_empty());
}

#[tokio::test]
async fn due_entries_filter_and_sort_by_next_review() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let now = ts("2026-08-25T10:00:00Z");
    for word in ["alpha", "beta", "gamma"] {
        storage
            .insert_vocab_word(word, &[], now)
            .await
            .expect("insert");
    }
    storage
        .update_review_state(
            "alpha",
            ReviewUpdate {
                easiness_factor: 2.5,
                interval_days: 6.0,
                repetition_count: 2,
                last_review_date: now,
                next_review_date: now + Duration::days(6),
            },
        )
        .await
        .expect("push alpha out");
    storage
        .update_review_state(
            "gamma",
            ReviewUpdate {
                easiness_factor: 2.5,
                interval_days: 1.0,
                repetition_count: 1,
                last_review_date: now - Duration::days(2),
                next_review_date: now - Duration::days(1),
            },
        )
        .await
        .expect("make gamma overdue");

    let due: Vec<String> = storage
        .due_vocab_entries(now)
        .await
        .expect("due")
        .into_iter()
        .map(|e| e.word)
        .collect();
    assert_eq!(due, vec!["gamma", "beta"]);
}

#[tokio::test]
async fn update_review_state_round_trips() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let now = ts("2026-08-25T10:00:00Z");
    storage
        .insert_vocab_word("lernen", &["to learn".to_string()], now)
        .await
        .expect("insert");

    let updated = storage
        .update_review_state(
            "lernen",
            ReviewUpdate {
                easiness_factor: 2.6,
                interval_days: 6.0,
                repetition_count: 2,
                last_review_date: now,
                next_review_date: now + Duration::days(6),
            },
        )
        .await
        .expect("update");
    assert!(updated);

    let entry = storage
        .vocab_entry("lernen")
        .await
        .expect("entry")
        .expect("present");
    assert_eq!(entry.easiness_factor, 2.6);
    assert_eq!(entry.interval_days, 6.0);
    assert_eq!(entry.repetition_count, 2);
    assert_eq!(entry.last_review_date, Some(now));
    assert_eq!(entry.next_review_date, now + Duration::days(6));

    let missing = storage
        .update_review_state(
            "unbekannt",
            ReviewUpdate {
                easiness_factor: 2.5,
                interval_days: 1.0,
                repetition_count: 1,
                last_review_date: now,
                next_review_date: now,
            },
        )
        .await
        .expect("update missing");
    assert!(!missing);
}

#[tokio::test]
async fn rename_keeps_review_state_and_replaces_target() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let now = ts("2026-08-25T10:00:00Z");
    storage
        .insert_vocab_word("Hunde", &["dogs".to_string()], now)
        .await
        .expect("insert old");
    storage
        .insert_vocab_word("Hund", &["hound".to_string()], now)
        .await
        .expect("insert target");
    storage
        .update_review_state(
            "Hunde",
            ReviewUpdate {
                easiness_factor: 2.7,
                interval_days: 6.0,
                repetition_count: 3,
                last_review_date: now,
                next_review_date: now + Duration::days(6),
            },
        )
        .await
        .expect("advance old");

    let renamed = storage
        .rename_vocab_word("Hunde", "Hund", &["dog".to_string()])
        .await
        .expect("rename");
    assert!(renamed);

    let words = storage.list_vocab_words().await.expect("list");
    assert_eq!(words, vec!["Hund"]);

    let entry = storage
        .vocab_entry("Hund")
        .await
        .expect("entry")
        .expect("present");
    assert_eq!(entry.translations, vec!["dog".to_string()]);
    assert_eq!(entry.repetition_count, 3);
    assert_eq!(entry.easiness_factor, 2.7);

    let missing = storage
        .rename_vocab_word("nicht-da", "egal", &[])
        .await
        .expect("rename missing");
    assert!(!missing);
}

#[tokio::test]
async fn practice_entries_cover_all_words() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let now = Utc::now();
    for word in ["eins", "zwei", "drei", "vier"] {
        storage
            .insert_vocab_word(word, &[], now)
            .await
            .expect("insert");
    }

    let mut sample: Vec<String> = storage
        .practice_entries()
        .await
        .expect("practice")
        .into_iter()
        .map(|e| e.word)
        .collect();
    sample.sort();
    assert_eq!(sample, vec!["drei", "eins", "vier", "zwei"]);
}
