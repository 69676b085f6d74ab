use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;
use tokio::{net::TcpListener, sync::Mutex};

use super::*;

#[derive(Default)]
struct MockState {
    texts: Mutex<HashMap<String, String>>,
    vocab: Mutex<Vec<String>>,
    uploads: Mutex<Vec<(String, String)>>,
    deleted: Mutex<Vec<String>>,
    translate_requests: Mutex<Vec<(String, String)>>,
    edits: Mutex<Vec<(String, String, String)>>,
    review_submissions: Mutex<Vec<(String, String)>>,
}

async fn spawn_mock_server() -> (String, Arc<MockState>) {
    // Keep corporate proxies out of loopback test traffic.
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let state = Arc::new(MockState::default());
    let app = Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/texts", get(mock_list_texts))
        .route("/text/:filename", get(mock_text_content))
        .route("/upload", post(mock_upload))
        .route("/load-url", post(mock_load_url))
        .route("/api/translate/:pair/:word", get(mock_translate))
        .route("/vocab", get(mock_vocab_list))
        .route("/vocab", post(mock_vocab_add))
        .route("/vocab/:word", delete(mock_vocab_delete))
        .route("/api/vocab/all", get(mock_all_entries))
        .route("/api/vocab/edit", post(mock_edit))
        .route("/api/vocab/practice", get(mock_practice))
        .route("/api/review/due", get(mock_due))
        .route("/api/review/submit", post(mock_submit))
        .route("/api/review/stats", get(mock_stats))
        .with_state(state.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    (format!("http://{addr}"), state)
}

async fn form_fields(mut multipart: Multipart) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    while let Some(field) = multipart.next_field().await.expect("form field") {
        let name = field.name().expect("field name").to_string();
        if let Some(file_name) = field.file_name() {
            fields.insert(format!("{name}.filename"), file_name.to_string());
        }
        let text = field.text().await.expect("field body");
        fields.insert(name, text);
    }
    fields
}

fn entry_json(word: &str) -> serde_json::Value {
    json!({
        "word": word,
        "translations": ["house", "home"],
        "easiness_factor": 2.5,
        "interval_days": 0.0,
        "repetition_count": 0,
        "next_review_date": "2026-08-20T10:00:00Z",
        "added_at": "2026-08-19T10:00:00Z",
    })
}

async fn mock_list_texts(State(state): State<Arc<MockState>>) -> Json<serde_json::Value> {
    let mut texts: Vec<String> = state.texts.lock().await.keys().cloned().collect();
    texts.sort();
    Json(json!({ "texts": texts }))
}

async fn mock_text_content(
    State(state): State<Arc<MockState>>,
    Path(filename): Path<String>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    match state.texts.lock().await.get(&filename) {
        Some(content) => Ok(Json(json!({ "content": content }))),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "code": "not_found", "message": format!("no text named `{filename}`") })),
        )),
    }
}

async fn mock_upload(
    State(state): State<Arc<MockState>>,
    multipart: Multipart,
) -> Json<serde_json::Value> {
    let fields = form_fields(multipart).await;
    let filename = fields.get("file.filename").cloned().expect("filename");
    let content = fields.get("file").cloned().expect("file content");
    state
        .uploads
        .lock()
        .await
        .push((filename.clone(), content.clone()));
    state.texts.lock().await.insert(filename.clone(), content);
    Json(json!({ "filename": filename }))
}

async fn mock_load_url(
    multipart: Multipart,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let fields = form_fields(multipart).await;
    let url = fields.get("url").cloned().expect("url field");
    if url.ends_with("/fehlt") {
        return Err((
            StatusCode::BAD_GATEWAY,
            Json(json!({ "code": "upstream", "message": "fetch failed: 404 Not Found" })),
        ));
    }
    Ok(Json(
        json!({ "filename": "geladen.txt", "content": "Es war einmal" }),
    ))
}

async fn mock_translate(
    State(state): State<Arc<MockState>>,
    Path((pair, word)): Path<(String, String)>,
) -> Json<serde_json::Value> {
    state
        .translate_requests
        .lock()
        .await
        .push((pair, word.clone()));
    if word == "Haus" {
        Json(json!({ "success": true, "word": word, "translations": ["house", "home"] }))
    } else {
        Json(
            json!({ "success": false, "word": word, "translations": [], "error": "No translation found" }),
        )
    }
}

async fn mock_vocab_list(State(state): State<Arc<MockState>>) -> Json<serde_json::Value> {
    let vocab = state.vocab.lock().await.clone();
    Json(json!({ "vocab": vocab }))
}

async fn mock_vocab_add(
    State(state): State<Arc<MockState>>,
    multipart: Multipart,
) -> Json<serde_json::Value> {
    let fields = form_fields(multipart).await;
    let word = fields.get("word").cloned().expect("word field");
    state.vocab.lock().await.push(word);
    Json(json!({ "status": "success" }))
}

async fn mock_vocab_delete(
    State(state): State<Arc<MockState>>,
    Path(word): Path<String>,
) -> Json<serde_json::Value> {
    state.deleted.lock().await.push(word.clone());
    state.vocab.lock().await.retain(|w| w != &word);
    Json(json!({ "status": "success" }))
}

async fn mock_all_entries() -> Json<serde_json::Value> {
    Json(json!([entry_json("Haus"), entry_json("Welt")]))
}

async fn mock_edit(
    State(state): State<Arc<MockState>>,
    multipart: Multipart,
) -> Json<serde_json::Value> {
    let fields = form_fields(multipart).await;
    state.edits.lock().await.push((
        fields.get("old_word").cloned().expect("old_word"),
        fields.get("new_word").cloned().expect("new_word"),
        fields.get("translation").cloned().expect("translation"),
    ));
    Json(json!({ "status": "success" }))
}

async fn mock_practice() -> Json<serde_json::Value> {
    Json(json!({ "due_words": [entry_json("Haus"), entry_json("Welt")] }))
}

async fn mock_due() -> Json<serde_json::Value> {
    Json(json!({ "due_words": [entry_json("Haus")] }))
}

async fn mock_submit(
    State(state): State<Arc<MockState>>,
    multipart: Multipart,
) -> Json<serde_json::Value> {
    let fields = form_fields(multipart).await;
    let word = fields.get("word").cloned().expect("word field");
    let quality = fields.get("quality").cloned().expect("quality field");
    state
        .review_submissions
        .lock()
        .await
        .push((word.clone(), quality));
    Json(json!({
        "status": "success",
        "word": word,
        "easiness_factor": 2.6,
        "interval_days": 1.0,
        "repetition_count": 1,
        "next_review_date": "2026-08-21T10:00:00Z",
    }))
}

async fn mock_stats() -> Json<serde_json::Value> {
    Json(json!({
        "total_words": 2,
        "mastered_words": 0,
        "learning_words": 2,
        "avg_recall": 2.5,
        "words_due_today": 1,
    }))
}

#[tokio::test]
async fn lists_and_fetches_texts() {
    let (url, state) = spawn_mock_server().await;
    state
        .texts
        .lock()
        .await
        .insert("maerchen.txt".to_string(), "Es war einmal".to_string());
    let client = ReaderClient::new(&url).expect("client");

    client.health().await.expect("health");
    assert_eq!(
        client.list_texts().await.expect("texts"),
        vec!["maerchen.txt".to_string()]
    );
    assert_eq!(
        client.text_content("maerchen.txt").await.expect("content"),
        "Es war einmal"
    );
    assert!(client.text_content("fehlt.txt").await.is_err());
}

#[tokio::test]
async fn upload_sends_the_file_as_multipart() {
    let (url, state) = spawn_mock_server().await;
    let client = ReaderClient::new(&url).expect("client");

    let stored = client
        .upload_text("neu.txt", "Viele Worte hier")
        .await
        .expect("upload");

    assert_eq!(stored, "neu.txt");
    assert_eq!(
        state.uploads.lock().await.clone(),
        vec![("neu.txt".to_string(), "Viele Worte hier".to_string())]
    );
    assert_eq!(
        client.text_content("neu.txt").await.expect("content"),
        "Viele Worte hier"
    );
}

#[tokio::test]
async fn translate_decodes_hits_and_misses() {
    let (url, state) = spawn_mock_server().await;
    let client = ReaderClient::new(&url).expect("client");

    let hit = client.translate("Haus").await.expect("translate");
    assert!(hit.success);
    assert_eq!(hit.translations, vec!["house", "home"]);

    let miss = client.translate("Zug").await.expect("translate");
    assert!(!miss.success);
    assert!(miss.translations.is_empty());
    assert_eq!(miss.error.as_deref(), Some("No translation found"));

    assert_eq!(
        state.translate_requests.lock().await.clone(),
        vec![
            ("de-en".to_string(), "Haus".to_string()),
            ("de-en".to_string(), "Zug".to_string()),
        ]
    );
}

#[tokio::test]
async fn vocab_mutations_use_encoded_paths() {
    let (url, state) = spawn_mock_server().await;
    let client = ReaderClient::new(&url).expect("client");

    client.add_vocab_word("Grüße").await.expect("add");
    assert_eq!(
        client.vocab_words().await.expect("vocab"),
        vec!["Grüße".to_string()]
    );

    // Umlauts and spaces survive the round trip only if the path segment is
    // percent-encoded on the way out.
    let status = client
        .remove_vocab_word("Grüne Soße")
        .await
        .expect("remove");
    assert_eq!(status.status, shared::protocol::MutationOutcome::Success);
    assert_eq!(
        state.deleted.lock().await.clone(),
        vec!["Grüne Soße".to_string()]
    );
}

#[tokio::test]
async fn load_url_surfaces_the_server_message() {
    let (url, _state) = spawn_mock_server().await;
    let client = ReaderClient::new(&url).expect("client");

    let loaded = client
        .load_url("https://example.com/geschichte.txt")
        .await
        .expect("load url");
    assert_eq!(loaded.filename, "geladen.txt");
    assert_eq!(loaded.content, "Es war einmal");

    let error = client
        .load_url("https://example.com/fehlt")
        .await
        .expect_err("rejected import");
    match error.downcast_ref::<UrlImportError>() {
        Some(UrlImportError::Rejected { message }) => {
            assert_eq!(message, "fetch failed: 404 Not Found");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn review_round_trip_decodes_wire_shapes() {
    let (url, state) = spawn_mock_server().await;
    let client = ReaderClient::new(&url).expect("client");

    let due = client.due_reviews().await.expect("due");
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].word, "Haus");
    assert_eq!(due[0].easiness_factor, 2.5);
    assert_eq!(due[0].last_review_date, None);

    let quality = shared::domain::ReviewQuality::try_from(5).expect("quality");
    let graded = client.submit_review("Haus", quality).await.expect("submit");
    assert_eq!(graded.word, "Haus");
    assert_eq!(graded.repetition_count, 1);
    assert_eq!(graded.interval_days, 1.0);
    assert_eq!(
        state.review_submissions.lock().await.clone(),
        vec![("Haus".to_string(), "5".to_string())]
    );

    let stats = client.review_stats().await.expect("stats");
    assert_eq!(stats.total_words, 2);
    assert_eq!(stats.words_due_today, 1);
    assert_eq!(stats.avg_recall, 2.5);
}

#[tokio::test]
async fn vocab_catalog_and_edit_round_trip() {
    let (url, state) = spawn_mock_server().await;
    let client = ReaderClient::new(&url).expect("client");

    let entries = client.all_vocab_entries().await.expect("entries");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].word, "Haus");
    assert_eq!(entries[0].translations, vec!["house", "home"]);

    let practice = client.practice_words().await.expect("practice");
    assert_eq!(practice.len(), 2);

    let status = client
        .edit_vocab_word("Haus", "Häuser", "houses; buildings")
        .await
        .expect("edit");
    assert_eq!(status.status, shared::protocol::MutationOutcome::Success);
    assert_eq!(
        state.edits.lock().await.clone(),
        vec![(
            "Haus".to_string(),
            "Häuser".to_string(),
            "houses; buildings".to_string()
        )]
    );
}

#[tokio::test]
async fn rejects_server_urls_that_cannot_carry_paths() {
    assert!(ReaderClient::new("data:text/plain,nope").is_err());
    assert!(ReaderClient::new("not a url").is_err());
    assert!(ReaderClient::new("http://127.0.0.1:8077").is_ok());
}
