use std::{collections::HashMap, net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Utc;
use dictionary::Dictionary;
use server_api::{
    add_vocab_word, all_vocab_entries, due_reviews, edit_vocab_word, filename_from_url, health,
    list_texts, practice_words, remove_vocab_word, review_stats, store_text, submit_review,
    text_content, translate, vocab_words, ApiContext,
};
use shared::{
    domain::{LanguagePair, ReviewQuality},
    error::{ApiError, ErrorCode},
    protocol::{
        DueReviewsResponse, LoadUrlResponse, MutationStatus, ReviewStatsResponse,
        ReviewSubmitResponse, TextContentResponse, TextListResponse, TranslateResponse,
        UploadResponse, VocabEntry, VocabListResponse,
    },
};
use storage::Storage;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info};
use url::Url;

mod config;

use config::{load_settings, prepare_database_url};

#[derive(Clone)]
struct AppState {
    api: ApiContext,
    http: reqwest::Client,
}

const MAX_UPLOAD_BYTES: usize = 1024 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = load_settings();
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;
    let dictionary = Dictionary::load(&settings.dictionary_path).map_err(|error| {
        error!(
            path = %settings.dictionary_path,
            %error,
            "failed to load the translation dictionary"
        );
        error
    })?;
    let pair: LanguagePair = settings.language_pair.parse()?;
    let api = ApiContext {
        storage,
        dictionary: Arc::new(dictionary),
        pair,
    };
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.http_timeout_secs))
        .build()?;

    let state = AppState { api, http };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/texts", get(http_list_texts))
        .route("/upload", post(http_upload_text))
        .route("/load-url", post(http_load_url))
        .route("/text/:filename", get(http_text_content))
        .route("/api/translate/:pair/:word", get(http_translate))
        .route("/vocab", get(http_vocab_words))
        .route("/vocab", post(http_add_vocab))
        .route("/vocab/:word", delete(http_remove_vocab))
        .route("/api/vocab/all", get(http_all_vocab))
        .route("/api/vocab/edit", post(http_edit_vocab))
        .route("/api/vocab/practice", get(http_practice_words))
        .route("/api/review/due", get(http_due_reviews))
        .route("/api/review/submit", post(http_submit_review))
        .route("/api/review/stats", get(http_review_stats))
        .layer(RequestBodyLimitLayer::new(MAX_UPLOAD_BYTES))
        .with_state(state)
}

async fn healthz(
    State(state): State<Arc<AppState>>,
) -> Result<&'static str, (StatusCode, Json<ApiError>)> {
    health(&state.api).await.map_err(error_response)?;
    Ok("ok")
}

async fn http_list_texts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TextListResponse>, (StatusCode, Json<ApiError>)> {
    let texts = list_texts(&state.api).await.map_err(error_response)?;
    Ok(Json(TextListResponse { texts }))
}

async fn http_upload_text(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, (StatusCode, Json<ApiError>)> {
    while let Some(field) = multipart.next_field().await.map_err(malformed_form)? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().map(str::to_string).ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                Json(ApiError::validation("file field carries no filename")),
            )
        })?;
        let bytes = field.bytes().await.map_err(malformed_form)?;
        let filename = store_text(&state.api, &filename, &bytes, Utc::now())
            .await
            .map_err(error_response)?;
        return Ok(Json(UploadResponse { filename }));
    }

    Err((
        StatusCode::BAD_REQUEST,
        Json(ApiError::validation("missing form field `file`")),
    ))
}

async fn http_load_url(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<LoadUrlResponse>, (StatusCode, Json<ApiError>)> {
    let fields = read_form_fields(multipart).await?;
    let raw_url = require_field(&fields, "url")?.trim();
    let url = Url::parse(raw_url).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiError::validation(format!("invalid url: {e}"))),
        )
    })?;

    let response = state
        .http
        .get(url.clone())
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| {
            (
                StatusCode::BAD_GATEWAY,
                Json(ApiError::upstream(format!("fetch failed: {e}"))),
            )
        })?;
    let content = response.text().await.map_err(|e| {
        (
            StatusCode::BAD_GATEWAY,
            Json(ApiError::upstream(format!("unreadable response body: {e}"))),
        )
    })?;

    let filename = filename_from_url(raw_url);
    let filename = store_text(&state.api, &filename, content.as_bytes(), Utc::now())
        .await
        .map_err(error_response)?;
    info!(url = %url, filename = %filename, "url imported");
    Ok(Json(LoadUrlResponse { filename, content }))
}

async fn http_text_content(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Json<TextContentResponse>, (StatusCode, Json<ApiError>)> {
    let content = text_content(&state.api, &filename)
        .await
        .map_err(error_response)?;
    Ok(Json(TextContentResponse { content }))
}

async fn http_translate(
    State(state): State<Arc<AppState>>,
    Path((pair, word)): Path<(String, String)>,
) -> Result<Json<TranslateResponse>, (StatusCode, Json<ApiError>)> {
    let pair: LanguagePair = pair.parse().map_err(|_| {
        (
            StatusCode::NOT_FOUND,
            Json(ApiError::not_found(format!(
                "unsupported language pair `{pair}`"
            ))),
        )
    })?;
    let response = translate(&state.api, &pair, &word).map_err(error_response)?;
    Ok(Json(response))
}

async fn http_vocab_words(
    State(state): State<Arc<AppState>>,
) -> Result<Json<VocabListResponse>, (StatusCode, Json<ApiError>)> {
    let vocab = vocab_words(&state.api).await.map_err(error_response)?;
    Ok(Json(VocabListResponse { vocab }))
}

async fn http_add_vocab(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<MutationStatus>, (StatusCode, Json<ApiError>)> {
    let fields = read_form_fields(multipart).await?;
    let word = require_field(&fields, "word")?;
    add_vocab_word(&state.api, word, Utc::now())
        .await
        .map_err(error_response)?;
    Ok(Json(MutationStatus::success()))
}

async fn http_remove_vocab(
    State(state): State<Arc<AppState>>,
    Path(word): Path<String>,
) -> Result<Json<MutationStatus>, (StatusCode, Json<ApiError>)> {
    let removed = remove_vocab_word(&state.api, &word)
        .await
        .map_err(error_response)?;
    if removed {
        Ok(Json(MutationStatus::success()))
    } else {
        Ok(Json(MutationStatus::error("Word not found in vocabulary")))
    }
}

async fn http_all_vocab(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<VocabEntry>>, (StatusCode, Json<ApiError>)> {
    let entries = all_vocab_entries(&state.api)
        .await
        .map_err(error_response)?;
    Ok(Json(entries))
}

async fn http_edit_vocab(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<MutationStatus>, (StatusCode, Json<ApiError>)> {
    let fields = read_form_fields(multipart).await?;
    let old_word = require_field(&fields, "old_word")?;
    let new_word = require_field(&fields, "new_word")?;
    let translation = require_field(&fields, "translation")?;
    let edited = edit_vocab_word(&state.api, old_word, new_word, translation)
        .await
        .map_err(error_response)?;
    if edited {
        Ok(Json(MutationStatus::success()))
    } else {
        Ok(Json(MutationStatus::error("Word not found in vocabulary")))
    }
}

async fn http_practice_words(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DueReviewsResponse>, (StatusCode, Json<ApiError>)> {
    let due_words = practice_words(&state.api).await.map_err(error_response)?;
    Ok(Json(DueReviewsResponse { due_words }))
}

async fn http_due_reviews(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DueReviewsResponse>, (StatusCode, Json<ApiError>)> {
    let due_words = due_reviews(&state.api, Utc::now())
        .await
        .map_err(error_response)?;
    Ok(Json(DueReviewsResponse { due_words }))
}

async fn http_submit_review(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<ReviewSubmitResponse>, (StatusCode, Json<ApiError>)> {
    let fields = read_form_fields(multipart).await?;
    let word = require_field(&fields, "word")?;
    let quality: ReviewQuality = require_field(&fields, "quality")?.parse().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiError::validation("Quality must be between 0 and 5")),
        )
    })?;
    let response = submit_review(&state.api, word, quality, Utc::now())
        .await
        .map_err(error_response)?;
    Ok(Json(response))
}

async fn http_review_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ReviewStatsResponse>, (StatusCode, Json<ApiError>)> {
    let stats = review_stats(&state.api, Utc::now())
        .await
        .map_err(error_response)?;
    Ok(Json(stats))
}

async fn read_form_fields(
    mut multipart: Multipart,
) -> Result<HashMap<String, String>, (StatusCode, Json<ApiError>)> {
    let mut fields = HashMap::new();
    while let Some(field) = multipart.next_field().await.map_err(malformed_form)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let value = field.text().await.map_err(malformed_form)?;
        fields.insert(name, value);
    }
    Ok(fields)
}

fn require_field<'a>(
    fields: &'a HashMap<String, String>,
    name: &str,
) -> Result<&'a str, (StatusCode, Json<ApiError>)> {
    fields.get(name).map(String::as_str).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiError::validation(format!("missing form field `{name}`"))),
        )
    })
}

fn malformed_form(err: axum::extract::multipart::MultipartError) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiError::validation(format!("malformed form data: {err}"))),
    )
}

fn error_response(err: ApiError) -> (StatusCode, Json<ApiError>) {
    let status = match err.code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Upstream => StatusCode::BAD_GATEWAY,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(err))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
