use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::{multipart, Client};
use shared::{
    domain::{LanguagePair, ReviewQuality},
    error::ApiError,
    protocol::{
        DueReviewsResponse, LoadUrlResponse, MutationStatus, ReviewStatsResponse,
        ReviewSubmitResponse, TextContentResponse, TextListResponse, TranslateResponse,
        UploadResponse, VocabEntry, VocabListResponse,
    },
};
use thiserror::Error;
use url::Url;

pub mod controller;
pub mod hover;
pub mod view;

pub use controller::{AlwaysConfirm, DeletePrompt, ReaderController, ReaderEvent};
pub use hover::{HoverTranslator, TranslationDisplay, DEFAULT_HOVER_DELAY};
pub use view::TextView;

#[derive(Debug, Error)]
pub enum UrlImportError {
    /// The server refused the import; the message is what the user should see.
    #[error("{message}")]
    Rejected { message: String },
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// Operations the interaction layer needs from the server. [`ReaderClient`]
/// is the HTTP implementation; tests substitute in-memory doubles.
#[async_trait]
pub trait ReaderBackend: Send + Sync {
    async fn fetch_text(&self, filename: &str) -> Result<String>;
    async fn import_url(&self, url: &str) -> Result<LoadUrlResponse>;
    async fn upload_text(&self, filename: &str, content: &str) -> Result<String>;
    async fn translate(&self, word: &str) -> Result<TranslateResponse>;
    async fn vocab_words(&self) -> Result<Vec<String>>;
    async fn add_vocab_word(&self, word: &str) -> Result<()>;
    async fn remove_vocab_word(&self, word: &str) -> Result<MutationStatus>;
}

/// Typed HTTP client for the reader server.
#[derive(Clone)]
pub struct ReaderClient {
    http: Client,
    base_url: Url,
    pair: LanguagePair,
}

impl ReaderClient {
    pub fn new(server_url: &str) -> Result<Self> {
        Self::with_pair(server_url, LanguagePair::default())
    }

    pub fn with_pair(server_url: &str, pair: LanguagePair) -> Result<Self> {
        let base_url = Url::parse(server_url).context("invalid server url")?;
        if base_url.cannot_be_a_base() {
            bail!("server url `{server_url}` cannot carry a path");
        }
        Ok(Self {
            http: Client::new(),
            base_url,
            pair,
        })
    }

    pub fn language_pair(&self) -> &LanguagePair {
        &self.pair
    }

    /// Joins path segments onto the base URL, percent-encoding each segment.
    fn route(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow!("server url cannot carry a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn health(&self) -> Result<()> {
        self.http
            .get(self.route(&["healthz"])?)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    pub async fn list_texts(&self) -> Result<Vec<String>> {
        let body: TextListResponse = self
            .http
            .get(self.route(&["texts"])?)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body.texts)
    }

    pub async fn text_content(&self, filename: &str) -> Result<String> {
        let body: TextContentResponse = self
            .http
            .get(self.route(&["text", filename])?)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body.content)
    }

    /// Uploads a text file; returns the filename the server stored it under.
    pub async fn upload_text(&self, filename: &str, content: &str) -> Result<String> {
        let part = multipart::Part::text(content.to_string()).file_name(filename.to_string());
        let form = multipart::Form::new().part("file", part);
        let body: UploadResponse = self
            .http
            .post(self.route(&["upload"])?)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body.filename)
    }

    /// Asks the server to fetch a remote URL and store it as a text. On
    /// rejection the error message is the one the server reported, suitable
    /// for showing to the user verbatim.
    pub async fn load_url(&self, url: &str) -> Result<LoadUrlResponse> {
        let form = multipart::Form::new().text("url", url.to_string());
        let response = self
            .http
            .post(self.route(&["load-url"])?)
            .multipart(form)
            .send()
            .await
            .map_err(UrlImportError::Transport)?;
        if !response.status().is_success() {
            let message = decode_error_message(response).await;
            return Err(UrlImportError::Rejected { message }.into());
        }
        let body = response.json().await.map_err(UrlImportError::Transport)?;
        Ok(body)
    }

    pub async fn translate(&self, word: &str) -> Result<TranslateResponse> {
        let pair = self.pair.to_string();
        let body: TranslateResponse = self
            .http
            .get(self.route(&["api", "translate", &pair, word])?)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body)
    }

    pub async fn vocab_words(&self) -> Result<Vec<String>> {
        let body: VocabListResponse = self
            .http
            .get(self.route(&["vocab"])?)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body.vocab)
    }

    pub async fn add_vocab_word(&self, word: &str) -> Result<()> {
        let form = multipart::Form::new().text("word", word.to_string());
        self.http
            .post(self.route(&["vocab"])?)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Removes a word. A missing word is reported in the returned status, not
    /// as an HTTP error.
    pub async fn remove_vocab_word(&self, word: &str) -> Result<MutationStatus> {
        let body: MutationStatus = self
            .http
            .delete(self.route(&["vocab", word])?)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body)
    }

    pub async fn all_vocab_entries(&self) -> Result<Vec<VocabEntry>> {
        let body: Vec<VocabEntry> = self
            .http
            .get(self.route(&["api", "vocab", "all"])?)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body)
    }

    pub async fn edit_vocab_word(
        &self,
        old_word: &str,
        new_word: &str,
        translation: &str,
    ) -> Result<MutationStatus> {
        let form = multipart::Form::new()
            .text("old_word", old_word.to_string())
            .text("new_word", new_word.to_string())
            .text("translation", translation.to_string());
        let body: MutationStatus = self
            .http
            .post(self.route(&["api", "vocab", "edit"])?)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body)
    }

    pub async fn practice_words(&self) -> Result<Vec<VocabEntry>> {
        let body: DueReviewsResponse = self
            .http
            .get(self.route(&["api", "vocab", "practice"])?)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body.due_words)
    }

    pub async fn due_reviews(&self) -> Result<Vec<VocabEntry>> {
        let body: DueReviewsResponse = self
            .http
            .get(self.route(&["api", "review", "due"])?)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body.due_words)
    }

    pub async fn submit_review(
        &self,
        word: &str,
        quality: ReviewQuality,
    ) -> Result<ReviewSubmitResponse> {
        let form = multipart::Form::new()
            .text("word", word.to_string())
            .text("quality", quality.value().to_string());
        let body: ReviewSubmitResponse = self
            .http
            .post(self.route(&["api", "review", "submit"])?)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body)
    }

    pub async fn review_stats(&self) -> Result<ReviewStatsResponse> {
        let body: ReviewStatsResponse = self
            .http
            .get(self.route(&["api", "review", "stats"])?)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body)
    }
}

#[async_trait]
impl ReaderBackend for ReaderClient {
    async fn fetch_text(&self, filename: &str) -> Result<String> {
        self.text_content(filename).await
    }

    async fn import_url(&self, url: &str) -> Result<LoadUrlResponse> {
        self.load_url(url).await
    }

    async fn upload_text(&self, filename: &str, content: &str) -> Result<String> {
        ReaderClient::upload_text(self, filename, content).await
    }

    async fn translate(&self, word: &str) -> Result<TranslateResponse> {
        ReaderClient::translate(self, word).await
    }

    async fn vocab_words(&self) -> Result<Vec<String>> {
        ReaderClient::vocab_words(self).await
    }

    async fn add_vocab_word(&self, word: &str) -> Result<()> {
        ReaderClient::add_vocab_word(self, word).await
    }

    async fn remove_vocab_word(&self, word: &str) -> Result<MutationStatus> {
        ReaderClient::remove_vocab_word(self, word).await
    }
}

async fn decode_error_message(response: reqwest::Response) -> String {
    match response.json::<ApiError>().await {
        Ok(err) => err.message,
        Err(_) => "Unknown error".to_string(),
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
