use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

use crate::{
    hover::{HoverTranslator, TranslationDisplay, DEFAULT_HOVER_DELAY},
    view::TextView,
    ReaderBackend,
};
use shared::text::clean_word;

/// Everything an attached UI needs to render: text swaps, vocabulary
/// changes, translation panel updates and user-facing errors.
#[derive(Debug, Clone)]
pub enum ReaderEvent {
    TextLoaded {
        filename: String,
        word_count: usize,
    },
    VocabUpdated {
        vocab: Vec<String>,
    },
    Translation(TranslationDisplay),
    Error(String),
}

/// Confirmation gate for destructive vocabulary actions. Answering `false`
/// leaves the word untouched and skips the refresh.
#[async_trait]
pub trait DeletePrompt: Send + Sync {
    async fn confirm(&self, word: &str) -> bool;
}

/// Prompt that approves every deletion, for tests and non-interactive use.
pub struct AlwaysConfirm;

#[async_trait]
impl DeletePrompt for AlwaysConfirm {
    async fn confirm(&self, _word: &str) -> bool {
        true
    }
}

struct ControllerState {
    view: TextView,
    vocab: Vec<String>,
}

/// Maps user gestures in the reading view onto server operations. Each kind
/// of target gets its own entry point: text links ([`open_text`]), the URL
/// form ([`import_url`]), word tokens ([`click_word`], [`pointer_enter`]) and
/// the vocabulary list's delete affordances ([`remove_word`]).
///
/// [`open_text`]: ReaderController::open_text
/// [`import_url`]: ReaderController::import_url
/// [`click_word`]: ReaderController::click_word
/// [`pointer_enter`]: ReaderController::pointer_enter
/// [`remove_word`]: ReaderController::remove_word
pub struct ReaderController {
    backend: Arc<dyn ReaderBackend>,
    hover: Arc<HoverTranslator>,
    prompt: Arc<dyn DeletePrompt>,
    inner: Mutex<ControllerState>,
    events: broadcast::Sender<ReaderEvent>,
}

impl ReaderController {
    pub fn new(backend: Arc<dyn ReaderBackend>, prompt: Arc<dyn DeletePrompt>) -> Arc<Self> {
        Self::with_hover_delay(backend, prompt, DEFAULT_HOVER_DELAY)
    }

    pub fn with_hover_delay(
        backend: Arc<dyn ReaderBackend>,
        prompt: Arc<dyn DeletePrompt>,
        hover_delay: Duration,
    ) -> Arc<Self> {
        let hover = HoverTranslator::with_delay(Arc::clone(&backend), hover_delay);
        let (events, _) = broadcast::channel(256);
        let controller = Arc::new(Self {
            backend,
            hover,
            prompt,
            inner: Mutex::new(ControllerState {
                view: TextView::default(),
                vocab: Vec::new(),
            }),
            events,
        });
        controller.spawn_translation_forwarder();
        controller
    }

    /// Republishes hover display changes as [`ReaderEvent::Translation`].
    /// The task holds no reference back to the controller and exits when the
    /// hover side shuts down.
    fn spawn_translation_forwarder(&self) {
        let events = self.events.clone();
        let mut displays = self.hover.subscribe();
        tokio::spawn(async move {
            while let Ok(display) = displays.recv().await {
                let _ = events.send(ReaderEvent::Translation(display));
            }
        });
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ReaderEvent> {
        self.events.subscribe()
    }

    pub async fn current_view(&self) -> TextView {
        self.inner.lock().await.view.clone()
    }

    pub async fn vocab(&self) -> Vec<String> {
        self.inner.lock().await.vocab.clone()
    }

    /// The nth word token of the current text.
    pub async fn word_token(&self, index: usize) -> Option<String> {
        let inner = self.inner.lock().await;
        inner.view.word_at(index).map(str::to_string)
    }

    pub async fn translation_display(&self) -> TranslationDisplay {
        self.hover.display().await
    }

    /// Click on a stored-text link: fetch the text and make it current.
    pub async fn open_text(&self, filename: &str) -> Result<()> {
        let content = self.backend.fetch_text(filename).await?;
        self.install_text(filename, &content).await;
        Ok(())
    }

    /// Submission of the URL form. Failures are surfaced to the user as an
    /// [`ReaderEvent::Error`] and do not end the session; the current text
    /// stays in place.
    pub async fn import_url(&self, url: &str) -> Result<()> {
        let url = url.trim();
        if url.is_empty() {
            return Ok(());
        }
        match self.backend.import_url(url).await {
            Ok(loaded) => {
                self.install_text(&loaded.filename, &loaded.content).await;
                Ok(())
            }
            Err(error) => {
                warn!(url = %url, %error, "url import failed");
                let _ = self
                    .events
                    .send(ReaderEvent::Error(format!("Error loading URL: {error}")));
                Ok(())
            }
        }
    }

    /// Upload form submission. Like the vocabulary mutations, a failed call
    /// is logged rather than surfaced; the stored-text list simply shows no
    /// new entry.
    pub async fn upload_file(&self, filename: &str, content: &str) {
        match self.backend.upload_text(filename, content).await {
            Ok(stored) => info!(filename = %stored, "text uploaded"),
            Err(error) => warn!(filename = %filename, %error, "text upload failed"),
        }
    }

    /// Click on a word token: add its cleaned form to the vocabulary and
    /// refresh the mirror. Tokens that clean to nothing are ignored. A failed
    /// insert is logged and the refresh still runs, so the list shows
    /// whatever the server actually holds.
    pub async fn click_word(&self, token: &str) -> Result<()> {
        let word = clean_word(token);
        if word.is_empty() {
            return Ok(());
        }
        if let Err(error) = self.backend.add_vocab_word(&word).await {
            warn!(word = %word, %error, "vocabulary insert failed");
        }
        self.refresh_vocab().await
    }

    /// Click on a delete affordance. Asks the prompt first; a declined
    /// confirmation performs no request at all. Returns whether the deletion
    /// was attempted.
    pub async fn remove_word(&self, word: &str) -> Result<bool> {
        if !self.prompt.confirm(word).await {
            return Ok(false);
        }
        if let Err(error) = self.backend.remove_vocab_word(word).await {
            warn!(word = %word, %error, "vocabulary delete failed");
        }
        self.refresh_vocab().await?;
        Ok(true)
    }

    /// Re-fetch the vocabulary list and publish the new state.
    pub async fn refresh_vocab(&self) -> Result<()> {
        let vocab = self.backend.vocab_words().await?;
        {
            let mut inner = self.inner.lock().await;
            inner.vocab = vocab.clone();
        }
        let _ = self.events.send(ReaderEvent::VocabUpdated { vocab });
        Ok(())
    }

    /// Pointer entered a word token.
    pub async fn pointer_enter(&self, token: &str) {
        self.hover.pointer_enter(token).await;
    }

    /// Pointer left the word area.
    pub async fn pointer_leave(&self) {
        self.hover.pointer_leave().await;
    }

    async fn install_text(&self, filename: &str, content: &str) {
        // A new text invalidates the hover session; a lookup still in flight
        // for the old text may not touch the display.
        self.hover.reset().await;
        let view = TextView::new(filename, content);
        let word_count = view.word_count();
        {
            let mut inner = self.inner.lock().await;
            inner.view = view;
        }
        info!(filename = %filename, words = word_count, "text loaded");
        let _ = self.events.send(ReaderEvent::TextLoaded {
            filename: filename.to_string(),
            word_count,
        });
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
