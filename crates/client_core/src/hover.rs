use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tracing::{debug, warn};

use crate::ReaderBackend;
use shared::text::clean_word;

/// How long the pointer must rest on a word before a lookup is issued.
pub const DEFAULT_HOVER_DELAY: Duration = Duration::from_millis(300);

/// What the translation panel shows. Every transition is published to
/// subscribers in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationDisplay {
    /// No word is hovered; the panel shows its standing invitation.
    Prompt,
    Loading {
        word: String,
    },
    Translations {
        word: String,
        translations: Vec<String>,
    },
    NoTranslation {
        word: String,
    },
}

struct HoverState {
    /// Cleaned form of the word the pointer is currently on. The single
    /// source of truth: a lookup result may only reach the display while
    /// its word still matches.
    last_word: Option<String>,
    /// The armed delay timer, if any. At most one exists at a time.
    pending: Option<JoinHandle<()>>,
    display: TranslationDisplay,
}

/// Debounced hover-to-translation driver.
///
/// Entering a word arms a single delay timer; entering another word or
/// leaving disarms it, so skimming across a text issues no lookups. A lookup
/// that does go out cannot be cancelled; instead its result is checked
/// against [`HoverState::last_word`] and dropped when the pointer has moved
/// on.
pub struct HoverTranslator {
    backend: Arc<dyn ReaderBackend>,
    delay: Duration,
    state: Mutex<HoverState>,
    events: broadcast::Sender<TranslationDisplay>,
}

impl HoverTranslator {
    pub fn new(backend: Arc<dyn ReaderBackend>) -> Arc<Self> {
        Self::with_delay(backend, DEFAULT_HOVER_DELAY)
    }

    pub fn with_delay(backend: Arc<dyn ReaderBackend>, delay: Duration) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            backend,
            delay,
            state: Mutex::new(HoverState {
                last_word: None,
                pending: None,
                display: TranslationDisplay::Prompt,
            }),
            events,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TranslationDisplay> {
        self.events.subscribe()
    }

    pub async fn display(&self) -> TranslationDisplay {
        self.state.lock().await.display.clone()
    }

    /// Pointer entered a word token. Re-entering the word already hovered is
    /// a no-op and leaves any armed timer running.
    pub async fn pointer_enter(self: &Arc<Self>, token: &str) {
        let word = clean_word(token);
        let mut state = self.state.lock().await;
        if state.last_word.as_deref() == Some(word.as_str()) {
            return;
        }
        if let Some(pending) = state.pending.take() {
            pending.abort();
        }
        state.last_word = Some(word.clone());
        self.set_display(&mut state, TranslationDisplay::Loading { word: word.clone() });

        let translator = Arc::clone(self);
        state.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(translator.delay).await;
            // Past this point the lookup is no longer cancellable; resolve
            // rejects a stale result against last_word instead.
            tokio::spawn(translator.resolve(word));
        }));
    }

    /// Pointer left the word area: disarm the timer and fall back to the
    /// prompt. A lookup already in flight will find last_word cleared and
    /// discard its result.
    pub async fn pointer_leave(&self) {
        let mut state = self.state.lock().await;
        if let Some(pending) = state.pending.take() {
            pending.abort();
        }
        state.last_word = None;
        self.set_display(&mut state, TranslationDisplay::Prompt);
    }

    /// Forget the hover session entirely, e.g. when a new text replaces the
    /// one the pointer was over.
    pub async fn reset(&self) {
        self.pointer_leave().await;
    }

    async fn resolve(self: Arc<Self>, word: String) {
        let translations = match self.backend.translate(&word).await {
            Ok(response) if response.success => response.translations,
            Ok(response) => {
                debug!(word = %word, error = ?response.error, "no translation found");
                Vec::new()
            }
            Err(error) => {
                warn!(word = %word, %error, "translation lookup failed");
                Vec::new()
            }
        };

        let mut state = self.state.lock().await;
        if state.last_word.as_deref() != Some(word.as_str()) {
            debug!(word = %word, "discarding stale translation result");
            return;
        }
        let display = if translations.is_empty() {
            TranslationDisplay::NoTranslation { word }
        } else {
            TranslationDisplay::Translations { word, translations }
        };
        self.set_display(&mut state, display);
    }

    fn set_display(&self, state: &mut HoverState, display: TranslationDisplay) {
        state.display = display.clone();
        let _ = self.events.send(display);
    }
}
