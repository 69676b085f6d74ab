use shared::text::{clean_word, segments, Segment};

/// Render model for a loaded text. Every whitespace-delimited token is a
/// hover and click target; the gaps between them are kept verbatim so the
/// displayed text reads exactly like the stored file.
#[derive(Debug, Clone, Default)]
pub struct TextView {
    filename: Option<String>,
    segments: Vec<Segment>,
}

impl TextView {
    pub fn new(filename: impl Into<String>, content: &str) -> Self {
        Self {
            filename: Some(filename.into()),
            segments: segments(content),
        }
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Raw word tokens in reading order, punctuation still attached.
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.segments
            .iter()
            .filter(|s| s.is_word())
            .map(Segment::raw)
    }

    pub fn word_count(&self) -> usize {
        self.words().count()
    }

    /// The nth word token, counting only words.
    pub fn word_at(&self, index: usize) -> Option<&str> {
        self.words().nth(index)
    }

    /// Cleaned forms of every token, skipping tokens that clean to nothing
    /// (standalone punctuation).
    pub fn cleaned_words(&self) -> Vec<String> {
        self.words()
            .map(clean_word)
            .filter(|w| !w.is_empty())
            .collect()
    }

    /// Reconstructs the original content byte for byte.
    pub fn render(&self) -> String {
        self.segments.iter().map(Segment::raw).collect()
    }
}
