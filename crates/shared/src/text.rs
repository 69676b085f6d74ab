//! Word cleaning and whitespace-preserving segmentation.
//!
//! Both the interaction layer and the server key translations and vocabulary
//! entries by the *cleaned* form of a word, so the rule lives here.

/// Punctuation stripped from word tokens before lookup or storage.
const STRIPPED: &[char] = &['.', ',', '!', '?', ';', ':', '"', '\'', '(', ')'];

/// Strips the fixed punctuation set anywhere in the string and trims outer
/// whitespace. Idempotent; never reorders characters.
pub fn clean_word(raw: &str) -> String {
    let stripped: String = raw.chars().filter(|c| !STRIPPED.contains(c)).collect();
    stripped.trim().to_string()
}

/// One run of displayed text: either a word token or the whitespace between
/// words. Joining the raw parts of a segment sequence reproduces the source
/// content byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Word(String),
    Gap(String),
}

impl Segment {
    pub fn raw(&self) -> &str {
        match self {
            Segment::Word(raw) | Segment::Gap(raw) => raw,
        }
    }

    pub fn is_word(&self) -> bool {
        matches!(self, Segment::Word(_))
    }
}

/// Splits content into alternating word and gap segments, preserving every
/// separator so the original text can be reconstructed exactly.
pub fn segments(content: &str) -> Vec<Segment> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut current_is_gap: Option<bool> = None;

    for (idx, ch) in content.char_indices() {
        let is_gap = ch.is_whitespace();
        match current_is_gap {
            None => current_is_gap = Some(is_gap),
            Some(prev) if prev == is_gap => {}
            Some(prev) => {
                out.push(make_segment(&content[start..idx], prev));
                start = idx;
                current_is_gap = Some(is_gap);
            }
        }
    }
    if let Some(is_gap) = current_is_gap {
        out.push(make_segment(&content[start..], is_gap));
    }
    out
}

fn make_segment(raw: &str, is_gap: bool) -> Segment {
    if is_gap {
        Segment::Gap(raw.to_string())
    } else {
        Segment::Word(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleaning_strips_punctuation_and_trims() {
        assert_eq!(clean_word("Hallo,"), "Hallo");
        assert_eq!(clean_word("(Welt)!"), "Welt");
        assert_eq!(clean_word("  Haus  "), "Haus");
        assert_eq!(clean_word("geht's"), "gehts");
        assert_eq!(clean_word("\"Zitat:\""), "Zitat");
        assert_eq!(clean_word("..."), "");
    }

    #[test]
    fn cleaning_keeps_characters_outside_the_set() {
        assert_eq!(clean_word("so-called"), "so-called");
        assert_eq!(clean_word("Straße"), "Straße");
        assert_eq!(clean_word("C3PO"), "C3PO");
    }

    #[test]
    fn cleaning_is_idempotent() {
        let samples = [
            "Hallo,",
            "  (gut)  ",
            "don't!",
            "",
            "   ",
            "?!.,;:\"'()",
            "Bäume...",
        ];
        for raw in samples {
            let once = clean_word(raw);
            assert_eq!(clean_word(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn segmentation_reconstructs_input_exactly() {
        let samples = [
            "Hallo, Welt!",
            "  leading spaces",
            "trailing newline\n",
            "tabs\tand  double  spaces",
            "",
            "   ",
            "ein",
            "Zeilen\nund\r\nUmbrüche",
        ];
        for content in samples {
            let joined: String = segments(content).iter().map(Segment::raw).collect();
            assert_eq!(joined, content, "round trip failed for {content:?}");
        }
    }

    #[test]
    fn segments_alternate_words_and_gaps() {
        let segs = segments(" ein zwei ");
        assert_eq!(segs.len(), 5);
        assert!(!segs[0].is_word());
        assert!(segs[1].is_word());
        assert_eq!(segs[1].raw(), "ein");
        assert_eq!(segs[3].raw(), "zwei");
    }

    #[test]
    fn hallo_welt_yields_two_cleaned_words() {
        let words: Vec<String> = segments("Hallo, Welt!")
            .iter()
            .filter(|s| s.is_word())
            .map(|s| clean_word(s.raw()))
            .collect();
        assert_eq!(words, vec!["Hallo".to_string(), "Welt".to_string()]);
    }
}
