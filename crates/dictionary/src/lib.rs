//! In-memory dictionary over the dict.cc interchange format.
//!
//! Lines look like `Haus {n} :: house; building`, with `;`-separated variants
//! on both sides, `{...}` gender/number markers, `[...]` context tags and
//! `|`-separated inflection hints. The whole file is parsed once and indexed
//! by cleaned headword; lookups are exact and case-sensitive.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

#[derive(Debug, Default)]
pub struct Dictionary {
    // Translations per source line, in file order.
    entries: Vec<Vec<String>>,
    // Cleaned headword -> indices into `entries`, ascending.
    index: HashMap<String, Vec<usize>>,
}

impl Dictionary {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("opening dictionary file {}", path.display()))?;
        let dict = Self::parse(BufReader::new(file))?;
        info!(
            path = %path.display(),
            entries = dict.entries.len(),
            headwords = dict.index.len(),
            "dictionary loaded"
        );
        Ok(dict)
    }

    pub fn parse(reader: impl BufRead) -> Result<Self> {
        let mut entries: Vec<Vec<String>> = Vec::new();
        let mut index: HashMap<String, Vec<usize>> = HashMap::new();

        for line in reader.lines() {
            let line = line.context("reading dictionary line")?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let mut parts = trimmed.split("::");
            let (Some(source_side), Some(target_side), None) =
                (parts.next(), parts.next(), parts.next())
            else {
                continue;
            };

            let headwords: Vec<String> = source_side
                .split(';')
                .map(clean_headword)
                .filter(|t| !t.is_empty())
                .collect();
            let translations: Vec<String> = target_side
                .split(';')
                .map(clean_translation)
                .filter(|t| !t.is_empty())
                .collect();
            if headwords.is_empty() || translations.is_empty() {
                continue;
            }

            let id = entries.len();
            entries.push(translations);
            for headword in headwords {
                index.entry(headword).or_default().push(id);
            }
        }

        Ok(Self { entries, index })
    }

    /// All translations for `word`, concatenated across matching entries in
    /// file order. Empty when the word is unknown.
    pub fn lookup(&self, word: &str) -> Vec<String> {
        let Some(ids) = self.index.get(word) else {
            return Vec::new();
        };
        ids.iter()
            .flat_map(|&id| self.entries[id].iter().cloned())
            .collect()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.index.contains_key(word)
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn headword_count(&self) -> usize {
        self.index.len()
    }
}

/// Drops `{...}` and `[...]` tokens, collapses whitespace, cuts at `|`.
fn clean_headword(term: &str) -> String {
    let without_markers: Vec<&str> = term
        .split_whitespace()
        .filter(|tok| !(tok.starts_with('{') && tok.ends_with('}')))
        .filter(|tok| !(tok.starts_with('[') && tok.ends_with(']')))
        .collect();
    let joined = without_markers.join(" ");
    match joined.split_once('|') {
        Some((head, _)) => head.trim().to_string(),
        None => joined,
    }
}

/// Target-side variants keep their markers; only `|` hints are cut.
fn clean_translation(term: &str) -> String {
    let term = term.trim();
    match term.split_once('|') {
        Some((head, _)) => head.trim().to_string(),
        None => term.to_string(),
    }
}
