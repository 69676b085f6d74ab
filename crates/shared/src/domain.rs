use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("language pair must look like `de-en`, got `{0}`")]
    MalformedLanguagePair(String),
    #[error("language code must be 2-3 ascii letters, got `{0}`")]
    BadLanguageCode(String),
    #[error("review quality must be between 0 and 5, got {0}")]
    QualityOutOfRange(u8),
    #[error("review quality must be a number, got `{0}`")]
    MalformedQuality(String),
}

/// A `source-target` pair of ISO-639-1 style codes, e.g. `de-en`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguagePair {
    source: String,
    target: String,
}

impl LanguagePair {
    pub fn new(source: &str, target: &str) -> Result<Self, DomainError> {
        Ok(Self {
            source: validate_code(source)?,
            target: validate_code(target)?,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

fn validate_code(code: &str) -> Result<String, DomainError> {
    let trimmed = code.trim();
    if trimmed.len() < 2 || trimmed.len() > 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(DomainError::BadLanguageCode(code.to_string()));
    }
    Ok(trimmed.to_ascii_lowercase())
}

impl Default for LanguagePair {
    fn default() -> Self {
        Self {
            source: "de".to_string(),
            target: "en".to_string(),
        }
    }
}

impl fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.source, self.target)
    }
}

impl FromStr for LanguagePair {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (source, target) = s
            .split_once('-')
            .ok_or_else(|| DomainError::MalformedLanguagePair(s.to_string()))?;
        Self::new(source, target)
    }
}

impl TryFrom<String> for LanguagePair {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LanguagePair> for String {
    fn from(value: LanguagePair) -> Self {
        value.to_string()
    }
}

/// SM-2 recall grade, 0 (blackout) through 5 (perfect).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ReviewQuality(u8);

impl ReviewQuality {
    pub const MAX: u8 = 5;

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for ReviewQuality {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value > Self::MAX {
            return Err(DomainError::QualityOutOfRange(value));
        }
        Ok(Self(value))
    }
}

impl From<ReviewQuality> for u8 {
    fn from(value: ReviewQuality) -> Self {
        value.0
    }
}

impl FromStr for ReviewQuality {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: u8 = s
            .trim()
            .parse()
            .map_err(|_| DomainError::MalformedQuality(s.to_string()))?;
        Self::try_from(raw)
    }
}
