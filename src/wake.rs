//! Wake word detection
//!
//! Pure matching over finalized transcript text. The phrase must open the
//! utterance as a full token sequence — "hey rocket what time is it"
//! matches and carries "what time is it" as the command remainder, while
//! chatter that merely mentions the phrase mid-sentence does not trigger.

use crate::{Error, Result};

/// A successful wake match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WakeMatch {
    /// Command text spoken in the same utterance after the phrase;
    /// empty when the utterance was exactly the wake phrase
    pub remainder: String,
}

/// Matches finalized transcripts against the configured wake phrase
#[derive(Debug, Clone)]
pub struct WakeWordDetector {
    phrase: String,
    phrase_tokens: Vec<String>,
}

/// Lowercase and split into tokens, trimming punctuation at token edges
///
/// Some engines emit "Hey Rocket, tell me a joke"; the comma must not
/// defeat token comparison.
fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|t| {
            t.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
                .to_lowercase()
        })
        .filter(|t| !t.is_empty())
        .collect()
}

impl WakeWordDetector {
    /// Create a detector for `phrase`
    ///
    /// The phrase is normalized to lowercase and trimmed.
    ///
    /// # Errors
    ///
    /// Returns error if the phrase is empty after trimming.
    pub fn new(phrase: &str) -> Result<Self> {
        let phrase_tokens = tokenize(phrase);

        if phrase_tokens.is_empty() {
            return Err(Error::Config("wake phrase must not be empty".to_string()));
        }

        let phrase = phrase_tokens.join(" ");
        tracing::debug!(phrase = %phrase, "wake word detector initialized");

        Ok(Self {
            phrase,
            phrase_tokens,
        })
    }

    /// Check a finalized transcript for the wake phrase
    ///
    /// Matching is case-insensitive and token-aligned: the phrase must be
    /// the leading token sequence of the utterance. Returns the trailing
    /// remainder so "hey rocket what time is it" seeds the command with
    /// "what time is it".
    #[must_use]
    pub fn matches(&self, transcript: &str) -> Option<WakeMatch> {
        let tokens = tokenize(transcript);

        if tokens.len() < self.phrase_tokens.len() {
            return None;
        }

        let leads = tokens
            .iter()
            .zip(&self.phrase_tokens)
            .all(|(token, expected)| token == expected);

        if !leads {
            return None;
        }

        let remainder = tokens[self.phrase_tokens.len()..].join(" ");
        Some(WakeMatch { remainder })
    }

    /// Remove embedded occurrences of the phrase and collapse whitespace
    ///
    /// The recognizer sometimes hears the wake phrase again inside the
    /// command; stripping keeps it out of the text sent to the generator.
    #[must_use]
    pub fn strip_phrase(&self, text: &str) -> String {
        let tokens = tokenize(text);
        let n = self.phrase_tokens.len();

        let mut kept: Vec<&str> = Vec::with_capacity(tokens.len());
        let mut i = 0;
        while i < tokens.len() {
            let window_matches = tokens.len() - i >= n
                && tokens[i..i + n]
                    .iter()
                    .zip(&self.phrase_tokens)
                    .all(|(token, expected)| token == expected);

            if window_matches {
                i += n;
            } else {
                kept.push(tokens[i].as_str());
                i += 1;
            }
        }

        kept.join(" ")
    }

    /// The configured phrase, normalized
    #[must_use]
    pub fn phrase(&self) -> &str {
        &self.phrase
    }
}
