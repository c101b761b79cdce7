//! Crisis-phrase guard: the highest-priority branch.
//!
//! A case-insensitive substring scan against a fixed phrase list. Any match
//! short-circuits normal selection with a fixed safety message; the session's
//! question progression is untouched.

use tracing::warn;

/// High-risk phrases scanned for in every user turn.
pub const DEFAULT_CRISIS_PHRASES: &[&str] = &["suicide", "kill myself", "end my life", "self-harm"];

/// Fixed safety reply, returned verbatim on any crisis match.
pub const SAFETY_MESSAGE: &str = "I'm really sorry you're feeling this way. I care about your safety, \
     but I'm not trained to give crisis support. Please consider talking to \
     a trained professional or someone you trust. \
     Would you like to continue our conversation gently?";

/// Scans user text for high-risk phrases.
#[derive(Debug, Clone)]
pub struct CrisisGuard {
    phrases: Vec<String>,
}

impl CrisisGuard {
    /// Guard with the default phrase list.
    pub fn new() -> Self {
        Self::with_phrases(DEFAULT_CRISIS_PHRASES.iter().map(|p| p.to_string()))
    }

    /// Guard with an explicit phrase list (config override).
    pub fn with_phrases(phrases: impl IntoIterator<Item = String>) -> Self {
        Self {
            phrases: phrases
                .into_iter()
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// Which phrases appear in the text. Empty when none.
    pub fn matched(&self, text: &str) -> Vec<&str> {
        let lower = text.to_lowercase();
        self.phrases
            .iter()
            .filter(|p| lower.contains(p.as_str()))
            .map(|p| p.as_str())
            .collect()
    }

    /// The safety message when any crisis phrase matches, `None` otherwise.
    pub fn check(&self, text: &str) -> Option<&'static str> {
        let matched = self.matched(text);
        if matched.is_empty() {
            return None;
        }
        warn!(phrases = ?matched, "crisis phrase detected");
        Some(SAFETY_MESSAGE)
    }
}

impl Default for CrisisGuard {
    fn default() -> Self {
        Self::new()
    }
}
