//! **Emotion classification** — convert one user turn into a label from the
//! fixed vocabulary.
//!
//! Implement `EmotionClassifier` for a local heuristic or a remote
//! chat-completions model. The port is infallible by signature: backends
//! coerce their own failures to `Neutral`, so classification can never abort
//! a conversation.

use crate::config::ReverieConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Closed emotion vocabulary. Anything a backend produces outside this set
/// collapses to `Neutral`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionLabel {
    Joy,
    Neutral,
    Stress,
    Sadness,
    Nostalgia,
    Pride,
    Regret,
    Curiosity,
    Faith,
    Trust,
    Values,
    Growth,
    Creativity,
    Inspiration,
    Ambition,
    Hope,
}

impl EmotionLabel {
    /// All labels, in vocabulary order.
    pub const ALL: [EmotionLabel; 16] = [
        EmotionLabel::Joy,
        EmotionLabel::Neutral,
        EmotionLabel::Stress,
        EmotionLabel::Sadness,
        EmotionLabel::Nostalgia,
        EmotionLabel::Pride,
        EmotionLabel::Regret,
        EmotionLabel::Curiosity,
        EmotionLabel::Faith,
        EmotionLabel::Trust,
        EmotionLabel::Values,
        EmotionLabel::Growth,
        EmotionLabel::Creativity,
        EmotionLabel::Inspiration,
        EmotionLabel::Ambition,
        EmotionLabel::Hope,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionLabel::Joy => "joy",
            EmotionLabel::Neutral => "neutral",
            EmotionLabel::Stress => "stress",
            EmotionLabel::Sadness => "sadness",
            EmotionLabel::Nostalgia => "nostalgia",
            EmotionLabel::Pride => "pride",
            EmotionLabel::Regret => "regret",
            EmotionLabel::Curiosity => "curiosity",
            EmotionLabel::Faith => "faith",
            EmotionLabel::Trust => "trust",
            EmotionLabel::Values => "values",
            EmotionLabel::Growth => "growth",
            EmotionLabel::Creativity => "creativity",
            EmotionLabel::Inspiration => "inspiration",
            EmotionLabel::Ambition => "ambition",
            EmotionLabel::Hope => "hope",
        }
    }

    /// Parse a label, case-insensitive. Unrecognized input is `Neutral` —
    /// degraded classification is never an error.
    pub fn parse(s: &str) -> EmotionLabel {
        let s = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|l| l.as_str() == s)
            .unwrap_or(EmotionLabel::Neutral)
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend for classifying one user turn. Must always return a label from
/// the fixed vocabulary; internal failures map to `Neutral`, never an error.
#[async_trait]
pub trait EmotionClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> EmotionLabel;
}

/// Placeholder classifier: returns a fixed label. Use for testing the
/// reflection loop without a model.
#[derive(Debug, Clone, Copy)]
pub struct PlaceholderClassifier {
    pub label: EmotionLabel,
}

impl PlaceholderClassifier {
    pub fn new() -> Self {
        Self {
            label: EmotionLabel::Neutral,
        }
    }

    pub fn with_label(label: EmotionLabel) -> Self {
        Self { label }
    }
}

impl Default for PlaceholderClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmotionClassifier for PlaceholderClassifier {
    async fn classify(&self, _text: &str) -> EmotionLabel {
        self.label
    }
}

/// Keyword cues for the local heuristic. Order matters: earlier entries win
/// ties, and `Neutral` is the fallback when nothing scores.
const LEXICON: &[(EmotionLabel, &[&str])] = &[
    (
        EmotionLabel::Sadness,
        &["sad", "lonely", "miss ", "lost", "grief", "cry", "heavy"],
    ),
    (
        EmotionLabel::Joy,
        &["happy", "wonderful", "smile", "laugh", "fun", "love"],
    ),
    (
        EmotionLabel::Stress,
        &["stress", "anxious", "overwhelm", "pressure", "worried"],
    ),
    (
        EmotionLabel::Nostalgia,
        &["remember", "back then", "those days", "used to"],
    ),
    (
        EmotionLabel::Pride,
        &["proud", "accomplish", "achieve"],
    ),
    (
        EmotionLabel::Regret,
        &["regret", "wish i had", "should have"],
    ),
    (
        EmotionLabel::Hope,
        &["hope", "looking forward", "someday"],
    ),
    (
        EmotionLabel::Curiosity,
        &["wonder", "curious", "what if"],
    ),
];

/// Local heuristic classifier: counts lexicon hits per label, highest wins.
/// Zero-dependency default when no remote model is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LexiconClassifier;

impl LexiconClassifier {
    pub fn new() -> Self {
        Self
    }

    fn score(text: &str) -> EmotionLabel {
        let lower = text.to_lowercase();
        let mut best = EmotionLabel::Neutral;
        let mut best_hits = 0usize;
        for (label, cues) in LEXICON {
            let hits = cues.iter().filter(|c| lower.contains(**c)).count();
            if hits > best_hits {
                best = *label;
                best_hits = hits;
            }
        }
        best
    }
}

#[async_trait]
impl EmotionClassifier for LexiconClassifier {
    async fn classify(&self, text: &str) -> EmotionLabel {
        Self::score(text)
    }
}

/// Production classifier: OpenAI-compatible chat-completions API.
/// Uses `REVERIE_CLASSIFIER_API_URL` (default https://api.openai.com/v1),
/// `REVERIE_CLASSIFIER_API_KEY` (or OPENAI_API_KEY / OPENROUTER_API_KEY),
/// and `REVERIE_CLASSIFIER_MODEL` (default gpt-4o-mini).
#[derive(Debug, Clone)]
pub struct RemoteClassifier {
    /// Base URL without trailing slash (e.g. https://api.openai.com/v1).
    pub base_url: String,
    /// Bearer API key.
    pub api_key: String,
    /// Model id, e.g. gpt-4o-mini.
    pub model: String,
    client: reqwest::Client,
}

const DEFAULT_CLASSIFIER_URL: &str = "https://api.openai.com/v1";

impl RemoteClassifier {
    /// Create with explicit settings.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Build from configuration. Returns `None` when no API key is set.
    pub fn from_config(config: &ReverieConfig) -> Option<Self> {
        let api_key = config.classifier_api_key.clone()?;
        let base_url = config
            .classifier_api_url
            .clone()
            .unwrap_or_else(|| DEFAULT_CLASSIFIER_URL.to_string());
        Some(Self::new(base_url, api_key, config.classifier_model.clone()))
    }

    fn prompt(text: &str) -> String {
        format!(
            "Classify the emotion of this message into ONE category:\n\
             joy, neutral, stress, sadness, nostalgia, pride, regret, curiosity, \
             faith, trust, values, growth, creativity, inspiration, ambition, hope.\n\n\
             Only output the emotion. No punctuation.\nMessage: \"{}\"",
            text
        )
    }

    async fn request_label(&self, text: &str) -> Result<String, String> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": Self::prompt(text)}],
            "max_tokens": 3,
            "temperature": 0,
        });
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !res.status().is_success() {
            return Err(format!("classifier API error {}", res.status()));
        }
        let json: serde_json::Value = res.json().await.map_err(|e| e.to_string())?;
        let label = json
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|t| t.as_str())
            .unwrap_or("")
            .trim()
            .to_string();
        Ok(label)
    }
}

#[async_trait]
impl EmotionClassifier for RemoteClassifier {
    async fn classify(&self, text: &str) -> EmotionLabel {
        match self.request_label(text).await {
            Ok(label) => EmotionLabel::parse(&label),
            Err(err) => {
                warn!("emotion classification failed, defaulting to neutral: {err}");
                EmotionLabel::Neutral
            }
        }
    }
}

/// Create the best available classifier from configuration.
/// Remote model when an API key is configured, local lexicon otherwise.
pub fn create_best_classifier(config: &ReverieConfig) -> Arc<dyn EmotionClassifier> {
    match RemoteClassifier::from_config(config) {
        Some(remote) => Arc::new(remote),
        None => Arc::new(LexiconClassifier::new()),
    }
}
