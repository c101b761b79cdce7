//! Question banks: per-category JSON collections, read-only after load.
//!
//! A bank file is an ordered JSON array of question records. File order is
//! load-bearing: it is the tie-break when several candidates share a
//! priority, so `load` never reorders.

use crate::emotion::EmotionLabel;
use crate::error::{ReverieError, ReverieResult};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

/// Display text is capped at this many words (long variants get truncated).
pub const MAX_PROMPT_WORDS: usize = 30;

/// One question record, as stored in a bank file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    /// Unique within its bank, stable across the category's lifetime.
    pub id: String,
    /// Lower = asked earlier when several candidates match.
    pub priority: i32,
    /// Emotions this question suits; `neutral` makes it a universal match.
    pub emotion_tags: Vec<EmotionLabel>,
    /// Phrasing alternatives; one is chosen at random at selection time.
    pub prompt_variants: Vec<String>,
    /// Optional acknowledgment phrasings used after an answer.
    #[serde(default)]
    pub followups: Vec<String>,
}

impl Question {
    /// True when this question suits the emotion, or is tagged `neutral`.
    pub fn matches(&self, emotion: EmotionLabel) -> bool {
        self.emotion_tags.contains(&emotion) || self.emotion_tags.contains(&EmotionLabel::Neutral)
    }
}

/// A loaded, validated category bank. No mutation after load; share via `Arc`.
#[derive(Debug, Clone)]
pub struct QuestionBank {
    category: String,
    questions: Vec<Question>,
    /// Set when this bank was substituted for a missing category's bank.
    substituted_for: Option<String>,
}

impl QuestionBank {
    /// Validate and wrap a question list. Duplicate ids or a question with
    /// no prompt variants are configuration errors, surfaced immediately.
    pub fn new(category: impl Into<String>, questions: Vec<Question>) -> ReverieResult<Self> {
        let category = category.into();
        let mut seen = HashSet::new();
        for q in &questions {
            if q.prompt_variants.is_empty() {
                return Err(ReverieError::MalformedBank {
                    category,
                    reason: format!("question '{}' has no prompt_variants", q.id),
                });
            }
            if !seen.insert(q.id.as_str()) {
                return Err(ReverieError::MalformedBank {
                    category,
                    reason: format!("duplicate question id '{}'", q.id),
                });
            }
        }
        Ok(Self {
            category,
            questions,
            substituted_for: None,
        })
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// Questions in original file order.
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// The category this bank stands in for, when loaded as a fallback.
    pub fn substituted_for(&self) -> Option<&str> {
        self.substituted_for.as_deref()
    }
}

/// Loads category banks from JSON files under a knowledge directory.
///
/// Category names map to file names by slug: `"Early Childhood"` loads
/// `early_childhood.json`. An optional fallback category stands in for
/// missing banks; the substitution is logged and marked on the bank.
#[derive(Debug, Clone)]
pub struct FileBankSource {
    root: PathBuf,
    fallback: Option<String>,
}

impl FileBankSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            fallback: None,
        }
    }

    pub fn with_fallback(root: impl Into<PathBuf>, fallback: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            fallback: Some(fallback.into()),
        }
    }

    /// Load the bank for a category. Missing bank + configured fallback =>
    /// the fallback loads with a `substituted_for` marker; missing bank and
    /// no fallback => `BankNotFound`.
    pub fn load(&self, category: &str) -> ReverieResult<QuestionBank> {
        match self.load_exact(category) {
            Ok(bank) => Ok(bank),
            Err(ReverieError::BankNotFound(_)) => match self.fallback {
                Some(ref fallback) if fallback != category => {
                    warn!(category, %fallback, "question bank missing; substituting fallback");
                    let mut bank = self.load_exact(fallback)?;
                    bank.substituted_for = Some(category.to_string());
                    Ok(bank)
                }
                _ => Err(ReverieError::BankNotFound(category.to_string())),
            },
            Err(e) => Err(e),
        }
    }

    fn load_exact(&self, category: &str) -> ReverieResult<QuestionBank> {
        let path = self.bank_path(category);
        if !path.exists() {
            return Err(ReverieError::BankNotFound(category.to_string()));
        }
        let raw = fs::read_to_string(&path)?;
        let questions: Vec<Question> =
            serde_json::from_str(&raw).map_err(|e| ReverieError::MalformedBank {
                category: category.to_string(),
                reason: e.to_string(),
            })?;
        QuestionBank::new(category, questions)
    }

    /// File backing a category: `<root>/<slug>.json`.
    pub fn bank_path(&self, category: &str) -> PathBuf {
        self.root.join(format!("{}.json", slug(category)))
    }

    /// Category slugs with a bank file present, sorted.
    pub fn categories(&self) -> Vec<String> {
        let mut out: Vec<String> = fs::read_dir(&self.root)
            .into_iter()
            .flatten()
            .flatten()
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) == Some("json") {
                    path.file_stem()
                        .and_then(|s| s.to_str())
                        .map(|s| s.to_string())
                } else {
                    None
                }
            })
            .collect();
        out.sort();
        out
    }
}

/// Slugify a category name for file lookup: lowercase, word runs joined
/// with underscores ("Early Childhood" -> "early_childhood").
fn slug(category: &str) -> String {
    category
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Shared bank cache: banks are immutable after load, so one copy serves
/// every session and thread. Keyed by the requested category name.
pub struct BankCache {
    source: FileBankSource,
    cache: DashMap<String, Arc<QuestionBank>>,
}

impl BankCache {
    pub fn new(source: FileBankSource) -> Self {
        Self {
            source,
            cache: DashMap::new(),
        }
    }

    pub fn load(&self, category: &str) -> ReverieResult<Arc<QuestionBank>> {
        if let Some(bank) = self.cache.get(category) {
            return Ok(Arc::clone(&bank));
        }
        let bank = Arc::new(self.source.load(category)?);
        self.cache.insert(category.to_string(), Arc::clone(&bank));
        Ok(bank)
    }

    pub fn source(&self) -> &FileBankSource {
        &self.source
    }
}

/// Normalize display text: cut at the first question mark and cap the word
/// count, so a rambling variant still reads as one question.
pub fn clean_prompt(text: &str) -> String {
    let text = match text.find('?') {
        Some(i) => &text[..=i],
        None => text,
    };
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() > MAX_PROMPT_WORDS {
        let mut capped = words[..MAX_PROMPT_WORDS].join(" ");
        capped.push('?');
        capped
    } else {
        text.trim().to_string()
    }
}
