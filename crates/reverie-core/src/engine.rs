//! **ReflectionEngine** — orchestrates one conversational step.
//!
//! Order per turn: remember the user text, guard for crisis language,
//! classify emotion, stall on plain sadness, otherwise advance selection.
//! The safety and sadness branches never mark a question asked: the pending
//! question stays pending and the next user message is judged against the
//! same unasked pool.

use crate::bank::{BankCache, FileBankSource};
use crate::config::ReverieConfig;
use crate::crisis::CrisisGuard;
use crate::emotion::{create_best_classifier, EmotionClassifier, EmotionLabel};
use crate::error::ReverieResult;
use crate::selector::{select_next, Selection, COMPLETION_MESSAGE};
use crate::session::{SessionState, Speaker, DEFAULT_MEMORY_WINDOW};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Empathetic acknowledgments for the non-crisis sadness branch. One is
/// drawn at random; no question advances on this turn.
pub const SADNESS_ACKNOWLEDGMENTS: &[&str] = &[
    "That sounds really heavy. Do you feel okay talking more about it?",
    "I hear how difficult that feels. Would you like to continue?",
    "Thank you for sharing that with me. Want to talk about it more?",
];

/// Which branch produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    /// A new question was selected and is now pending.
    Question,
    /// Crisis phrase detected; fixed safety text, no selection advance.
    Safety,
    /// Plain sadness; empathetic acknowledgment, no selection advance.
    Sadness,
    /// Category exhausted; fixed completion message.
    Terminal,
}

/// One engine reply: plain data, no dependency on any wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub kind: ResponseKind,
    pub text: String,
    /// Present only on the Question branch.
    pub question_id: Option<String>,
    /// The emotion this turn was judged with. Absent on the safety branch
    /// (classification never ran) and on Terminal.
    pub emotion: Option<EmotionLabel>,
    /// Random follow-up phrasing for the question just answered, when the
    /// bank provides one. Kept apart from `text` so question wording stays
    /// stable per id and the safety reply stays verbatim.
    pub acknowledgment: Option<String>,
}

impl Response {
    fn terminal() -> Self {
        Self {
            kind: ResponseKind::Terminal,
            text: COMPLETION_MESSAGE.to_string(),
            question_id: None,
            emotion: None,
            acknowledgment: None,
        }
    }
}

/// The public face of the engine: `start` opens a category, `handle_message`
/// advances it one user turn at a time.
///
/// The engine is shareable across sessions (banks are cached read-only, the
/// classifier is a shared port); each `SessionState` must still be driven by
/// one call at a time.
pub struct ReflectionEngine {
    banks: BankCache,
    classifier: Arc<dyn EmotionClassifier>,
    guard: CrisisGuard,
    memory_window: usize,
}

impl ReflectionEngine {
    pub fn new(banks: BankCache, classifier: Arc<dyn EmotionClassifier>) -> Self {
        Self {
            banks,
            classifier,
            guard: CrisisGuard::new(),
            memory_window: DEFAULT_MEMORY_WINDOW,
        }
    }

    /// Wire the whole engine from configuration: file bank source (with
    /// optional fallback), best available classifier, crisis override.
    pub fn from_config(config: &ReverieConfig) -> Self {
        let source = match config.fallback_category {
            Some(ref fallback) => {
                FileBankSource::with_fallback(&config.knowledge_dir, fallback.clone())
            }
            None => FileBankSource::new(&config.knowledge_dir),
        };
        let guard = match config.crisis_phrases {
            Some(ref phrases) => CrisisGuard::with_phrases(phrases.iter().cloned()),
            None => CrisisGuard::new(),
        };
        Self {
            banks: BankCache::new(source),
            classifier: create_best_classifier(config),
            guard,
            memory_window: config.memory_window.max(1),
        }
    }

    pub fn with_guard(mut self, guard: CrisisGuard) -> Self {
        self.guard = guard;
        self
    }

    pub fn with_memory_window(mut self, window: usize) -> Self {
        self.memory_window = window;
        self
    }

    pub fn banks(&self) -> &BankCache {
        &self.banks
    }

    /// Open a category: load its bank (fatal on configuration errors — no
    /// session is created), then serve the first question with emotion
    /// forced to `neutral`, since no user text exists yet to classify.
    pub fn start(&self, category: &str) -> ReverieResult<(SessionState, Response)> {
        let bank = self.banks.load(category)?;
        let mut session = SessionState::with_memory_window(category, self.memory_window);
        match select_next(&bank, &mut session, EmotionLabel::Neutral) {
            Selection::Question(sel) => {
                session.push_turn(Speaker::Ai, sel.text.clone());
                info!(category, question_id = %sel.id, "session started");
                Ok((
                    session,
                    Response {
                        kind: ResponseKind::Question,
                        text: sel.text,
                        question_id: Some(sel.id),
                        emotion: Some(EmotionLabel::Neutral),
                        acknowledgment: None,
                    },
                ))
            }
            Selection::Exhausted => {
                session.set_completed();
                info!(category, "session started against an empty bank");
                Ok((session, Response::terminal()))
            }
        }
    }

    /// Advance the session by one user turn.
    pub async fn handle_message(
        &self,
        session: &mut SessionState,
        text: &str,
    ) -> ReverieResult<Response> {
        session.push_turn(Speaker::User, text);

        // Highest-priority branch: crisis phrases bypass everything.
        if let Some(safety) = self.guard.check(text) {
            session.push_turn(Speaker::Ai, safety);
            return Ok(Response {
                kind: ResponseKind::Safety,
                text: safety.to_string(),
                question_id: None,
                emotion: None,
                acknowledgment: None,
            });
        }

        let emotion = self.classifier.classify(text).await;
        debug!(%emotion, "classified user turn");

        // Plain sadness stalls progression: acknowledge, keep the same
        // question pending.
        if emotion == EmotionLabel::Sadness {
            let ack = SADNESS_ACKNOWLEDGMENTS
                .choose(&mut rand::thread_rng())
                .copied()
                .unwrap_or(SADNESS_ACKNOWLEDGMENTS[0]);
            session.push_turn(Speaker::Ai, ack);
            return Ok(Response {
                kind: ResponseKind::Sadness,
                text: ack.to_string(),
                question_id: None,
                emotion: Some(emotion),
                acknowledgment: None,
            });
        }

        let bank = self.banks.load(session.category())?;

        // Follow-up for the question just answered, before selection moves
        // `last_question_id` forward.
        let acknowledgment = session
            .last_question_id()
            .and_then(|id| bank.question(id))
            .and_then(|q| q.followups.choose(&mut rand::thread_rng()).cloned());

        match select_next(&bank, session, emotion) {
            Selection::Question(sel) => {
                session.push_turn(Speaker::Ai, sel.text.clone());
                info!(
                    category = %session.category(),
                    question_id = %sel.id,
                    %emotion,
                    "question served"
                );
                Ok(Response {
                    kind: ResponseKind::Question,
                    text: sel.text,
                    question_id: Some(sel.id),
                    emotion: Some(emotion),
                    acknowledgment,
                })
            }
            Selection::Exhausted => {
                session.set_completed();
                info!(category = %session.category(), "category exhausted");
                Ok(Response::terminal())
            }
        }
    }
}
