//! reverie-core: life-reflection engine (question banks, emotion-aware
//! selection, session flow).
//!
//! The engine receives one user turn at a time, classifies its emotional
//! tone through a pluggable backend, guards for crisis language, and serves
//! the next unused question from the active category's bank. Transport,
//! audio, and durable persistence live outside this crate; the engine
//! exposes plain data in and out through narrow ports.

mod bank;
mod config;
mod crisis;
mod emotion;
mod engine;
mod error;
mod selector;
mod session;

// Question banks (per-category JSON files, shared read-only cache)
pub use bank::{
    clean_prompt, BankCache, FileBankSource, Question, QuestionBank, MAX_PROMPT_WORDS,
};

// Configuration
pub use config::{ReverieConfig, DEFAULT_KNOWLEDGE_DIR};

// Crisis escalation (highest-priority branch)
pub use crisis::{CrisisGuard, DEFAULT_CRISIS_PHRASES, SAFETY_MESSAGE};

// Emotion vocabulary + classifier port and backends
pub use emotion::{
    create_best_classifier, EmotionClassifier, EmotionLabel, LexiconClassifier,
    PlaceholderClassifier, RemoteClassifier,
};

// Engine orchestration
pub use engine::{ReflectionEngine, Response, ResponseKind, SADNESS_ACKNOWLEDGMENTS};

// Errors (configuration problems only; everything else is a Response)
pub use error::{ReverieError, ReverieResult};

// Selection policy
pub use selector::{select_next, SelectedQuestion, Selection, COMPLETION_MESSAGE};

// Session state + store port
pub use session::{
    InMemorySessionStore, MemoryTurn, SessionState, SessionStore, Speaker, DEFAULT_MEMORY_WINDOW,
};
