//! Per-conversation state and the session store port.
//!
//! A `SessionState` is exclusively owned by its conversation: callers must
//! serialize `handle_message` calls per session id. Distinct sessions share
//! nothing and may run in parallel. The engine never touches a store —
//! persistence is injected by the caller through `SessionStore`.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use uuid::Uuid;

/// Rolling-memory window: how many recent turns a session keeps.
pub const DEFAULT_MEMORY_WINDOW: usize = 4;

fn default_memory_window() -> usize {
    DEFAULT_MEMORY_WINDOW
}

/// Who produced a memory turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Ai,
}

/// One remembered conversational turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryTurn {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Mutable per-conversation record: which questions have been served, the
/// pending question, and a short rolling memory of recent turns.
///
/// `asked_ids` only grows — a question, once asked, is permanently excluded
/// from selection for this session. The category is fixed at creation; a new
/// category means a new session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    category: String,
    asked_ids: HashSet<String>,
    last_question_id: Option<String>,
    memory: VecDeque<MemoryTurn>,
    #[serde(default = "default_memory_window")]
    memory_window: usize,
    #[serde(default)]
    completed: bool,
}

impl SessionState {
    pub fn new(category: impl Into<String>) -> Self {
        Self::with_memory_window(category, DEFAULT_MEMORY_WINDOW)
    }

    pub fn with_memory_window(category: impl Into<String>, memory_window: usize) -> Self {
        Self {
            category: category.into(),
            asked_ids: HashSet::new(),
            last_question_id: None,
            memory: VecDeque::new(),
            memory_window: memory_window.max(1),
            completed: false,
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn asked_ids(&self) -> &HashSet<String> {
        &self.asked_ids
    }

    pub fn is_asked(&self, id: &str) -> bool {
        self.asked_ids.contains(id)
    }

    pub fn last_question_id(&self) -> Option<&str> {
        self.last_question_id.as_deref()
    }

    /// True once the category's pool has been exhausted for this session.
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Recent turns, oldest first, at most the memory window.
    pub fn recent_turns(&self) -> impl Iterator<Item = &MemoryTurn> {
        self.memory.iter()
    }

    /// Append a turn; evicts the oldest once the window is full.
    pub fn push_turn(&mut self, speaker: Speaker, text: impl Into<String>) {
        self.memory.push_back(MemoryTurn {
            speaker,
            text: text.into(),
            timestamp: Utc::now(),
        });
        while self.memory.len() > self.memory_window {
            self.memory.pop_front();
        }
    }

    pub(crate) fn mark_asked(&mut self, id: &str) {
        self.asked_ids.insert(id.to_string());
        self.last_question_id = Some(id.to_string());
    }

    pub(crate) fn set_completed(&mut self) {
        self.completed = true;
    }
}

/// Session persistence port. The engine takes states by reference and never
/// calls this; inject a store where the transport layer needs one.
pub trait SessionStore: Send + Sync {
    fn get(&self, id: &str) -> Option<SessionState>;
    fn put(&self, id: &str, state: SessionState);
    fn delete(&self, id: &str) -> bool;
}

/// Process-local store on a concurrent map. Suitable for single-instance
/// deployments and tests; swap for a durable implementation behind the same
/// trait for anything else.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<String, SessionState>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a fresh session under a minted id and return the id.
    pub fn insert_new(&self, state: SessionState) -> String {
        let id = Uuid::new_v4().to_string();
        self.sessions.insert(id.clone(), state);
        id
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, id: &str) -> Option<SessionState> {
        self.sessions.get(id).map(|s| s.clone())
    }

    fn put(&self, id: &str, state: SessionState) {
        self.sessions.insert(id.to_string(), state);
    }

    fn delete(&self, id: &str) -> bool {
        self.sessions.remove(id).is_some()
    }
}
