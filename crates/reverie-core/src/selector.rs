//! Next-question ranking policy.
//!
//! Candidates are the session's unused questions, narrowed to those whose
//! tags match the current emotion (or are tagged `neutral`); when nothing
//! matches, the emotion filter is dropped rather than ending the category
//! early. The pool sorts ascending by priority; the sort is stable, so bank
//! order breaks ties deterministically.

use crate::bank::{clean_prompt, Question, QuestionBank};
use crate::emotion::EmotionLabel;
use crate::session::SessionState;
use rand::seq::SliceRandom;
use tracing::debug;

/// Fixed message returned once a category's pool is exhausted.
pub const COMPLETION_MESSAGE: &str = "Thank you. That covers everything for this section.";

/// A question chosen for this turn, with one prompt variant rendered.
#[derive(Debug, Clone)]
pub struct SelectedQuestion {
    pub id: String,
    pub text: String,
}

/// Outcome of a selection pass.
#[derive(Debug, Clone)]
pub enum Selection {
    Question(SelectedQuestion),
    /// Pool exhausted. Terminal: no question, no state mutation.
    Exhausted,
}

/// Pick the next question for the session, or `Exhausted` when every id has
/// been asked. On success the session is mutated: the chosen id joins
/// `asked_ids` and becomes `last_question_id`. The display text is one
/// `prompt_variants` entry chosen uniformly at random, so repeat exposure
/// across sessions can word the same question differently.
pub fn select_next(
    bank: &QuestionBank,
    session: &mut SessionState,
    emotion: EmotionLabel,
) -> Selection {
    let unused: Vec<&Question> = bank
        .questions()
        .iter()
        .filter(|q| !session.is_asked(&q.id))
        .collect();
    if unused.is_empty() {
        return Selection::Exhausted;
    }

    let matched: Vec<&Question> = unused
        .iter()
        .copied()
        .filter(|q| q.matches(emotion))
        .collect();
    let mut pool = if matched.is_empty() { unused } else { matched };

    // Stable sort: equal priorities keep bank order.
    pool.sort_by_key(|q| q.priority);
    let chosen = pool[0];
    debug!(
        id = %chosen.id,
        priority = chosen.priority,
        pool = pool.len(),
        %emotion,
        "selected next question"
    );

    let variant = chosen
        .prompt_variants
        .choose(&mut rand::thread_rng())
        .map(String::as_str)
        .unwrap_or_default(); // bank validation guarantees at least one variant
    session.mark_asked(&chosen.id);

    Selection::Question(SelectedQuestion {
        id: chosen.id.clone(),
        text: clean_prompt(variant),
    })
}
