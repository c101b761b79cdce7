//! Engine flow test: verifies the conversational invariants end to end.
//!
//! 1. A started session walks its bank to exhaustion without repeats
//! 2. Crisis phrases and plain sadness never advance selection
//! 3. Emotion-mismatched pools fall back to all unused questions
//!
//! Run with: `cargo test --test engine_flow_test`

use reverie_core::{
    BankCache, EmotionLabel, FileBankSource, InMemorySessionStore, PlaceholderClassifier,
    ReflectionEngine, ResponseKind, ReverieError, SessionStore, COMPLETION_MESSAGE,
    SAFETY_MESSAGE,
};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

fn write_bank(dir: &Path, name: &str, body: serde_json::Value) {
    fs::write(dir.join(format!("{name}.json")), body.to_string()).expect("write bank");
}

fn two_question_bank() -> serde_json::Value {
    serde_json::json!([
        {"id": "Q1", "priority": 1, "emotion_tags": ["neutral"],
         "prompt_variants": ["Tell me about yourself."]},
        {"id": "Q2", "priority": 2, "emotion_tags": ["joy"],
         "prompt_variants": ["What made you smile recently?"]}
    ])
}

fn engine(dir: &Path, label: EmotionLabel) -> ReflectionEngine {
    ReflectionEngine::new(
        BankCache::new(FileBankSource::new(dir)),
        Arc::new(PlaceholderClassifier::with_label(label)),
    )
}

#[tokio::test]
async fn end_to_end_two_question_category() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    write_bank(tmp.path(), "x", two_question_bank());
    let engine = engine(tmp.path(), EmotionLabel::Joy);

    // Start: lowest priority, neutral-forced.
    let (mut session, first) = engine.start("X").expect("start");
    assert_eq!(first.kind, ResponseKind::Question);
    assert_eq!(first.question_id.as_deref(), Some("Q1"));
    assert_eq!(first.text, "Tell me about yourself.");
    assert_eq!(first.emotion, Some(EmotionLabel::Neutral));

    // Joyful answer: Q2 matches joy and is the only unused question.
    let second = engine
        .handle_message(&mut session, "I had a wonderful day")
        .await
        .expect("reply");
    assert_eq!(second.kind, ResponseKind::Question);
    assert_eq!(second.question_id.as_deref(), Some("Q2"));
    assert_eq!(second.emotion, Some(EmotionLabel::Joy));

    // Pool exhausted: terminal, fixed message, asked set complete.
    let third = engine
        .handle_message(&mut session, "anything at all")
        .await
        .expect("reply");
    assert_eq!(third.kind, ResponseKind::Terminal);
    assert_eq!(third.text, COMPLETION_MESSAGE);
    assert!(session.is_completed());

    let asked: HashSet<&str> = session.asked_ids().iter().map(|s| s.as_str()).collect();
    assert_eq!(asked, HashSet::from(["Q1", "Q2"]));
}

#[tokio::test]
async fn no_question_id_repeats_across_a_session() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    write_bank(
        tmp.path(),
        "big",
        serde_json::json!([
            {"id": "a", "priority": 2, "emotion_tags": ["joy"], "prompt_variants": ["A?"]},
            {"id": "b", "priority": 1, "emotion_tags": ["neutral"], "prompt_variants": ["B?"]},
            {"id": "c", "priority": 3, "emotion_tags": ["stress"], "prompt_variants": ["C?"]},
            {"id": "d", "priority": 1, "emotion_tags": ["joy", "hope"], "prompt_variants": ["D?"]},
            {"id": "e", "priority": 2, "emotion_tags": ["neutral"], "prompt_variants": ["E?"]}
        ]),
    );
    let engine = engine(tmp.path(), EmotionLabel::Joy);

    let (mut session, first) = engine.start("big").expect("start");
    let mut served = vec![first.question_id.expect("first question")];
    loop {
        let reply = engine
            .handle_message(&mut session, "and then")
            .await
            .expect("reply");
        match reply.kind {
            ResponseKind::Question => served.push(reply.question_id.expect("question id")),
            ResponseKind::Terminal => break,
            other => panic!("unexpected branch: {other:?}"),
        }
    }

    assert_eq!(served.len(), 5);
    let unique: HashSet<&String> = served.iter().collect();
    assert_eq!(unique.len(), 5, "a question id repeated: {served:?}");
}

#[tokio::test]
async fn exhausted_session_stays_terminal_without_mutation() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    write_bank(tmp.path(), "x", two_question_bank());
    let engine = engine(tmp.path(), EmotionLabel::Neutral);

    let (mut session, _) = engine.start("x").expect("start");
    engine.handle_message(&mut session, "one").await.expect("reply");
    engine.handle_message(&mut session, "two").await.expect("reply");
    let asked_after = session.asked_ids().clone();

    for text in ["again", "still here", "hello?"] {
        let reply = engine.handle_message(&mut session, text).await.expect("reply");
        assert_eq!(reply.kind, ResponseKind::Terminal);
    }
    assert_eq!(session.asked_ids(), &asked_after);
}

#[tokio::test]
async fn crisis_phrase_takes_precedence_and_freezes_selection() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    write_bank(tmp.path(), "x", two_question_bank());
    // Classifier says joy; the crisis scan must still win.
    let engine = engine(tmp.path(), EmotionLabel::Joy);

    let (mut session, _) = engine.start("x").expect("start");
    let asked_before = session.asked_ids().clone();
    let last_before = session.last_question_id().map(str::to_string);

    let reply = engine
        .handle_message(&mut session, "some days I just want to End My Life")
        .await
        .expect("reply");
    assert_eq!(reply.kind, ResponseKind::Safety);
    assert_eq!(reply.text, SAFETY_MESSAGE);
    assert!(reply.question_id.is_none());
    assert!(reply.emotion.is_none());

    assert_eq!(session.asked_ids(), &asked_before);
    assert_eq!(session.last_question_id().map(str::to_string), last_before);
}

#[tokio::test]
async fn sadness_stalls_progression_on_the_same_question() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    write_bank(tmp.path(), "x", two_question_bank());
    let engine = engine(tmp.path(), EmotionLabel::Sadness);

    let (mut session, _) = engine.start("x").expect("start");
    let last_before = session.last_question_id().map(str::to_string);
    let asked_before = session.asked_ids().clone();

    let reply = engine
        .handle_message(&mut session, "everything feels gray lately")
        .await
        .expect("reply");
    assert_eq!(reply.kind, ResponseKind::Sadness);
    assert_eq!(session.last_question_id().map(str::to_string), last_before);
    assert_eq!(session.asked_ids(), &asked_before);
}

#[tokio::test]
async fn mismatched_emotion_falls_back_to_all_unused() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    // Nothing is tagged stress; B still qualifies via its neutral tag and
    // wins on priority.
    write_bank(
        tmp.path(),
        "x",
        serde_json::json!([
            {"id": "A", "priority": 2, "emotion_tags": ["joy"], "prompt_variants": ["A?"]},
            {"id": "B", "priority": 1, "emotion_tags": ["neutral"], "prompt_variants": ["B?"]}
        ]),
    );
    let engine = engine(tmp.path(), EmotionLabel::Stress);

    let (mut session, first) = engine.start("x").expect("start");
    assert_eq!(first.question_id.as_deref(), Some("B"));

    // Only A remains; it matches nothing for stress, so the filter drops.
    let reply = engine
        .handle_message(&mut session, "deadlines everywhere")
        .await
        .expect("reply");
    assert_eq!(reply.question_id.as_deref(), Some("A"));
}

#[test]
fn variants_differ_but_question_id_is_stable() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    write_bank(
        tmp.path(),
        "x",
        serde_json::json!([
            {"id": "Q1", "priority": 1, "emotion_tags": ["neutral"],
             "prompt_variants": ["One way to ask?", "Another way to ask?", "A third way to ask?"]}
        ]),
    );
    let engine = engine(tmp.path(), EmotionLabel::Neutral);

    // Fresh sessions may see different wording; the id never varies.
    for _ in 0..10 {
        let (_, first) = engine.start("x").expect("start");
        assert_eq!(first.question_id.as_deref(), Some("Q1"));
        assert!(first.text.ends_with('?'));
    }
}

#[test]
fn missing_bank_is_fatal_at_start() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let engine = engine(tmp.path(), EmotionLabel::Neutral);
    match engine.start("Nowhere") {
        Err(ReverieError::BankNotFound(category)) => assert_eq!(category, "Nowhere"),
        other => panic!("expected BankNotFound, got {other:?}"),
    }
}

#[test]
fn fallback_bank_serves_missing_categories() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    write_bank(
        tmp.path(),
        "screening",
        serde_json::json!([
            {"id": "s1", "priority": 1, "emotion_tags": ["neutral"],
             "prompt_variants": ["How are you feeling today?"]}
        ]),
    );
    let engine = ReflectionEngine::new(
        BankCache::new(FileBankSource::with_fallback(tmp.path(), "screening")),
        Arc::new(PlaceholderClassifier::new()),
    );

    let (session, first) = engine.start("Places").expect("start");
    assert_eq!(first.question_id.as_deref(), Some("s1"));
    assert_eq!(session.category(), "Places");

    // The substitution is visible on the bank, not on the response.
    let bank = engine.banks().load("Places").expect("load");
    assert_eq!(bank.substituted_for(), Some("Places"));
}

#[tokio::test]
async fn sessions_round_trip_through_a_store() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    write_bank(tmp.path(), "x", two_question_bank());
    let engine = engine(tmp.path(), EmotionLabel::Neutral);
    let store = InMemorySessionStore::new();

    let (session, _) = engine.start("x").expect("start");
    let id = store.insert_new(session);

    // Simulate a second request: load, advance, store back.
    let mut session = store.get(&id).expect("session in store");
    let reply = engine
        .handle_message(&mut session, "my answer")
        .await
        .expect("reply");
    assert_eq!(reply.kind, ResponseKind::Question);
    store.put(&id, session);

    let session = store.get(&id).expect("session in store");
    assert_eq!(session.asked_ids().len(), 2);
    assert!(store.delete(&id));
}
