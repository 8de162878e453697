// tests/quiz_flow_tests.rs

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use quizboard::{
    models::question::{Question, default_questions},
    services::{
        cache::LocalCache, identity::compute_identity, leaderboard::LeaderboardEngine, ledger::AttemptLedger,
        points::ScoreAggregator, questions::QuestionStore, results::{Recording, ResultRecorder},
        session::SessionState,
    },
    store::{MemoryStore, StoreError, TreeStore},
};
use serde_json::Value;
use tokio::sync::broadcast;

/// In-memory store that can be told to fail reads, or writes under one path.
struct FlakyStore {
    inner: MemoryStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    /// When set, only writes under this prefix fail.
    write_prefix: Option<&'static str>,
}

impl FlakyStore {
    fn new(write_prefix: Option<&'static str>) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryStore::new(),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            write_prefix,
        })
    }
}

#[async_trait]
impl TreeStore for FlakyStore {
    async fn read(&self, path: &str) -> Result<Option<Value>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("reads are down".to_string()));
        }
        self.inner.read(path).await
    }

    async fn write(&self, path: &str, value: Value) -> Result<(), StoreError> {
        let targeted = self.write_prefix.is_none_or(|prefix| path.starts_with(prefix));
        if self.fail_writes.load(Ordering::SeqCst) && targeted {
            return Err(StoreError::Unavailable("writes are down".to_string()));
        }
        self.inner.write(path, value).await
    }

    fn changes(&self) -> broadcast::Receiver<String> {
        self.inner.changes()
    }
}

fn temp_cache() -> LocalCache {
    LocalCache::new(
        std::env::temp_dir()
            .join(format!("quizboard-flow-{}", uuid::Uuid::new_v4()))
            .join("questions.json"),
    )
}

fn recorder(store: Arc<dyn TreeStore>) -> (ResultRecorder, ScoreAggregator, AttemptLedger) {
    let ledger = AttemptLedger::new(store.clone());
    let points = ScoreAggregator::new(store.clone());
    let leaderboard = LeaderboardEngine::new(store);
    (
        ResultRecorder::new(ledger.clone(), points.clone(), leaderboard),
        points,
        ledger,
    )
}

#[tokio::test]
async fn completion_check_fails_open() {
    let store = FlakyStore::new(None);
    let (results, _, ledger) = recorder(store.clone());
    let quiz_id = compute_identity(&default_questions());

    assert!(matches!(
        results.record("Sara", &quiz_id, 4, 5).await,
        Recording::Awarded { total_points: 4 }
    ));
    assert!(ledger.has_completed("Sara", &quiz_id).await);

    store.fail_reads.store(true, Ordering::SeqCst);
    assert!(!ledger.has_completed("Sara", &quiz_id).await);
}

#[tokio::test]
async fn failed_writes_record_nothing() {
    let store = FlakyStore::new(None);
    let (results, points, ledger) = recorder(store.clone());
    let quiz_id = compute_identity(&default_questions());

    store.fail_writes.store(true, Ordering::SeqCst);
    assert_eq!(results.record("Sara", &quiz_id, 4, 5).await, Recording::NotRecorded);

    store.fail_writes.store(false, Ordering::SeqCst);
    assert_eq!(points.total("Sara").await.unwrap(), 0);
    assert!(!ledger.has_completed("Sara", &quiz_id).await);
}

#[tokio::test]
async fn leaderboard_failure_still_awards_points() {
    let store = FlakyStore::new(Some("leaderboard"));
    let (results, points, _) = recorder(store.clone());
    let quiz_id = compute_identity(&default_questions());

    store.fail_writes.store(true, Ordering::SeqCst);
    assert_eq!(
        results.record("Sara", &quiz_id, 3, 5).await,
        Recording::Awarded { total_points: 3 }
    );
    assert_eq!(points.total("Sara").await.unwrap(), 3);

    // The next successful recompute catches up.
    store.fail_writes.store(false, Ordering::SeqCst);
    let entries = LeaderboardEngine::new(store).recompute().await.unwrap();
    assert_eq!(entries[0].name, "Sara");
    assert_eq!(entries[0].points, 3);
}

#[tokio::test]
async fn second_attempt_is_a_duplicate_until_the_questions_change() {
    let store: Arc<dyn TreeStore> = Arc::new(MemoryStore::new());
    let (results, points, _) = recorder(store.clone());
    let questions = QuestionStore::new(store, temp_cache());

    let current = questions.load().await;
    let first_id = compute_identity(&current);
    let outcome = SessionState::replay(current, &[Some(0), Some(2)]).unwrap().finish();
    assert_eq!(outcome.score, 2);
    results.record("Omar", &first_id, outcome.score, outcome.total_questions).await;
    assert_eq!(
        results.record("Omar", &first_id, 5, 5).await,
        Recording::AlreadyCompleted
    );
    assert_eq!(points.total("Omar").await.unwrap(), 2);

    let edited = vec![
        Question::new("Is Rust fast?", &["Yes", "No"], 0),
        Question::new("2 + 2?", &["3", "4"], 1),
    ];
    questions.save(&edited).await.unwrap();
    let second_id = compute_identity(&questions.load().await);
    assert_ne!(first_id, second_id);

    assert_eq!(
        results.record("Omar", &second_id, 2, 2).await,
        Recording::Awarded { total_points: 4 }
    );
}

#[tokio::test]
async fn questions_degrade_to_cache_then_defaults() {
    let store = FlakyStore::new(None);
    let cache = temp_cache();
    let questions = QuestionStore::new(store.clone(), cache.clone());

    // Nothing stored anywhere yet.
    store.fail_reads.store(true, Ordering::SeqCst);
    assert_eq!(questions.load().await, default_questions());

    // The shared write fails but the cache keeps the edit.
    store.fail_reads.store(false, Ordering::SeqCst);
    store.fail_writes.store(true, Ordering::SeqCst);
    let edited = vec![Question::new("Only question", &["a", "b", "c"], 2)];
    questions.save(&edited).await.unwrap();
    assert_eq!(cache.load().await, Some(edited.clone()));
    assert_eq!(store.read("questions").await.unwrap(), None);

    store.fail_reads.store(true, Ordering::SeqCst);
    assert_eq!(questions.load().await, edited);
}

#[tokio::test]
async fn invalid_edits_touch_nothing() {
    let store: Arc<dyn TreeStore> = Arc::new(MemoryStore::new());
    let cache = temp_cache();
    let questions = QuestionStore::new(store.clone(), cache.clone());

    let err = questions
        .save(&[Question::new("Pick one", &["a", "b"], 5)])
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "BadRequest(\"Question 1 has no correct answer selected\")");

    assert!(questions.save(&[]).await.is_err());
    assert_eq!(store.read("questions").await.unwrap(), None);
    assert_eq!(cache.load().await, None);
}

#[tokio::test]
async fn reset_restores_defaults_everywhere() {
    let store: Arc<dyn TreeStore> = Arc::new(MemoryStore::new());
    let cache = temp_cache();
    let questions = QuestionStore::new(store.clone(), cache.clone());

    questions
        .save(&[Question::new("Temporary?", &["yes", "no"], 1)])
        .await
        .unwrap();
    let restored = questions.reset_to_defaults().await.unwrap();
    assert_eq!(restored, default_questions());

    let stored: Vec<Question> = serde_json::from_value(store.read("questions").await.unwrap().unwrap()).unwrap();
    assert_eq!(stored, default_questions());
    assert_eq!(cache.load().await, Some(default_questions()));
}
