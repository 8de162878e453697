// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    config::Config,
    error::AppError,
    services::{
        admin::AdminGate, cache::LocalCache, leaderboard::LeaderboardEngine, ledger::AttemptLedger,
        points::ScoreAggregator, questions::QuestionStore, results::ResultRecorder,
    },
    store::TreeStore,
};

/// Services shared by every handler. Settings are consumed here and not
/// kept, so the plaintext admin password ends with the `Config`.
#[derive(Clone)]
pub struct AppState {
    pub questions: QuestionStore,
    pub ledger: AttemptLedger,
    pub points: ScoreAggregator,
    pub leaderboard: LeaderboardEngine,
    pub results: ResultRecorder,
    pub admin: AdminGate,
}

impl AppState {
    /// Wires every service to the one shared store.
    pub fn new(config: &Config, store: Arc<dyn TreeStore>) -> Result<Self, AppError> {
        let cache = LocalCache::new(config.question_cache_path.clone());
        let ledger = AttemptLedger::new(store.clone());
        let points = ScoreAggregator::new(store.clone());
        let leaderboard = LeaderboardEngine::new(store.clone());
        let admin = AdminGate::new(&config.admin_password, &config.jwt_secret, config.jwt_expiration)?;

        Ok(Self {
            questions: QuestionStore::new(store, cache),
            results: ResultRecorder::new(ledger.clone(), points.clone(), leaderboard.clone()),
            ledger,
            points,
            leaderboard,
            admin,
        })
    }
}

impl FromRef<AppState> for QuestionStore {
    fn from_ref(state: &AppState) -> Self {
        state.questions.clone()
    }
}

impl FromRef<AppState> for LeaderboardEngine {
    fn from_ref(state: &AppState) -> Self {
        state.leaderboard.clone()
    }
}

impl FromRef<AppState> for AdminGate {
    fn from_ref(state: &AppState) -> Self {
        state.admin.clone()
    }
}
