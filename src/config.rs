// src/config.rs

use std::{env, net::SocketAddr, path::PathBuf};

/// Number of entries kept on the leaderboard.
pub const LEADERBOARD_SIZE: usize = 7;

/// Points awarded per correct answer.
pub const POINTS_PER_CORRECT: u32 = 1;

/// Fewest options a question may have.
pub const MIN_ANSWERS: usize = 2;

/// Path of the question set inside the shared store.
pub const QUESTIONS_PATH: &str = "questions";
pub const USERS_PATH: &str = "users";
pub const USER_QUIZZES_PATH: &str = "userQuizzes";
pub const USER_POINTS_PATH: &str = "userPoints";
pub const LEADERBOARD_PATH: &str = "leaderboard";

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{key} must be set"),
            ConfigError::Invalid(key, value) => write!(f, "{key} has an invalid value: {value}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite URL of the shared store. `None` keeps the store in memory.
    pub database_url: Option<String>,
    /// Shared password of the admin editor.
    pub admin_password: String,
    pub jwt_secret: String,
    /// Lifetime of an admin session token, in seconds.
    pub jwt_expiration: u64,
    /// Local fallback copy of the question set.
    pub question_cache_path: PathBuf,
    pub listen_addr: SocketAddr,
    pub log_dir: String,
    pub rust_log: String,
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key))
}

fn parsed<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid(key, raw)),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let admin_password = required("ADMIN_PASSWORD")?;
        let jwt_secret = required("JWT_SECRET")?;
        let jwt_expiration = parsed("JWT_EXPIRATION", 3600)?;
        let listen_addr = parsed("LISTEN_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?;

        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());

        let question_cache_path = env::var("QUESTION_CACHE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data/questions.json"));

        let log_dir = env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string());

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            database_url,
            admin_password,
            jwt_secret,
            jwt_expiration,
            question_cache_path,
            listen_addr,
            log_dir,
            rust_log,
        })
    }
}
