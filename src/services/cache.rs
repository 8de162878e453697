// src/services/cache.rs

use std::path::{Path, PathBuf};

use crate::{error::AppError, models::question::Question};

/// Local copy of the question set, kept as one JSON file.
///
/// The cache is always written before the shared store, so the next load on
/// this host sees the latest edit even when the shared write failed.
#[derive(Debug, Clone)]
pub struct LocalCache {
    path: PathBuf,
}

impl LocalCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The cached question set. A missing or unreadable file is no cache.
    pub async fn load(&self) -> Option<Vec<Question>> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("Failed to read question cache {}: {}", self.path.display(), e);
                return None;
            }
        };
        match serde_json::from_slice(&raw) {
            Ok(questions) => Some(questions),
            Err(e) => {
                tracing::warn!("Ignoring corrupt question cache {}: {}", self.path.display(), e);
                None
            }
        }
    }

    /// Replaces the cached question set. The file is swapped in with a
    /// rename so readers never see a half-written cache.
    pub async fn store(&self, questions: &[Question]) -> Result<(), AppError> {
        let raw = serde_json::to_vec_pretty(questions).map_err(|e| AppError::InternalServerError(e.to_string()))?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| AppError::InternalServerError(format!("cache dir {}: {e}", dir.display())))?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, raw)
            .await
            .map_err(|e| AppError::InternalServerError(format!("cache write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| AppError::InternalServerError(format!("cache rename {}: {e}", self.path.display())))?;
        Ok(())
    }
}
