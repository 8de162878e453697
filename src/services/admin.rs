// src/services/admin.rs

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
    time::{SystemTime, UNIX_EPOCH},
};

use crate::{
    error::AppError,
    utils::{
        hash::{hash_password, verify_password},
        jwt::{ADMIN_ROLE, Claims, sign_jwt, verify_jwt},
    },
};

/// Gate in front of the question editor.
///
/// There is one shared password. Logging in yields a signed session token;
/// logging out revokes that token until it would have expired anyway.
#[derive(Clone)]
pub struct AdminGate {
    password_hash: Arc<str>,
    secret: Arc<str>,
    expiration_seconds: u64,
    /// Revoked tokens and their expiry (Unix seconds).
    revoked: Arc<RwLock<HashMap<String, usize>>>,
}

fn now_seconds() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as usize)
        .unwrap_or_default()
}

impl AdminGate {
    pub fn new(password: &str, secret: &str, expiration_seconds: u64) -> Result<Self, AppError> {
        Ok(Self {
            password_hash: hash_password(password)?.into(),
            secret: secret.into(),
            expiration_seconds,
            revoked: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    pub fn expiration_seconds(&self) -> u64 {
        self.expiration_seconds
    }

    /// Exchanges the shared password for a session token.
    pub fn login(&self, password: &str) -> Result<String, AppError> {
        if !verify_password(password, &self.password_hash)? {
            tracing::warn!("Rejected admin login with a wrong password");
            return Err(AppError::AuthError("Incorrect password".to_string()));
        }
        tracing::info!("Admin logged in");
        sign_jwt(ADMIN_ROLE, ADMIN_ROLE, &self.secret, self.expiration_seconds)
    }

    /// Checks a presented token: signature, expiry, role, revocation.
    pub fn authorize(&self, token: &str) -> Result<Claims, AppError> {
        let claims = verify_jwt(token, &self.secret)?;
        if claims.role != ADMIN_ROLE {
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }
        let revoked = self
            .revoked
            .read()
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
        if revoked.contains_key(token) {
            return Err(AppError::AuthError("Session has ended".to_string()));
        }
        Ok(claims)
    }

    /// Ends the session behind `token`.
    pub fn logout(&self, token: &str, claims: &Claims) -> Result<(), AppError> {
        let now = now_seconds();
        let mut revoked = self
            .revoked
            .write()
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
        // Expired tokens fail verification on their own.
        revoked.retain(|_, exp| *exp > now);
        revoked.insert(token.to_owned(), claims.exp);
        tracing::info!("Admin logged out");
        Ok(())
    }
}
