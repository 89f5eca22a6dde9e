//! Local authentication for Smartmarks.
//!
//! Signs users in by e-mail against the `users` table and issues random bearer
//! tokens. Only a SHA-256 digest of each token is kept, both in SQLite and in the
//! [`TokenRegistry`] the change feed consults to scope subscriptions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{SecondsFormat, Utc};
use ring::digest::{digest, SHA256};
use ring::rand::{SecureRandom, SystemRandom};
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use crate::database::connection::Database;
use crate::types::errors::AuthError;
use crate::types::session::{AccessToken, Session, User};

/// Random bytes per issued access token.
const TOKEN_LENGTH: usize = 32;

/// Trait defining the auth collaborator used by the dashboard and the feed listener.
pub trait AuthProvider {
    /// The signed-in user, if any.
    fn current_user(&self) -> Option<User>;
    /// The current session together with its access token, if any.
    fn session(&self) -> Option<Session>;
    fn sign_in(&self, email: &str) -> Result<Session, AuthError>;
    fn sign_out(&self) -> Result<(), AuthError>;
}

/// Digest under which a token is stored; the raw token is never persisted.
pub fn token_digest(token: &AccessToken) -> String {
    URL_SAFE_NO_PAD.encode(digest(&SHA256, token.as_str().as_bytes()).as_ref())
}

/// Thread-safe map of live token digests to user ids.
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    inner: Arc<RwLock<HashMap<String, String>>>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, token: &AccessToken, user_id: &str) {
        let mut map = self.inner.write().unwrap_or_else(|e| e.into_inner());
        map.insert(token_digest(token), user_id.to_string());
    }

    pub fn revoke(&self, token: &AccessToken) {
        let mut map = self.inner.write().unwrap_or_else(|e| e.into_inner());
        map.remove(&token_digest(token));
    }

    /// Returns the user the token was issued to, if it is still live.
    pub fn resolve(&self, token: &AccessToken) -> Option<String> {
        let map = self.inner.read().unwrap_or_else(|e| e.into_inner());
        map.get(&token_digest(token)).cloned()
    }
}

/// Auth provider backed by the local SQLite database.
pub struct LocalAuth {
    db: Arc<Database>,
    tokens: TokenRegistry,
    rng: SystemRandom,
    current: Mutex<Option<Session>>,
}

impl LocalAuth {
    pub fn new(db: Arc<Database>, tokens: TokenRegistry) -> Self {
        Self {
            db,
            tokens,
            rng: SystemRandom::new(),
            current: Mutex::new(None),
        }
    }

    fn now() -> String {
        Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    /// Looks up a user by e-mail, creating the row on first sign-in.
    fn find_or_create_user(&self, email: &str) -> Result<User, AuthError> {
        let conn = self.db.connection();
        let existing: Option<String> = conn
            .query_row(
                "SELECT id FROM users WHERE email = ?1",
                params![email],
                |row| row.get(0),
            )
            .optional()?;

        let id = match existing {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4().to_string();
                conn.execute(
                    "INSERT INTO users (id, email, created_at) VALUES (?1, ?2, ?3)",
                    params![id, email, Self::now()],
                )?;
                log::info!("created user {} for {}", id, email);
                id
            }
        };

        Ok(User {
            id,
            email: email.to_string(),
        })
    }

    fn issue_token(&self, user_id: &str) -> Result<AccessToken, AuthError> {
        let mut bytes = [0u8; TOKEN_LENGTH];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| AuthError::Token("random generation failed".to_string()))?;
        let token = AccessToken::new(URL_SAFE_NO_PAD.encode(bytes));
        zeroize::Zeroize::zeroize(&mut bytes);

        self.db.connection().execute(
            "INSERT INTO auth_tokens (token_digest, user_id, issued_at) VALUES (?1, ?2, ?3)",
            params![token_digest(&token), user_id, Self::now()],
        )?;
        self.tokens.register(&token, user_id);
        Ok(token)
    }

    fn revoke_token(&self, token: &AccessToken) -> Result<(), AuthError> {
        self.tokens.revoke(token);
        self.db.connection().execute(
            "UPDATE auth_tokens SET revoked_at = ?1 WHERE token_digest = ?2 AND revoked_at IS NULL",
            params![Self::now(), token_digest(token)],
        )?;
        Ok(())
    }
}

impl AuthProvider for LocalAuth {
    fn current_user(&self) -> Option<User> {
        self.session().map(|session| session.user)
    }

    fn session(&self) -> Option<Session> {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Signs in by e-mail, replacing (and revoking) any previous session.
    fn sign_in(&self, email: &str) -> Result<Session, AuthError> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(AuthError::InvalidEmail(email.to_string()));
        }

        self.sign_out()?;

        let user = self.find_or_create_user(&email.to_lowercase())?;
        let access_token = self.issue_token(&user.id)?;
        let session = Session { user, access_token };

        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = Some(session.clone());
        log::info!("signed in {}", session.user.email);
        Ok(session)
    }

    fn sign_out(&self) -> Result<(), AuthError> {
        let previous = self
            .current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(session) = previous {
            self.revoke_token(&session.access_token)?;
            log::info!("signed out {}", session.user.email);
        }
        Ok(())
    }
}
