//! Operator login and sessions.
//!
//! The credential pair lives in the configuration file; the password is
//! stored as a hex SHA-256 digest. A successful login issues an opaque
//! session token that marks the caller as logged in until logout or
//! process exit.

use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::AuthConfig;

/// Returns the lowercase hex SHA-256 digest of a password.
pub fn hash_password(password: &str) -> String {
    format!("{:x}", Sha256::digest(password.as_bytes()))
}

/// Checks submitted credentials against the configured pair.
#[derive(Debug, Clone)]
pub struct CredentialCheck {
    username: String,
    password_sha256: String,
}

impl CredentialCheck {
    /// Creates a credential check from the auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            username: config.username.clone(),
            password_sha256: config.password_sha256.to_ascii_lowercase(),
        }
    }

    /// Returns true only for the exact configured username and password.
    pub fn verify(&self, username: &str, password: &str) -> bool {
        username == self.username && hash_password(password) == self.password_sha256
    }
}

/// Set of live session tokens.
#[derive(Debug, Default)]
pub struct SessionStore {
    tokens: RwLock<HashSet<String>>,
}

impl SessionStore {
    /// Creates an empty session store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a new session token.
    pub fn create(&self) -> String {
        let token = Uuid::new_v4().to_string();
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.clone());
        token
    }

    /// Returns true if the token belongs to a live session.
    pub fn is_valid(&self, token: &str) -> bool {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(token)
    }

    /// Ends a session. Returns false if the token was unknown.
    pub fn revoke(&self, token: &str) -> bool {
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(token)
    }
}
