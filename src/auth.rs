// src/auth.rs
//! Access token supply
//!
//! The engine never mints or refreshes credentials itself; it asks the
//! embedding once per scheduler tick and caches the answer. `None` means
//! no user is authenticated right now.

use async_trait::async_trait;
use parking_lot::Mutex;

/// Source of the current user's access token.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Current access token, if a user is authenticated.
    async fn access_token(&self) -> Option<String>;
}

/// Fixed, swappable token source for tests and simple embeddings.
#[derive(Default)]
pub struct StaticTokenProvider {
    token: Mutex<Option<String>>,
}

impl StaticTokenProvider {
    /// A provider that starts out authenticated.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }

    /// A provider with no authenticated user.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Swap the current token; `None` simulates a sign-out.
    pub fn set_token(&self, token: Option<String>) {
        *self.token.lock() = token;
    }
}

#[async_trait]
impl AccessTokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Option<String> {
        self.token.lock().clone()
    }
}
