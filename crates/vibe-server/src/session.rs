//! In-memory session store — cookie id → Spotify tokens.
//!
//! Sessions live only for the process lifetime; there is no persistence.
//! Pending OAuth `state` nonces are tracked here too so the callback can
//! reject responses it never asked for.

use std::collections::HashMap;

use rand::distributions::Alphanumeric;
use rand::Rng;
use tokio::sync::RwLock;

use crate::spotify::TokenResponse;

/// Seconds before actual expiry at which a token counts as expired.
const EXPIRY_LEEWAY_SECS: i64 = 60;

/// How long an issued OAuth state nonce stays valid.
const STATE_TTL_SECS: i64 = 600;

pub const SESSION_COOKIE: &str = "vibe_session";

#[derive(Debug, Clone)]
pub struct TokenData {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
}

impl TokenData {
    /// Build from a token endpoint response.  Refresh grants may omit the
    /// refresh token, in which case the previous one is kept.
    pub fn from_response(resp: TokenResponse, prev_refresh: Option<&str>, now: i64) -> Self {
        let refresh_token = resp
            .refresh_token
            .or_else(|| prev_refresh.map(String::from))
            .unwrap_or_default();
        Self {
            access_token: resp.access_token,
            refresh_token,
            expires_at: now + resp.expires_in,
        }
    }

    /// Expired, or expiring within the leeway window.
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at - EXPIRY_LEEWAY_SECS
    }
}

#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, TokenData>>,
    pending_states: RwLock<HashMap<String, i64>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self, tokens: TokenData) -> String {
        let id = random_token(32);
        self.sessions.write().await.insert(id.clone(), tokens);
        id
    }

    pub async fn get(&self, id: &str) -> Option<TokenData> {
        self.sessions.read().await.get(id).cloned()
    }

    pub async fn update(&self, id: &str, tokens: TokenData) {
        self.sessions.write().await.insert(id.to_string(), tokens);
    }

    pub async fn remove(&self, id: &str) {
        self.sessions.write().await.remove(id);
    }

    /// Issue a fresh OAuth state nonce for a login attempt.
    pub async fn issue_state(&self, now: i64) -> String {
        let state = random_token(32);
        let mut pending = self.pending_states.write().await;
        pending.retain(|_, issued| now - *issued < STATE_TTL_SECS);
        pending.insert(state.clone(), now);
        state
    }

    /// Consume a state nonce.  Returns false for unknown or expired states.
    pub async fn take_state(&self, state: &str, now: i64) -> bool {
        match self.pending_states.write().await.remove(state) {
            Some(issued) => now - issued < STATE_TTL_SECS,
            None => false,
        }
    }
}

fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
