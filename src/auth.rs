use std::sync::RwLock;

use chrono::{DateTime, Utc};
use log::{debug, error};
use thiserror::Error;

/// A bearer token and the instant it stops being accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues credentials against whatever identity service fronts the store.
pub trait CredentialProvider: Send + Sync {
    fn authenticate(&self) -> anyhow::Result<Credential>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("failed to refresh credentials")]
    Refresh(#[source] anyhow::Error),
    #[error("store rejected a freshly issued token")]
    Rejected,
    #[error("failed to get credential lock")]
    LockFailure,
}

#[derive(Default)]
struct TokenState {
    credential: Option<Credential>,
    // Bumped on every refresh so callers can tell whether someone else
    // already handled the expiry they observed.
    generation: u64,
}

impl TokenState {
    fn valid_token(&self, now: DateTime<Utc>) -> Option<&str> {
        match &self.credential {
            Some(c) if !c.token.is_empty() && now < c.expires_at => Some(&c.token),
            _ => None,
        }
    }
}

/// Process-wide token cache. Refreshes happen under the write lock, and
/// callers that saw the same stale token share a single refresh.
pub struct CredentialCache {
    provider: Box<dyn CredentialProvider>,
    clock: Box<dyn Clock>,
    state: RwLock<TokenState>,
}

impl CredentialCache {
    pub fn new(provider: Box<dyn CredentialProvider>) -> Self {
        Self::with_clock(provider, Box::new(SystemClock))
    }

    pub fn with_clock(provider: Box<dyn CredentialProvider>, clock: Box<dyn Clock>) -> Self {
        Self {
            provider,
            clock,
            state: RwLock::new(TokenState::default()),
        }
    }

    /// Returns a token that is valid now, refreshing it first if needed.
    pub fn ensure_valid(&self) -> Result<String, AuthError> {
        let observed = match self.state.read() {
            Ok(state) => {
                if let Some(token) = state.valid_token(self.clock.now()) {
                    return Ok(token.to_string());
                }
                state.generation
            }
            Err(_) => return Err(AuthError::LockFailure),
        };

        match self.state.write() {
            Ok(mut state) => {
                if state.generation != observed {
                    if let Some(c) = &state.credential {
                        // Refreshed by another caller while we waited.
                        return Ok(c.token.clone());
                    }
                }
                if let Some(token) = state.valid_token(self.clock.now()) {
                    return Ok(token.to_string());
                }
                debug!("refreshing store credentials");
                let credential = self.provider.authenticate().map_err(|e| {
                    error!("failed to refresh store credentials: {}", e);
                    AuthError::Refresh(e)
                })?;
                let token = credential.token.clone();
                state.credential = Some(credential);
                state.generation += 1;
                Ok(token)
            }
            Err(_) => Err(AuthError::LockFailure),
        }
    }

    /// Drops the cached token after the store rejected `rejected`. A token
    /// that has already been replaced is left alone.
    pub fn invalidate(&self, rejected: &str) -> Result<(), AuthError> {
        match self.state.write() {
            Ok(mut state) => {
                if matches!(&state.credential, Some(c) if c.token == rejected) {
                    state.credential = None;
                }
                Ok(())
            }
            Err(_) => Err(AuthError::LockFailure),
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        match self.state.read() {
            Ok(state) => state.credential.as_ref().map(|c| c.expires_at),
            Err(_) => None,
        }
    }
}
