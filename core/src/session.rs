//! Session state and sign-in orchestration
//!
//! The session is an injected value, not a process-wide singleton. Token
//! acquisition lives behind [`TokenProvider`] so the identity stack (MSAL,
//! a broker, an environment shim in tests and the CLI) stays outside this
//! crate; the session only sequences silent-then-interactive acquisition
//! and broadcasts state transitions to registered observers.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::SpyglassResult;
use crate::graph::MailboxApi;

/// Sign-in lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No usable credentials
    SignedOut,
    /// Acquisition in progress
    Loading,
    /// Credentials available
    SignedIn,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::SignedOut => write!(f, "signed out"),
            SessionState::Loading => write!(f, "loading"),
            SessionState::SignedIn => write!(f, "signed in"),
        }
    }
}

/// Bearer token handed out by the identity provider
#[derive(Debug, Clone)]
pub struct AccessToken {
    /// Raw bearer secret
    pub secret: String,
    /// Expiry instant, if the provider reports one
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// Create a token without expiry metadata
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            expires_at: None,
        }
    }

    /// Create a token with a known expiry
    pub fn with_expiry(secret: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            secret: secret.into(),
            expires_at: Some(expires_at),
        }
    }

    /// Check if the token is expired
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() >= expires_at,
            None => false,
        }
    }

    /// Check if the token will expire soon (within 5 minutes)
    pub fn expires_soon(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at - Utc::now() <= Duration::minutes(5),
            None => false,
        }
    }
}

/// Token acquisition seam. Implementations are external collaborators.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Try to obtain a token without user interaction.
    async fn acquire_token_silent(&self) -> SpyglassResult<Option<AccessToken>>;

    /// Obtain a token, prompting the user if the provider supports it.
    async fn acquire_token_interactive(&self) -> SpyglassResult<AccessToken>;
}

/// Callback surface for session state transitions
pub trait SessionObserver: Send + Sync {
    /// Called after every state change, in observer registration order.
    fn state_changed(&self, previous: SessionState, current: SessionState);
}

/// Sign-in state plus the authenticated mailbox handle
pub struct Session {
    tokens: Arc<dyn TokenProvider>,
    state: RwLock<SessionState>,
    observers: RwLock<Vec<Arc<dyn SessionObserver>>>,
    client: RwLock<Option<Arc<dyn MailboxApi>>>,
}

impl Session {
    /// Create a signed-out session around a token provider
    pub fn new(tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            tokens,
            state: RwLock::new(SessionState::SignedOut),
            observers: RwLock::new(Vec::new()),
            client: RwLock::new(None),
        }
    }

    /// Register an observer for state transitions
    pub async fn observe(&self, observer: Arc<dyn SessionObserver>) {
        self.observers.write().await.push(observer);
    }

    /// Attach the mailbox handle consumers will use.
    ///
    /// Legal while signed out; the handle authenticates per request, so a
    /// handle without credentials is inert rather than broken.
    pub async fn attach_client(&self, api: Arc<dyn MailboxApi>) {
        *self.client.write().await = Some(api);
    }

    /// Current mailbox handle, if one is attached
    pub async fn client(&self) -> Option<Arc<dyn MailboxApi>> {
        self.client.read().await.clone()
    }

    /// Current sign-in state
    pub async fn state(&self) -> SessionState {
        *self.state.read().await
    }

    /// Sign in: silent acquisition first, interactive as the fallback.
    ///
    /// Already signed in is a no-op. Failure transitions back to
    /// `SignedOut` and returns the acquisition error.
    pub async fn sign_in(&self) -> SpyglassResult<()> {
        if self.state().await == SessionState::SignedIn {
            debug!("sign-in requested but session is already signed in");
            return Ok(());
        }

        self.transition(SessionState::Loading).await;

        let acquired = match self.tokens.acquire_token_silent().await {
            Ok(Some(token)) => Ok(token),
            Ok(None) => self.tokens.acquire_token_interactive().await,
            Err(err) => Err(err),
        };

        match acquired {
            Ok(token) => {
                if token.expires_soon() {
                    debug!("acquired token is close to expiry");
                }
                info!("session signed in");
                self.transition(SessionState::SignedIn).await;
                Ok(())
            }
            Err(err) => {
                self.transition(SessionState::SignedOut).await;
                Err(err)
            }
        }
    }

    /// Drop back to `SignedOut` and notify observers
    pub async fn sign_out(&self) {
        info!("session signed out");
        self.transition(SessionState::SignedOut).await;
    }

    async fn transition(&self, next: SessionState) {
        let previous = {
            let mut state = self.state.write().await;
            let previous = *state;
            *state = next;
            previous
        };
        if previous == next {
            return;
        }
        let observers = self.observers.read().await.clone();
        for observer in &observers {
            observer.state_changed(previous, next);
        }
    }
}
