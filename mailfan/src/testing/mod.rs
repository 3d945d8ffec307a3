//! Testing utilities
//!
//! Deterministic stand-ins for the identity and mail collaborators, so
//! integration tests can drive the full HTTP surface without touching the
//! network:
//! - [`CapturingMailer`] records outbound messages instead of sending them
//! - [`StubIdentity`] hands out canned credentials and tokens
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mailfan::config::MailfanConfig;
//! use mailfan::state::AppState;
//! use mailfan::testing::{CapturingMailer, StubIdentity};
//!
//! let mailer = Arc::new(CapturingMailer::new());
//! let state = AppState::with_collaborators(
//!     MailfanConfig::default(),
//!     Arc::new(StubIdentity::new()),
//!     Arc::clone(&mailer) as Arc<_>,
//! );
//! let app = mailfan::handlers::router(state);
//! ```

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::identity::{AccessToken, AuthError, CredentialBundle, IdentityBroker};
use crate::mail::{MailError, Mailer, OutboundMessage};

/// Mailer that records every message instead of sending it
///
/// Messages still run through [`OutboundMessage::validate`], so a draft
/// that the real backend would refuse is refused here too. Addresses
/// registered with [`reject_address`](Self::reject_address) fail with a
/// delivery error, which lets tests exercise partial-failure reporting.
#[derive(Debug, Default)]
pub struct CapturingMailer {
    outbox: Mutex<Vec<OutboundMessage>>,
    rejected: Mutex<HashSet<String>>,
    attempts: AtomicUsize,
}

impl CapturingMailer {
    /// Empty capturing mailer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every delivery addressed to `address` fail
    pub fn reject_address(&self, address: impl Into<String>) {
        self.rejected.lock().insert(address.into());
    }

    /// How many sends were attempted, rejected ones included
    #[must_use]
    pub fn attempt_count(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// How many messages were recorded
    #[must_use]
    pub fn sent_count(&self) -> usize {
        self.outbox.lock().len()
    }

    /// Snapshot of every recorded message, in send order
    #[must_use]
    pub fn sent_messages(&self) -> Vec<OutboundMessage> {
        self.outbox.lock().clone()
    }

    /// Whether any recorded message was addressed to `address`
    #[must_use]
    pub fn was_sent_to(&self, address: &str) -> bool {
        self.outbox
            .lock()
            .iter()
            .any(|message| message.to.iter().any(|to| to == address))
    }

    /// The most recently recorded message
    #[must_use]
    pub fn last_sent(&self) -> Option<OutboundMessage> {
        self.outbox.lock().last().cloned()
    }
}

#[async_trait]
impl Mailer for CapturingMailer {
    async fn send(
        &self,
        _token: &AccessToken,
        message: &OutboundMessage,
    ) -> Result<(), MailError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        message.validate()?;

        let to = message.to.first().cloned().unwrap_or_default();
        if self.rejected.lock().contains(&to) {
            return Err(MailError::api(format!("delivery to {to} rejected")));
        }

        self.outbox.lock().push(message.clone());
        Ok(())
    }
}

/// Identity broker with canned responses
///
/// Exchanges any non-empty code for a credential bundle and mints the
/// same access token for every acquisition. Configure it with
/// [`with_refresh_failure`](Self::with_refresh_failure) to simulate a
/// revoked or expired grant.
#[derive(Debug, Clone)]
pub struct StubIdentity {
    token_secret: String,
    fail_refresh: bool,
}

impl StubIdentity {
    /// Broker that always succeeds
    #[must_use]
    pub fn new() -> Self {
        Self {
            token_secret: "stub-access-token".to_string(),
            fail_refresh: false,
        }
    }

    /// Broker whose token acquisition always fails
    #[must_use]
    pub fn with_refresh_failure(mut self) -> Self {
        self.fail_refresh = true;
        self
    }
}

impl Default for StubIdentity {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityBroker for StubIdentity {
    fn authorization_url(&self, state: &str) -> String {
        format!("https://identity.invalid/authorize?state={state}")
    }

    async fn exchange_code(&self, code: &str) -> Result<CredentialBundle, AuthError> {
        if code.is_empty() {
            return Err(AuthError::exchange("empty authorization code"));
        }
        Ok(CredentialBundle::new(
            format!("bundle-for-{code}").into_bytes(),
        ))
    }

    async fn acquire_token(&self, _bundle: &CredentialBundle) -> Result<AccessToken, AuthError> {
        if self.fail_refresh {
            return Err(AuthError::refresh("refresh grant revoked"));
        }
        Ok(AccessToken::new(self.token_secret.clone(), None))
    }

    fn logout_url(&self) -> String {
        "https://identity.invalid/logout".to_string()
    }
}
