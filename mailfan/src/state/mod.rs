//! Application state management
//!
//! One [`AppState`] value is built at startup and cloned into every
//! handler. All fields are `Arc`-shared, so clones are cheap and every
//! clone observes the same credential store.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::config::{MailBackend, MailfanConfig};
use crate::dispatch::Dispatcher;
use crate::identity::{IdentityBroker, OAuthBroker};
use crate::mail::{ConsoleMailer, GraphMailer, Mailer};
use crate::session::CredentialStore;

/// Shared application state
///
/// # Example
///
/// ```rust,no_run
/// use mailfan::config::MailfanConfig;
/// use mailfan::state::AppState;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = MailfanConfig::load()?;
/// let state = AppState::new(config)?;
///
/// let app = mailfan::handlers::router(state);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    config: Arc<MailfanConfig>,

    /// Session-keyed credential store
    credentials: Arc<CredentialStore>,

    /// Identity provider broker
    identity: Arc<dyn IdentityBroker>,

    /// Batch dispatch engine
    dispatcher: Arc<Dispatcher>,
}

impl AppState {
    /// Build state from configuration, wiring the configured mail backend
    ///
    /// # Errors
    ///
    /// Returns an error if the identity provider endpoints in the
    /// configuration are not valid URLs.
    pub fn new(config: MailfanConfig) -> anyhow::Result<Self> {
        let mailer: Arc<dyn Mailer> = match config.mail.backend {
            MailBackend::Graph => Arc::new(GraphMailer::new(&config.mail)),
            MailBackend::Console => Arc::new(ConsoleMailer::new()),
        };
        let identity = Arc::new(OAuthBroker::from_config(&config)?);

        Ok(Self::with_collaborators(config, identity, mailer))
    }

    /// Build state with explicit collaborators
    ///
    /// Used by tests to substitute a stub identity broker or a capturing
    /// mailer for the real ones.
    #[must_use]
    pub fn with_collaborators(
        config: MailfanConfig,
        identity: Arc<dyn IdentityBroker>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(mailer).with_pacing(config.dispatch.pacing()));

        Self {
            config: Arc::new(config),
            credentials: Arc::new(CredentialStore::new()),
            identity,
            dispatcher,
        }
    }

    /// Application configuration
    #[must_use]
    pub fn config(&self) -> &MailfanConfig {
        &self.config
    }

    /// Session-keyed credential store
    #[must_use]
    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Identity provider broker
    #[must_use]
    pub fn identity(&self) -> &dyn IdentityBroker {
        self.identity.as_ref()
    }

    /// Batch dispatch engine
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Spawn the background task that purges expired credentials
    ///
    /// Runs until the returned handle is aborted or the runtime shuts
    /// down. Expired records are already unreadable before the sweep;
    /// the sweeper only reclaims their memory.
    pub fn start_expiry_sweeper(&self) -> JoinHandle<()> {
        let store = Arc::clone(&self.credentials);
        // interval() panics on a zero period
        let period = Duration::from_secs(self.config.session.sweep_interval_secs.max(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let purged = store.purge_expired();
                if purged > 0 {
                    tracing::debug!(purged, "purged expired sessions");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::CredentialBundle;

    fn console_state() -> AppState {
        let mut config = MailfanConfig::default();
        config.mail.backend = MailBackend::Console;
        config.session.sweep_interval_secs = 1;
        AppState::new(config).unwrap()
    }

    #[test]
    fn test_clones_share_the_credential_store() {
        let state = console_state();
        let clone = state.clone();

        let handle = state
            .credentials()
            .put(CredentialBundle::new(b"creds".to_vec()), chrono::Duration::hours(1));

        assert!(clone.credentials().get(&handle).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_reclaims_expired_records() {
        let state = console_state();
        state
            .credentials()
            .put(CredentialBundle::new(b"old".to_vec()), chrono::Duration::seconds(-1));
        assert_eq!(state.credentials().len(), 1);

        let sweeper = state.start_expiry_sweeper();
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(state.credentials().len(), 0);
        sweeper.abort();
    }
}
