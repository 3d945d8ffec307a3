//! Identity provider integration
//!
//! Login runs the authorization-code flow against the hosted identity
//! provider and serializes the resulting refresh-capable grant into an
//! opaque [`CredentialBundle`] for the credential cache. Every dispatch
//! re-derives a short-lived bearer [`AccessToken`] from the stored bundle
//! before any mail is sent.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;

pub mod broker;
mod http;

pub use broker::OAuthBroker;

/// Opaque serialized credential material
///
/// Producers and consumers agree on the encoding; everything in between
/// (the cache, the cookie boundary) treats it as bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialBundle(Vec<u8>);

impl CredentialBundle {
    /// Wrap raw bundle bytes
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// The raw bytes of the bundle
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Short-lived bearer token for the mail API
#[derive(Debug, Clone)]
pub struct AccessToken {
    /// The bearer secret presented to the mail API
    pub secret: String,
    /// When the provider said the token stops working, if it said at all
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// Create a token from its secret and optional expiry
    #[must_use]
    pub fn new(secret: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            secret: secret.into(),
            expires_at,
        }
    }

    /// Check whether the token is past its advertised expiry
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }
}

/// Errors from the identity provider boundary
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The authorization code could not be exchanged for a grant
    #[error("Authorization code exchange failed: {0}")]
    ExchangeFailed(String),

    /// The provider issued no refresh-capable grant
    #[error("Provider response carried no refresh token; is offline access in scope?")]
    MissingRefreshGrant,

    /// Silent token acquisition from the stored grant failed
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    /// The stored credential bundle could not be decoded
    #[error("Credential bundle is malformed: {0}")]
    MalformedBundle(#[from] serde_json::Error),

    /// A provider endpoint URL was invalid
    #[error("Invalid identity endpoint: {0}")]
    InvalidEndpoint(String),
}

impl AuthError {
    /// Create an exchange failure from any stringly error
    pub fn exchange<T: Into<String>>(msg: T) -> Self {
        Self::ExchangeFailed(msg.into())
    }

    /// Create a refresh failure from any stringly error
    pub fn refresh<T: Into<String>>(msg: T) -> Self {
        Self::RefreshFailed(msg.into())
    }

    /// Create an endpoint error from any stringly error
    pub fn endpoint<T: Into<String>>(msg: T) -> Self {
        Self::InvalidEndpoint(msg.into())
    }
}

/// Generate the CSRF state token for a login roundtrip
///
/// 32 random bytes, hex encoded. The token rides in a short-lived cookie
/// and must match the `state` the provider echoes back to the callback.
#[must_use]
pub fn state_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    hex::encode(bytes)
}

/// Abstraction over the hosted identity provider
///
/// The server-side flow needs exactly four things from the provider: a URL
/// to send the browser to, a code-for-grant exchange, silent token
/// acquisition from a stored grant, and a logout URL.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityBroker: Send + Sync {
    /// Provider URL the browser is redirected to for login
    fn authorization_url(&self, state: &str) -> String;

    /// Exchange an authorization code for a storable credential bundle
    ///
    /// # Errors
    ///
    /// Returns an error if the provider rejects the code or issues no
    /// refresh-capable grant.
    async fn exchange_code(&self, code: &str) -> Result<CredentialBundle, AuthError>;

    /// Derive a fresh bearer token from a stored bundle
    ///
    /// Called once per dispatch, before any send. The bundle itself is not
    /// modified; it stays valid for the life of the session record.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundle cannot be decoded or the provider
    /// refuses the refresh.
    async fn acquire_token(&self, bundle: &CredentialBundle) -> Result<AccessToken, AuthError>;

    /// Provider URL that ends the hosted session and returns to the app
    fn logout_url(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_state_token_is_hex_of_32_bytes() {
        let token = state_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_state_tokens_are_unique() {
        assert_ne!(state_token(), state_token());
    }

    #[test]
    fn test_bundle_exposes_bytes() {
        let bundle = CredentialBundle::new(vec![1, 2, 3]);
        assert_eq!(bundle.as_bytes(), &[1, 2, 3]);
    }

    #[test]
    fn test_token_without_expiry_never_expires() {
        let token = AccessToken::new("secret", None);
        assert!(!token.is_expired());
    }

    #[test]
    fn test_token_expiry() {
        let expired = AccessToken::new("secret", Some(Utc::now() - Duration::seconds(5)));
        assert!(expired.is_expired());

        let live = AccessToken::new("secret", Some(Utc::now() + Duration::hours(1)));
        assert!(!live.is_expired());
    }
}
