//! OAuth2 authorization-code broker
//!
//! Implements [`IdentityBroker`] over the `oauth2` crate: the browser is
//! sent to the provider's authorize endpoint, the callback code is
//! exchanged for a refresh-capable grant, and the grant (not any access
//! token) is what gets serialized into the cached bundle. Silent
//! acquisition replays the refresh grant for a fresh bearer token.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use oauth2::basic::BasicClient;
use oauth2::url::Url;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    RedirectUrl, RefreshToken, Scope, TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};

use crate::config::MailfanConfig;

use super::http::send_token_request;
use super::{AccessToken, AuthError, CredentialBundle, IdentityBroker};

/// OAuth2 client with authorize and token endpoints configured
type ConfiguredClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// What actually lives inside a [`CredentialBundle`]
///
/// Only this module knows the encoding. The refresh grant outlives any
/// access token, so it is the only credential worth storing.
#[derive(Debug, Serialize, Deserialize)]
struct DelegatedCredential {
    refresh_token: String,
    obtained_at: DateTime<Utc>,
    scopes: Vec<String>,
}

impl DelegatedCredential {
    fn encode(&self) -> Result<CredentialBundle, AuthError> {
        Ok(CredentialBundle::new(serde_json::to_vec(self)?))
    }

    fn decode(bundle: &CredentialBundle) -> Result<Self, AuthError> {
        Ok(serde_json::from_slice(bundle.as_bytes())?)
    }
}

/// [`IdentityBroker`] backed by a hosted OAuth2 provider
pub struct OAuthBroker {
    client: ConfiguredClient,
    scopes: Vec<String>,
    logout_endpoint: Url,
    post_logout_redirect: String,
}

impl OAuthBroker {
    /// Build a broker from the service configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configured endpoint is not a valid URL.
    pub fn from_config(config: &MailfanConfig) -> Result<Self, AuthError> {
        let identity = &config.identity;

        let client = BasicClient::new(ClientId::new(identity.client_id.clone()))
            .set_client_secret(ClientSecret::new(identity.client_secret.clone()))
            .set_auth_uri(
                AuthUrl::new(identity.authorize_endpoint())
                    .map_err(|e| AuthError::endpoint(e.to_string()))?,
            )
            .set_token_uri(
                TokenUrl::new(identity.token_endpoint())
                    .map_err(|e| AuthError::endpoint(e.to_string()))?,
            )
            .set_redirect_uri(
                RedirectUrl::new(config.oauth_redirect_url())
                    .map_err(|e| AuthError::endpoint(e.to_string()))?,
            );

        let logout_endpoint = Url::parse(&identity.logout_endpoint())
            .map_err(|e| AuthError::endpoint(e.to_string()))?;

        let post_logout_redirect = identity
            .post_logout_redirect
            .clone()
            .unwrap_or_else(|| config.service.public_base_url.clone());

        Ok(Self {
            client,
            scopes: identity.scopes.clone(),
            logout_endpoint,
            post_logout_redirect,
        })
    }
}

#[async_trait]
impl IdentityBroker for OAuthBroker {
    fn authorization_url(&self, state: &str) -> String {
        let state = CsrfToken::new(state.to_string());
        let (url, _) = self
            .client
            .authorize_url(|| state)
            .add_scopes(self.scopes.iter().map(|s| Scope::new(s.clone())))
            .url();
        url.to_string()
    }

    async fn exchange_code(&self, code: &str) -> Result<CredentialBundle, AuthError> {
        tracing::debug!("exchanging authorization code for delegated grant");
        let response = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&send_token_request)
            .await
            .map_err(|e| AuthError::exchange(e.to_string()))?;

        let refresh_token = response
            .refresh_token()
            .ok_or(AuthError::MissingRefreshGrant)?;

        DelegatedCredential {
            refresh_token: refresh_token.secret().clone(),
            obtained_at: Utc::now(),
            scopes: self.scopes.clone(),
        }
        .encode()
    }

    async fn acquire_token(&self, bundle: &CredentialBundle) -> Result<AccessToken, AuthError> {
        let credential = DelegatedCredential::decode(bundle)?;
        tracing::debug!("acquiring bearer token from stored grant");

        let refresh = RefreshToken::new(credential.refresh_token);
        let response = self
            .client
            .exchange_refresh_token(&refresh)
            .add_scopes(credential.scopes.iter().map(|s| Scope::new(s.clone())))
            .request_async(&send_token_request)
            .await
            .map_err(|e| AuthError::refresh(e.to_string()))?;

        let expires_at = response
            .expires_in()
            .and_then(|d| chrono::Duration::from_std(d).ok())
            .map(|d| Utc::now() + d);

        Ok(AccessToken::new(
            response.access_token().secret().clone(),
            expires_at,
        ))
    }

    fn logout_url(&self) -> String {
        let mut url = self.logout_endpoint.clone();
        url.query_pairs_mut()
            .append_pair("post_logout_redirect_uri", &self.post_logout_redirect);
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> MailfanConfig {
        let mut config = MailfanConfig::default();
        config.identity.client_id = "test-client".to_string();
        config.identity.client_secret = "test-secret".to_string();
        config
    }

    #[test]
    fn test_broker_from_default_config() {
        assert!(OAuthBroker::from_config(&test_config()).is_ok());
    }

    #[test]
    fn test_broker_rejects_bad_authority() {
        let mut config = test_config();
        config.identity.authority = "not a url".to_string();
        assert!(matches!(
            OAuthBroker::from_config(&config),
            Err(AuthError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn test_authorization_url_carries_flow_parameters() {
        let broker = OAuthBroker::from_config(&test_config()).unwrap();
        let url = broker.authorization_url("abc123");

        assert!(url.starts_with("https://login.microsoftonline.com/common/oauth2/v2.0/authorize"));
        assert!(url.contains("client_id=test-client"));
        assert!(url.contains("state=abc123"));
        assert!(url.contains("Mail.Send"));
        assert!(url.contains("offline_access"));
        assert!(url.contains("redirect_uri="));
    }

    #[test]
    fn test_logout_url_encodes_return_target() {
        let broker = OAuthBroker::from_config(&test_config()).unwrap();
        let url = broker.logout_url();

        assert!(url.starts_with("https://login.microsoftonline.com/common/oauth2/v2.0/logout"));
        assert!(url.contains("post_logout_redirect_uri=http%3A%2F%2F127.0.0.1%3A8080"));
    }

    #[test]
    fn test_credential_roundtrip() {
        let credential = DelegatedCredential {
            refresh_token: "0.AXoA-refresh".to_string(),
            obtained_at: Utc::now(),
            scopes: vec!["Mail.Send".to_string()],
        };
        let bundle = credential.encode().unwrap();
        let decoded = DelegatedCredential::decode(&bundle).unwrap();
        assert_eq!(decoded.refresh_token, "0.AXoA-refresh");
        assert_eq!(decoded.scopes, vec!["Mail.Send".to_string()]);
    }

    #[test]
    fn test_malformed_bundle_is_an_auth_error() {
        let bundle = CredentialBundle::new(b"definitely not json".to_vec());
        assert!(matches!(
            DelegatedCredential::decode(&bundle),
            Err(AuthError::MalformedBundle(_))
        ));
    }
}
