//! Configuration management for mailfan
//!
//! XDG-compliant configuration loaded from multiple sources with clear
//! precedence:
//!
//! 1. Environment variables (highest priority, `MAILFAN_` prefix)
//! 2. `./config.toml` (development)
//! 3. `~/.config/mailfan/config.toml` (user config, XDG)
//! 4. `/etc/mailfan/config.toml` (system config)
//! 5. Hardcoded defaults (fallback)
//!
//! # Example Configuration
//!
//! ```toml
//! # config.toml
//! [service]
//! name = "mailfan"
//! port = 8080
//! public_base_url = "https://mail.example.com"
//!
//! [identity]
//! client_id = "00000000-0000-0000-0000-000000000000"
//! client_secret = "secret"
//! authority = "https://login.microsoftonline.com/common"
//!
//! [session]
//! ttl_secs = 86400
//! secure_cookies = true
//!
//! [dispatch]
//! pacing_ms = 1000
//!
//! [mail]
//! backend = "graph"
//! save_to_sent_items = true
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use mailfan::config::MailfanConfig;
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = MailfanConfig::load()?;
//!
//! let addr = config.service.bind_addr();
//! let pacing = config.dispatch.pacing();
//! # Ok(())
//! # }
//! ```

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::session::SameSite;

/// HTTP service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name, used for config paths and log fields
    pub name: String,

    /// Address to bind the listener to
    pub host: String,

    /// Port to bind the listener to
    pub port: u16,

    /// Externally visible base URL, used to build OAuth redirect URLs
    pub public_base_url: String,
}

impl ServiceSettings {
    /// Socket address string for the HTTP listener
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "mailfan".to_string(),
            host: "127.0.0.1".to_string(),
            port: 8080,
            public_base_url: "http://127.0.0.1:8080".to_string(),
        }
    }
}

/// Identity provider (OAuth2) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentitySettings {
    /// OAuth2 application (client) id
    pub client_id: String,

    /// OAuth2 client secret
    pub client_secret: String,

    /// Identity provider authority, e.g. a Microsoft tenant endpoint
    pub authority: String,

    /// Scopes requested during authorization
    pub scopes: Vec<String>,

    /// Path on this service that receives the authorization callback
    pub redirect_path: String,

    /// Where the provider sends the browser after sign-out.
    /// Defaults to the service's public base URL.
    pub post_logout_redirect: Option<String>,
}

impl IdentitySettings {
    /// Authorization endpoint derived from the authority
    #[must_use]
    pub fn authorize_endpoint(&self) -> String {
        format!("{}/oauth2/v2.0/authorize", self.authority_base())
    }

    /// Token endpoint derived from the authority
    #[must_use]
    pub fn token_endpoint(&self) -> String {
        format!("{}/oauth2/v2.0/token", self.authority_base())
    }

    /// Sign-out endpoint derived from the authority
    #[must_use]
    pub fn logout_endpoint(&self) -> String {
        format!("{}/oauth2/v2.0/logout", self.authority_base())
    }

    fn authority_base(&self) -> &str {
        self.authority.trim_end_matches('/')
    }
}

impl Default for IdentitySettings {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            authority: "https://login.microsoftonline.com/common".to_string(),
            scopes: vec![
                "User.Read".to_string(),
                "Mail.Send".to_string(),
                "offline_access".to_string(),
            ],
            redirect_path: "/api/auth/callback".to_string(),
            post_logout_redirect: None,
        }
    }
}

/// Session and cookie configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Name of the session cookie
    pub cookie_name: String,

    /// Name of the short-lived cookie carrying the OAuth state token
    pub state_cookie_name: String,

    /// Session lifetime in seconds
    pub ttl_secs: u64,

    /// Mark cookies `Secure` (HTTPS only)
    pub secure_cookies: bool,

    /// Cookie SameSite policy
    pub same_site: SameSite,

    /// How often the background sweeper purges expired sessions, in seconds
    pub sweep_interval_secs: u64,
}

impl SessionSettings {
    /// Session lifetime as a duration
    #[must_use]
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.ttl_secs).unwrap_or(i64::MAX))
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            cookie_name: "mailfan_session".to_string(),
            state_cookie_name: "mailfan_oauth_state".to_string(),
            ttl_secs: 86400, // 24 hours
            secure_cookies: !cfg!(debug_assertions),
            same_site: SameSite::Lax,
            sweep_interval_secs: 300,
        }
    }
}

/// Batch dispatch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchSettings {
    /// Delay between consecutive send attempts, in milliseconds
    pub pacing_ms: u64,
}

impl DispatchSettings {
    /// Pacing delay as a duration
    #[must_use]
    pub fn pacing(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.pacing_ms)
    }
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self { pacing_ms: 1000 }
    }
}

/// Which mail backend delivers messages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailBackend {
    /// Deliver through the Microsoft Graph API
    #[default]
    Graph,
    /// Log messages to the console instead of sending (development)
    Console,
}

/// Mail delivery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailSettings {
    /// Active delivery backend
    pub backend: MailBackend,

    /// Base URL of the mail API
    pub api_base_url: String,

    /// Keep a copy of sent messages in the sender's Sent Items folder
    pub save_to_sent_items: bool,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            backend: MailBackend::Graph,
            api_base_url: "https://graph.microsoft.com/v1.0".to_string(),
            save_to_sent_items: true,
        }
    }
}

/// Complete mailfan configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MailfanConfig {
    /// HTTP service settings
    #[serde(default)]
    pub service: ServiceSettings,

    /// Identity provider settings
    #[serde(default)]
    pub identity: IdentitySettings,

    /// Session and cookie settings
    #[serde(default)]
    pub session: SessionSettings,

    /// Batch dispatch settings
    #[serde(default)]
    pub dispatch: DispatchSettings,

    /// Mail delivery settings
    #[serde(default)]
    pub mail: MailSettings,
}

impl MailfanConfig {
    /// Load configuration from XDG-compliant locations
    ///
    /// Merges sources with precedence:
    /// 1. Environment variables (`MAILFAN_*`, use `__` for nesting)
    /// 2. `./config.toml`
    /// 3. `~/.config/mailfan/config.toml`
    /// 4. `/etc/mailfan/config.toml`
    /// 5. Defaults
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Default configuration cannot be serialized to TOML
    /// - A configuration file cannot be read or parsed
    /// - Configuration values fail validation or type conversion
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use mailfan::config::MailfanConfig;
    ///
    /// # fn example() -> anyhow::Result<()> {
    /// let config = MailfanConfig::load()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn load() -> anyhow::Result<Self> {
        let mut figment = Figment::new()
            // 5. Start with defaults (lowest priority)
            .merge(Toml::string(&toml::to_string(&Self::default())?));

        // 4. System config: /etc/mailfan/config.toml
        let system_config = PathBuf::from("/etc/mailfan/config.toml");
        if system_config.exists() {
            figment = figment.merge(Toml::file(&system_config));
        }

        // 3. User config: ~/.config/mailfan/config.toml
        let user_config = Self::recommended_path();
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }

        // 2. Local config: ./config.toml
        let local_config = PathBuf::from("./config.toml");
        if local_config.exists() {
            figment = figment.merge(Toml::file(&local_config));
        }

        // 1. Environment variables (highest priority, double underscore for nesting)
        figment = figment.merge(Env::prefixed("MAILFAN_").split("__").lowercase(true));

        let config = figment.extract()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Default configuration cannot be serialized to TOML
    /// - The file contains invalid TOML syntax
    /// - Configuration values fail validation or type conversion
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use mailfan::config::MailfanConfig;
    ///
    /// # fn example() -> anyhow::Result<()> {
    /// let config = MailfanConfig::load_from("./config/production.toml")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn load_from(path: &str) -> anyhow::Result<Self> {
        let config = Figment::new()
            .merge(Toml::string(&toml::to_string(&Self::default())?))
            .merge(Toml::file(path))
            .merge(Env::prefixed("MAILFAN_").split("__").lowercase(true))
            .extract()?;

        Ok(config)
    }

    /// Get the recommended XDG config path
    ///
    /// # Example
    ///
    /// ```rust
    /// use mailfan::config::MailfanConfig;
    ///
    /// let path = MailfanConfig::recommended_path();
    /// // Returns: ~/.config/mailfan/config.toml
    /// ```
    #[must_use]
    pub fn recommended_path() -> PathBuf {
        dirs::config_dir().map_or_else(
            || PathBuf::from("./config.toml"),
            |config_dir| config_dir.join("mailfan").join("config.toml"),
        )
    }

    /// Full OAuth redirect URL, built from the public base URL and the
    /// configured callback path
    #[must_use]
    pub fn oauth_redirect_url(&self) -> String {
        format!(
            "{}{}",
            self.service.public_base_url.trim_end_matches('/'),
            self.identity.redirect_path
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MailfanConfig::default();
        assert_eq!(config.service.name, "mailfan");
        assert_eq!(config.service.bind_addr(), "127.0.0.1:8080");
        assert_eq!(config.session.ttl_secs, 86400);
        assert_eq!(config.dispatch.pacing_ms, 1000);
        assert_eq!(config.mail.backend, MailBackend::Graph);
        assert!(config.mail.save_to_sent_items);
    }

    #[test]
    fn test_identity_defaults() {
        let identity = IdentitySettings::default();
        assert!(identity.scopes.contains(&"Mail.Send".to_string()));
        assert!(identity.scopes.contains(&"offline_access".to_string()));
        assert_eq!(
            identity.authorize_endpoint(),
            "https://login.microsoftonline.com/common/oauth2/v2.0/authorize"
        );
        assert_eq!(
            identity.token_endpoint(),
            "https://login.microsoftonline.com/common/oauth2/v2.0/token"
        );
    }

    #[test]
    fn test_authority_trailing_slash_is_trimmed() {
        let identity = IdentitySettings {
            authority: "https://login.microsoftonline.com/common/".to_string(),
            ..IdentitySettings::default()
        };
        assert_eq!(
            identity.logout_endpoint(),
            "https://login.microsoftonline.com/common/oauth2/v2.0/logout"
        );
    }

    #[test]
    fn test_session_defaults() {
        let session = SessionSettings::default();
        assert_eq!(session.cookie_name, "mailfan_session");
        assert_eq!(session.state_cookie_name, "mailfan_oauth_state");
        assert_eq!(session.ttl(), chrono::Duration::hours(24));

        // secure_cookies should be true in release, false in debug
        #[cfg(debug_assertions)]
        assert!(!session.secure_cookies);

        #[cfg(not(debug_assertions))]
        assert!(session.secure_cookies);
    }

    #[test]
    fn test_oauth_redirect_url() {
        let mut config = MailfanConfig::default();
        config.service.public_base_url = "https://mail.example.com/".to_string();
        assert_eq!(
            config.oauth_redirect_url(),
            "https://mail.example.com/api/auth/callback"
        );
    }

    #[test]
    fn test_load_from_merges_file_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
            [service]
            port = 3000

            [identity]
            client_id = "from-file"

            [mail]
            backend = "console"
            "#,
        )
        .unwrap();

        let config = MailfanConfig::load_from(path.to_str().unwrap()).unwrap();
        assert_eq!(config.service.port, 3000);
        assert_eq!(config.identity.client_id, "from-file");
        assert_eq!(config.mail.backend, MailBackend::Console);
        // untouched sections keep their defaults
        assert_eq!(config.service.host, "127.0.0.1");
        assert_eq!(config.dispatch.pacing_ms, 1000);
    }
}
