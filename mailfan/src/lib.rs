//! mailfan: personalized batch mail dispatch over hosted identity and mail APIs
//!
//! mailfan takes one draft (subject, HTML body, attachments) and a recipient
//! list, substitutes `${field}` merge tokens per recipient, wraps each body in
//! an Outlook-compatible document frame, and delivers the copies one by one
//! through the Microsoft Graph API with pacing between sends. Sign-in is
//! delegated to an OAuth2 identity provider; the browser only ever holds an
//! opaque session cookie while credentials stay server-side.
//!
//! The crate is organized by concern:
//! - [`session`]: opaque session handles and the in-memory credential store
//! - [`identity`]: OAuth2 broker, credential bundles, access tokens
//! - [`compose`]: merge-field rendering and Outlook HTML framing
//! - [`mail`]: attachment admission, message building, delivery backends
//! - [`dispatch`]: the per-recipient fan-out engine and its reports
//! - [`handlers`]: the HTTP surface tying it all together
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use mailfan::config::MailfanConfig;
//! use mailfan::state::AppState;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     mailfan::observability::init()?;
//!
//!     let config = MailfanConfig::load()?;
//!     let addr = config.service.bind_addr();
//!
//!     let state = AppState::new(config)?;
//!     state.start_expiry_sweeper();
//!
//!     let app = mailfan::handlers::router(state);
//!     let listener = tokio::net::TcpListener::bind(&addr).await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod compose;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod mail;
pub mod observability;
pub mod session;
pub mod state;

// Public so integration tests and downstream consumers can wire stub
// collaborators into AppState
pub mod testing;

pub mod prelude {
    //! Convenience re-exports for common types and traits
    //!
    //! # Examples
    //!
    //! ```rust
    //! use mailfan::prelude::*;
    //! ```

    // Configuration
    pub use crate::config::MailfanConfig;

    // Dispatch engine
    pub use crate::dispatch::{
        DispatchReport, DispatchRequest, DispatchSummary, Dispatcher, Recipient,
    };

    // Error type
    pub use crate::error::MailfanError;

    // Identity
    pub use crate::identity::{AccessToken, CredentialBundle, IdentityBroker};

    // Mail
    pub use crate::mail::{Attachment, Mailer, OutboundMessage};

    // Sessions
    pub use crate::session::{CredentialStore, SessionHandle};

    // Application state and router
    pub use crate::handlers::router;
    pub use crate::state::AppState;

    // Re-export key dependencies
    pub use axum;

    // Convenience for JSON responses
    pub use serde_json::json;
}
