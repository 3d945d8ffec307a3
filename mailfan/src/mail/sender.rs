//! Mailer trait abstraction
//!
//! This module defines the core `Mailer` trait that all mail backends
//! implement. Batching, ordering, and pacing live in the dispatch engine;
//! a backend only knows how to send one message with one bearer token.

use async_trait::async_trait;

use crate::identity::AccessToken;

use super::{MailError, OutboundMessage};

/// Trait for sending a single message through a mail API
///
/// Implemented by the hosted-API backend and the console backend, and
/// mocked in tests.
///
/// # Examples
///
/// ```rust,no_run
/// use mailfan::identity::AccessToken;
/// use mailfan::mail::{ConsoleMailer, Mailer, OutboundMessage};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mailer = ConsoleMailer::new();
/// let token = AccessToken::new("bearer-secret", None);
///
/// let message = OutboundMessage::new()
///     .to("user@example.com")
///     .subject("Hello!")
///     .html("<p>Hello, World!</p>");
///
/// mailer.send(&token, &message).await?;
/// # Ok(())
/// # }
/// ```
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send one message on behalf of the token's owner
    ///
    /// # Errors
    ///
    /// Returns `MailError` if the message is invalid or the API refuses it.
    async fn send(&self, token: &AccessToken, message: &OutboundMessage) -> Result<(), MailError>;
}
