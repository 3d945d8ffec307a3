//! Console backend for development
//!
//! Logs messages instead of sending them. Useful for exercising the whole
//! dispatch pipeline without provider credentials.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::identity::AccessToken;

use super::{MailError, Mailer, OutboundMessage};

/// Console mail backend for development
///
/// Validates and logs each message, then reports success without talking
/// to any provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleMailer {
    verbose: bool,
}

impl ConsoleMailer {
    /// Create a new console mailer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a verbose console mailer that also logs message bodies
    #[must_use]
    pub const fn verbose() -> Self {
        Self { verbose: true }
    }
}

#[async_trait]
impl Mailer for ConsoleMailer {
    async fn send(&self, _token: &AccessToken, message: &OutboundMessage) -> Result<(), MailError> {
        message.validate()?;

        info!(
            to = ?message.to,
            cc = ?message.cc,
            bcc = ?message.bcc,
            subject = ?message.subject,
            attachments = message.attachments.len(),
            "console mailer accepted message"
        );

        if self.verbose {
            if let Some(html) = &message.html {
                debug!(html = %html, "message HTML content");
            }
        }

        Ok(())
    }
}
