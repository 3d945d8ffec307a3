//! Mail error types

use thiserror::Error;

/// Errors that can occur when building or sending a message
///
/// These are per-message errors: during a batch they become the recorded
/// failure reason for one recipient and never abort the run.
#[derive(Debug, Error)]
pub enum MailError {
    /// Message has no recipients
    #[error("message must have at least one recipient")]
    NoRecipients,

    /// Message has no subject
    #[error("message must have a subject")]
    NoSubject,

    /// Message has no body content
    #[error("message must have HTML content")]
    NoContent,

    /// Body frame rendering error
    #[error("failed to render message body: {0}")]
    Template(#[from] askama::Error),

    /// The mail API accepted the connection but refused the send
    #[error("mail API error: {0}")]
    Api(String),

    /// The mail API could not be reached
    #[error("mail transport error: {0}")]
    Transport(String),
}

impl MailError {
    /// Create an API error from a string message
    #[must_use]
    pub fn api<T: Into<String>>(msg: T) -> Self {
        Self::Api(msg.into())
    }

    /// Create a transport error from a string message
    #[must_use]
    pub fn transport<T: Into<String>>(msg: T) -> Self {
        Self::Transport(msg.into())
    }
}
