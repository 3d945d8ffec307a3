//! Outbound mail over the hosted provider API
//!
//! This module covers everything between a composed message and the mail
//! API accepting it:
//! - The [`OutboundMessage`] builder and its validation
//! - Attachments with the fixed batch admission caps
//! - The [`Mailer`] trait and its backends (hosted API, console/development)
//!
//! # Examples
//!
//! ```rust,no_run
//! use mailfan::identity::AccessToken;
//! use mailfan::mail::{ConsoleMailer, Mailer, OutboundMessage};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mailer = ConsoleMailer::new();
//! let token = AccessToken::new("bearer-secret", None);
//!
//! let message = OutboundMessage::new()
//!     .to("user@example.com")
//!     .subject("Welcome!")
//!     .html("<h1>Welcome!</h1>");
//!
//! mailer.send(&token, &message).await?;
//! # Ok(())
//! # }
//! ```

mod console;
mod graph;
mod message;
mod sender;

pub mod attachments;
mod error;

pub use attachments::{
    admit, AdmissionError, Attachment, MAX_ATTACHMENT_BYTES, MAX_ATTACHMENT_COUNT, MAX_TOTAL_BYTES,
};
pub use console::ConsoleMailer;
pub use error::MailError;
pub use graph::GraphMailer;
pub use message::OutboundMessage;
pub use sender::Mailer;

#[cfg(test)]
pub use sender::MockMailer;
