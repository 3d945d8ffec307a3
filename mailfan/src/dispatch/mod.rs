//! Batch dispatch engine
//!
//! Takes one draft (subject, HTML body, attachments) and a recipient list,
//! personalizes the draft per recipient, and delivers each copy through a
//! [`Mailer`]. Failures are recorded per recipient and never abort the
//! batch; consecutive attempts are separated by a pacing delay to stay
//! under provider throttling limits.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mailfan::dispatch::{Dispatcher, DispatchRequest, Recipient};
//! use mailfan::identity::AccessToken;
//! use mailfan::mail::ConsoleMailer;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let dispatcher = Dispatcher::new(Arc::new(ConsoleMailer::new()));
//!
//! let request = DispatchRequest {
//!     subject: "Welcome, ${name}!".to_string(),
//!     body: "<p>Hello ${name}</p>".to_string(),
//!     recipients: vec![Recipient::new("ana@example.com").field("name", "Ana")],
//!     ..DispatchRequest::default()
//! };
//!
//! let token = AccessToken::new("token", None);
//! let report = dispatcher.dispatch(&token, &request).await?;
//! assert_eq!(report.summary().successful, 1);
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::compose;
use crate::identity::AccessToken;
use crate::mail::{admit, AdmissionError, Attachment, Mailer, OutboundMessage};

/// Merge field that carries a recipient's email address
pub const ADDRESS_FIELD: &str = "email";

/// One recipient: an email address plus arbitrary merge fields
///
/// Deserializes from a flat JSON object; every key becomes a merge field,
/// and the `email` key doubles as the delivery address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Recipient(HashMap<String, String>);

impl Recipient {
    /// Recipient with just an address
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self(HashMap::from([(ADDRESS_FIELD.to_string(), address.into())]))
    }

    /// Add a merge field
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Delivery address, if present and non-empty
    #[must_use]
    pub fn address(&self) -> Option<&str> {
        self.0
            .get(ADDRESS_FIELD)
            .map(String::as_str)
            .filter(|a| !a.is_empty())
    }

    /// Replace the delivery address, keeping all other merge fields
    #[must_use]
    pub fn with_address(mut self, address: &str) -> Self {
        self.0
            .insert(ADDRESS_FIELD.to_string(), address.to_string());
        self
    }

    /// Look up a single merge field
    #[must_use]
    pub fn get_field(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// All merge fields, address included
    #[must_use]
    pub fn fields(&self) -> &HashMap<String, String> {
        &self.0
    }
}

impl From<HashMap<String, String>> for Recipient {
    fn from(fields: HashMap<String, String>) -> Self {
        Self(fields)
    }
}

/// Why a dispatch request was rejected before any send was attempted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchRejection {
    /// The draft has no subject
    #[error("missing required field: subject")]
    EmptySubject,

    /// The draft has no body
    #[error("missing required field: body")]
    EmptyBody,

    /// The recipient list is empty
    #[error("at least one recipient is required")]
    NoRecipients,

    /// A recipient has no usable email address
    #[error("recipient {index} has no email address")]
    RecipientMissingAddress {
        /// Zero-based position in the recipient list
        index: usize,
    },

    /// The attachment set is over a size or count limit
    #[error(transparent)]
    Admission(#[from] AdmissionError),
}

/// One batch to dispatch: a shared draft and the recipients to fan out to
#[derive(Debug, Clone, Default)]
pub struct DispatchRequest {
    /// Subject line, may contain merge fields
    pub subject: String,

    /// HTML body, may contain merge fields
    pub body: String,

    /// Recipients to personalize and deliver to
    pub recipients: Vec<Recipient>,

    /// Carbon-copy addresses attached to every message
    pub cc: Vec<String>,

    /// Blind-carbon-copy addresses attached to every message
    pub bcc: Vec<String>,

    /// Attachments shared by every message
    pub attachments: Vec<Attachment>,
}

impl DispatchRequest {
    /// Check the whole batch before any send is attempted
    ///
    /// Checks run in a fixed order: subject, body, recipient list,
    /// per-recipient addresses, then attachment admission. The first
    /// failure wins.
    ///
    /// # Errors
    ///
    /// Returns the first [`DispatchRejection`] found.
    pub fn validate(&self) -> Result<(), DispatchRejection> {
        if self.subject.is_empty() {
            return Err(DispatchRejection::EmptySubject);
        }
        if self.body.is_empty() {
            return Err(DispatchRejection::EmptyBody);
        }
        if self.recipients.is_empty() {
            return Err(DispatchRejection::NoRecipients);
        }
        for (index, recipient) in self.recipients.iter().enumerate() {
            if recipient.address().is_none() {
                return Err(DispatchRejection::RecipientMissingAddress { index });
            }
        }
        admit(&self.attachments)?;
        Ok(())
    }

    /// Reduce the batch to a single test delivery
    ///
    /// Keeps the first recipient's merge fields so the test message renders
    /// with realistic data, but delivers it to `address`. An empty
    /// recipient list stays empty and fails validation as usual.
    #[must_use]
    pub fn into_test_send(mut self, address: &str) -> Self {
        self.recipients = self
            .recipients
            .into_iter()
            .next()
            .map(|first| first.with_address(address))
            .into_iter()
            .collect();
        self
    }
}

/// One delivery that failed, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedDelivery {
    /// Address the delivery was meant for
    pub email: String,
    /// Delivery error message
    pub error: String,
}

/// Batch-level bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchMetadata {
    /// How many deliveries were attempted
    pub total_attempted: usize,
    /// When the batch started
    #[serde(rename = "startTime")]
    pub started_at: DateTime<Utc>,
}

/// Outcome of a whole batch
///
/// Every recipient lands in exactly one of `successful` or `failed`.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    /// Addresses delivered successfully, in attempt order
    pub successful: Vec<String>,
    /// Deliveries that failed, in attempt order
    pub failed: Vec<FailedDelivery>,
    /// Batch-level bookkeeping
    pub metadata: DispatchMetadata,
}

impl DispatchReport {
    /// Condensed counts for the response envelope
    #[must_use]
    pub fn summary(&self) -> DispatchSummary {
        DispatchSummary {
            total: self.metadata.total_attempted,
            successful: self.successful.len(),
            failed: self.failed.len(),
        }
    }
}

/// Condensed batch counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    /// Total deliveries attempted
    pub total: usize,
    /// Deliveries that succeeded
    pub successful: usize,
    /// Deliveries that failed
    pub failed: usize,
}

/// Drives a batch through personalization, framing, and delivery
pub struct Dispatcher {
    mailer: Arc<dyn Mailer>,
    pacing: Duration,
}

impl Dispatcher {
    /// Dispatcher with the default one-second pacing delay
    #[must_use]
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self {
            mailer,
            pacing: Duration::from_millis(1000),
        }
    }

    /// Override the pacing delay between consecutive attempts
    #[must_use]
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Deliver a personalized copy of the draft to every recipient
    ///
    /// The batch is validated up front; a rejected batch attempts no
    /// deliveries at all. After validation, every recipient is attempted
    /// exactly once and a per-recipient failure never aborts the loop.
    /// A pacing delay follows every attempt, success or failure.
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchRejection`] if the batch fails validation.
    pub async fn dispatch(
        &self,
        token: &AccessToken,
        request: &DispatchRequest,
    ) -> Result<DispatchReport, DispatchRejection> {
        request.validate()?;

        let started_at = Utc::now();
        tracing::info!(
            recipients = request.recipients.len(),
            attachments = request.attachments.len(),
            "starting batch dispatch"
        );

        let mut successful = Vec::new();
        let mut failed = Vec::new();

        for recipient in &request.recipients {
            // validate() guarantees every recipient has an address
            let address = recipient.address().unwrap_or_default().to_string();

            match self.deliver(token, request, recipient).await {
                Ok(()) => {
                    tracing::info!(recipient = %address, "message delivered");
                    successful.push(address);
                }
                Err(e) => {
                    tracing::warn!(recipient = %address, error = %e, "delivery failed");
                    failed.push(FailedDelivery {
                        email: address,
                        error: e.to_string(),
                    });
                }
            }

            tokio::time::sleep(self.pacing).await;
        }

        tracing::info!(
            successful = successful.len(),
            failed = failed.len(),
            "batch dispatch finished"
        );

        Ok(DispatchReport {
            successful,
            failed,
            metadata: DispatchMetadata {
                total_attempted: request.recipients.len(),
                started_at,
            },
        })
    }

    async fn deliver(
        &self,
        token: &AccessToken,
        request: &DispatchRequest,
        recipient: &Recipient,
    ) -> Result<(), crate::mail::MailError> {
        let subject = compose::render(&request.subject, recipient.fields());
        let body = compose::render(&request.body, recipient.fields());
        let html = compose::frame_html(&body)?;

        let message = OutboundMessage::new()
            .to(recipient.address().unwrap_or_default())
            .subject(&subject)
            .html(&html)
            .cc_all(&request.cc)
            .bcc_all(&request.bcc)
            .attachments(request.attachments.clone());

        self.mailer.send(token, &message).await
    }
}
