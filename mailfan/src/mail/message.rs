//! Outbound message builder with fluent API

use super::{Attachment, MailError};

/// One personalized message bound for the mail API
///
/// Use the builder pattern to construct messages:
///
/// ```rust
/// use mailfan::mail::OutboundMessage;
///
/// let message = OutboundMessage::new()
///     .to("ana@example.com")
///     .subject("Welcome, Ana!")
///     .html("<h1>Welcome!</h1>");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutboundMessage {
    /// Primary recipients (To)
    pub to: Vec<String>,

    /// CC recipients
    pub cc: Vec<String>,

    /// BCC recipients
    pub bcc: Vec<String>,

    /// Message subject
    pub subject: Option<String>,

    /// HTML body
    pub html: Option<String>,

    /// Files attached to the message
    pub attachments: Vec<Attachment>,
}

impl OutboundMessage {
    /// Create a new empty message
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a recipient (To)
    #[must_use]
    pub fn to(mut self, address: &str) -> Self {
        self.to.push(address.to_string());
        self
    }

    /// Add a CC recipient
    #[must_use]
    pub fn cc(mut self, address: &str) -> Self {
        self.cc.push(address.to_string());
        self
    }

    /// Add a BCC recipient
    #[must_use]
    pub fn bcc(mut self, address: &str) -> Self {
        self.bcc.push(address.to_string());
        self
    }

    /// Add every address in a list as a CC recipient
    #[must_use]
    pub fn cc_all(mut self, addresses: &[String]) -> Self {
        self.cc.extend_from_slice(addresses);
        self
    }

    /// Add every address in a list as a BCC recipient
    #[must_use]
    pub fn bcc_all(mut self, addresses: &[String]) -> Self {
        self.bcc.extend_from_slice(addresses);
        self
    }

    /// Set the message subject
    #[must_use]
    pub fn subject(mut self, subject: &str) -> Self {
        self.subject = Some(subject.to_string());
        self
    }

    /// Set the HTML body
    #[must_use]
    pub fn html(mut self, body: &str) -> Self {
        self.html = Some(body.to_string());
        self
    }

    /// Add a single attachment
    #[must_use]
    pub fn attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Replace the attachment set
    #[must_use]
    pub fn attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    /// Validate the message
    ///
    /// # Errors
    ///
    /// Returns errors if:
    /// - No To recipient (CC/BCC alone do not make a deliverable message here)
    /// - No subject
    /// - No HTML content
    pub fn validate(&self) -> Result<(), MailError> {
        if self.to.is_empty() {
            return Err(MailError::NoRecipients);
        }

        if self.subject.is_none() {
            return Err(MailError::NoSubject);
        }

        if self.html.is_none() {
            return Err(MailError::NoContent);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_builder() {
        let message = OutboundMessage::new()
            .to("user@example.com")
            .subject("Test")
            .html("<p>Hello</p>");

        assert_eq!(message.to, vec!["user@example.com"]);
        assert_eq!(message.subject, Some("Test".to_string()));
        assert_eq!(message.html, Some("<p>Hello</p>".to_string()));
    }

    #[test]
    fn test_validation_no_recipients() {
        let message = OutboundMessage::new().subject("Test").html("<p>Hi</p>");
        assert!(matches!(message.validate(), Err(MailError::NoRecipients)));
    }

    #[test]
    fn test_validation_cc_alone_is_not_deliverable() {
        let message = OutboundMessage::new()
            .cc("copy@example.com")
            .subject("Test")
            .html("<p>Hi</p>");
        assert!(matches!(message.validate(), Err(MailError::NoRecipients)));
    }

    #[test]
    fn test_validation_no_subject() {
        let message = OutboundMessage::new().to("user@example.com").html("<p>Hi</p>");
        assert!(matches!(message.validate(), Err(MailError::NoSubject)));
    }

    #[test]
    fn test_validation_no_content() {
        let message = OutboundMessage::new().to("user@example.com").subject("Test");
        assert!(matches!(message.validate(), Err(MailError::NoContent)));
    }

    #[test]
    fn test_validation_success() {
        let message = OutboundMessage::new()
            .to("user@example.com")
            .subject("Test")
            .html("<p>Hello</p>");
        assert!(message.validate().is_ok());
    }

    #[test]
    fn test_cc_and_bcc_lists() {
        let cc = vec!["a@example.com".to_string(), "b@example.com".to_string()];
        let bcc = vec!["c@example.com".to_string()];
        let message = OutboundMessage::new()
            .to("user@example.com")
            .cc_all(&cc)
            .bcc_all(&bcc);

        assert_eq!(message.cc, cc);
        assert_eq!(message.bcc, bcc);
    }

    #[test]
    fn test_attachment_set() {
        let message = OutboundMessage::new()
            .attachment(Attachment::new("a.txt", "text/plain", &b"a"[..]))
            .attachment(Attachment::new("b.txt", "text/plain", &b"b"[..]));
        assert_eq!(message.attachments.len(), 2);
    }
}
