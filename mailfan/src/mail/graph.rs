//! Hosted mail API backend
//!
//! Sends through the provider's `sendMail` endpoint: one bearer-
//! authenticated POST per message, carrying the recipients, the HTML body,
//! and base64-encoded file attachments in the provider's JSON envelope.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;

use crate::config::MailSettings;
use crate::identity::AccessToken;

use super::attachments::base64_bytes;
use super::{MailError, Mailer, OutboundMessage};

/// How much of an upstream error body survives into the failure reason
const ERROR_EXCERPT_CHARS: usize = 200;

/// Mailer backed by the hosted mail API
#[derive(Debug, Clone)]
pub struct GraphMailer {
    http: reqwest::Client,
    base_url: String,
    save_to_sent_items: bool,
}

impl GraphMailer {
    /// Build a mailer from the mail settings
    #[must_use]
    pub fn new(settings: &MailSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            save_to_sent_items: settings.save_to_sent_items,
        }
    }

    fn send_mail_url(&self) -> String {
        format!("{}/me/sendMail", self.base_url)
    }
}

#[async_trait]
impl Mailer for GraphMailer {
    async fn send(&self, token: &AccessToken, message: &OutboundMessage) -> Result<(), MailError> {
        message.validate()?;

        let payload = wire_payload(message, self.save_to_sent_items);
        let response = self
            .http
            .post(self.send_mail_url())
            .bearer_auth(&token.secret)
            .json(&payload)
            .send()
            .await
            .map_err(|e| MailError::transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(to = ?message.to, "mail API accepted message");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let excerpt: String = body.chars().take(ERROR_EXCERPT_CHARS).collect();
        tracing::warn!(%status, "mail API refused message");
        Err(MailError::api(format!("HTTP {status}: {excerpt}")))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendMailPayload<'a> {
    message: WireMessage<'a>,
    save_to_sent_items: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireMessage<'a> {
    subject: &'a str,
    body: WireBody<'a>,
    to_recipients: Vec<WireRecipient<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    cc_recipients: Vec<WireRecipient<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    bcc_recipients: Vec<WireRecipient<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<WireAttachment<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireBody<'a> {
    content_type: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRecipient<'a> {
    email_address: WireAddress<'a>,
}

#[derive(Debug, Serialize)]
struct WireAddress<'a> {
    address: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireAttachment<'a> {
    #[serde(rename = "@odata.type")]
    odata_type: &'static str,
    name: &'a str,
    content_type: &'a str,
    // Cloning the payload is a refcount bump, not a copy.
    #[serde(rename = "contentBytes", with = "base64_bytes")]
    content: Bytes,
}

fn recipients(addresses: &[String]) -> Vec<WireRecipient<'_>> {
    addresses
        .iter()
        .map(|address| WireRecipient {
            email_address: WireAddress { address },
        })
        .collect()
}

fn wire_payload(message: &OutboundMessage, save_to_sent_items: bool) -> SendMailPayload<'_> {
    SendMailPayload {
        message: WireMessage {
            subject: message.subject.as_deref().unwrap_or_default(),
            body: WireBody {
                content_type: "HTML",
                content: message.html.as_deref().unwrap_or_default(),
            },
            to_recipients: recipients(&message.to),
            cc_recipients: recipients(&message.cc),
            bcc_recipients: recipients(&message.bcc),
            attachments: message
                .attachments
                .iter()
                .map(|a| WireAttachment {
                    odata_type: "#microsoft.graph.fileAttachment",
                    name: &a.name,
                    content_type: &a.content_type,
                    content: a.content.clone(),
                })
                .collect(),
        },
        save_to_sent_items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::Attachment;

    fn message() -> OutboundMessage {
        OutboundMessage::new()
            .to("ana@example.com")
            .subject("Welcome, Ana!")
            .html("<h1>Welcome!</h1>")
    }

    #[test]
    fn test_payload_core_fields() {
        let json = serde_json::to_value(wire_payload(&message(), true)).unwrap();

        assert_eq!(json["message"]["subject"], "Welcome, Ana!");
        assert_eq!(json["message"]["body"]["contentType"], "HTML");
        assert_eq!(json["message"]["body"]["content"], "<h1>Welcome!</h1>");
        assert_eq!(
            json["message"]["toRecipients"][0]["emailAddress"]["address"],
            "ana@example.com"
        );
        assert_eq!(json["saveToSentItems"], true);
    }

    #[test]
    fn test_payload_omits_empty_recipient_lists() {
        let json = serde_json::to_value(wire_payload(&message(), true)).unwrap();
        assert!(json["message"].get("ccRecipients").is_none());
        assert!(json["message"].get("bccRecipients").is_none());
        assert!(json["message"].get("attachments").is_none());
    }

    #[test]
    fn test_payload_carries_copy_lists() {
        let message = message()
            .cc("lead@example.com")
            .bcc("archive@example.com");
        let json = serde_json::to_value(wire_payload(&message, true)).unwrap();

        assert_eq!(
            json["message"]["ccRecipients"][0]["emailAddress"]["address"],
            "lead@example.com"
        );
        assert_eq!(
            json["message"]["bccRecipients"][0]["emailAddress"]["address"],
            "archive@example.com"
        );
    }

    #[test]
    fn test_payload_encodes_attachments() {
        let message =
            message().attachment(Attachment::new("hello.txt", "text/plain", &b"hello"[..]));
        let json = serde_json::to_value(wire_payload(&message, false)).unwrap();

        let attachment = &json["message"]["attachments"][0];
        assert_eq!(attachment["@odata.type"], "#microsoft.graph.fileAttachment");
        assert_eq!(attachment["name"], "hello.txt");
        assert_eq!(attachment["contentType"], "text/plain");
        assert_eq!(attachment["contentBytes"], "aGVsbG8=");
        assert_eq!(json["saveToSentItems"], false);
    }

    #[test]
    fn test_send_mail_url_trims_trailing_slash() {
        let settings = MailSettings {
            api_base_url: "https://graph.microsoft.com/v1.0/".to_string(),
            ..MailSettings::default()
        };
        let mailer = GraphMailer::new(&settings);
        assert_eq!(
            mailer.send_mail_url(),
            "https://graph.microsoft.com/v1.0/me/sendMail"
        );
    }
}
