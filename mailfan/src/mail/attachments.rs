//! Attachments and batch admission control
//!
//! Every message in a batch carries the same attachment set, so the set is
//! validated once, before any send. The caps are fixed properties of the
//! downstream mail API, not configuration.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Most attachments a single batch may carry
pub const MAX_ATTACHMENT_COUNT: usize = 250;

/// Cap on the decoded size of all attachments together
pub const MAX_TOTAL_BYTES: u64 = 35 * 1024 * 1024;

/// Cap on the decoded size of any single attachment
pub const MAX_ATTACHMENT_BYTES: u64 = 25 * 1024 * 1024;

/// A file attached to every message in a batch
///
/// The payload is held decoded in a refcounted buffer, so handing the set
/// to each outbound message clones a pointer, not megabytes. On the wire
/// the payload travels base64 encoded under `contentBytes`; unknown fields
/// such as `@odata.type` are ignored on input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// File name shown to the recipient
    pub name: String,
    /// MIME type of the payload
    pub content_type: String,
    /// Decoded payload bytes
    #[serde(rename = "contentBytes", with = "base64_bytes")]
    pub content: Bytes,
}

impl Attachment {
    /// Create an attachment from its name, MIME type, and payload
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        content: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            content: content.into(),
        }
    }

    /// Decoded payload size in bytes
    #[must_use]
    pub fn size_bytes(&self) -> u64 {
        self.content.len() as u64
    }
}

/// A batch attachment set that violates one of the fixed caps
///
/// Each variant names the specific rule that failed and carries the
/// measured value next to the limit, so the refusal is actionable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    /// More attachments than a batch may carry
    #[error("too many attachments: {count} exceeds the limit of {limit}")]
    TooManyAttachments {
        /// How many attachments the batch carried
        count: usize,
        /// The fixed count cap
        limit: usize,
    },

    /// Combined attachment payload too large
    #[error("total attachment size of {total_bytes} bytes exceeds the limit of {limit_bytes} bytes")]
    TotalSizeExceeded {
        /// Summed decoded size of every attachment
        total_bytes: u64,
        /// The fixed total cap
        limit_bytes: u64,
    },

    /// A single attachment payload too large
    #[error("attachment '{name}' is {size_bytes} bytes, over the per-file limit of {limit_bytes} bytes")]
    AttachmentTooLarge {
        /// Name of the offending attachment
        name: String,
        /// Its decoded size
        size_bytes: u64,
        /// The fixed per-file cap
        limit_bytes: u64,
    },
}

/// Validate a batch's attachment set against the fixed caps
///
/// Pure and order-stable: count first, then total size, then per-file
/// size, failing fast on the first violated rule. An empty set is
/// admitted.
///
/// # Errors
///
/// Returns the first violated rule with the measured value and the cap.
pub fn admit(attachments: &[Attachment]) -> Result<(), AdmissionError> {
    if attachments.len() > MAX_ATTACHMENT_COUNT {
        return Err(AdmissionError::TooManyAttachments {
            count: attachments.len(),
            limit: MAX_ATTACHMENT_COUNT,
        });
    }

    let total_bytes: u64 = attachments.iter().map(Attachment::size_bytes).sum();
    if total_bytes > MAX_TOTAL_BYTES {
        return Err(AdmissionError::TotalSizeExceeded {
            total_bytes,
            limit_bytes: MAX_TOTAL_BYTES,
        });
    }

    if let Some(oversized) = attachments
        .iter()
        .find(|a| a.size_bytes() > MAX_ATTACHMENT_BYTES)
    {
        return Err(AdmissionError::AttachmentTooLarge {
            name: oversized.name.clone(),
            size_bytes: oversized.size_bytes(),
            limit_bytes: MAX_ATTACHMENT_BYTES,
        });
    }

    Ok(())
}

/// Base64 codec for attachment payloads on the JSON wire
pub(crate) mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map(Bytes::from)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: usize = 1024 * 1024;

    fn attachment(name: &str, size: usize) -> Attachment {
        Attachment::new(name, "application/octet-stream", vec![0u8; size])
    }

    #[test]
    fn test_empty_set_admitted() {
        assert!(admit(&[]).is_ok());
    }

    #[test]
    fn test_reasonable_set_admitted() {
        let set = vec![
            attachment("a.pdf", 5 * MIB),
            attachment("b.pdf", 10 * MIB),
        ];
        assert!(admit(&set).is_ok());
    }

    #[test]
    fn test_count_at_limit_admitted() {
        let set: Vec<_> = (0..MAX_ATTACHMENT_COUNT)
            .map(|i| attachment(&format!("{i}.txt"), 1))
            .collect();
        assert!(admit(&set).is_ok());
    }

    #[test]
    fn test_one_over_count_limit_rejected() {
        let set: Vec<_> = (0..=MAX_ATTACHMENT_COUNT)
            .map(|i| attachment(&format!("{i}.txt"), 1))
            .collect();
        assert_eq!(
            admit(&set),
            Err(AdmissionError::TooManyAttachments {
                count: 251,
                limit: 250,
            })
        );
    }

    #[test]
    fn test_single_file_at_limit_admitted() {
        let set = vec![attachment("exact.bin", 25 * MIB)];
        assert!(admit(&set).is_ok());
    }

    #[test]
    fn test_single_file_over_limit_rejected() {
        let set = vec![attachment("huge.bin", 26 * MIB)];
        assert_eq!(
            admit(&set),
            Err(AdmissionError::AttachmentTooLarge {
                name: "huge.bin".to_string(),
                size_bytes: 26 * 1024 * 1024,
                limit_bytes: MAX_ATTACHMENT_BYTES,
            })
        );
    }

    #[test]
    fn test_total_over_limit_rejected() {
        // Each file is within the per-file cap; only the sum violates.
        let set = vec![
            attachment("a.bin", 18 * MIB),
            attachment("b.bin", 18 * MIB),
        ];
        assert_eq!(
            admit(&set),
            Err(AdmissionError::TotalSizeExceeded {
                total_bytes: 36 * 1024 * 1024,
                limit_bytes: MAX_TOTAL_BYTES,
            })
        );
    }

    #[test]
    fn test_count_rule_checked_before_sizes() {
        // Cloning Bytes shares one buffer, so this stays cheap.
        let big = attachment("big.bin", 26 * MIB);
        let set: Vec<_> = (0..=MAX_ATTACHMENT_COUNT).map(|_| big.clone()).collect();
        assert!(matches!(
            admit(&set),
            Err(AdmissionError::TooManyAttachments { .. })
        ));
    }

    #[test]
    fn test_total_rule_checked_before_per_file() {
        let set = vec![attachment("a.bin", 26 * MIB), attachment("b.bin", 26 * MIB)];
        assert!(matches!(
            admit(&set),
            Err(AdmissionError::TotalSizeExceeded { .. })
        ));
    }

    #[test]
    fn test_wire_decode_base64_payload() {
        let json = r##"{
            "@odata.type": "#microsoft.graph.fileAttachment",
            "name": "hello.txt",
            "contentType": "text/plain",
            "contentBytes": "aGVsbG8="
        }"##;
        let attachment: Attachment = serde_json::from_str(json).unwrap();
        assert_eq!(attachment.name, "hello.txt");
        assert_eq!(attachment.content_type, "text/plain");
        assert_eq!(attachment.content.as_ref(), b"hello");
    }

    #[test]
    fn test_wire_encode_base64_payload() {
        let attachment = Attachment::new("hello.txt", "text/plain", &b"hello"[..]);
        let json = serde_json::to_value(&attachment).unwrap();
        assert_eq!(json["contentBytes"], "aGVsbG8=");
        assert_eq!(json["contentType"], "text/plain");
    }

    #[test]
    fn test_wire_rejects_invalid_base64() {
        let json = r#"{"name": "x", "contentType": "text/plain", "contentBytes": "!!!"}"#;
        assert!(serde_json::from_str::<Attachment>(json).is_err());
    }
}
