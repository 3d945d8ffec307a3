//! Session handles and the server-side credential cache
//!
//! A login stores an opaque credential bundle in the [`CredentialStore`] and
//! hands the browser nothing but a generated [`SessionHandle`] in a cookie.
//! Records expire after a fixed TTL; expiry is checked on every read and a
//! periodic sweep reclaims the memory of records nobody reads again.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::CredentialBundle;

pub mod cookie;
pub mod store;

pub use cookie::SameSite;
pub use store::CredentialStore;

/// Opaque identifier for a stored credential record
///
/// The handle is the only thing that ever leaves the process; it carries no
/// user information and cannot be derived from the credentials it names.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionHandle(String);

impl SessionHandle {
    /// Generate a new unguessable handle
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from a string (validates format)
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid UUID.
    pub fn try_from_string(s: String) -> Result<Self, InvalidHandle> {
        Uuid::parse_str(&s).map(|_| Self(s)).map_err(|_| InvalidHandle)
    }

    /// Get the handle as a string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SessionHandle {
    type Err = InvalidHandle;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from_string(s.to_string())
    }
}

/// A string that does not parse as a session handle
///
/// At the HTTP boundary this is treated the same as an absent cookie; a
/// malformed handle could never resolve to a record anyway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Invalid session handle")]
pub struct InvalidHandle;

/// A credential bundle together with its expiry bookkeeping
#[derive(Debug, Clone)]
pub struct CredentialRecord {
    /// The opaque payload handed over at login
    pub bundle: CredentialBundle,
    /// When this record was created
    pub created_at: DateTime<Utc>,
    /// When this record expires
    pub expires_at: DateTime<Utc>,
}

impl CredentialRecord {
    /// Create a record expiring `ttl` from now
    ///
    /// A negative `ttl` produces an already-expired record.
    #[must_use]
    pub fn new(bundle: CredentialBundle, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            bundle,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    /// Check whether this record has expired
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_generate_unique() {
        let a = SessionHandle::generate();
        let b = SessionHandle::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_handle_from_valid_string() {
        let uuid_str = "550e8400-e29b-41d4-a716-446655440000";
        let handle = SessionHandle::try_from_string(uuid_str.to_string());
        assert!(handle.is_ok());
        assert_eq!(handle.unwrap().as_str(), uuid_str);
    }

    #[test]
    fn test_handle_rejects_garbage() {
        let result = SessionHandle::try_from_string("not-a-uuid".to_string());
        assert!(result.is_err());
    }

    #[test]
    fn test_handle_display_roundtrip() {
        let handle = SessionHandle::generate();
        let parsed: SessionHandle = handle.to_string().parse().unwrap();
        assert_eq!(handle, parsed);
    }

    #[test]
    fn test_record_fresh_not_expired() {
        let record = CredentialRecord::new(
            CredentialBundle::new(b"grant".to_vec()),
            Duration::hours(24),
        );
        assert!(!record.is_expired());
        assert!(record.expires_at > record.created_at);
    }

    #[test]
    fn test_record_negative_ttl_expired() {
        let record =
            CredentialRecord::new(CredentialBundle::new(b"grant".to_vec()), Duration::seconds(-1));
        assert!(record.is_expired());
    }
}
