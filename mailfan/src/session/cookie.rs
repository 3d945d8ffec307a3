//! Cookie assembly and extraction for the session boundary
//!
//! The session cookie carries nothing but the opaque handle string. Flags
//! follow the hardened defaults: `HttpOnly` always, `Secure` outside debug
//! builds, `Path=/`, and a `Max-Age` equal to the credential TTL so cookie
//! and record die together.

use http::{header, HeaderMap};
use serde::{Deserialize, Serialize};

use crate::config::SessionSettings;

use super::SessionHandle;

/// Lifetime of the OAuth state cookie that rides along during login
pub const STATE_COOKIE_MAX_AGE_SECS: u64 = 600;

/// `SameSite` cookie policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    /// Sent only for same-site requests
    Strict,
    /// Sent for same-site requests and top-level navigations
    #[default]
    Lax,
    /// Sent for all requests (requires `Secure`)
    None,
}

impl SameSite {
    /// Attribute value as it appears in a `Set-Cookie` header
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "Strict",
            Self::Lax => "Lax",
            Self::None => "None",
        }
    }
}

/// Read a cookie value out of the request headers
///
/// Scans every `Cookie` header, tolerating values other middleware may
/// have appended. Returns the first match by name.
#[must_use]
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    for header_value in headers.get_all(header::COOKIE) {
        let Ok(raw) = header_value.to_str() else {
            continue;
        };
        for pair in raw.split(';') {
            if let Some((key, value)) = pair.trim().split_once('=') {
                if key == name {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}

/// Extract and parse the session handle from the request headers
///
/// A cookie whose value does not parse as a handle is treated exactly like
/// an absent cookie; it could never resolve to a record.
#[must_use]
pub fn extract_handle(headers: &HeaderMap, settings: &SessionSettings) -> Option<SessionHandle> {
    cookie_value(headers, &settings.cookie_name)?.parse().ok()
}

/// Build the `Set-Cookie` value that installs a session handle
#[must_use]
pub fn session_cookie(settings: &SessionSettings, handle: &SessionHandle) -> String {
    format_cookie(
        &settings.cookie_name,
        handle.as_str(),
        settings.ttl_secs,
        settings,
    )
}

/// Build the `Set-Cookie` value that removes the session cookie
#[must_use]
pub fn clear_session_cookie(settings: &SessionSettings) -> String {
    format_cookie(&settings.cookie_name, "", 0, settings)
}

/// Build the `Set-Cookie` value for the short-lived OAuth state token
#[must_use]
pub fn state_cookie(settings: &SessionSettings, token: &str) -> String {
    format_cookie(
        &settings.state_cookie_name,
        token,
        STATE_COOKIE_MAX_AGE_SECS,
        settings,
    )
}

/// Build the `Set-Cookie` value that removes the OAuth state cookie
#[must_use]
pub fn clear_state_cookie(settings: &SessionSettings) -> String {
    format_cookie(&settings.state_cookie_name, "", 0, settings)
}

fn format_cookie(name: &str, value: &str, max_age_secs: u64, settings: &SessionSettings) -> String {
    let mut cookie = format!(
        "{name}={value}; Path=/; Max-Age={max_age_secs}; SameSite={}; HttpOnly",
        settings.same_site.as_str()
    );
    if settings.secure_cookies {
        cookie.push_str("; Secure");
    }
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> SessionSettings {
        SessionSettings {
            secure_cookies: false,
            ..SessionSettings::default()
        }
    }

    fn headers_with_cookie(raw: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, raw.parse().unwrap());
        headers
    }

    #[test]
    fn test_cookie_value_found_among_others() {
        let headers = headers_with_cookie("theme=dark; mailfan_session=abc; lang=en");
        assert_eq!(
            cookie_value(&headers, "mailfan_session"),
            Some("abc".to_string())
        );
    }

    #[test]
    fn test_cookie_value_absent() {
        let headers = headers_with_cookie("theme=dark");
        assert_eq!(cookie_value(&headers, "mailfan_session"), None);
    }

    #[test]
    fn test_extract_handle_roundtrip() {
        let handle = SessionHandle::generate();
        let headers = headers_with_cookie(&format!("mailfan_session={handle}"));
        assert_eq!(extract_handle(&headers, &settings()), Some(handle));
    }

    #[test]
    fn test_extract_handle_rejects_malformed_value() {
        let headers = headers_with_cookie("mailfan_session=not-a-uuid");
        assert_eq!(extract_handle(&headers, &settings()), None);
    }

    #[test]
    fn test_extract_handle_no_cookie_header() {
        assert_eq!(extract_handle(&HeaderMap::new(), &settings()), None);
    }

    #[test]
    fn test_session_cookie_attributes() {
        let handle = SessionHandle::generate();
        let cookie = session_cookie(&settings(), &handle);
        assert!(cookie.starts_with(&format!("mailfan_session={handle}")));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Max-Age=86400"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("HttpOnly"));
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn test_session_cookie_secure_flag() {
        let mut settings = settings();
        settings.secure_cookies = true;
        let cookie = session_cookie(&settings, &SessionHandle::generate());
        assert!(cookie.ends_with("; Secure"));
    }

    #[test]
    fn test_clear_session_cookie_zeroes_max_age() {
        let cookie = clear_session_cookie(&settings());
        assert!(cookie.starts_with("mailfan_session=;"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[test]
    fn test_state_cookie_short_lived() {
        let cookie = state_cookie(&settings(), "f00d");
        assert!(cookie.starts_with("mailfan_oauth_state=f00d"));
        assert!(cookie.contains("Max-Age=600"));
        assert!(cookie.contains("HttpOnly"));
    }

    #[test]
    fn test_same_site_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&SameSite::Lax).unwrap(), "\"lax\"");
        let parsed: SameSite = serde_json::from_str("\"strict\"").unwrap();
        assert_eq!(parsed, SameSite::Strict);
    }
}
