//! XOAUTH2 SASL mechanism (Google/Microsoft proprietary).
//!
//! XOAUTH2 is a single-round-trip mechanism: the client sends one initial
//! response and the server either accepts it or answers with a JSON error
//! blob. The initial response is:
//!
//! ```text
//! user={email}\x01auth=Bearer {access_token}\x01\x01
//! ```
//!
//! base64-encoded where the transport requires it (IMAP `AUTHENTICATE`,
//! SMTP `AUTH`), raw bytes for SASL framing layers that encode themselves.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::debug;

/// SASL mechanism name advertised by servers supporting XOAUTH2.
pub const MECHANISM: &str = "XOAUTH2";

/// Builds the raw XOAUTH2 initial response (before base64 encoding).
///
/// # Example
///
/// ```
/// use mailbridge_oauth::sasl::xoauth2_initial_response;
///
/// let raw = xoauth2_initial_response("a@b.com", "tok");
/// assert_eq!(raw, b"user=a@b.com\x01auth=Bearer tok\x01\x01");
/// ```
#[must_use]
pub fn xoauth2_initial_response(email: &str, access_token: &str) -> Vec<u8> {
    format!("user={email}\x01auth=Bearer {access_token}\x01\x01").into_bytes()
}

/// Builds the base64-encoded XOAUTH2 initial response.
///
/// # Example
///
/// ```
/// use mailbridge_oauth::sasl::xoauth2_response;
///
/// let encoded = xoauth2_response("user@example.com", "ya29.a0...");
/// // Send: AUTHENTICATE XOAUTH2 {encoded}
/// ```
#[must_use]
pub fn xoauth2_response(email: &str, access_token: &str) -> String {
    STANDARD.encode(xoauth2_initial_response(email, access_token))
}

/// Two-step SASL client for the XOAUTH2 mechanism.
///
/// Mail transports drive SASL through a start/next capability; XOAUTH2
/// only ever uses the first step. Any challenge arriving after [`start`]
/// is a provider-side error or success signal that the transport layer
/// resolves, so [`next`] is a terminal no-op.
///
/// [`start`]: XOauth2Client::start
/// [`next`]: XOauth2Client::next
#[derive(Debug, Clone)]
pub struct XOauth2Client {
    email: String,
    access_token: String,
}

impl XOauth2Client {
    /// Creates a SASL client for the given account and access token.
    #[must_use]
    pub fn new(email: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            access_token: access_token.into(),
        }
    }

    /// Begins authentication, returning the mechanism name and the raw
    /// initial response.
    #[must_use]
    pub fn start(&self) -> (&'static str, Vec<u8>) {
        let initial = xoauth2_initial_response(&self.email, &self.access_token);
        debug!(
            "starting XOAUTH2 authentication for {}, token length {}, initial response length {}",
            self.email,
            self.access_token.len(),
            initial.len()
        );
        (MECHANISM, initial)
    }

    /// Continues authentication after a server challenge.
    ///
    /// Always returns an empty response: XOAUTH2 has no further rounds.
    #[must_use]
    pub fn next(&self, challenge: &[u8]) -> Vec<u8> {
        if !challenge.is_empty() {
            debug!(
                "XOAUTH2 challenge after initial response ({} bytes): {}",
                challenge.len(),
                String::from_utf8_lossy(challenge)
            );
        }
        Vec::new()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_response_layout() {
        let raw = xoauth2_initial_response("user@example.com", "token123");
        let expected = b"user=user@example.com\x01auth=Bearer token123\x01\x01";
        assert_eq!(raw, expected.to_vec());
    }

    #[test]
    fn test_encoded_response_matches_raw() {
        let encoded = xoauth2_response("a@b.com", "tok");
        assert_eq!(encoded, STANDARD.encode(b"user=a@b.com\x01auth=Bearer tok\x01\x01"));
    }

    #[test]
    fn test_encoded_response_is_base64() {
        let encoded = xoauth2_response("user@example.com", "secret-token");
        assert!(!encoded.contains("user@example.com"));
        assert!(!encoded.contains("secret-token"));
        assert!(STANDARD.decode(&encoded).is_ok());
    }

    #[test]
    fn test_sasl_start() {
        let client = XOauth2Client::new("user@example.com", "tok");
        let (mechanism, initial) = client.start();

        assert_eq!(mechanism, "XOAUTH2");
        assert_eq!(initial, xoauth2_initial_response("user@example.com", "tok"));
    }

    #[test]
    fn test_sasl_next_is_terminal() {
        let client = XOauth2Client::new("user@example.com", "tok");

        // Error blob from the server after a rejected token.
        let challenge = br#"{"status":"401","schemes":"bearer","scope":"https://mail.google.com/"}"#;
        assert!(client.next(challenge).is_empty());
        assert!(client.next(b"").is_empty());
    }
}
