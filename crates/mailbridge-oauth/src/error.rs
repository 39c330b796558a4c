//! Error types for `OAuth2` operations.

use std::fmt;

/// Result type alias for `OAuth2` operations.
pub type Result<T> = std::result::Result<T, Error>;

/// `OAuth2` error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Provider type is not one of the supported providers.
    #[error("unsupported provider type: {0}")]
    UnsupportedProvider(String),

    /// Request URL could not be constructed.
    #[error("failed to build request: {0}")]
    Request(#[from] url::ParseError),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Token endpoint returned a body that is not valid JSON.
    #[error("failed to parse token response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Well-formed `OAuth2` error payload from the provider.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Expected field absent from an otherwise successful response.
    #[error("{0} not found in response")]
    MissingField(&'static str),
}

/// `OAuth2` error payload returned by a provider's token endpoint.
///
/// Microsoft responses additionally carry `error_codes` and
/// `correlation_id`, which are included in the rendered message when
/// present.
#[derive(Debug, Clone)]
pub struct ProviderError {
    /// Error code (e.g., `invalid_grant`).
    pub error: String,
    /// Human-readable description.
    pub description: String,
    /// Numeric error codes (Microsoft).
    pub error_codes: Vec<i64>,
    /// Request correlation ID (Microsoft).
    pub correlation_id: Option<String>,
}

/// Diagnostic appended to `invalid_grant` errors, the most common and
/// least self-explanatory refresh failure.
const INVALID_GRANT_HINT: &str = "Possible causes: 1) Refresh token expired 2) Token already used 3) Invalid client_id 4) User revoked permissions";

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OAuth2 error: {} - {}", self.error, self.description)?;
        if !self.error_codes.is_empty() {
            write!(f, " (Error codes: {:?})", self.error_codes)?;
        }
        if let Some(correlation_id) = &self.correlation_id {
            write!(f, " (Correlation ID: {correlation_id})")?;
        }
        if self.error == "invalid_grant" {
            write!(f, "\n{INVALID_GRANT_HINT}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ProviderError {}

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
    fn test_provider_error_basic() {
        let err = ProviderError {
            error: "invalid_client".to_string(),
            description: "Client authentication failed".to_string(),
            error_codes: Vec::new(),
            correlation_id: None,
        };

        let rendered = err.to_string();
        assert_eq!(
            rendered,
            "OAuth2 error: invalid_client - Client authentication failed"
        );
    }

    #[test]
    fn test_provider_error_with_codes_and_correlation() {
        let err = ProviderError {
            error: "invalid_request".to_string(),
            description: "AADSTS90014: Missing required field".to_string(),
            error_codes: vec![90014],
            correlation_id: Some("7d9cb1f2-0000-0000-0000-000000000000".to_string()),
        };

        let rendered = err.to_string();
        assert!(rendered.contains("(Error codes: [90014])"));
        assert!(rendered.contains("(Correlation ID: 7d9cb1f2"));
    }

    #[test]
    fn test_invalid_grant_hint() {
        let err = ProviderError {
            error: "invalid_grant".to_string(),
            description: "Token has been expired or revoked".to_string(),
            error_codes: Vec::new(),
            correlation_id: None,
        };

        let rendered = err.to_string();
        assert!(rendered.contains("Possible causes: 1) Refresh token expired"));
        assert!(rendered.contains("4) User revoked permissions"));
    }

    #[test]
    fn test_hint_only_for_invalid_grant() {
        let err = ProviderError {
            error: "invalid_scope".to_string(),
            description: "The requested scope is invalid".to_string(),
            error_codes: Vec::new(),
            correlation_id: None,
        };

        assert!(!err.to_string().contains("Possible causes"));
    }

    #[test]
    fn test_missing_field_message() {
        let err = Error::MissingField("access_token");
        assert_eq!(err.to_string(), "access_token not found in response");
    }

    #[test]
    fn test_unsupported_provider_message() {
        let err = Error::UnsupportedProvider("yahoo".to_string());
        assert_eq!(err.to_string(), "unsupported provider type: yahoo");
    }
}
