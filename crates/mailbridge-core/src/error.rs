//! Error types for the core library.

use thiserror::Error;

use crate::config::ValidationError;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// `OAuth2` client operation failed.
    #[error("OAuth2 error: {0}")]
    Oauth(#[from] mailbridge_oauth::Error),

    /// Refresh attempted inside the throttle window.
    #[error("token refresh throttled, please wait a moment")]
    Throttled,

    /// No configuration record matched the lookup.
    #[error("OAuth2 configuration not found for {0}")]
    ConfigNotFound(String),

    /// The provider's configuration exists but is disabled.
    #[error("OAuth2 is not enabled for provider {0}")]
    ConfigDisabled(mailbridge_oauth::ProviderType),

    /// A configuration update was attempted without a record ID.
    #[error("configuration record has no ID")]
    MissingConfigId,

    /// Configuration failed required-field validation.
    #[error("invalid configuration: {}", join_messages(.0))]
    InvalidConfig(Vec<ValidationError>),
}

fn join_messages(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ValidationError::message)
        .collect::<Vec<_>>()
        .join(", ")
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
    fn test_invalid_config_message() {
        let err = Error::InvalidConfig(vec![
            ValidationError::EmptyName,
            ValidationError::EmptyRedirectUri,
        ]);
        assert_eq!(
            err.to_string(),
            "invalid configuration: name is required, redirect URI is required"
        );
    }

    #[test]
    fn test_oauth_error_wrapped() {
        let err = Error::from(mailbridge_oauth::Error::MissingField("access_token"));
        assert_eq!(
            err.to_string(),
            "OAuth2 error: access_token not found in response"
        );
    }
}
