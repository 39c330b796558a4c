//! Provider configuration records.

use std::fmt;

use mailbridge_oauth::ProviderType;
use serde::{Deserialize, Serialize};

/// Unique identifier for a provider configuration record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConfigId(pub i64);

impl ConfigId {
    /// Creates a config ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ConfigId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `OAuth2` provider credentials for one registered application.
///
/// The token service only reads these values as refresh parameters; it
/// never persists them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Record ID, assigned on creation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<ConfigId>,
    /// Human-readable name (e.g. "work gmail").
    pub name: String,
    /// Provider this configuration belongs to.
    pub provider: ProviderType,
    /// `OAuth2` client ID.
    pub client_id: String,
    /// `OAuth2` client secret.
    pub client_secret: String,
    /// Redirect URI registered with the provider.
    pub redirect_uri: String,
    /// Scopes to request; provider defaults are assigned when empty.
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Whether this configuration may be used for sign-in and refresh.
    #[serde(default)]
    pub is_enabled: bool,
}

/// Validation error for a provider configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Configuration name is empty.
    EmptyName,
    /// Client ID is empty.
    EmptyClientId,
    /// Client secret is empty.
    EmptyClientSecret,
    /// Redirect URI is empty.
    EmptyRedirectUri,
}

impl ValidationError {
    /// Get human-readable error message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::EmptyName => "name is required",
            Self::EmptyClientId => "client ID is required",
            Self::EmptyClientSecret => "client secret is required",
            Self::EmptyRedirectUri => "redirect URI is required",
        }
    }

    /// Get the field name this error relates to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::EmptyName => "name",
            Self::EmptyClientId => "client_id",
            Self::EmptyClientSecret => "client_secret",
            Self::EmptyRedirectUri => "redirect_uri",
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ValidationError {}

/// Validate a provider configuration.
///
/// Returns `Ok(())` if valid, or all errors found.
///
/// # Errors
///
/// Returns a vector of `ValidationError` if any required field is empty.
pub fn validate_config(config: &ProviderConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.name.trim().is_empty() {
        errors.push(ValidationError::EmptyName);
    }
    if config.client_id.trim().is_empty() {
        errors.push(ValidationError::EmptyClientId);
    }
    if config.client_secret.trim().is_empty() {
        errors.push(ValidationError::EmptyClientSecret);
    }
    if config.redirect_uri.trim().is_empty() {
        errors.push(ValidationError::EmptyRedirectUri);
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
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

    fn valid_config() -> ProviderConfig {
        ProviderConfig {
            id: None,
            name: "work gmail".to_string(),
            provider: ProviderType::Gmail,
            client_id: "cid".to_string(),
            client_secret: "cs".to_string(),
            redirect_uri: "http://localhost:8080".to_string(),
            scopes: Vec::new(),
            is_enabled: true,
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_empty_fields_collected() {
        let config = ProviderConfig {
            name: String::new(),
            client_id: "  ".to_string(),
            ..valid_config()
        };

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::EmptyName, ValidationError::EmptyClientId]
        );
        assert_eq!(errors[0].field(), "name");
        assert_eq!(errors[1].message(), "client ID is required");
    }

    #[test]
    fn test_config_serde_round_trip() {
        let config = valid_config();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"provider\":\"gmail\""));

        let parsed: ProviderConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.name, config.name);
        assert_eq!(parsed.provider, config.provider);
    }

    #[test]
    fn test_config_serde_defaults() {
        let json = r#"{
            "name": "n",
            "provider": "outlook",
            "client_id": "cid",
            "client_secret": "cs",
            "redirect_uri": "http://localhost"
        }"#;

        let parsed: ProviderConfig = serde_json::from_str(json).unwrap();
        assert!(parsed.scopes.is_empty());
        assert!(!parsed.is_enabled);
        assert!(parsed.id.is_none());
    }
}
