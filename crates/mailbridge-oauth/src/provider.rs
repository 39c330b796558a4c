//! `OAuth2` provider registry.
//!
//! Providers form a closed set: endpoint and scope differences live in a
//! static per-provider table rather than in conditional branches at each
//! call site. Adding a provider means adding a variant and a table row.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Supported mail `OAuth2` providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    /// Google / Gmail.
    Gmail,
    /// Microsoft / Outlook.
    Outlook,
}

/// Static endpoint and scope record for one provider.
#[derive(Debug, Clone, Copy)]
pub struct ProviderProfile {
    /// Token endpoint (refresh_token and authorization_code grants).
    pub token_url: &'static str,
    /// Authorization endpoint (user consent).
    pub auth_url: &'static str,
    /// Space-joined scope string sent with token requests.
    pub scope: &'static str,
    /// Individual scopes, used as defaults for config records.
    pub default_scopes: &'static [&'static str],
}

const GMAIL: ProviderProfile = ProviderProfile {
    token_url: "https://oauth2.googleapis.com/token",
    auth_url: "https://accounts.google.com/o/oauth2/auth",
    scope: "https://mail.google.com/ https://www.googleapis.com/auth/userinfo.email https://www.googleapis.com/auth/userinfo.profile",
    default_scopes: &[
        "https://mail.google.com/",
        "https://www.googleapis.com/auth/userinfo.email",
        "https://www.googleapis.com/auth/userinfo.profile",
    ],
};

const OUTLOOK: ProviderProfile = ProviderProfile {
    token_url: "https://login.microsoftonline.com/common/oauth2/v2.0/token",
    auth_url: "https://login.microsoftonline.com/common/oauth2/v2.0/authorize",
    scope: "https://outlook.office.com/IMAP.AccessAsUser.All offline_access",
    default_scopes: &[
        "https://outlook.office.com/IMAP.AccessAsUser.All",
        "offline_access",
    ],
};

impl ProviderType {
    /// Returns the endpoint and scope record for this provider.
    #[must_use]
    pub const fn profile(self) -> &'static ProviderProfile {
        match self {
            Self::Gmail => &GMAIL,
            Self::Outlook => &OUTLOOK,
        }
    }

    /// Returns the wire name (`"gmail"` / `"outlook"`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gmail => "gmail",
            Self::Outlook => "outlook",
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gmail" => Ok(Self::Gmail),
            "outlook" => Ok(Self::Outlook),
            other => Err(Error::UnsupportedProvider(other.to_string())),
        }
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
    fn test_gmail_profile() {
        let profile = ProviderType::Gmail.profile();
        assert_eq!(profile.token_url, "https://oauth2.googleapis.com/token");
        assert_eq!(profile.auth_url, "https://accounts.google.com/o/oauth2/auth");
        assert!(profile.scope.starts_with("https://mail.google.com/"));
        assert_eq!(profile.default_scopes.len(), 3);
    }

    #[test]
    fn test_outlook_profile() {
        let profile = ProviderType::Outlook.profile();
        assert_eq!(
            profile.token_url,
            "https://login.microsoftonline.com/common/oauth2/v2.0/token"
        );
        assert_eq!(
            profile.auth_url,
            "https://login.microsoftonline.com/common/oauth2/v2.0/authorize"
        );
        assert!(profile.scope.contains("offline_access"));
        assert_eq!(profile.default_scopes.len(), 2);
    }

    #[test]
    fn test_scope_matches_default_scopes() {
        for provider in [ProviderType::Gmail, ProviderType::Outlook] {
            let profile = provider.profile();
            assert_eq!(profile.scope, profile.default_scopes.join(" "));
        }
    }

    #[test]
    fn test_parse_round_trip() {
        for provider in [ProviderType::Gmail, ProviderType::Outlook] {
            let parsed: ProviderType = provider.as_str().parse().unwrap();
            assert_eq!(parsed, provider);
        }
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let err = ProviderType::from_str("yahoo").unwrap_err();
        assert!(matches!(err, Error::UnsupportedProvider(ref name) if name == "yahoo"));

        // Case-sensitive wire names, as stored in config records.
        assert!(ProviderType::from_str("Gmail").is_err());
        assert!(ProviderType::from_str("").is_err());
    }

    #[test]
    fn test_serde_wire_names() {
        let json = serde_json::to_string(&ProviderType::Gmail).unwrap();
        assert_eq!(json, "\"gmail\"");

        let parsed: ProviderType = serde_json::from_str("\"outlook\"").unwrap();
        assert_eq!(parsed, ProviderType::Outlook);

        assert!(serde_json::from_str::<ProviderType>("\"yahoo\"").is_err());
    }
}
