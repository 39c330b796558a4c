//! Token cache domain types.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use mailbridge_oauth::ProviderType;
use sha2::{Digest, Sha256};

use crate::config::ProviderConfig;

/// Unique identifier for a mail account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccountId(pub i64);

impl AccountId {
    /// Creates an account ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Key identifying the refresh critical section for one mail account.
///
/// At most one refresh is in flight per `AccountKey` at any time;
/// distinct keys never block each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountKey {
    /// The account's provider.
    pub provider: ProviderType,
    /// The account's identifier.
    pub account: AccountId,
}

impl AccountKey {
    /// Creates an account key.
    #[must_use]
    pub const fn new(provider: ProviderType, account: AccountId) -> Self {
        Self { provider, account }
    }
}

impl fmt::Display for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.provider, self.account)
    }
}

/// Key identifying a cached token entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derives the cache key for a set of refresh parameters.
    ///
    /// The key combines provider, client ID, and a SHA-256 digest of the
    /// refresh token. The digest covers the full token, so distinct
    /// tokens sharing a prefix map to distinct entries.
    #[must_use]
    pub fn derive(params: &RefreshParams) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(params.refresh_token.as_bytes());
        let digest = URL_SAFE_NO_PAD.encode(hasher.finalize());

        Self(format!("{}_{}_{digest}", params.provider, params.client_id))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parameters for a `refresh_token` grant against a provider.
#[derive(Debug, Clone)]
pub struct RefreshParams {
    /// Provider to refresh against.
    pub provider: ProviderType,
    /// `OAuth2` client ID.
    pub client_id: String,
    /// `OAuth2` client secret.
    pub client_secret: String,
    /// Long-lived refresh token for the account.
    pub refresh_token: String,
}

impl RefreshParams {
    /// Creates refresh parameters.
    #[must_use]
    pub fn new(
        provider: ProviderType,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            refresh_token: refresh_token.into(),
        }
    }

    /// Creates refresh parameters from a provider config record and the
    /// account's refresh token.
    #[must_use]
    pub fn from_config(config: &ProviderConfig, refresh_token: impl Into<String>) -> Self {
        Self::new(
            config.provider,
            config.client_id.clone(),
            config.client_secret.clone(),
            refresh_token,
        )
    }
}

/// A cached access token.
///
/// Entries are immutable: every successful refresh replaces the entry
/// wholesale, so readers observe either a complete entry or none.
#[derive(Debug, Clone)]
pub struct TokenCacheEntry {
    /// The cached access token.
    pub access_token: String,
    /// When the token stops being served from cache.
    pub expires_at: DateTime<Utc>,
    /// When the token was obtained.
    pub refresh_time: DateTime<Utc>,
}

impl TokenCacheEntry {
    /// Returns true if the token is still inside its validity window,
    /// with `margin` subtracted to avoid handing out tokens that expire
    /// mid-session.
    #[must_use]
    pub fn is_fresh(&self, margin: Duration, now: DateTime<Utc>) -> bool {
        now < self.expires_at - margin
    }

    /// Returns true if the entry was refreshed within the last
    /// `throttle` window.
    #[must_use]
    pub fn recently_refreshed(&self, throttle: Duration, now: DateTime<Utc>) -> bool {
        now - self.refresh_time < throttle
    }
}

/// Timing policy for the token cache.
///
/// The validity window is fixed rather than derived from the provider's
/// reported `expires_in`: a conservative window holds across providers
/// and favors fewer expired-token failures over token hoarding.
#[derive(Debug, Clone, Copy)]
pub struct CachePolicy {
    /// Subtracted from `expires_at` when deciding freshness.
    pub freshness_margin: Duration,
    /// Lifetime assigned to every cached token.
    pub validity: Duration,
    /// Minimum interval between refreshes for the same cache key.
    pub throttle: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            freshness_margin: Duration::minutes(5),
            validity: Duration::minutes(55),
            throttle: Duration::seconds(30),
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

    fn params(refresh_token: &str) -> RefreshParams {
        RefreshParams::new(ProviderType::Gmail, "client-1", "secret", refresh_token)
    }

    #[test]
    fn test_account_key_display() {
        let key = AccountKey::new(ProviderType::Outlook, AccountId::new(42));
        assert_eq!(key.to_string(), "outlook_42");
    }

    #[test]
    fn test_cache_key_stable() {
        let a = CacheKey::derive(&params("1/refresh-token-value"));
        let b = CacheKey::derive(&params("1/refresh-token-value"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_cache_key_distinguishes_shared_prefixes() {
        // Tokens identical through the first 10+ characters must still
        // map to distinct entries.
        let a = CacheKey::derive(&params("1/shared-prefix-AAAA"));
        let b = CacheKey::derive(&params("1/shared-prefix-BBBB"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_cache_key_distinguishes_client_ids() {
        let token = "1/refresh";
        let a = CacheKey::derive(&RefreshParams::new(
            ProviderType::Gmail,
            "client-a",
            "s",
            token,
        ));
        let b = CacheKey::derive(&RefreshParams::new(
            ProviderType::Gmail,
            "client-b",
            "s",
            token,
        ));
        assert_ne!(a, b);
    }

    #[test]
    fn test_entry_freshness() {
        let now = Utc::now();
        let margin = Duration::minutes(5);

        let entry = TokenCacheEntry {
            access_token: "tok".to_string(),
            expires_at: now + Duration::minutes(56),
            refresh_time: now - Duration::minutes(10),
        };
        assert!(entry.is_fresh(margin, now));

        let expiring = TokenCacheEntry {
            expires_at: now + Duration::minutes(4),
            ..entry.clone()
        };
        assert!(!expiring.is_fresh(margin, now));
    }

    #[test]
    fn test_entry_throttle_window() {
        let now = Utc::now();
        let throttle = Duration::seconds(30);

        let entry = TokenCacheEntry {
            access_token: "tok".to_string(),
            expires_at: now,
            refresh_time: now - Duration::seconds(10),
        };
        assert!(entry.recently_refreshed(throttle, now));

        let old = TokenCacheEntry {
            refresh_time: now - Duration::seconds(31),
            ..entry.clone()
        };
        assert!(!old.recently_refreshed(throttle, now));
    }

    #[test]
    fn test_refresh_params_from_config() {
        let config = ProviderConfig {
            id: None,
            name: "work gmail".to_string(),
            provider: ProviderType::Gmail,
            client_id: "cid".to_string(),
            client_secret: "cs".to_string(),
            redirect_uri: "http://localhost:8080".to_string(),
            scopes: Vec::new(),
            is_enabled: true,
        };

        let params = RefreshParams::from_config(&config, "1/token");
        assert_eq!(params.provider, ProviderType::Gmail);
        assert_eq!(params.client_id, "cid");
        assert_eq!(params.client_secret, "cs");
        assert_eq!(params.refresh_token, "1/token");
    }

    #[test]
    fn test_default_policy() {
        let policy = CachePolicy::default();
        assert_eq!(policy.freshness_margin, Duration::minutes(5));
        assert_eq!(policy.validity, Duration::minutes(55));
        assert_eq!(policy.throttle, Duration::seconds(30));
    }
}
