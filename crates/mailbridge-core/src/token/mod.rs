//! Token cache and refresh orchestration.
//!
//! [`TokenService`] hands out usable access tokens for mail accounts,
//! refreshing through the provider only when the cached token is stale.
//! Concurrent callers for the same account collapse into a single
//! provider call: the first caller refreshes under the account's lock
//! while the rest wait, then find the fresh entry on recheck.
//!
//! The protocol for one [`access_token`] call:
//!
//! 1. check the cache (no lock, no network)
//! 2. acquire the account lock
//! 3. recheck the cache under the lock
//! 4. reject if the entry was refreshed inside the throttle window
//! 5. refresh through the token source
//! 6. replace the cache entry wholesale and return
//!
//! [`access_token`]: TokenService::access_token

mod locks;
mod model;

pub use locks::AccountLockRegistry;
pub use model::{
    AccountId, AccountKey, CacheKey, CachePolicy, RefreshParams, TokenCacheEntry,
};

use std::collections::HashMap;
use std::future::Future;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use mailbridge_oauth::{RefreshedToken, TokenClient};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Source of fresh access tokens.
///
/// The seam between the cache orchestration and the provider's token
/// endpoint. [`TokenClient`] is the production implementation; tests
/// substitute their own.
pub trait TokenSource: Send + Sync {
    /// Performs a `refresh_token` grant and returns the new access token.
    fn refresh_access_token(
        &self,
        params: &RefreshParams,
    ) -> impl Future<Output = mailbridge_oauth::Result<RefreshedToken>> + Send;
}

impl TokenSource for TokenClient {
    fn refresh_access_token(
        &self,
        params: &RefreshParams,
    ) -> impl Future<Output = mailbridge_oauth::Result<RefreshedToken>> + Send {
        self.refresh(
            params.provider,
            &params.client_id,
            &params.client_secret,
            &params.refresh_token,
        )
    }
}

/// Caching token service for mail accounts.
///
/// Owns the token cache and the per-account lock registry. Construct one
/// instance and share it by reference with every mail-sync worker;
/// independent instances (e.g. in tests) have fully independent state.
#[derive(Debug)]
pub struct TokenService<S = TokenClient> {
    source: S,
    policy: CachePolicy,
    cache: RwLock<HashMap<CacheKey, TokenCacheEntry>>,
    locks: AccountLockRegistry,
}

impl TokenService {
    /// Creates a token service backed by a [`TokenClient`].
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new() -> Result<Self> {
        Ok(Self::with_source(TokenClient::new()?))
    }
}

impl<S> TokenService<S> {
    /// Creates a token service backed by a custom token source.
    #[must_use]
    pub fn with_source(source: S) -> Self {
        Self {
            source,
            policy: CachePolicy::default(),
            cache: RwLock::new(HashMap::new()),
            locks: AccountLockRegistry::new(),
        }
    }

    /// Overrides the cache timing policy.
    #[must_use]
    pub fn with_policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl<S: TokenSource> TokenService<S> {
    /// Returns a usable access token for the account, refreshing through
    /// the provider if the cached token is missing or stale.
    ///
    /// Refreshes for the same account key are strictly serialized;
    /// refreshes for different account keys proceed in parallel. A
    /// failed refresh leaves any prior cache entry untouched, so a
    /// subsequent call can retry independently.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Throttled`] if the entry was refreshed within
    /// the throttle window, or the underlying `OAuth2` error if the
    /// provider call fails. Errors are never retried internally.
    pub async fn access_token(
        &self,
        account: &AccountKey,
        params: &RefreshParams,
    ) -> Result<String> {
        let key = CacheKey::derive(params);

        if let Some(token) = self.cached_fresh(&key) {
            debug!("using cached token for account {account}");
            return Ok(token);
        }

        // Serializes refreshes for this account without blocking others.
        let account_lock = self.locks.lock_for(account);
        let _guard = account_lock.lock().await;

        // Another caller may have refreshed while this one waited.
        if let Some(token) = self.cached_fresh(&key) {
            debug!("using cached token after lock for account {account}");
            return Ok(token);
        }

        if let Some(refresh_time) = self.throttled_until(&key) {
            warn!("throttling refresh for account {account}, last refresh at {refresh_time}");
            return Err(Error::Throttled);
        }

        info!(
            "refreshing token for account {account} (provider {})",
            params.provider
        );
        let refreshed = self.source.refresh_access_token(params).await?;

        let now = Utc::now();
        let entry = TokenCacheEntry {
            access_token: refreshed.access_token,
            expires_at: now + self.policy.validity,
            refresh_time: now,
        };
        let token = entry.access_token.clone();
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, entry);

        debug!("token refreshed and cached for account {account}");
        Ok(token)
    }

    /// Returns the cached token if it is still fresh.
    fn cached_fresh(&self, key: &CacheKey) -> Option<String> {
        let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
        let entry = cache.get(key)?;
        entry
            .is_fresh(self.policy.freshness_margin, Utc::now())
            .then(|| entry.access_token.clone())
    }

    /// Returns the last refresh time if the entry is inside the
    /// throttle window.
    fn throttled_until(&self, key: &CacheKey) -> Option<DateTime<Utc>> {
        let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
        let entry = cache.get(key)?;
        entry
            .recently_refreshed(self.policy.throttle, Utc::now())
            .then_some(entry.refresh_time)
    }

    #[cfg(test)]
    fn seed_entry(&self, key: CacheKey, entry: TokenCacheEntry) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, entry);
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
    use chrono::Duration;
    use mailbridge_oauth::{ProviderError, ProviderType};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts refreshes; fails the first `fail_first` calls.
    struct CountingSource {
        calls: AtomicUsize,
        fail_first: usize,
    }

    impl CountingSource {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_first: 0,
            }
        }

        fn failing_first(count: usize) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_first: count,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl TokenSource for CountingSource {
        fn refresh_access_token(
            &self,
            _params: &RefreshParams,
        ) -> impl Future<Output = mailbridge_oauth::Result<RefreshedToken>> + Send {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            let fail = call <= self.fail_first;
            async move {
                if fail {
                    Err(ProviderError {
                        error: "invalid_grant".to_string(),
                        description: "refresh token expired".to_string(),
                        error_codes: Vec::new(),
                        correlation_id: None,
                    }
                    .into())
                } else {
                    Ok(RefreshedToken {
                        access_token: format!("token-{call}"),
                        expires_in: Some(3599),
                    })
                }
            }
        }
    }

    fn account() -> AccountKey {
        AccountKey::new(ProviderType::Gmail, AccountId::new(1))
    }

    fn params() -> RefreshParams {
        RefreshParams::new(ProviderType::Gmail, "client", "secret", "1/refresh")
    }

    fn entry(access_token: &str, expires_in: Duration, refreshed_ago: Duration) -> TokenCacheEntry {
        let now = Utc::now();
        TokenCacheEntry {
            access_token: access_token.to_string(),
            expires_at: now + expires_in,
            refresh_time: now - refreshed_ago,
        }
    }

    #[tokio::test]
    async fn test_fresh_entry_hits_without_network() {
        let service = TokenService::with_source(CountingSource::new());
        let params = params();
        service.seed_entry(
            CacheKey::derive(&params),
            entry("cached", Duration::minutes(56), Duration::minutes(10)),
        );

        let token = service.access_token(&account(), &params).await.unwrap();
        assert_eq!(token, "cached");
        assert_eq!(service.source.calls(), 0);
    }

    #[tokio::test]
    async fn test_entry_inside_margin_refreshes_once() {
        let service = TokenService::with_source(CountingSource::new());
        let params = params();
        service.seed_entry(
            CacheKey::derive(&params),
            entry("stale", Duration::minutes(4), Duration::minutes(10)),
        );

        let token = service.access_token(&account(), &params).await.unwrap();
        assert_eq!(token, "token-1");
        assert_eq!(service.source.calls(), 1);
    }

    #[tokio::test]
    async fn test_recent_refresh_is_throttled() {
        let service = TokenService::with_source(CountingSource::new());
        let params = params();
        service.seed_entry(
            CacheKey::derive(&params),
            entry("stale", Duration::minutes(0), Duration::seconds(10)),
        );

        let err = service.access_token(&account(), &params).await.unwrap_err();
        assert!(matches!(err, Error::Throttled));
        assert_eq!(service.source.calls(), 0);
    }

    #[tokio::test]
    async fn test_throttle_window_elapses() {
        let service = TokenService::with_source(CountingSource::new());
        let params = params();
        service.seed_entry(
            CacheKey::derive(&params),
            entry("stale", Duration::minutes(0), Duration::seconds(31)),
        );

        let token = service.access_token(&account(), &params).await.unwrap();
        assert_eq!(token, "token-1");
        assert_eq!(service.source.calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_leaves_prior_entry() {
        let service = TokenService::with_source(CountingSource::failing_first(1));
        let params = params();
        let key = CacheKey::derive(&params);
        let stale = entry("old-token", Duration::minutes(4), Duration::minutes(10));
        service.seed_entry(key.clone(), stale.clone());

        let err = service.access_token(&account(), &params).await.unwrap_err();
        assert!(matches!(err, Error::Oauth(_)));
        assert!(err.to_string().contains("invalid_grant"));

        // The stale entry is still present, unchanged.
        let cache = service.cache.read().unwrap();
        let kept = cache.get(&key).unwrap();
        assert_eq!(kept.access_token, "old-token");
        assert_eq!(kept.refresh_time, stale.refresh_time);
    }

    #[tokio::test]
    async fn test_successful_refresh_replaces_entry() {
        let service = TokenService::with_source(CountingSource::new());
        let params = params();
        let key = CacheKey::derive(&params);
        service.seed_entry(
            key.clone(),
            entry("old-token", Duration::minutes(4), Duration::minutes(10)),
        );

        let before = Utc::now();
        let token = service.access_token(&account(), &params).await.unwrap();
        assert_eq!(token, "token-1");

        let cache = service.cache.read().unwrap();
        let stored = cache.get(&key).unwrap();
        assert_eq!(stored.access_token, "token-1");
        assert!(stored.refresh_time >= before);
        assert_eq!(stored.expires_at, stored.refresh_time + Duration::minutes(55));
    }

    #[tokio::test]
    async fn test_retry_after_failure_succeeds() {
        let service = TokenService::with_source(CountingSource::failing_first(1));
        let params = params();

        assert!(service.access_token(&account(), &params).await.is_err());
        // No entry was stored, so the retry is not throttled.
        let token = service.access_token(&account(), &params).await.unwrap();
        assert_eq!(token, "token-2");
        assert_eq!(service.source.calls(), 2);
    }

    #[tokio::test]
    async fn test_distinct_refresh_tokens_cache_separately() {
        let service = TokenService::with_source(CountingSource::new());
        let first = params();
        let second = RefreshParams::new(ProviderType::Gmail, "client", "secret", "1/other");

        let a = service.access_token(&account(), &first).await.unwrap();
        let b = service.access_token(&account(), &second).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(service.source.calls(), 2);
    }
}
