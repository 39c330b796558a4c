//! Integration tests for the token cache service.
//!
//! These tests use a mock token source to observe how many provider
//! refresh calls the service issues under sequential and concurrent
//! access, without requiring a real token endpoint.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration as StdDuration;

use chrono::Duration;
use tokio::time::Instant;

use mailbridge_core::{
    AccountId, AccountKey, CachePolicy, Error, RefreshParams, TokenService, TokenSource,
};
use mailbridge_oauth::{ProviderType, RefreshedToken};

/// Mock token source that counts refreshes and can simulate a slow
/// provider for selected refresh tokens.
struct MockSource {
    calls: Arc<AtomicUsize>,
    slow_delay: StdDuration,
}

impl MockSource {
    fn new() -> (Self, Arc<AtomicUsize>) {
        Self::with_slow_delay(StdDuration::ZERO)
    }

    /// Refreshes for tokens starting with `slow/` take `delay` to
    /// complete; all others return immediately.
    fn with_slow_delay(delay: StdDuration) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                calls: Arc::clone(&calls),
                slow_delay: delay,
            },
            calls,
        )
    }
}

impl TokenSource for MockSource {
    fn refresh_access_token(
        &self,
        params: &RefreshParams,
    ) -> impl Future<Output = mailbridge_oauth::Result<RefreshedToken>> + Send {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let delay = if params.refresh_token.starts_with("slow/") {
            self.slow_delay
        } else {
            StdDuration::ZERO
        };

        async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            Ok(RefreshedToken {
                access_token: format!("token-{call}"),
                expires_in: Some(3599),
            })
        }
    }
}

fn account(id: i64) -> AccountKey {
    AccountKey::new(ProviderType::Gmail, AccountId::new(id))
}

fn params(refresh_token: &str) -> RefreshParams {
    RefreshParams::new(ProviderType::Gmail, "client", "secret", refresh_token)
}

#[tokio::test]
async fn test_sequential_calls_hit_cache() {
    let (source, calls) = MockSource::new();
    let service = TokenService::with_source(source);
    let account = account(1);
    let params = params("1/refresh");

    let first = service.access_token(&account, &params).await.unwrap();
    let second = service.access_token(&account, &params).await.unwrap();

    assert_eq!(first, "token-1");
    assert_eq!(second, "token-1");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_concurrent_same_account_single_refresh() {
    let (source, calls) = MockSource::with_slow_delay(StdDuration::from_millis(150));
    let service = Arc::new(TokenService::with_source(source));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            service
                .access_token(&account(1), &params("slow/refresh"))
                .await
                .unwrap()
        }));
    }

    for handle in handles {
        // Every caller observes the value written by the single refresh.
        assert_eq!(handle.await.unwrap(), "token-1");
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_distinct_accounts_do_not_block() {
    let (source, calls) = MockSource::with_slow_delay(StdDuration::from_millis(500));
    let service = Arc::new(TokenService::with_source(source));

    let slow = {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            service
                .access_token(&account(1), &params("slow/refresh"))
                .await
                .unwrap()
        })
    };

    // Give the slow refresh time to take its account lock.
    tokio::time::sleep(StdDuration::from_millis(50)).await;

    let start = Instant::now();
    let fast = service
        .access_token(&account(2), &params("1/other"))
        .await
        .unwrap();
    let elapsed = start.elapsed();

    // The fast account completed while the slow refresh was still in
    // flight.
    assert!(
        elapsed < StdDuration::from_millis(250),
        "fast account blocked for {elapsed:?}"
    );
    assert!(fast.starts_with("token-"));

    assert!(slow.await.unwrap().starts_with("token-"));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_refresh_inside_throttle_window_rejected() {
    let (source, calls) = MockSource::new();
    // Zero validity makes every stored entry immediately stale, so the
    // second call reaches the throttle check.
    let service = TokenService::with_source(source).with_policy(CachePolicy {
        freshness_margin: Duration::minutes(5),
        validity: Duration::zero(),
        throttle: Duration::seconds(30),
    });
    let account = account(1);
    let params = params("1/refresh");

    let first = service.access_token(&account, &params).await.unwrap();
    assert_eq!(first, "token-1");

    let err = service.access_token(&account, &params).await.unwrap_err();
    assert!(matches!(err, Error::Throttled));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_entry_inside_freshness_margin_refreshes() {
    let (source, calls) = MockSource::new();
    // Tokens live 4 minutes but the margin is 5, so every cached entry
    // is already inside the margin on the next call.
    let service = TokenService::with_source(source).with_policy(CachePolicy {
        freshness_margin: Duration::minutes(5),
        validity: Duration::minutes(4),
        throttle: Duration::zero(),
    });
    let account = account(1);
    let params = params("1/refresh");

    let first = service.access_token(&account, &params).await.unwrap();
    let second = service.access_token(&account, &params).await.unwrap();

    assert_eq!(first, "token-1");
    assert_eq!(second, "token-2");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_independent_services_do_not_share_state() {
    let (source_a, calls_a) = MockSource::new();
    let (source_b, calls_b) = MockSource::new();
    let service_a = TokenService::with_source(source_a);
    let service_b = TokenService::with_source(source_b);
    let account = account(1);
    let params = params("1/refresh");

    service_a.access_token(&account, &params).await.unwrap();
    service_b.access_token(&account, &params).await.unwrap();

    assert_eq!(calls_a.load(Ordering::SeqCst), 1);
    assert_eq!(calls_b.load(Ordering::SeqCst), 1);
}
