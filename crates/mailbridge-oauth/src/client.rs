//! Token endpoint client.
//!
//! Performs the `refresh_token` and `authorization_code` grants against a
//! provider's token endpoint and builds authorization URLs. Responses are
//! parsed from the raw body rather than branching on the HTTP status:
//! providers return well-formed `OAuth2` error payloads with non-2xx
//! statuses, and the `error` field is the authoritative signal.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::{Error, ProviderError, Result};
use crate::provider::ProviderType;

/// Bound on every token endpoint request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Access token obtained from a `refresh_token` grant.
///
/// `expires_in` is the provider-reported lifetime in seconds. It is
/// surfaced for logging; callers decide their own validity window.
#[derive(Debug, Clone)]
pub struct RefreshedToken {
    /// The new access token.
    pub access_token: String,
    /// Provider-reported lifetime in seconds, when present.
    pub expires_in: Option<u64>,
}

/// Token pair obtained from an `authorization_code` grant.
#[derive(Debug, Clone)]
pub struct CodeGrant {
    /// Short-lived access token.
    pub access_token: String,
    /// Long-lived refresh token.
    pub refresh_token: String,
}

/// Client for provider token endpoints.
#[derive(Debug, Clone)]
pub struct TokenClient {
    http: reqwest::Client,
}

impl TokenClient {
    /// Creates a new token client with a bounded request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { http })
    }

    /// Exchanges a refresh token for a new access token.
    ///
    /// Sends `grant_type=refresh_token` with the provider's scope string.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the body is not valid JSON,
    /// the provider reports an `OAuth2` error, or `access_token` is absent.
    pub async fn refresh(
        &self,
        provider: ProviderType,
        client_id: &str,
        client_secret: &str,
        refresh_token: &str,
    ) -> Result<RefreshedToken> {
        let profile = provider.profile();

        debug!(
            "refreshing token for provider {provider}, client_id {client_id}, \
             refresh token length {}",
            refresh_token.len()
        );

        let params = [
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("scope", profile.scope),
        ];

        let response = self.http.post(profile.token_url).form(&params).send().await?;
        debug!("token endpoint responded with status {}", response.status());

        let raw = response.text().await?;
        let token = Self::refresh_from_body(&raw)?;

        debug!(
            "obtained access token (length {}), expires in {} seconds",
            token.access_token.len(),
            token
                .expires_in
                .map_or_else(|| "unknown".to_string(), |secs| secs.to_string())
        );

        Ok(token)
    }

    /// Exchanges an authorization code for an access/refresh token pair.
    ///
    /// Sends `grant_type=authorization_code`. Unlike the refresh path,
    /// both `access_token` and `refresh_token` must be present in the
    /// response.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the body is not valid JSON,
    /// the provider reports an `OAuth2` error, or either token is absent.
    pub async fn exchange_code(
        &self,
        provider: ProviderType,
        client_id: &str,
        client_secret: &str,
        code: &str,
        redirect_uri: &str,
    ) -> Result<CodeGrant> {
        let profile = provider.profile();

        let params = [
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ];

        let response = self.http.post(profile.token_url).form(&params).send().await?;
        debug!("token endpoint responded with status {}", response.status());

        let raw = response.text().await?;
        Self::grant_from_body(&raw)
    }

    /// Builds the authorization URL a user visits to grant consent.
    ///
    /// `state` is the caller-supplied CSRF/session correlation value and
    /// is passed through opaquely.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider's authorization URL cannot be
    /// parsed.
    pub fn build_auth_url(
        provider: ProviderType,
        client_id: &str,
        redirect_uri: &str,
        state: &str,
    ) -> Result<Url> {
        let profile = provider.profile();
        let mut url = Url::parse(profile.auth_url)?;

        url.query_pairs_mut()
            .append_pair("client_id", client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", profile.scope)
            .append_pair("state", state)
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent");

        Ok(url)
    }

    /// Parses a refresh response body.
    fn refresh_from_body(raw: &str) -> Result<RefreshedToken> {
        let body = parse_body(raw)?;
        let access_token = body
            .access_token
            .ok_or(Error::MissingField("access_token"))?;

        Ok(RefreshedToken {
            access_token,
            expires_in: body.expires_in,
        })
    }

    /// Parses a code exchange response body.
    fn grant_from_body(raw: &str) -> Result<CodeGrant> {
        let body = parse_body(raw)?;
        let access_token = body
            .access_token
            .ok_or(Error::MissingField("access_token"))?;
        let refresh_token = body
            .refresh_token
            .ok_or(Error::MissingField("refresh_token"))?;

        Ok(CodeGrant {
            access_token,
            refresh_token,
        })
    }
}

/// Token endpoint response body, success and error fields combined.
#[derive(Debug, Deserialize)]
struct TokenResponseBody {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
    error: Option<String>,
    error_description: Option<String>,
    error_codes: Option<Vec<i64>>,
    correlation_id: Option<String>,
}

/// Parses a token endpoint body and promotes the `error` field, when
/// present, to a [`ProviderError`].
fn parse_body(raw: &str) -> Result<TokenResponseBody> {
    let body: TokenResponseBody = serde_json::from_str(raw).inspect_err(|_| {
        debug!("failed to parse token response, raw body: {raw}");
    })?;

    if let Some(error) = body.error {
        return Err(ProviderError {
            error,
            description: body.error_description.unwrap_or_default(),
            error_codes: body.error_codes.unwrap_or_default(),
            correlation_id: body.correlation_id,
        }
        .into());
    }

    Ok(body)
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
    fn test_refresh_from_success_body() {
        let raw = r#"{"access_token":"ya29.new","token_type":"Bearer","expires_in":3599}"#;
        let token = TokenClient::refresh_from_body(raw).unwrap();
        assert_eq!(token.access_token, "ya29.new");
        assert_eq!(token.expires_in, Some(3599));
    }

    #[test]
    fn test_refresh_missing_access_token() {
        let raw = r#"{"token_type":"Bearer","expires_in":3599}"#;
        let err = TokenClient::refresh_from_body(raw).unwrap_err();
        assert!(matches!(err, Error::MissingField("access_token")));
    }

    #[test]
    fn test_refresh_does_not_require_refresh_token() {
        // A refresh response is not expected to return a new refresh token.
        let raw = r#"{"access_token":"tok","expires_in":3600}"#;
        assert!(TokenClient::refresh_from_body(raw).is_ok());
    }

    #[test]
    fn test_grant_requires_both_tokens() {
        let raw = r#"{"access_token":"tok","refresh_token":"ref"}"#;
        let grant = TokenClient::grant_from_body(raw).unwrap();
        assert_eq!(grant.access_token, "tok");
        assert_eq!(grant.refresh_token, "ref");

        let missing = r#"{"access_token":"tok"}"#;
        let err = TokenClient::grant_from_body(missing).unwrap_err();
        assert!(matches!(err, Error::MissingField("refresh_token")));
    }

    #[test]
    fn test_error_payload_promoted() {
        let raw = r#"{
            "error": "invalid_grant",
            "error_description": "AADSTS70000: refresh token expired",
            "error_codes": [70000],
            "correlation_id": "2a4b0000-0000-0000-0000-000000000000"
        }"#;

        let err = TokenClient::refresh_from_body(raw).unwrap_err();
        let Error::Provider(provider_err) = err else {
            panic!("expected provider error, got {err:?}");
        };

        assert_eq!(provider_err.error, "invalid_grant");
        assert_eq!(provider_err.error_codes, vec![70000]);
        let rendered = provider_err.to_string();
        assert!(rendered.contains("AADSTS70000"));
        assert!(rendered.contains("(Error codes: [70000])"));
        assert!(rendered.contains("(Correlation ID: 2a4b0000"));
        assert!(rendered.contains("Possible causes: 1) Refresh token expired"));
    }

    #[test]
    fn test_error_without_description() {
        let raw = r#"{"error":"invalid_client"}"#;
        let err = TokenClient::refresh_from_body(raw).unwrap_err();
        let Error::Provider(provider_err) = err else {
            panic!("expected provider error");
        };
        assert_eq!(provider_err.description, "");
        assert!(provider_err.correlation_id.is_none());
    }

    #[test]
    fn test_malformed_body() {
        let err = TokenClient::refresh_from_body("<html>502 Bad Gateway</html>").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_auth_url_gmail() {
        let url = TokenClient::build_auth_url(
            ProviderType::Gmail,
            "client-123",
            "http://localhost:8080/callback",
            "state-xyz",
        )
        .unwrap();

        assert!(url.as_str().starts_with("https://accounts.google.com/o/oauth2/auth?"));
        assert!(url.as_str().contains("client_id=client-123"));
        assert!(url.as_str().contains("response_type=code"));
        assert!(url.as_str().contains("state=state-xyz"));
        assert!(url.as_str().contains("access_type=offline"));
        assert!(url.as_str().contains("prompt=consent"));
        // Check URL-encoded redirect_uri
        assert!(
            url.as_str()
                .contains("redirect_uri=http%3A%2F%2Flocalhost%3A8080%2Fcallback")
        );
    }

    #[test]
    fn test_auth_url_outlook_scope() {
        let url = TokenClient::build_auth_url(
            ProviderType::Outlook,
            "client-123",
            "http://localhost:8080",
            "s",
        )
        .unwrap();

        let (_, scope) = url
            .query_pairs()
            .find(|(key, _)| key == "scope")
            .unwrap();
        assert_eq!(
            scope,
            "https://outlook.office.com/IMAP.AccessAsUser.All offline_access"
        );
    }
}
