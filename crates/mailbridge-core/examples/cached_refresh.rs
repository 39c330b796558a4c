//! Example: cached token refresh for a mail account
//!
//! This example demonstrates how to:
//! 1. Register a provider configuration
//! 2. Obtain an access token through the caching token service
//! 3. Observe the second request being served from cache
//! 4. Generate the SASL XOAUTH2 string for IMAP/SMTP
//!
//! ## Prerequisites
//!
//! A refresh token obtained through the authorization code flow (see the
//! `gmail_signin` example in `mailbridge-oauth`), plus:
//!
//! ```bash
//! export OAUTH_PROVIDER="gmail"            # or "outlook"
//! export OAUTH_CLIENT_ID="your-client-id"
//! export OAUTH_CLIENT_SECRET="your-client-secret"
//! export OAUTH_REFRESH_TOKEN="your-refresh-token"
//! export OAUTH_EMAIL="your-email@gmail.com"
//! ```
//!
//! ## Running
//!
//! ```bash
//! RUST_LOG=debug cargo run --example cached_refresh
//! ```

use std::env;

use anyhow::Context;
use mailbridge_core::{
    AccountId, AccountKey, ConfigRepository, ProviderConfig, ProviderType, RefreshParams,
    TokenService,
};
use mailbridge_oauth::sasl;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let provider: ProviderType = env::var("OAUTH_PROVIDER")
        .unwrap_or_else(|_| "gmail".to_string())
        .parse()?;
    let client_id = env::var("OAUTH_CLIENT_ID").context("OAUTH_CLIENT_ID not set")?;
    let client_secret = env::var("OAUTH_CLIENT_SECRET").context("OAUTH_CLIENT_SECRET not set")?;
    let refresh_token = env::var("OAUTH_REFRESH_TOKEN").context("OAUTH_REFRESH_TOKEN not set")?;
    let email = env::var("OAUTH_EMAIL").context("OAUTH_EMAIL not set")?;

    println!("mailbridge Example - cached token refresh");
    println!("=========================================\n");

    // Step 1: Register the provider configuration
    println!("Step 1: Registering provider configuration...");
    let configs = ConfigRepository::new();
    let config = configs.create(ProviderConfig {
        id: None,
        name: format!("{provider} main"),
        provider,
        client_id,
        client_secret,
        redirect_uri: "http://localhost:8080".to_string(),
        scopes: Vec::new(),
        is_enabled: true,
    })?;
    println!("  Registered \"{}\" with scopes {:?}\n", config.name, config.scopes);

    // Step 2: Obtain a token through the caching service
    println!("Step 2: Requesting access token (refreshes through the provider)...");
    let service = TokenService::new()?;
    let account = AccountKey::new(provider, AccountId::new(1));
    let params = RefreshParams::from_config(&config, refresh_token);

    let token = service.access_token(&account, &params).await?;
    println!("  Obtained access token (length {})\n", token.len());

    // Step 3: Request again - served from cache, no provider call
    println!("Step 3: Requesting again (served from cache)...");
    let cached = service.access_token(&account, &params).await?;
    assert_eq!(token, cached);
    println!("  Same token, zero network calls\n");

    // Step 4: Generate the SASL XOAUTH2 string
    println!("Step 4: Generating SASL XOAUTH2 authentication string...");
    let auth_string = sasl::xoauth2_response(&email, &token);
    println!("  Auth string (base64): {}...\n", &auth_string[..40]);

    println!("You can now authenticate an IMAP/SMTP session with:");
    println!("  AUTHENTICATE XOAUTH2 {{auth_string}}");

    Ok(())
}
