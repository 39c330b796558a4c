//! # mailbridge-core
//!
//! Token caching and refresh orchestration for mail-protocol `OAuth2`
//! sessions.
//!
//! This crate provides:
//! - **Token service** - cached access tokens with per-account refresh
//!   serialization and refresh-storm throttling
//! - **Account lock registry** - one refresh mutex per mail account
//! - **Provider configuration** - config records, validation, and an
//!   in-memory store
//!
//! The typical consumer is a mail-sync worker pool: many workers ask for
//! a usable access token before opening an IMAP or SMTP session, and the
//! [`TokenService`] makes sure a given account refreshes through the
//! provider at most once no matter how many workers ask concurrently.
//!
//! ```ignore
//! use mailbridge_core::{AccountId, AccountKey, ProviderType, RefreshParams, TokenService};
//!
//! let service = TokenService::new()?;
//! let account = AccountKey::new(ProviderType::Gmail, AccountId::new(1));
//! let params = RefreshParams::new(ProviderType::Gmail, client_id, client_secret, refresh_token);
//!
//! // Shared by reference across all sync workers.
//! let token = service.access_token(&account, &params).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
mod error;
pub mod token;

pub use mailbridge_oauth::ProviderType;

pub use config::{ConfigId, ConfigRepository, ProviderConfig, ValidationError, validate_config};
pub use error::{Error, Result};
pub use token::{
    AccountId, AccountKey, AccountLockRegistry, CacheKey, CachePolicy, RefreshParams,
    TokenCacheEntry, TokenService, TokenSource,
};
