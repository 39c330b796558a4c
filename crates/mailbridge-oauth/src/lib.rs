//! # mailbridge-oauth
//!
//! `OAuth2` token acquisition for email protocols (IMAP/SMTP).
//!
//! ## Features
//!
//! - **Provider registry**: closed set of pre-configured providers
//!   (Gmail, Outlook) with their token/authorize endpoints and scopes
//! - **Token client**: `refresh_token` and `authorization_code` grants,
//!   authorization URL construction
//! - **SASL bridging**: XOAUTH2 initial response encoding and a two-step
//!   SASL client for mail transports
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailbridge_oauth::{ProviderType, TokenClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = TokenClient::new()?;
//!
//!     // Send the user to the consent page
//!     let url = TokenClient::build_auth_url(
//!         ProviderType::Gmail,
//!         "your_client_id",
//!         "http://localhost:8080",
//!         "random_state",
//!     )?;
//!     println!("Visit: {url}");
//!
//!     // After the redirect, exchange the code for tokens
//!     let grant = client
//!         .exchange_code(
//!             ProviderType::Gmail,
//!             "your_client_id",
//!             "your_secret",
//!             "code_from_redirect",
//!             "http://localhost:8080",
//!         )
//!         .await?;
//!
//!     // Later, mint fresh access tokens from the stored refresh token
//!     let token = client
//!         .refresh(
//!             ProviderType::Gmail,
//!             "your_client_id",
//!             "your_secret",
//!             &grant.refresh_token,
//!         )
//!         .await?;
//!     println!("Access token: {}", token.access_token);
//!     Ok(())
//! }
//! ```
//!
//! ## Using with IMAP/SMTP
//!
//! ```ignore
//! use mailbridge_oauth::sasl::xoauth2_response;
//!
//! let auth_string = xoauth2_response("user@gmail.com", &token.access_token);
//! // Send: AUTHENTICATE XOAUTH2 {auth_string}
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod client;
mod error;
pub mod provider;
pub mod sasl;

pub use client::{CodeGrant, RefreshedToken, TokenClient};
pub use error::{Error, ProviderError, Result};
pub use provider::{ProviderProfile, ProviderType};
pub use sasl::XOauth2Client;
