//! Example: OAuth2 sign-in with Gmail and XOAUTH2 generation
//!
//! This example demonstrates how to:
//! 1. Build the Gmail authorization URL
//! 2. Exchange the authorization code for tokens
//! 3. Refresh the access token
//! 4. Generate the SASL XOAUTH2 string for IMAP/SMTP
//!
//! ## Prerequisites
//!
//! 1. Create OAuth credentials in the Google Cloud console:
//!    - Enable the Gmail API for your project
//!    - Create an OAuth client ID (web application)
//!    - Add `http://localhost:8080` as an authorized redirect URI
//!
//! 2. Set environment variables:
//!    ```bash
//!    export OAUTH_CLIENT_ID="your-client-id"
//!    export OAUTH_CLIENT_SECRET="your-client-secret"
//!    export OAUTH_EMAIL="your-email@gmail.com"
//!    ```
//!
//! ## Running
//!
//! ```bash
//! cargo run --example gmail_signin
//! ```

use mailbridge_oauth::{ProviderType, TokenClient, sasl};
use std::env;
use std::io::{self, Write};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client_id =
        env::var("OAUTH_CLIENT_ID").expect("OAUTH_CLIENT_ID environment variable not set");
    let client_secret =
        env::var("OAUTH_CLIENT_SECRET").expect("OAUTH_CLIENT_SECRET environment variable not set");
    let email = env::var("OAUTH_EMAIL").expect("OAUTH_EMAIL environment variable not set");
    let redirect_uri = "http://localhost:8080";

    println!("mailbridge OAuth2 Example - Gmail");
    println!("=================================\n");

    // Step 1: Generate authorization URL
    println!("Step 1: Generating authorization URL...");
    let auth_url =
        TokenClient::build_auth_url(ProviderType::Gmail, &client_id, redirect_uri, "example-state")?;

    println!("\nPlease visit this URL to authorize the application:\n");
    println!("{auth_url}\n");
    println!("After authorizing, you'll be redirected to:");
    println!("  {redirect_uri}/?code=AUTHORIZATION_CODE&state=example-state\n");

    // Step 2: Get authorization code from user
    print!("Enter the authorization code from the redirect URL: ");
    io::stdout().flush()?;

    let mut code = String::new();
    io::stdin().read_line(&mut code)?;
    let code = code.trim();

    if code.is_empty() {
        println!("\nNo code entered. Exiting.");
        return Ok(());
    }

    // Step 3: Exchange code for tokens
    println!("\nStep 3: Exchanging authorization code for tokens...");
    let client = TokenClient::new()?;
    let grant = client
        .exchange_code(
            ProviderType::Gmail,
            &client_id,
            &client_secret,
            code,
            redirect_uri,
        )
        .await?;

    println!("  Access token: {}...", &grant.access_token[..20]);
    println!("  Refresh token length: {}\n", grant.refresh_token.len());

    // Step 4: Refresh the access token
    println!("Step 4: Refreshing the access token...");
    let token = client
        .refresh(
            ProviderType::Gmail,
            &client_id,
            &client_secret,
            &grant.refresh_token,
        )
        .await?;
    println!(
        "  New access token (length {}), expires in {:?} seconds\n",
        token.access_token.len(),
        token.expires_in
    );

    // Step 5: Generate SASL XOAUTH2 string
    println!("Step 5: Generating SASL XOAUTH2 authentication string...");
    let auth_string = sasl::xoauth2_response(&email, &token.access_token);
    println!("  Auth string (base64): {}...\n", &auth_string[..40]);

    println!("You can now authenticate an IMAP/SMTP session with:");
    println!("  AUTHENTICATE XOAUTH2 {{auth_string}}");
    println!("\nStore the refresh token securely for future use.");

    Ok(())
}
