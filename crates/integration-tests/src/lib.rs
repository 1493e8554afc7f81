//! Integration tests for Confeitaria.
//!
//! These tests drive a running storefront over HTTP, which in turn talks to a
//! running bakery API. They are `#[ignore]`d so `cargo test` stays hermetic.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the bakery API and the storefront, then:
//! STOREFRONT_TEST_URL=http://localhost:3000 \
//! STOREFRONT_TEST_EMAIL=ana@doces.com STOREFRONT_TEST_PASSWORD=senha \
//!     cargo test -p confeitaria-integration-tests -- --ignored
//! ```

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, redirect::Policy};

/// Base URL of the storefront under test.
#[must_use]
pub fn storefront_url() -> String {
    std::env::var("STOREFRONT_TEST_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Credentials of an existing account on the bakery API.
#[must_use]
pub fn test_credentials() -> (String, String) {
    (
        std::env::var("STOREFRONT_TEST_EMAIL").unwrap_or_else(|_| "ana@doces.com".to_string()),
        std::env::var("STOREFRONT_TEST_PASSWORD").unwrap_or_else(|_| "senha".to_string()),
    )
}

/// A browser-like client: keeps cookies, does not follow redirects, and
/// identifies itself through the proxy header the auth rate limiter keys on.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built.
pub fn browser() -> reqwest::Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert("x-forwarded-for", HeaderValue::from_static("192.0.2.44"));

    Client::builder()
        .cookie_store(true)
        .redirect(Policy::none())
        .default_headers(headers)
        .build()
}

/// Submit the login form with the test credentials.
///
/// # Errors
///
/// Returns an error if the request fails.
pub async fn log_in(client: &Client) -> reqwest::Result<reqwest::Response> {
    let (email, password) = test_credentials();
    client
        .post(format!("{}/auth/login", storefront_url()))
        .form(&[("email", email.as_str()), ("password", password.as_str())])
        .send()
        .await
}
