//! Bakery REST API client.
//!
//! # Architecture
//!
//! - The bakery API is the source of truth: NO local copies beyond a short
//!   product-list cache
//! - One shared `reqwest::Client` with a base URL and a per-request timeout
//! - The bearer token is attached in [`BakeryClient::request`] and nowhere
//!   else; call sites only say whether the call is authenticated
//! - A 401 becomes [`ApiError::Unauthorized`] so handlers can invalidate the
//!   visitor's session
//!
//! # Example
//!
//! ```rust,ignore
//! use confeitaria_storefront::api::BakeryClient;
//!
//! let client = BakeryClient::new(&config.api)?;
//! let products = client.list_products().await?;
//!
//! let token = client.login("ana@doces.com", "senha").await?;
//! client.add_to_cart(&token, &products[0].id, Quantity::ONE).await?;
//! let cart = client.get_cart(&token).await?;
//! ```

pub mod types;

use std::sync::Arc;

use moka::future::Cache;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use confeitaria_core::{CartItemId, ProductId, Quantity, SessionToken};

use crate::config::BakeryApiConfig;

pub use types::*;

const PRODUCTS_CACHE_KEY: &str = "products";

/// Longest API error body carried into logs and error messages.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Errors that can occur when talking to the bakery API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connection, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API rejected the bearer token, or the call needed one.
    #[error("Unauthorized")]
    Unauthorized,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The API refused the request (4xx other than 401/404).
    #[error("Rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The API failed (5xx).
    #[error("Server error with status {status}: {message}")]
    Server { status: u16, message: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The response was well-formed but unusable.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// The configured base URL cannot carry path segments.
    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(String),
}

impl ApiError {
    /// Whether this error means the visitor's session is no longer valid.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

// =============================================================================
// BakeryClient
// =============================================================================

/// Client for the bakery REST API.
///
/// Cheap to clone; all clones share one connection pool and one product cache.
#[derive(Clone)]
pub struct BakeryClient {
    inner: Arc<BakeryClientInner>,
}

struct BakeryClientInner {
    client: reqwest::Client,
    base_url: Url,
    products: Cache<&'static str, Arc<Vec<Product>>>,
}

impl BakeryClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot be used as a path prefix or
    /// the HTTP client cannot be built.
    pub fn new(config: &BakeryApiConfig) -> Result<Self, ApiError> {
        if config.base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl(config.base_url.to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("confeitaria-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let products = Cache::builder()
            .max_capacity(1)
            .time_to_live(config.product_cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(BakeryClientInner {
                client,
                base_url: config.base_url.clone(),
                products,
            }),
        })
    }

    /// Build the URL for a path made of raw segments.
    ///
    /// Segments are percent-encoded, so ids from the API can't escape their slot.
    fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidBaseUrl(self.inner.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Start a request, attaching the bearer token when one is given.
    fn request(
        &self,
        method: Method,
        segments: &[&str],
        token: Option<&SessionToken>,
    ) -> Result<RequestBuilder, ApiError> {
        let url = self.url(segments)?;
        let builder = self.inner.client.request(method, url);
        Ok(match token {
            Some(token) => builder.bearer_auth(token.expose()),
            None => builder,
        })
    }

    /// Send a request and return the body of a successful response.
    async fn execute(&self, builder: RequestBuilder) -> Result<String, ApiError> {
        let response = builder.send().await?;
        let status = response.status();
        let url = response.url().path().to_string();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(body);
        }

        let message = error_message(&body);
        match status {
            StatusCode::UNAUTHORIZED => {
                debug!(path = %url, "Bakery API rejected the session token");
                Err(ApiError::Unauthorized)
            }
            StatusCode::NOT_FOUND => Err(ApiError::NotFound(url)),
            s if s.is_client_error() => {
                tracing::warn!(status = %s, path = %url, message = %message, "Bakery API refused request");
                Err(ApiError::Rejected {
                    status: s.as_u16(),
                    message,
                })
            }
            s => {
                tracing::error!(status = %s, path = %url, message = %message, "Bakery API returned non-success status");
                Err(ApiError::Server {
                    status: s.as_u16(),
                    message,
                })
            }
        }
    }

    /// Send a request and parse the JSON body.
    async fn execute_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let body = self.execute(builder).await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %truncate(&body),
                "Failed to parse bakery API response"
            );
            ApiError::Parse(e)
        })
    }

    // =========================================================================
    // Product Methods
    // =========================================================================

    /// Get every product in the catalog.
    ///
    /// Served from cache for the configured TTL.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Arc<Vec<Product>>, ApiError> {
        if let Some(products) = self.inner.products.get(PRODUCTS_CACHE_KEY).await {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let products: Vec<Product> = self
            .execute_json(self.request(Method::GET, &["produtos"], None)?)
            .await?;
        let products = Arc::new(products);

        self.inner
            .products
            .insert(PRODUCTS_CACHE_KEY, Arc::clone(&products))
            .await;

        Ok(products)
    }

    /// Register a new product.
    ///
    /// Invalidates the product cache. Returns the created record when the API
    /// echoes one back.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token, product), fields(name = %product.name))]
    pub async fn create_product(
        &self,
        token: &SessionToken,
        product: &NewProduct,
    ) -> Result<Option<Product>, ApiError> {
        let body = self
            .execute(
                self.request(Method::POST, &["produtos"], Some(token))?
                    .json(product),
            )
            .await?;

        self.inner.products.invalidate(PRODUCTS_CACHE_KEY).await;

        Ok(serde_json::from_str(&body).ok())
    }

    /// Check that the API answers at all, bypassing the cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn ping(&self) -> Result<(), ApiError> {
        self.execute(self.request(Method::GET, &["produtos"], None)?)
            .await
            .map(|_| ())
    }

    // =========================================================================
    // Cart Methods
    // =========================================================================

    /// Add a product to the visitor's cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(product_id = %product_id))]
    pub async fn add_to_cart(
        &self,
        token: &SessionToken,
        product_id: &ProductId,
        quantity: Quantity,
    ) -> Result<(), ApiError> {
        let body = AddItemRequest {
            product_id,
            quantity,
        };
        self.execute(
            self.request(Method::POST, &["adicionarItem"], Some(token))?
                .json(&body),
        )
        .await
        .map(|_| ())
    }

    /// Get the visitor's cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn get_cart(&self, token: &SessionToken) -> Result<Cart, ApiError> {
        let body = self
            .execute(self.request(Method::GET, &["carrinho"], Some(token))?)
            .await?;

        // Some deployments answer an empty body for a user without a cart
        if body.trim().is_empty() || body.trim() == "null" {
            return Ok(Cart::default());
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, body = %truncate(&body), "Failed to parse cart");
            ApiError::Parse(e)
        })
    }

    /// Set the quantity of one cart line.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(item_id = %item_id, quantity = %quantity))]
    pub async fn update_quantity(
        &self,
        token: &SessionToken,
        item_id: &CartItemId,
        quantity: Quantity,
    ) -> Result<(), ApiError> {
        self.execute(
            self.request(Method::PUT, &["carrinho", item_id.as_str()], Some(token))?
                .json(&UpdateQuantityRequest { quantity }),
        )
        .await
        .map(|_| ())
    }

    /// Remove one line from the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(item_id = %item_id))]
    pub async fn remove_item(
        &self,
        token: &SessionToken,
        item_id: &CartItemId,
    ) -> Result<(), ApiError> {
        self.execute(self.request(
            Method::DELETE,
            &["carrinho", item_id.as_str()],
            Some(token),
        )?)
        .await
        .map(|_| ())
    }

    /// Remove every line from the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn clear_cart(&self, token: &SessionToken) -> Result<(), ApiError> {
        self.execute(self.request(Method::DELETE, &["carrinho"], Some(token))?)
            .await
            .map(|_| ())
    }

    // =========================================================================
    // Account Methods
    // =========================================================================

    /// Exchange credentials for a session token.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] or [`ApiError::Rejected`] for bad
    /// credentials, and other variants if the request fails.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<SessionToken, ApiError> {
        let response: LoginResponse = self
            .execute_json(
                self.request(Method::POST, &["login"], None)?
                    .json(&LoginRequest { email, password }),
            )
            .await?;

        let token = SessionToken::new(response.token);
        if token.is_empty() {
            return Err(ApiError::UnexpectedResponse(
                "login succeeded without a token".to_string(),
            ));
        }
        Ok(token)
    }

    /// Create a visitor account.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] when the API refuses the account
    /// (e.g., email already registered), and other variants if the request fails.
    #[instrument(skip(self, password))]
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<(), ApiError> {
        self.execute(
            self.request(Method::POST, &["usuarios"], None)?
                .json(&RegisterRequest {
                    name,
                    email,
                    password,
                }),
        )
        .await
        .map(|_| ())
    }
}

/// Pull a human-readable message out of an API error body.
///
/// The API answers `{"message": ...}`, `{"mensagem": ...}` or `{"erro": ...}`
/// depending on the route; anything else is passed through truncated.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["message", "mensagem", "erro", "error"]
                .iter()
                .find_map(|key| value.get(*key).and_then(|v| v.as_str()).map(String::from))
        })
        .unwrap_or_else(|| truncate(body))
}

fn truncate(body: &str) -> String {
    body.chars().take(MAX_ERROR_BODY_CHARS).collect()
}
