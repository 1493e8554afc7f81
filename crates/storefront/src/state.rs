//! Application state shared across handlers.

use std::sync::Arc;

use crate::api::{ApiError, BakeryClient};
use crate::config::StorefrontConfig;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the bakery API client.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    api: BakeryClient,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the API client cannot be built from the configuration.
    pub fn new(config: &StorefrontConfig) -> Result<Self, ApiError> {
        let api = BakeryClient::new(&config.api)?;

        Ok(Self {
            inner: Arc::new(AppStateInner { api }),
        })
    }

    /// Get a reference to the bakery API client.
    #[must_use]
    pub fn api(&self) -> &BakeryClient {
        &self.inner.api
    }
}
