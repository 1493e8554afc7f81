//! HTTP route handlers for storefront.
//!
//! Every mutation is a form post answered with a redirect; the next GET
//! re-fetches fresh state from the bakery API and renders any queued notice.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                               - Catalog (product form when logged in)
//! POST /products                       - Register a product
//!
//! # Cart (requires session)
//! POST /cart/add                       - Add a product (one unit)
//! GET  /cart                           - Cart page
//! POST /cart/items/{item_id}/quantity  - Set quantity of a line
//! POST /cart/items/{item_id}/remove    - Remove a line
//! POST /cart/clear                     - Remove every line
//!
//! # Auth (rate limited)
//! GET  /auth/login                     - Login page
//! POST /auth/login                     - Login action
//! GET  /auth/register                  - Register page
//! POST /auth/register                  - Register action
//! POST /auth/logout                    - Logout action
//! ```

pub mod auth;
pub mod cart;
pub mod catalog;

use axum::{
    Router,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};

use crate::api::ApiError;
use crate::error::Result;
use crate::middleware::{SessionContext, auth_rate_limiter, login_url};
use crate::models::{Flash, Notice, push_flash};
use crate::state::AppState;

/// Data every page template needs for the header and notices.
#[derive(Clone, Default)]
pub struct PageContext {
    pub logged_in: bool,
    pub flashes: Vec<Flash>,
}

impl PageContext {
    /// Take pending notices from the session and add `extra` after them.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn load(ctx: &SessionContext, extra: Option<Notice>) -> Result<Self> {
        let mut flashes = crate::models::take_flashes(ctx.session()).await?;
        flashes.extend(extra.map(Flash::from));
        Ok(Self {
            logged_in: ctx.is_logged_in(),
            flashes,
        })
    }
}

/// Turn a failed API call into a notice and a redirect.
///
/// A 401 means the token is dead: it is cleared and the visitor is sent to
/// log in again, coming back to `back` afterwards. Anything else queues the
/// `fallback` notice and returns to `back`.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn redirect_after_api_failure(
    ctx: &mut SessionContext,
    err: &ApiError,
    fallback: Notice,
    back: &str,
) -> Result<Response> {
    if err.is_unauthorized() {
        ctx.invalidate().await?;
        push_flash(ctx.session(), Notice::SessionExpired).await?;
        return Ok(Redirect::to(&login_url(back)).into_response());
    }

    tracing::warn!(error = %err, notice = ?fallback, "Bakery API call failed");
    push_flash(ctx.session(), fallback).await?;
    Ok(Redirect::to(back).into_response())
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(catalog::add_to_cart))
        .route("/items/{item_id}/quantity", post(cart::update_quantity))
        .route("/items/{item_id}/remove", post(cart::remove_item))
        .route("/clear", post(cart::clear))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
        .layer(auth_rate_limiter())
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(catalog::index))
        .route("/products", post(catalog::create_product))
        .nest("/cart", cart_routes())
        .nest("/auth", auth_routes())
}
