//! Cart route handlers.
//!
//! Lines are always addressed by their cart item id. Every mutation is
//! followed by a redirect to `/cart`, which re-fetches the cart from the API.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use confeitaria_core::{CartItemId, Price, Quantity};

use super::{PageContext, redirect_after_api_failure};
use crate::api::{Cart, CartItem};
use crate::error::Result;
use crate::filters;
use crate::middleware::RequireSession;
use crate::models::{Notice, push_flash};
use crate::state::AppState;

const CART_PATH: &str = "/cart";

/// Shown where a total cannot be computed from the stored prices.
const NO_TOTAL: &str = "-";

fn total_text(total: Option<Price>) -> String {
    total.map_or_else(|| NO_TOTAL.to_string(), |price| price.display())
}

/// Cart item display data for templates.
#[derive(Clone)]
pub struct CartItemView {
    pub id: String,
    pub name: String,
    pub photo_url: Option<String>,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
}

impl From<&CartItem> for CartItemView {
    fn from(item: &CartItem) -> Self {
        Self {
            id: item.id.to_string(),
            name: item.product.name.clone(),
            photo_url: item
                .product
                .photo_url
                .clone()
                .filter(|url| !url.trim().is_empty()),
            quantity: item.quantity,
            price: item.product.price.display(),
            line_price: total_text(item.line_total()),
        }
    }
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub subtotal: String,
    pub item_count: u64,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            items: cart.items.iter().map(CartItemView::from).collect(),
            subtotal: total_text(cart.subtotal()),
            item_count: cart.item_count(),
        }
    }
}

/// Update quantity form data, as typed.
#[derive(Debug, Deserialize)]
pub struct UpdateQuantityForm {
    #[serde(default)]
    pub quantity: String,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub page: PageContext,
    /// `None` when the cart could not be loaded.
    pub cart: Option<CartView>,
}

/// Display the cart.
#[instrument(skip(state, auth))]
pub async fn show(State(state): State<AppState>, auth: RequireSession) -> Result<Response> {
    let token = auth.token.clone();
    let mut ctx = auth.into_context();

    match state.api().get_cart(&token).await {
        Ok(cart) => Ok(CartShowTemplate {
            page: PageContext::load(&ctx, None).await?,
            cart: Some(CartView::from(&cart)),
        }
        .into_response()),
        Err(e) if e.is_unauthorized() => {
            redirect_after_api_failure(&mut ctx, &e, Notice::CartLoadFailed, CART_PATH).await
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load cart");
            Ok((
                StatusCode::BAD_GATEWAY,
                CartShowTemplate {
                    page: PageContext::load(&ctx, Some(Notice::CartLoadFailed)).await?,
                    cart: None,
                },
            )
                .into_response())
        }
    }
}

/// Set the quantity of one cart line.
///
/// Quantities below 1 are refused before any API call.
#[instrument(skip(state, auth, form), fields(item_id = %item_id))]
pub async fn update_quantity(
    State(state): State<AppState>,
    auth: RequireSession,
    Path(item_id): Path<String>,
    Form(form): Form<UpdateQuantityForm>,
) -> Result<Response> {
    let token = auth.token.clone();
    let mut ctx = auth.into_context();

    let Ok(quantity) = Quantity::parse(&form.quantity) else {
        push_flash(ctx.session(), Notice::InvalidQuantity).await?;
        return Ok(Redirect::to(CART_PATH).into_response());
    };

    let item_id = CartItemId::new(item_id);
    match state.api().update_quantity(&token, &item_id, quantity).await {
        Ok(()) => Ok(Redirect::to(CART_PATH).into_response()),
        Err(e) => {
            redirect_after_api_failure(&mut ctx, &e, Notice::QuantityUpdateFailed, CART_PATH)
                .await
        }
    }
}

/// Remove one line from the cart.
#[instrument(skip(state, auth), fields(item_id = %item_id))]
pub async fn remove_item(
    State(state): State<AppState>,
    auth: RequireSession,
    Path(item_id): Path<String>,
) -> Result<Response> {
    let token = auth.token.clone();
    let mut ctx = auth.into_context();

    let item_id = CartItemId::new(item_id);
    match state.api().remove_item(&token, &item_id).await {
        Ok(()) => Ok(Redirect::to(CART_PATH).into_response()),
        Err(e) => {
            redirect_after_api_failure(&mut ctx, &e, Notice::ItemRemoveFailed, CART_PATH).await
        }
    }
}

/// Remove every line from the cart.
#[instrument(skip(state, auth))]
pub async fn clear(State(state): State<AppState>, auth: RequireSession) -> Result<Response> {
    let token = auth.token.clone();
    let mut ctx = auth.into_context();

    match state.api().clear_cart(&token).await {
        Ok(()) => Ok(Redirect::to(CART_PATH).into_response()),
        Err(e) => {
            redirect_after_api_failure(&mut ctx, &e, Notice::CartClearFailed, CART_PATH).await
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::StatusCode;

    use super::*;
    use crate::test_support::{FakeBakeryApi, TestApp};

    async fn app_with_cart(api: &FakeBakeryApi) -> TestApp {
        api.seed_product("p1", "Bolo de cenoura", 3500);
        api.seed_product("p2", "Brigadeiro", 250);
        let mut app = TestApp::new(api);
        app.login().await;
        app.post("/cart/add", &[("product_id", "p1")]).await;
        app.post("/cart/add", &[("product_id", "p2")]).await;
        app
    }

    #[tokio::test]
    async fn test_cart_requires_session() {
        let api = FakeBakeryApi::start().await;
        let mut app = TestApp::new(&api);

        let response = app.get("/cart").await;
        assert_eq!(response.status, StatusCode::SEE_OTHER);
        assert_eq!(response.location, "/auth/login?next=%2Fcart");
        assert_eq!(api.request_count("GET", "/carrinho"), 0);

        let login = app.get(&response.location).await;
        assert!(login.body.contains(Notice::LoginRequired.message()));
    }

    #[tokio::test]
    async fn test_guest_cart_post_returns_to_cart_after_login() {
        let api = FakeBakeryApi::start().await;
        let mut app = TestApp::new(&api);

        let response = app.post("/cart/clear", &[]).await;
        assert_eq!(response.location, "/auth/login?next=%2Fcart");
        assert_eq!(api.cart_mutation_count(), 0);

        let response = app
            .post(
                "/auth/login",
                &[
                    ("email", "ana@doces.com"),
                    ("password", crate::test_support::TEST_PASSWORD),
                    ("next", "/cart"),
                ],
            )
            .await;
        assert_eq!(response.location, "/cart");
        assert_eq!(app.get(&response.location).await.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cart_lists_items_keyed_by_item_id() {
        let api = FakeBakeryApi::start().await;
        let mut app = app_with_cart(&api).await;

        let response = app.get("/cart").await;
        assert_eq!(response.status, StatusCode::OK);
        for item_id in api.cart_item_ids() {
            assert!(response.body.contains(&format!("data-item-id=\"{item_id}\"")));
            assert!(response.body.contains(&format!("/cart/items/{item_id}/remove")));
        }
        assert_eq!(response.body.matches("name=\"quantity\"").count(), 2);
        assert!(response.body.contains("R$ 37,50"));
    }

    #[tokio::test]
    async fn test_update_quantity_refetches() {
        let api = FakeBakeryApi::start().await;
        let mut app = app_with_cart(&api).await;
        let item_id = api.cart_item_ids().remove(0);

        let response = app
            .post(&format!("/cart/items/{item_id}/quantity"), &[("quantity", "3")])
            .await;
        assert_eq!(response.status, StatusCode::SEE_OTHER);
        assert_eq!(response.location, "/cart");

        let page = app.get("/cart").await;
        assert!(page.body.contains("value=\"3\""));
        // 3 x 35,00 + 1 x 2,50
        assert!(page.body.contains("R$ 107,50"));
    }

    #[tokio::test]
    async fn test_update_quantity_below_one_is_refused_locally() {
        let api = FakeBakeryApi::start().await;
        let mut app = app_with_cart(&api).await;
        let item_id = api.cart_item_ids().remove(0);

        for bad in ["0", "-1", "abc"] {
            let response = app
                .post(&format!("/cart/items/{item_id}/quantity"), &[("quantity", bad)])
                .await;
            assert_eq!(response.location, "/cart");
        }
        assert_eq!(api.request_count("PUT", &format!("/carrinho/{item_id}")), 0);

        let page = app.get("/cart").await;
        assert!(page.body.contains(Notice::InvalidQuantity.message()));
    }

    #[tokio::test]
    async fn test_remove_item_uses_cart_item_id() {
        let api = FakeBakeryApi::start().await;
        let mut app = app_with_cart(&api).await;
        let item_id = api.cart_item_ids().remove(0);

        app.post(&format!("/cart/items/{item_id}/remove"), &[]).await;
        assert_eq!(api.request_count("DELETE", &format!("/carrinho/{item_id}")), 1);
        assert_eq!(api.cart_len(), 1);

        let page = app.get("/cart").await;
        assert!(!page.body.contains(&format!("data-item-id=\"{item_id}\"")));
        assert_eq!(page.body.matches("name=\"quantity\"").count(), 1);
    }

    #[tokio::test]
    async fn test_clear_empties_rendered_list() {
        let api = FakeBakeryApi::start().await;
        let mut app = app_with_cart(&api).await;
        assert_eq!(app.get("/cart").await.body.matches("name=\"quantity\"").count(), 2);

        let response = app.post("/cart/clear", &[]).await;
        assert_eq!(response.location, "/cart");

        let page = app.get("/cart").await;
        assert!(page.body.contains("Your cart is empty."));
        assert_eq!(page.body.matches("name=\"quantity\"").count(), 0);
        assert_eq!(page.body.matches("data-item-id=").count(), 0);
    }

    #[tokio::test]
    async fn test_expired_session_on_cart_prompts_login() {
        let api = FakeBakeryApi::start().await;
        let mut app = app_with_cart(&api).await;
        api.expire_tokens();

        let response = app.post("/cart/clear", &[]).await;
        assert!(response.location.starts_with("/auth/login"));
        assert_eq!(api.cart_len(), 2);

        let login = app.get(&response.location).await;
        assert!(login.body.contains(Notice::SessionExpired.message()));

        // The cleared token means the cart page now gates on login without an API call
        let before = api.request_count("GET", "/carrinho");
        let response = app.get("/cart").await;
        assert!(response.location.starts_with("/auth/login"));
        assert_eq!(api.request_count("GET", "/carrinho"), before);
    }

    /// Asserts the visitor was sent to log in again with the token cleared.
    async fn assert_session_expired(app: &mut TestApp, api: &FakeBakeryApi, location: &str) {
        assert_eq!(location, "/auth/login?next=%2Fcart");
        let login = app.get(location).await;
        assert!(login.body.contains(Notice::SessionExpired.message()));

        let before = api.request_count("GET", "/carrinho");
        let response = app.get("/cart").await;
        assert!(response.location.starts_with("/auth/login"));
        assert_eq!(api.request_count("GET", "/carrinho"), before);
    }

    #[tokio::test]
    async fn test_expired_session_on_update_quantity_prompts_login() {
        let api = FakeBakeryApi::start().await;
        let mut app = app_with_cart(&api).await;
        let item_id = api.cart_item_ids().remove(0);
        api.expire_tokens();

        let response = app
            .post(&format!("/cart/items/{item_id}/quantity"), &[("quantity", "4")])
            .await;
        assert_eq!(response.status, StatusCode::SEE_OTHER);
        assert_eq!(api.request_count("PUT", &format!("/carrinho/{item_id}")), 1);
        assert_session_expired(&mut app, &api, &response.location).await;
    }

    #[tokio::test]
    async fn test_expired_session_on_remove_item_prompts_login() {
        let api = FakeBakeryApi::start().await;
        let mut app = app_with_cart(&api).await;
        let item_id = api.cart_item_ids().remove(0);
        api.expire_tokens();

        let response = app.post(&format!("/cart/items/{item_id}/remove"), &[]).await;
        assert_eq!(response.status, StatusCode::SEE_OTHER);
        assert_eq!(api.cart_len(), 2);
        assert_session_expired(&mut app, &api, &response.location).await;
    }

    #[tokio::test]
    async fn test_cart_with_text_price_still_renders() {
        let api = FakeBakeryApi::start().await;
        api.seed_product_with_raw_price("p1", "Cocada", serde_json::json!("sob consulta"));
        let mut app = TestApp::new(&api);
        app.login().await;
        app.post("/cart/add", &[("product_id", "p1")]).await;

        let response = app.get("/cart").await;
        assert_eq!(response.status, StatusCode::OK);
        assert!(response.body.contains("sob consulta"));
        assert!(response.body.contains("subtotal <strong>-</strong>"));
    }

    #[tokio::test]
    async fn test_cart_load_failure_renders_notice() {
        let api = FakeBakeryApi::start().await;
        let mut app = app_with_cart(&api).await;
        api.fail_cart(true);

        let response = app.get("/cart").await;
        assert_eq!(response.status, StatusCode::BAD_GATEWAY);
        assert!(response.body.contains(Notice::CartLoadFailed.message()));
    }
}
