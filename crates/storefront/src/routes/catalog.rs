//! Catalog route handlers: product listing, product registration, add to cart.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use confeitaria_core::{Price, PriceError, ProductId, Quantity};

use super::{PageContext, redirect_after_api_failure};
use crate::api::{NewProduct, Product};
use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{SessionContext, login_url};
use crate::models::{Flash, Notice, push_flash};
use crate::state::AppState;

/// Product display data for templates.
#[derive(Clone)]
pub struct ProductView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: String,
    pub photo_url: Option<String>,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            description: product.description.clone().unwrap_or_default(),
            price: product.price.display(),
            photo_url: product.photo_url.clone().filter(|url| !url.trim().is_empty()),
        }
    }
}

/// Product registration form, exactly as typed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub photo_url: String,
}

impl ProductForm {
    /// Validate the form into an API request body.
    ///
    /// Name and price are required; the price must be a non-negative number.
    fn validate(&self) -> std::result::Result<NewProduct, Flash> {
        let name = self.name.trim();
        if name.is_empty() || self.price.trim().is_empty() {
            return Err(Notice::NameAndPriceRequired.into());
        }

        let price = Price::parse(&self.price).map_err(|e| match e {
            PriceError::Empty => Flash::from(Notice::NameAndPriceRequired),
            other => Flash::error(format!("Invalid price: {other}.")),
        })?;

        Ok(NewProduct {
            name: name.to_string(),
            price,
            description: self.description.trim().to_string(),
            photo_url: self.photo_url.trim().to_string(),
        })
    }
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: String,
}

/// Catalog page template.
#[derive(Template, WebTemplate)]
#[template(path = "catalog/index.html")]
pub struct CatalogTemplate {
    pub page: PageContext,
    pub products: Vec<ProductView>,
    pub draft: ProductForm,
}

async fn load_products(state: &AppState) -> std::result::Result<Vec<ProductView>, Notice> {
    match state.api().list_products().await {
        Ok(products) => Ok(products.iter().map(ProductView::from).collect()),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load products");
            Err(Notice::ProductsLoadFailed)
        }
    }
}

/// Display the catalog.
#[instrument(skip(state, ctx))]
pub async fn index(State(state): State<AppState>, ctx: SessionContext) -> Result<Response> {
    let (products, failure) = match load_products(&state).await {
        Ok(products) => (products, None),
        Err(notice) => (Vec::new(), Some(notice)),
    };

    Ok(CatalogTemplate {
        page: PageContext::load(&ctx, failure).await?,
        products,
        draft: ProductForm::default(),
    }
    .into_response())
}

/// Re-render the catalog with the form as typed and an error notice.
async fn render_with_draft(
    state: &AppState,
    ctx: &SessionContext,
    draft: ProductForm,
    flash: Flash,
    status: StatusCode,
) -> Result<Response> {
    let mut page = PageContext::load(ctx, None).await?;
    page.flashes.push(flash);

    let products = match load_products(state).await {
        Ok(products) => products,
        Err(notice) => {
            page.flashes.push(notice.into());
            Vec::new()
        }
    };

    Ok((
        status,
        CatalogTemplate {
            page,
            products,
            draft,
        },
    )
        .into_response())
}

/// Register a new product.
///
/// Invalid forms are answered without calling the API. On success the
/// visitor is redirected to the catalog, which re-fetches the list.
#[instrument(skip(state, ctx, form))]
pub async fn create_product(
    State(state): State<AppState>,
    mut ctx: SessionContext,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let Some(token) = ctx.token().cloned() else {
        push_flash(ctx.session(), Notice::LoginRequired).await?;
        return Ok(Redirect::to(&login_url("/")).into_response());
    };

    let product = match form.validate() {
        Ok(product) => product,
        Err(flash) => {
            return render_with_draft(&state, &ctx, form, flash, StatusCode::UNPROCESSABLE_ENTITY)
                .await;
        }
    };

    match state.api().create_product(&token, &product).await {
        Ok(_) => {
            add_breadcrumb("catalog", "Registered product", &[("name", product.name.as_str())]);
            push_flash(ctx.session(), Notice::ProductCreated).await?;
            Ok(Redirect::to("/").into_response())
        }
        Err(e) if e.is_unauthorized() => {
            redirect_after_api_failure(&mut ctx, &e, Notice::ProductCreateFailed, "/").await
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to register product");
            render_with_draft(
                &state,
                &ctx,
                form,
                Notice::ProductCreateFailed.into(),
                StatusCode::BAD_GATEWAY,
            )
            .await
        }
    }
}

/// Add one unit of a product to the cart.
///
/// Anonymous visitors are sent to log in without any API call.
#[instrument(skip(state, ctx), fields(product_id = %form.product_id))]
pub async fn add_to_cart(
    State(state): State<AppState>,
    mut ctx: SessionContext,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let Some(token) = ctx.token().cloned() else {
        push_flash(ctx.session(), Notice::LoginRequiredForCart).await?;
        return Ok(Redirect::to(&login_url("/")).into_response());
    };

    let product_id = ProductId::new(form.product_id);
    match state
        .api()
        .add_to_cart(&token, &product_id, Quantity::ONE)
        .await
    {
        Ok(()) => {
            add_breadcrumb("cart", "Added product", &[("product_id", product_id.as_str())]);
            push_flash(ctx.session(), Notice::AddedToCart).await?;
            Ok(Redirect::to("/").into_response())
        }
        Err(e) => redirect_after_api_failure(&mut ctx, &e, Notice::AddToCartFailed, "/").await,
    }
}
