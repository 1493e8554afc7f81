//! Catalogue commands against the bakery API.
//!
//! # Environment Variables
//!
//! - `BAKERY_API_URL` - Base URL of the bakery REST API
//! - `BAKERY_API_TIMEOUT_SECS` - Per-request timeout (default: 10)

use confeitaria_core::{Price, SessionToken};
use confeitaria_storefront::api::{BakeryClient, NewProduct};
use confeitaria_storefront::config::BakeryApiConfig;

fn client() -> Result<BakeryClient, Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let config = BakeryApiConfig::from_env()?;
    Ok(BakeryClient::new(&config)?)
}

/// Print every product, one per line.
///
/// # Errors
///
/// Returns an error if the API is unreachable or answers with a failure.
pub async fn list() -> Result<(), Box<dyn std::error::Error>> {
    let products = client()?.list_products().await?;

    #[allow(clippy::print_stdout)]
    {
        for product in products.iter() {
            println!("{}\t{}\t{}", product.id, product.price.display(), product.name);
        }
        println!("{} product(s)", products.len());
    }
    Ok(())
}

/// Register a product.
///
/// # Errors
///
/// Returns an error if the name or price is invalid, or the API refuses the
/// product (e.g., an expired token).
pub async fn create(
    name: &str,
    price: &str,
    description: &str,
    photo_url: &str,
    token: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let name = name.trim();
    if name.is_empty() {
        return Err("product name must not be empty".into());
    }
    let product = NewProduct {
        name: name.to_string(),
        price: Price::parse(price)?,
        description: description.trim().to_string(),
        photo_url: photo_url.trim().to_string(),
    };

    let token = SessionToken::new(token);
    match client()?.create_product(&token, &product).await? {
        Some(created) => tracing::info!(id = %created.id, name = %created.name, "Product registered"),
        None => tracing::info!(name = %product.name, "Product registered"),
    }
    Ok(())
}
