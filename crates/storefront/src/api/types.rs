//! Wire types for the bakery REST API.
//!
//! Field names follow the API's JSON (`nome`, `preco`, ...); Rust names
//! are English. Everything here is a snapshot mirrored from a response and
//! replaced wholesale on the next fetch.

use serde::{Deserialize, Serialize};

use confeitaria_core::{CartItemId, ListedPrice, Price, ProductId, Quantity};

// =============================================================================
// Products
// =============================================================================

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: ProductId,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "preco", default)]
    pub price: ListedPrice,
    #[serde(rename = "descricao", default)]
    pub description: Option<String>,
    #[serde(rename = "urlfoto", default)]
    pub photo_url: Option<String>,
}

/// Body of `POST /produtos`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewProduct {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "preco")]
    pub price: Price,
    #[serde(rename = "descricao")]
    pub description: String,
    #[serde(rename = "urlfoto")]
    pub photo_url: String,
}

// =============================================================================
// Cart
// =============================================================================

/// Denormalised product copy embedded in a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartProduct {
    #[serde(rename = "_id")]
    pub id: ProductId,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "preco", default)]
    pub price: ListedPrice,
    #[serde(rename = "urlfoto", default)]
    pub photo_url: Option<String>,
}

/// One line of the visitor's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    #[serde(rename = "_id")]
    pub id: CartItemId,
    #[serde(rename = "produto")]
    pub product: CartProduct,
    #[serde(rename = "quantidade")]
    pub quantity: u32,
}

impl CartItem {
    /// Unit price times quantity; `None` if the stored price is not a
    /// number or the product overflows.
    #[must_use]
    pub fn line_total(&self) -> Option<Price> {
        self.product.price.price()?.checked_times(self.quantity)
    }
}

/// Response of `GET /carrinho`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    #[serde(rename = "itens", default)]
    pub items: Vec<CartItem>,
}

impl Cart {
    /// Sum of all line totals; `None` if any line has no total.
    #[must_use]
    pub fn subtotal(&self) -> Option<Price> {
        self.items
            .iter()
            .try_fold(Price::default(), |total, item| total.checked_add(item.line_total()?))
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items
            .iter()
            .fold(0u64, |count, item| count.saturating_add(u64::from(item.quantity)))
    }
}

/// Body of `POST /adicionarItem`.
#[derive(Debug, Clone, Serialize)]
pub struct AddItemRequest<'a> {
    #[serde(rename = "produtoId")]
    pub product_id: &'a ProductId,
    #[serde(rename = "quantidade")]
    pub quantity: Quantity,
}

/// Body of `PUT /carrinho/{itemId}`.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateQuantityRequest {
    #[serde(rename = "quantidade")]
    pub quantity: Quantity,
}

// =============================================================================
// Accounts
// =============================================================================

/// Body of `POST /login`.
#[derive(Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    #[serde(rename = "senha")]
    pub password: &'a str,
}

/// Response of `POST /login`.
#[derive(Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

/// Body of `POST /usuarios`.
#[derive(Serialize)]
pub struct RegisterRequest<'a> {
    #[serde(rename = "nome")]
    pub name: &'a str,
    pub email: &'a str,
    #[serde(rename = "senha")]
    pub password: &'a str,
}
