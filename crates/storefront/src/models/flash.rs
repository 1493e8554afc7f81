//! One-shot notices carried in the session to the next rendered page.
//!
//! Every user-visible outcome (success, "could not load", "could not submit",
//! "session expired") is a [`Notice`]; handlers push one before redirecting
//! and the next page takes and renders it.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use super::session_keys;

/// Severity of a flash message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlashLevel {
    Success,
    Error,
}

/// A message shown once on the next page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Success,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Error,
            message: message.into(),
        }
    }

    /// CSS class used by `partials/flashes.html`.
    #[must_use]
    pub const fn css_class(&self) -> &'static str {
        match self.level {
            FlashLevel::Success => "flash flash-success",
            FlashLevel::Error => "flash flash-error",
        }
    }
}

/// Every notice the storefront shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    LoginRequired,
    LoginRequiredForCart,
    SessionExpired,
    LoggedOut,
    AccountCreated,
    ProductsLoadFailed,
    ProductCreated,
    ProductCreateFailed,
    NameAndPriceRequired,
    AddedToCart,
    AddToCartFailed,
    CartLoadFailed,
    InvalidQuantity,
    QuantityUpdateFailed,
    ItemRemoveFailed,
    CartClearFailed,
}

impl Notice {
    /// Text shown to the visitor.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::LoginRequired => "You need to log in first.",
            Self::LoginRequiredForCart => "You need to log in to add products to the cart!",
            Self::SessionExpired => "Your session has expired. Please log in again.",
            Self::LoggedOut => "You have logged out.",
            Self::AccountCreated => "Account created. You can log in now.",
            Self::ProductsLoadFailed => "Could not load products.",
            Self::ProductCreated => "Product registered!",
            Self::ProductCreateFailed => "Could not register the product.",
            Self::NameAndPriceRequired => "Fill in at least the name and the price!",
            Self::AddedToCart => "Product added to cart!",
            Self::AddToCartFailed => "Could not add to cart.",
            Self::CartLoadFailed => "Could not load the cart.",
            Self::InvalidQuantity => "Quantity must be a whole number of at least 1.",
            Self::QuantityUpdateFailed => "Could not update the quantity.",
            Self::ItemRemoveFailed => "Could not remove the item.",
            Self::CartClearFailed => "Could not clear the cart.",
        }
    }

    #[must_use]
    pub const fn level(self) -> FlashLevel {
        match self {
            Self::LoggedOut | Self::AccountCreated | Self::ProductCreated | Self::AddedToCart => {
                FlashLevel::Success
            }
            _ => FlashLevel::Error,
        }
    }
}

impl From<Notice> for Flash {
    fn from(notice: Notice) -> Self {
        Self {
            level: notice.level(),
            message: notice.message().to_string(),
        }
    }
}

/// Queue a flash message for the next rendered page.
///
/// # Errors
///
/// Returns an error if the session cannot be read or modified.
pub async fn push_flash(
    session: &Session,
    flash: impl Into<Flash>,
) -> Result<(), tower_sessions::session::Error> {
    let mut pending: Vec<Flash> = session.get(session_keys::FLASH).await?.unwrap_or_default();
    pending.push(flash.into());
    session.insert(session_keys::FLASH, pending).await
}

/// Take all pending flash messages, leaving none behind.
///
/// # Errors
///
/// Returns an error if the session cannot be read or modified.
pub async fn take_flashes(session: &Session) -> Result<Vec<Flash>, tower_sessions::session::Error> {
    Ok(session
        .remove::<Vec<Flash>>(session_keys::FLASH)
        .await?
        .unwrap_or_default())
}
