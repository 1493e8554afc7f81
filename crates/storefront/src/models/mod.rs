//! Session-held models for the storefront.
//!
//! Nothing here is persisted by the storefront itself: the bakery API owns
//! products, carts and accounts. These types only live in the visitor's
//! server-side session.

pub mod flash;
pub mod session;

pub use flash::{Flash, FlashLevel, Notice, push_flash, take_flashes};
pub use session::keys as session_keys;
