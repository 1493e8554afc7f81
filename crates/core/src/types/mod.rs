//! Core types for Confeitaria.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod price;
pub mod quantity;
pub mod token;

pub use email::{Email, EmailError};
pub use id::*;
pub use price::{ListedPrice, Price, PriceError};
pub use quantity::{Quantity, QuantityError};
pub use token::SessionToken;
