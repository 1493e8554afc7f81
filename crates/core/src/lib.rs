//! Confeitaria Core - Shared types library.
//!
//! This crate provides common types used across the Confeitaria components:
//! - `storefront` - Public-facing bakery storefront
//! - `cli` - Command-line tools for migrations and catalogue management
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. The bakery REST API owns every entity; these types only
//! describe what crosses the wire and what the storefront accepts from forms.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, prices, quantities, emails and tokens

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
