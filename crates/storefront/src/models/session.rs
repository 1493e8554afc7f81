//! Session-related types.

/// Session keys for visitor state.
pub mod keys {
    /// Key for the bakery API bearer token of the logged-in visitor.
    pub const SESSION_TOKEN: &str = "session_token";

    /// Key for one-shot notices shown on the next rendered page.
    pub const FLASH: &str = "flash";
}
