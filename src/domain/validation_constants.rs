//! Validation constants for domain types
//!
//! Limits that are checked outside the newtype validators live here so the
//! API layer and the domain agree on them.

/// Listing limits shared by products, services and events
pub mod listing {
    /// Maximum number of images attached to a product
    pub const MAX_IMAGES: usize = 10;
}

/// Order limits
pub mod order {
    /// Maximum lines accepted in a single order request
    pub const MAX_LINES: usize = 100;

    /// Largest quantity of one product in a single order
    pub const MAX_LINE_QUANTITY: u32 = 10_000;
}

/// API token constants
pub mod token {
    /// Prefix that marks marketplace API tokens
    pub const PREFIX: &str = "fm_";
}
