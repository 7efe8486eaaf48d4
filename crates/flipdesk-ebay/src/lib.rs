//! eBay API client for category sync and leaf resolution.
//!
//! Covers the application-token exchange (Identity API), category tree
//! retrieval (Taxonomy API) and the legacy Trading calls `GetCategories`
//! and `GetSuggestedCategories`.

pub mod client;
pub mod error;
pub(crate) mod trading;
pub mod types;

pub use client::{EbayClient, EbaySettings};
pub use error::EbayError;
pub use types::{SuggestedCategory, TradingCategory};
