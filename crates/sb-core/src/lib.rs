//! sb-core: shared types, errors, configuration, the catalog store and the
//! TTL cache.
//!
//! This crate is the foundational dependency for all other sb-* crates.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod credentials;
pub mod error;
pub mod paths;

// Re-export the most commonly used items at the crate root.
pub use cache::TtlCache;
pub use catalog::{CatalogEntry, CatalogItem, CatalogSnapshot, CatalogStore, SortKey, SortOrder};
pub use config::Config;
pub use credentials::Credentials;
pub use error::{Error, Result};
