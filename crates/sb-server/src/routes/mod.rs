//! Route handlers, one module per resource.

pub mod catalog;
pub mod health;
pub mod playlist;
pub mod suggestions;
pub mod videos;
