//! HTTP middleware: request ID and basic authentication.

pub mod auth;
pub mod request_id;
