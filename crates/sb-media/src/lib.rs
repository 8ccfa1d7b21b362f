//! sb-media: catalog scanning, playlist rendering and HLS segment lookup.

pub mod playlist;
pub mod scanner;
pub mod segment;

pub use scanner::{scan, ScanOptions};
