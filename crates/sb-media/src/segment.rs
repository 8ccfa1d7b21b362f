//! HLS segment lookup.
//!
//! Segment requests look like `<base><N>.ts`, where `<N>` is the index suffix
//! written by the transcoder (`movie.mp4_000.ts`, `movie.mp4_001.ts`, ...).
//! The digit run is kept exactly as requested so zero padding survives.

use std::path::{Path, PathBuf};

use sb_core::{paths, Error, Result};

/// Extension of transport-stream segments.
pub const SEGMENT_EXTENSION: &str = "ts";

/// Content type served for segments.
pub const SEGMENT_CONTENT_TYPE: &str = "video/MP2T";

/// Split `<base><N>` into `(base, N)`.
///
/// The index must be a non-empty run of ASCII digits at the very end.
pub fn split_segment_request(requested: &str) -> Result<(&str, &str)> {
    let base = requested.trim_end_matches(|c: char| c.is_ascii_digit());
    let digits = &requested[base.len()..];
    if digits.is_empty() {
        return Err(Error::InvalidInput("Invalid segment number".into()));
    }
    Ok((base, digits))
}

/// Map a segment request (extension already stripped) to its on-disk path
/// under `root`, without touching the filesystem.
pub fn segment_path(root: &Path, requested: &str) -> Result<PathBuf> {
    let (base, digits) = split_segment_request(requested)?;
    paths::safe_join(root, &format!("{base}{digits}.{SEGMENT_EXTENSION}"))
}

/// Resolve a segment request to an existing file.
///
/// # Errors
///
/// - [`Error::InvalidInput`] for a missing index or a path escaping `root`.
/// - [`Error::NotFound`] if the segment file does not exist.
pub async fn resolve_segment(root: &Path, requested: &str) -> Result<PathBuf> {
    let path = segment_path(root, requested)?;
    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => Ok(path),
        Ok(_) => Err(Error::not_found("segment", format!("{requested}.{SEGMENT_EXTENSION}"))),
        Err(e) => Err(Error::from_io(
            "segment",
            format!("{requested}.{SEGMENT_EXTENSION}"),
            e,
        )),
    }
}
