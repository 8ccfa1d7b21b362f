//! Path utilities: media detection by file name and relative-path handling.

use std::path::{Component, Path, PathBuf};

use crate::{Error, Result};

/// Recognized media file suffixes, lowercase and including the dot.
const MEDIA_EXTENSIONS: &[&str] = &[".mp4", ".avi", ".mov", ".mkv", ".webm"];

/// Check if a file name ends in one of the recognized media extensions.
///
/// Matching is case-insensitive and looks only at the name, never the content.
///
/// # Examples
///
/// ```
/// use sb_core::paths::is_media_file_name;
///
/// assert!(is_media_file_name("movie.MKV"));
/// assert!(is_media_file_name("clip.webm"));
/// assert!(!is_media_file_name("notes.txt"));
/// ```
pub fn is_media_file_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    MEDIA_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Get the list of recognized media suffixes.
#[must_use]
pub fn media_extensions() -> &'static [&'static str] {
    MEDIA_EXTENSIONS
}

/// Render `path` relative to `root` with `/` separators.
///
/// Returns `None` if `path` is not under `root`.
pub fn relative_slash_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

/// Join a client-supplied `/`-separated relative path onto `root`.
///
/// Rejects absolute paths, `..` components and platform prefixes so a request
/// can never escape the served directory.
pub fn safe_join(root: &Path, relative: &str) -> Result<PathBuf> {
    let mut joined = root.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => joined.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(Error::InvalidInput(format!(
                    "Invalid path: {relative}"
                )));
            }
        }
    }
    Ok(joined)
}
