//! Directory completion for clients choosing a catalog root.

use std::path::{Path, PathBuf};

use axum::extract::rejection::QueryRejection;
use axum::extract::Query;
use axum::Json;
use serde::{Deserialize, Serialize};

use sb_core::Error;

use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct SuggestionQuery {
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathSuggestion {
    pub path: String,
    #[serde(rename = "isDir")]
    pub is_dir: bool,
}

/// `GET /api/v1/path-suggestions?path=`
pub async fn path_suggestions(
    query: Result<Query<SuggestionQuery>, QueryRejection>,
) -> Result<Json<Vec<PathSuggestion>>, AppError> {
    let Query(query) = query?;
    Ok(Json(suggest(&query.path).await?))
}

/// Directory whose children complete `prefix`: the prefix itself when it
/// ends in `/`, otherwise its parent.
fn listing_dir(prefix: &str) -> PathBuf {
    if prefix.ends_with('/') {
        return PathBuf::from(prefix);
    }
    match Path::new(prefix).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Non-hidden subdirectories whose full path starts with `prefix`, sorted.
pub async fn suggest(prefix: &str) -> Result<Vec<PathSuggestion>, Error> {
    if prefix.trim().is_empty() {
        return Err(Error::InvalidInput("Path is required".into()));
    }

    let dir = listing_dir(prefix);
    let mut reader = tokio::fs::read_dir(&dir).await.map_err(|e| {
        Error::InvalidInput(format!("Cannot read directory {}: {e}", dir.display()))
    })?;

    let mut suggestions = Vec::new();
    while let Some(entry) = reader.next_entry().await? {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with('.') {
            continue;
        }
        // Follows symlinks so linked directories are offered too.
        let is_dir = tokio::fs::metadata(entry.path())
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir {
            continue;
        }

        let full = dir.join(&*name).to_string_lossy().into_owned();
        if full.starts_with(prefix) {
            suggestions.push(PathSuggestion {
                path: full,
                is_dir: true,
            });
        }
    }

    suggestions.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(suggestions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for sub in ["movies", "music", "shows", ".hidden"] {
            std::fs::create_dir(dir.path().join(sub)).unwrap();
        }
        std::fs::write(dir.path().join("mfile.txt"), b"x").unwrap();
        dir
    }

    fn paths(suggestions: &[PathSuggestion]) -> Vec<String> {
        suggestions.iter().map(|s| s.path.clone()).collect()
    }

    #[tokio::test]
    async fn prefix_filters_siblings() {
        let dir = tree();
        let root = dir.path().to_string_lossy().into_owned();

        let found = suggest(&format!("{root}/m")).await.unwrap();
        assert_eq!(
            paths(&found),
            vec![format!("{root}/movies"), format!("{root}/music")]
        );
        assert!(found.iter().all(|s| s.is_dir));
    }

    #[tokio::test]
    async fn trailing_slash_lists_directory() {
        let dir = tree();
        let root = dir.path().to_string_lossy().into_owned();

        let found = suggest(&format!("{root}/")).await.unwrap();
        assert_eq!(
            paths(&found),
            vec![
                format!("{root}/movies"),
                format!("{root}/music"),
                format!("{root}/shows")
            ]
        );
    }

    #[tokio::test]
    async fn empty_or_unreadable_is_invalid_input() {
        assert!(matches!(suggest("").await, Err(Error::InvalidInput(_))));

        let dir = tree();
        let missing = format!("{}/nope/x", dir.path().display());
        assert!(matches!(suggest(&missing).await, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn serializes_is_dir_in_camel_case() {
        let json = serde_json::to_value(PathSuggestion {
            path: "/a".into(),
            is_dir: true,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"path": "/a", "isDir": true}));
    }
}
