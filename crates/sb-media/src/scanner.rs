//! Catalog scanner.
//!
//! The directory walk runs on a blocking worker thread and streams every
//! qualifying file through an unbounded channel to a single async collector.
//! The collector finishes when the worker drops its sender, so the result is
//! complete once the channel closes.
//!
//! Scans are fail-fast: the first filesystem error aborts the whole scan and
//! no partial catalog is returned. A [`CancellationToken`] is checked at every
//! directory entry.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use futures::stream::{self, StreamExt};
use sb_av::{Tool, ToolRegistry};
use sb_core::{paths, CatalogEntry, Error, Result};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;

/// Maximum number of concurrent ffprobe runs when probing durations.
const PROBE_CONCURRENCY: usize = 4;

/// Options controlling a scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanOptions {
    /// Descend into subdirectories.
    pub recursive: bool,
    /// Fill in durations with ffprobe after the walk.
    pub probe_durations: bool,
}

impl ScanOptions {
    pub fn recursive(recursive: bool) -> Self {
        Self {
            recursive,
            ..Self::default()
        }
    }
}

/// Scan `root` for media files.
///
/// Returned paths are relative to `root` and `/`-separated. Order is not
/// significant; callers sort afterwards.
///
/// # Errors
///
/// - [`Error::InvalidInput`] if `root` is not a readable directory.
/// - [`Error::Scan`] on the first filesystem error during the walk.
/// - [`Error::Cancelled`] if `cancel` fires before the scan completes.
pub async fn scan(
    root: &Path,
    options: ScanOptions,
    tools: &ToolRegistry,
    cancel: &CancellationToken,
) -> Result<Vec<CatalogEntry>> {
    let meta = tokio::fs::metadata(root).await.map_err(|e| {
        Error::InvalidInput(format!("Cannot read directory {}: {e}", root.display()))
    })?;
    if !meta.is_dir() {
        return Err(Error::InvalidInput(format!(
            "{} is not a directory",
            root.display()
        )));
    }

    let started = Instant::now();
    tracing::info!(
        root = %root.display(),
        recursive = options.recursive,
        "Starting catalog scan"
    );

    let (tx, mut rx) = mpsc::unbounded_channel::<CatalogEntry>();

    let worker = {
        let root = root.to_path_buf();
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || walk(&root, options.recursive, &cancel, tx))
    };

    let mut seen = HashSet::new();
    let mut entries = Vec::new();
    while let Some(entry) = rx.recv().await {
        if seen.insert(entry.path.clone()) {
            entries.push(entry);
        } else {
            tracing::warn!(path = %entry.path, "Duplicate path from scan worker; ignoring");
        }
    }

    worker
        .await
        .map_err(|e| Error::Internal(format!("scan worker panicked: {e}")))??;

    if options.probe_durations {
        probe_durations(root, &mut entries, tools, cancel).await?;
    }

    tracing::info!(
        root = %root.display(),
        count = entries.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Catalog scan complete"
    );

    Ok(entries)
}

/// Blocking directory walk. Sends each qualifying file and drops `tx` on
/// return, which closes the channel.
fn walk(
    root: &Path,
    recursive: bool,
    cancel: &CancellationToken,
    tx: mpsc::UnboundedSender<CatalogEntry>,
) -> Result<()> {
    let mut walker = WalkDir::new(root).min_depth(1);
    if !recursive {
        walker = walker.max_depth(1);
    }

    for item in walker {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled("scan cancelled".into()));
        }

        let entry = item.map_err(|e| {
            let at = e
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| root.display().to_string());
            Error::scan(at, e.to_string())
        })?;

        if entry.file_type().is_dir() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if !paths::is_media_file_name(&name) {
            continue;
        }

        let Some(size) = file_size(&entry)? else {
            tracing::debug!(path = %entry.path().display(), "Skipping non-file entry");
            continue;
        };
        let Some(rel) = paths::relative_slash_path(root, entry.path()) else {
            return Err(Error::scan(
                entry.path().display(),
                "entry is outside the scan root",
            ));
        };

        tracing::trace!(path = %rel, size, "Found media file");
        if tx.send(CatalogEntry::new(rel, size)).is_err() {
            // Collector is gone; nobody wants the result.
            return Err(Error::Cancelled("scan collector dropped".into()));
        }
    }

    Ok(())
}

/// Size of the regular file an entry refers to, following symlinks.
///
/// `None` if the target is not a regular file (a symlink to a directory).
/// A dangling symlink is a walk error.
fn file_size(entry: &walkdir::DirEntry) -> Result<Option<u64>> {
    let meta = if entry.path_is_symlink() {
        std::fs::metadata(entry.path()).map_err(|e| e.to_string())
    } else {
        entry.metadata().map_err(|e| e.to_string())
    };
    let meta = meta.map_err(|message| Error::scan(entry.path().display(), message))?;
    Ok(meta.is_file().then_some(meta.len()))
}

/// Fill `duration` on every entry using ffprobe. Individual failures are
/// logged and leave the duration unset.
async fn probe_durations(
    root: &Path,
    entries: &mut [CatalogEntry],
    tools: &ToolRegistry,
    cancel: &CancellationToken,
) -> Result<()> {
    let ffprobe: PathBuf = match tools.require(Tool::Ffprobe) {
        Ok(path) => path.to_path_buf(),
        Err(e) => {
            tracing::warn!("Skipping duration probing: {e}");
            return Ok(());
        }
    };

    let ffprobe = ffprobe.as_path();
    stream::iter(entries.iter_mut())
        .for_each_concurrent(PROBE_CONCURRENCY, |entry| async move {
            if cancel.is_cancelled() {
                return;
            }
            let file = match paths::safe_join(root, &entry.path) {
                Ok(file) => file,
                Err(e) => {
                    tracing::warn!(path = %entry.path, "Cannot probe: {e}");
                    return;
                }
            };
            match sb_av::probe_duration(ffprobe, &file).await {
                Ok(duration) => entry.duration = duration,
                Err(e) => tracing::warn!(path = %entry.path, "Duration probe failed: {e}"),
            }
        })
        .await;

    if cancel.is_cancelled() {
        return Err(Error::Cancelled("scan cancelled".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds:
    /// ```text
    /// root/
    ///   a.mp4 (100 bytes)
    ///   B.MKV (50 bytes)
    ///   notes.txt
    ///   sub/
    ///     c.webm (10 bytes)
    ///     deeper/
    ///       d.mov (5 bytes)
    ///   fake.mp4/        (directory, never qualifies)
    /// ```
    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::write(root.join("a.mp4"), vec![0u8; 100]).unwrap();
        std::fs::write(root.join("B.MKV"), vec![0u8; 50]).unwrap();
        std::fs::write(root.join("notes.txt"), b"hello").unwrap();
        std::fs::create_dir_all(root.join("sub/deeper")).unwrap();
        std::fs::write(root.join("sub/c.webm"), vec![0u8; 10]).unwrap();
        std::fs::write(root.join("sub/deeper/d.mov"), vec![0u8; 5]).unwrap();
        std::fs::create_dir(root.join("fake.mp4")).unwrap();
        dir
    }

    fn sorted_paths(entries: &[CatalogEntry]) -> Vec<String> {
        let mut paths: Vec<String> = entries.iter().map(|e| e.path.clone()).collect();
        paths.sort();
        paths
    }

    #[tokio::test]
    async fn non_recursive_skips_subdirectories() {
        let dir = fixture();
        let entries = scan(
            dir.path(),
            ScanOptions::recursive(false),
            &ToolRegistry::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(sorted_paths(&entries), vec!["B.MKV", "a.mp4"]);
        assert!(entries.iter().all(|e| !e.path.contains('/')));
    }

    #[tokio::test]
    async fn recursive_finds_everything() {
        let dir = fixture();
        let entries = scan(
            dir.path(),
            ScanOptions::recursive(true),
            &ToolRegistry::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(
            sorted_paths(&entries),
            vec!["B.MKV", "a.mp4", "sub/c.webm", "sub/deeper/d.mov"]
        );
    }

    #[tokio::test]
    async fn sizes_are_captured() {
        let dir = fixture();
        let entries = scan(
            dir.path(),
            ScanOptions::recursive(true),
            &ToolRegistry::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let size_of = |p: &str| entries.iter().find(|e| e.path == p).unwrap().size;
        assert_eq!(size_of("a.mp4"), 100);
        assert_eq!(size_of("sub/deeper/d.mov"), 5);
        assert!(entries.iter().all(|e| e.duration.is_none()));
    }

    #[tokio::test]
    async fn empty_directory_yields_empty_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let entries = scan(
            dir.path(),
            ScanOptions::recursive(true),
            &ToolRegistry::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn missing_root_is_invalid_input() {
        let err = scan(
            Path::new("/nonexistent/streambox/media"),
            ScanOptions::default(),
            &ToolRegistry::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn file_root_is_invalid_input() {
        let dir = fixture();
        let err = scan(
            &dir.path().join("a.mp4"),
            ScanOptions::default(),
            &ToolRegistry::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn cancelled_scan_returns_no_catalog() {
        let dir = fixture();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = scan(
            dir.path(),
            ScanOptions::recursive(true),
            &ToolRegistry::default(),
            &cancel,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Cancelled(_)));
    }

    #[tokio::test]
    async fn probing_without_ffprobe_is_not_an_error() {
        let dir = fixture();
        let options = ScanOptions {
            recursive: false,
            probe_durations: true,
        };
        let entries = scan(
            dir.path(),
            options,
            &ToolRegistry::with_paths([]),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.duration.is_none()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn probing_fills_durations() {
        use std::os::unix::fs::PermissionsExt;

        let dir = fixture();
        let bin = tempfile::tempdir().unwrap();
        let script = bin.path().join("ffprobe");
        std::fs::write(
            &script,
            "#!/bin/sh\necho '{\"format\": {\"duration\": \"61.5\"}}'\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let options = ScanOptions {
            recursive: true,
            probe_durations: true,
        };
        let entries = scan(
            dir.path(),
            options,
            &ToolRegistry::with_paths([(Tool::Ffprobe, script)]),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(entries.len(), 4);
        assert!(entries.iter().all(|e| e.duration == Some(61.5)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlinked_files_report_target_size() {
        let dir = fixture();
        std::os::unix::fs::symlink(dir.path().join("a.mp4"), dir.path().join("link.mp4"))
            .unwrap();

        let entries = scan(
            dir.path(),
            ScanOptions::recursive(false),
            &ToolRegistry::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let link = entries.iter().find(|e| e.path == "link.mp4").unwrap();
        assert_eq!(link.size, 100);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlink_to_directory_never_qualifies() {
        let dir = fixture();
        std::os::unix::fs::symlink(dir.path().join("sub"), dir.path().join("movie.mp4"))
            .unwrap();

        let entries = scan(
            dir.path(),
            ScanOptions::recursive(false),
            &ToolRegistry::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(sorted_paths(&entries), vec!["B.MKV", "a.mp4"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn walk_error_fails_the_whole_scan() {
        let dir = fixture();
        std::os::unix::fs::symlink(dir.path().join("gone"), dir.path().join("ghost.mp4"))
            .unwrap();

        let err = scan(
            dir.path(),
            ScanOptions::recursive(true),
            &ToolRegistry::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Scan { ref path, .. } if path.ends_with("ghost.mp4")));
        assert_eq!(err.http_status(), 500);
    }
}
