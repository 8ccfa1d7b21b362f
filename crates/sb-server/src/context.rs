//! Application context.
//!
//! [`AppContext`] is shared across all route handlers via Axum state. It is
//! cheap to clone because every field is an `Arc` or a token.

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use sb_av::ToolRegistry;
use sb_core::config::Config;
use sb_core::{CatalogStore, Credentials, Error, SortKey, SortOrder, TtlCache};
use sb_media::ScanOptions;

// ---------------------------------------------------------------------------
// Scan coordination
// ---------------------------------------------------------------------------

/// Tracks the in-flight catalog scan so a newer request can supersede it.
#[derive(Debug, Default)]
pub struct ScanSlot {
    current: Mutex<Option<(u64, CancellationToken)>>,
    next_generation: Mutex<u64>,
}

impl ScanSlot {
    /// Register a new scan, cancelling whichever one was running.
    fn begin(&self, parent: &CancellationToken) -> (u64, CancellationToken) {
        let generation = {
            let mut next = self.next_generation.lock();
            *next += 1;
            *next
        };
        let token = parent.child_token();

        let previous = self.current.lock().replace((generation, token.clone()));
        if let Some((old, old_token)) = previous {
            tracing::info!(superseded = old, by = generation, "Cancelling previous scan");
            old_token.cancel();
        }
        (generation, token)
    }

    /// Run `commit` only if `generation` is still the current scan, then
    /// clear the slot. Holding the lock while committing means a superseded
    /// scan can never overwrite a newer result.
    fn finish<T>(&self, generation: u64, commit: impl FnOnce() -> T) -> sb_core::Result<T> {
        let mut current = self.current.lock();
        match current.as_ref() {
            Some((g, token)) if *g == generation && !token.is_cancelled() => {
                let out = commit();
                *current = None;
                Ok(out)
            }
            Some((g, _)) if *g == generation => {
                *current = None;
                Err(Error::Cancelled("scan cancelled".into()))
            }
            _ => Err(Error::Cancelled("superseded by a newer scan".into())),
        }
    }

    /// Drop the slot entry for a scan that failed.
    fn abandon(&self, generation: u64) {
        let mut current = self.current.lock();
        if matches!(current.as_ref(), Some((g, _)) if *g == generation) {
            *current = None;
        }
    }

    /// Whether a scan is currently running.
    pub fn is_active(&self) -> bool {
        self.current.lock().is_some()
    }
}

/// Parameters of a (re-)scan.
#[derive(Debug, Clone)]
pub struct RescanRequest<'a> {
    pub root: &'a Path,
    pub recursive: bool,
    pub probe_durations: bool,
    pub sort: SortKey,
    pub order: SortOrder,
}

// ---------------------------------------------------------------------------
// AppContext
// ---------------------------------------------------------------------------

/// Application context shared by all request handlers.
#[derive(Clone)]
pub struct AppContext {
    /// Immutable configuration snapshot.
    pub config: Arc<Config>,
    /// The current catalog.
    pub catalog: Arc<CatalogStore>,
    /// Rendered playlists keyed by [`sb_media::playlist::cache_key`].
    pub playlist_cache: Arc<TtlCache<Bytes>>,
    /// External tool registry.
    pub tools: Arc<ToolRegistry>,
    /// Basic-auth credentials. `None` disables the auth gate.
    pub credentials: Option<Arc<Credentials>>,
    /// Host embedded in playlist URLs.
    pub public_host: Arc<str>,
    /// Port embedded in playlist URLs.
    pub public_port: u16,
    /// In-flight scan tracking.
    pub scans: Arc<ScanSlot>,
    /// Cancelled on server shutdown.
    pub shutdown: CancellationToken,
}

impl AppContext {
    pub fn new(
        config: Config,
        tools: ToolRegistry,
        credentials: Option<Credentials>,
        public_host: impl Into<Arc<str>>,
        public_port: u16,
    ) -> Self {
        let root = config
            .catalog
            .root
            .clone()
            .unwrap_or_else(|| std::path::PathBuf::from("."));
        let recursive = config.catalog.recursive;

        Self {
            config: Arc::new(config),
            catalog: Arc::new(CatalogStore::new(root, recursive)),
            playlist_cache: Arc::new(TtlCache::new()),
            tools: Arc::new(tools),
            credentials: credentials.map(Arc::new),
            public_host: public_host.into(),
            public_port,
            scans: Arc::new(ScanSlot::default()),
            shutdown: CancellationToken::new(),
        }
    }

    /// Scan `request.root` and atomically replace the catalog.
    ///
    /// A newer call cancels this one; the superseded call then returns
    /// [`Error::Cancelled`] and leaves the catalog untouched.
    pub async fn rescan(&self, request: RescanRequest<'_>) -> sb_core::Result<usize> {
        let (generation, token) = self.scans.begin(&self.shutdown);

        let options = ScanOptions {
            recursive: request.recursive,
            probe_durations: request.probe_durations,
        };
        let mut entries = match sb_media::scan(request.root, options, &self.tools, &token).await {
            Ok(entries) => entries,
            Err(e) => {
                self.scans.abandon(generation);
                return Err(e);
            }
        };
        sb_core::catalog::sort_entries(&mut entries, request.sort, request.order);

        let count = entries.len();
        self.scans.finish(generation, || {
            self.catalog
                .replace(request.root, request.recursive, entries);
        })?;

        tracing::info!(
            root = %request.root.display(),
            count,
            "Catalog replaced"
        );
        Ok(count)
    }

    /// Credentials as a borrowed pair, for playlist rendering.
    pub fn auth_pair(&self) -> Option<(&str, &str)> {
        self.credentials
            .as_deref()
            .map(|c| (c.username.as_str(), c.password.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> AppContext {
        AppContext::new(
            Config::default(),
            ToolRegistry::default(),
            None,
            "127.0.0.1",
            8069,
        )
    }

    fn media_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("small.mp4"), vec![0u8; 10]).unwrap();
        std::fs::write(dir.path().join("big.mkv"), vec![0u8; 1000]).unwrap();
        dir
    }

    #[tokio::test]
    async fn rescan_replaces_and_sorts() {
        let ctx = context();
        let dir = media_dir();

        let count = ctx
            .rescan(RescanRequest {
                root: dir.path(),
                recursive: false,
                probe_durations: false,
                sort: SortKey::Size,
                order: SortOrder::Desc,
            })
            .await
            .unwrap();

        assert_eq!(count, 2);
        let snap = ctx.catalog.snapshot();
        assert_eq!(snap.root, dir.path());
        assert_eq!(snap.get(1).unwrap().path, "big.mkv");
        assert!(!ctx.scans.is_active());
    }

    #[tokio::test]
    async fn failed_rescan_keeps_old_catalog() {
        let ctx = context();
        let dir = media_dir();
        let request = RescanRequest {
            root: dir.path(),
            recursive: false,
            probe_durations: false,
            sort: SortKey::None,
            order: SortOrder::Desc,
        };
        ctx.rescan(request.clone()).await.unwrap();

        let missing = dir.path().join("missing");
        let err = ctx
            .rescan(RescanRequest {
                root: &missing,
                ..request
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(ctx.catalog.len(), 2);
        assert!(!ctx.scans.is_active());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn walk_failure_keeps_old_catalog() {
        let ctx = context();
        let dir = media_dir();
        let request = RescanRequest {
            root: dir.path(),
            recursive: false,
            probe_durations: false,
            sort: SortKey::Size,
            order: SortOrder::Desc,
        };
        ctx.rescan(request.clone()).await.unwrap();

        std::os::unix::fs::symlink(dir.path().join("gone"), dir.path().join("ghost.mp4"))
            .unwrap();
        let err = ctx.rescan(request).await.unwrap_err();

        assert!(matches!(err, Error::Scan { .. }));
        assert_eq!(ctx.catalog.len(), 2);
        assert_eq!(ctx.catalog.snapshot().get(1).unwrap().path, "big.mkv");
        assert!(!ctx.scans.is_active());
    }

    #[test]
    fn superseded_scan_cannot_commit() {
        let slot = ScanSlot::default();
        let parent = CancellationToken::new();

        let (first, first_token) = slot.begin(&parent);
        let (second, _) = slot.begin(&parent);
        assert!(first_token.is_cancelled());

        let err = slot.finish(first, || ()).unwrap_err();
        assert!(matches!(err, Error::Cancelled(_)));
        assert!(slot.is_active());

        slot.finish(second, || ()).unwrap();
        assert!(!slot.is_active());
    }

    #[test]
    fn shutdown_cancels_running_scan() {
        let slot = ScanSlot::default();
        let parent = CancellationToken::new();
        let (generation, token) = slot.begin(&parent);

        parent.cancel();
        assert!(token.is_cancelled());
        assert!(matches!(
            slot.finish(generation, || ()).unwrap_err(),
            Error::Cancelled(_)
        ));
    }
}
