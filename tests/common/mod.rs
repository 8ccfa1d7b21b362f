//! Shared test harness for integration tests.
//!
//! [`TestHarness`] builds a media fixture directory, scans it into a fresh
//! [`AppContext`] and serves the full router on a random local port.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use sb_av::ToolRegistry;
use sb_core::config::Config;
use sb_core::{Credentials, SortKey, SortOrder};
use sb_server::context::{AppContext, RescanRequest};
use sb_server::router::build_router;

pub const USERNAME: &str = "alice";
pub const PASSWORD: &str = "s3cret";

/// A running server over a temporary media directory.
pub struct TestHarness {
    pub ctx: AppContext,
    pub addr: SocketAddr,
    pub media: TempDir,
}

/// Populate `dir` with a small mixed tree:
///
/// ```text
/// a.mp4            100 bytes, bytes 0..100
/// b.mkv             50 bytes
/// sub/c.webm        10 bytes
/// notes.txt        (ignored by scans)
/// clip.mp4_000.ts  HLS segment
/// ```
pub fn write_fixture(dir: &Path) {
    let a: Vec<u8> = (0..100u8).collect();
    std::fs::write(dir.join("a.mp4"), a).unwrap();
    std::fs::write(dir.join("b.mkv"), vec![7u8; 50]).unwrap();
    std::fs::create_dir_all(dir.join("sub")).unwrap();
    std::fs::write(dir.join("sub").join("c.webm"), vec![1u8; 10]).unwrap();
    std::fs::write(dir.join("notes.txt"), b"not a video").unwrap();
    std::fs::write(dir.join("clip.mp4_000.ts"), b"segment-zero").unwrap();
}

impl TestHarness {
    /// Non-recursive catalog sorted by size, no auth.
    pub async fn start() -> Self {
        Self::start_with(None, false).await
    }

    /// Same fixture with basic auth enabled.
    pub async fn start_with_auth() -> Self {
        let creds = Credentials::new(USERNAME, PASSWORD).unwrap();
        Self::start_with(Some(creds), false).await
    }

    pub async fn start_with(credentials: Option<Credentials>, recursive: bool) -> Self {
        let media = tempfile::tempdir().expect("failed to create media dir");
        write_fixture(media.path());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        let ctx = AppContext::new(
            Config::default(),
            ToolRegistry::default(),
            credentials,
            "127.0.0.1",
            addr.port(),
        );
        ctx.rescan(RescanRequest {
            root: media.path(),
            recursive,
            probe_durations: false,
            sort: SortKey::Size,
            order: SortOrder::Desc,
        })
        .await
        .expect("initial scan failed");

        let app = build_router(ctx.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self { ctx, addr, media }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn media_path(&self) -> PathBuf {
        self.media.path().to_path_buf()
    }
}
