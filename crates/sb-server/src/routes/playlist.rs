//! Playlist routes: render the catalog as M3U and re-scan on request.

use std::path::PathBuf;
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use sb_core::{SortKey, SortOrder};
use sb_media::playlist;

use crate::context::{AppContext, RescanRequest};
use crate::error::AppError;

/// Content type of every playlist the server emits.
pub const PLAYLIST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";

/// `GET /playlist.m3u8` and `GET /api/v1/playlist`
///
/// Rendered output is memoized in the TTL cache under a digest of the
/// catalog and the advertised address.
pub async fn get_playlist(State(ctx): State<AppContext>) -> Response {
    let snapshot = ctx.catalog.snapshot();
    let auth = ctx.auth_pair();
    let key = playlist::cache_key(
        &snapshot.entries,
        &ctx.public_host,
        ctx.public_port,
        auth.is_some(),
    );

    let body = match ctx.playlist_cache.get(&key) {
        Some(cached) => {
            tracing::debug!(%key, "Playlist cache hit");
            cached
        }
        None => {
            let rendered = Bytes::from(playlist::generate(
                &snapshot.entries,
                &ctx.public_host,
                ctx.public_port,
                auth,
            ));
            let ttl = Duration::from_secs(ctx.config.cache.playlist_ttl_secs);
            ctx.playlist_cache.set(key, rendered.clone(), ttl);
            rendered
        }
    };

    ([(header::CONTENT_TYPE, PLAYLIST_CONTENT_TYPE)], body).into_response()
}

#[derive(Debug, Deserialize)]
pub struct RescanBody {
    pub path: String,
    #[serde(default)]
    pub recursive: Option<bool>,
    /// Extra scanner flags. Only `-r` / `--recursive` is understood.
    #[serde(default)]
    pub args: ScanArgs,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub order: Option<String>,
}

/// Scanner flags, either as one shell-style string (`"-r"`) or a list
/// (`["-r"]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ScanArgs {
    Line(String),
    List(Vec<String>),
}

impl Default for ScanArgs {
    fn default() -> Self {
        ScanArgs::List(Vec::new())
    }
}

impl ScanArgs {
    pub fn flags(&self) -> Vec<&str> {
        match self {
            ScanArgs::Line(line) => line.split_whitespace().collect(),
            ScanArgs::List(list) => list.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RescanResponse {
    pub message: String,
    pub count: usize,
}

/// `POST /api/v1/playlist`
pub async fn rescan(
    State(ctx): State<AppContext>,
    body: Result<Json<RescanBody>, JsonRejection>,
) -> Result<Json<RescanResponse>, AppError> {
    let Json(body) = body?;

    let raw = body.path.trim();
    if raw.is_empty() {
        return Err(sb_core::Error::InvalidInput("Path is required".into()).into());
    }
    let root = PathBuf::from(shellexpand::tilde(raw).as_ref());

    let mut recursive = body.recursive.unwrap_or(false);
    for arg in body.args.flags() {
        match arg {
            "-r" | "--recursive" => recursive = true,
            other => tracing::warn!(arg = other, "Ignoring unsupported scan argument"),
        }
    }

    let catalog_config = &ctx.config.catalog;
    let sort = body
        .sort
        .as_deref()
        .map(SortKey::parse_lenient)
        .unwrap_or(catalog_config.sort);
    let order = body
        .order
        .as_deref()
        .map(SortOrder::parse_lenient)
        .unwrap_or(catalog_config.order);

    let count = ctx
        .rescan(RescanRequest {
            root: &root,
            recursive,
            probe_durations: catalog_config.probe_durations,
            sort,
            order,
        })
        .await?;

    Ok(Json(RescanResponse {
        message: "Playlist updated".into(),
        count,
    }))
}
