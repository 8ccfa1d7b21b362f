//! Catalog listing, lookup and removal by 1-based ID.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use sb_core::CatalogItem;
use sb_media::playlist;

use crate::context::AppContext;
use crate::error::AppError;

#[derive(Debug, Serialize)]
pub struct VideoUrlResponse {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// IDs arrive as raw path text so a non-numeric ID gets the same error as an
/// out-of-range one.
fn parse_id(raw: &str) -> Result<usize, AppError> {
    raw.trim()
        .parse::<usize>()
        .map_err(|_| sb_core::Error::InvalidInput("Invalid video ID".into()).into())
}

/// `GET /api/v1/playlist/list`
pub async fn list_videos(State(ctx): State<AppContext>) -> Json<Vec<CatalogItem>> {
    Json(ctx.catalog.snapshot().items())
}

/// `GET /api/v1/playlist/{id}`
pub async fn get_video(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<VideoUrlResponse>, AppError> {
    let id = parse_id(&id)?;
    let snapshot = ctx.catalog.snapshot();
    let entry = snapshot.get(id)?;

    Ok(Json(VideoUrlResponse {
        url: playlist::stream_url(&entry.path, &ctx.public_host, ctx.public_port),
    }))
}

/// `DELETE /api/v1/playlist/{id}`
///
/// Removes the entry from the in-memory catalog only; the file stays on disk.
pub async fn delete_video(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = parse_id(&id)?;
    let removed = ctx.catalog.remove_at(id)?;
    tracing::info!(id, path = %removed.path, "Removed catalog entry");

    Ok(Json(MessageResponse {
        message: "Video deleted successfully".into(),
    }))
}
