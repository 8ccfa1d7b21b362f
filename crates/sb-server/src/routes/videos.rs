//! Media delivery under `/videos/`.
//!
//! Three kinds of request share the prefix:
//!
//! - `<file>.m3u8`: a transcoded manifest if one exists, otherwise the
//!   degraded single-segment playlist for `<file>`.
//! - `<base><N>.ts`: an HLS segment, resolved by index.
//! - anything else: the file itself, with byte-range support.

use std::path::Path as FsPath;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use sb_core::{paths, Error};
use sb_media::{playlist, segment};

use crate::context::AppContext;
use crate::error::AppError;
use crate::routes::playlist::PLAYLIST_CONTENT_TYPE;

const READ_CHUNK: usize = 64 * 1024;

/// `GET /videos/{*path}`
pub async fn serve_video(
    State(ctx): State<AppContext>,
    Path(requested): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let root = ctx.catalog.root();
    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok());

    if let Some(media) = requested.strip_suffix(".m3u8") {
        return serve_manifest(&root, &requested, media).await;
    }

    // Names without a trailing index are plain files, not segments.
    if let Some(stem) = requested.strip_suffix(".ts") {
        if segment::split_segment_request(stem).is_ok() {
            let file = segment::resolve_segment(&root, stem).await?;
            return stream_file(&file, segment::SEGMENT_CONTENT_TYPE, range).await;
        }
    }

    let file = paths::safe_join(&root, &requested)?;
    stream_file(&file, content_type_for(&requested), range).await
}

async fn serve_manifest(root: &FsPath, requested: &str, media: &str) -> Result<Response, AppError> {
    let manifest = paths::safe_join(root, requested)?;
    match tokio::fs::read(&manifest).await {
        Ok(bytes) => {
            return Ok(([(header::CONTENT_TYPE, PLAYLIST_CONTENT_TYPE)], bytes).into_response());
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(Error::from_io("manifest", requested, e).into()),
    }

    let media_path = paths::safe_join(root, media)?;
    let is_file = tokio::fs::metadata(&media_path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false);
    if !is_file {
        return Err(Error::not_found("video", media).into());
    }

    let file_name = media.rsplit('/').next().unwrap_or(media);
    tracing::debug!(file = file_name, "Serving degraded playlist");
    Ok((
        [(header::CONTENT_TYPE, PLAYLIST_CONTENT_TYPE)],
        playlist::fallback_playlist(file_name),
    )
        .into_response())
}

/// Stream a file from disk, honoring a single `Range` header.
async fn stream_file(
    path: &FsPath,
    content_type: &'static str,
    range_header: Option<&str>,
) -> Result<Response, AppError> {
    let display = path.display().to_string();
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| Error::from_io("video", &display, e))?;
    if !metadata.is_file() {
        return Err(Error::not_found("video", &display).into());
    }
    let file_size = metadata.len();

    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| Error::from_io("video", &display, e))?;

    let Some(range_header) = range_header else {
        let body = Body::from_stream(ReaderStream::with_capacity(file, READ_CHUNK));
        return Ok((
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, content_type.to_string()),
                (header::CONTENT_LENGTH, file_size.to_string()),
                (header::ACCEPT_RANGES, "bytes".to_string()),
            ],
            body,
        )
            .into_response());
    };

    let Some((start, end)) = parse_range_header(range_header, file_size) else {
        return Ok((
            StatusCode::RANGE_NOT_SATISFIABLE,
            [(header::CONTENT_RANGE, format!("bytes */{file_size}"))],
            Body::empty(),
        )
            .into_response());
    };

    let length = end - start + 1;
    file.seek(std::io::SeekFrom::Start(start))
        .await
        .map_err(|e| Error::Internal(format!("Seek failed: {e}")))?;
    let body = Body::from_stream(ReaderStream::with_capacity(file.take(length), READ_CHUNK));

    Ok((
        StatusCode::PARTIAL_CONTENT,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_RANGE, format!("bytes {start}-{end}/{file_size}")),
            (header::CONTENT_LENGTH, length.to_string()),
            (header::ACCEPT_RANGES, "bytes".to_string()),
        ],
        body,
    )
        .into_response())
}

/// Parse `bytes=START-END`, `bytes=START-` or `bytes=-SUFFIX` into an
/// inclusive range clamped to the file. `None` means unsatisfiable.
fn parse_range_header(header: &str, file_size: u64) -> Option<(u64, u64)> {
    if file_size == 0 {
        return None;
    }
    let ranges = header.trim().strip_prefix("bytes=")?;
    let (start, end) = ranges.split_once('-')?;
    let (start, end) = (start.trim(), end.trim());
    let last = file_size - 1;

    match (start.is_empty(), end.is_empty()) {
        (true, false) => {
            let suffix: u64 = end.parse().ok()?;
            if suffix == 0 {
                return None;
            }
            Some((file_size.saturating_sub(suffix), last))
        }
        (false, true) => {
            let start: u64 = start.parse().ok()?;
            (start <= last).then_some((start, last))
        }
        (false, false) => {
            let start: u64 = start.parse().ok()?;
            let end: u64 = end.parse::<u64>().ok()?.min(last);
            (start <= end).then_some((start, end))
        }
        (true, true) => None,
    }
}

fn content_type_for(path: &str) -> &'static str {
    let ext = path.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "ts" => segment::SEGMENT_CONTENT_TYPE,
        "m3u8" => PLAYLIST_CONTENT_TYPE,
        _ => "application/octet-stream",
    }
}
