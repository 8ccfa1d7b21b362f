//! Axum router construction.
//!
//! `/health` sits outside the auth gate; every other route goes through it.
//! Request IDs, CORS and tracing wrap the whole tree.

use axum::middleware;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::context::AppContext;
use crate::middleware::auth::basic_auth_middleware;
use crate::middleware::request_id::request_id_middleware;
use crate::routes;

/// Build the complete application router.
pub fn build_router(ctx: AppContext) -> Router {
    let public = Router::new().route("/health", get(routes::health::health));

    let protected = Router::new()
        .route("/playlist.m3u8", get(routes::playlist::get_playlist))
        .route(
            "/api/v1/playlist",
            get(routes::playlist::get_playlist).post(routes::playlist::rescan),
        )
        .route("/api/v1/playlist/list", get(routes::catalog::list_videos))
        .route(
            "/api/v1/playlist/{id}",
            get(routes::catalog::get_video).delete(routes::catalog::delete_video),
        )
        .route(
            "/api/v1/path-suggestions",
            get(routes::suggestions::path_suggestions),
        )
        .route("/videos/{*path}", get(routes::videos::serve_video))
        .layer(middleware::from_fn_with_state(
            ctx.clone(),
            basic_auth_middleware,
        ));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
