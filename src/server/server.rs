use anyhow::Result;
use std::time::Duration;

use tracing::info;

use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::services::ServeDir;

use super::classroom_routes::make_classroom_routes;
use super::recording_routes::make_recording_routes;
use super::{log_requests, state::ServerState, ServerConfig};
use crate::ingestion::IngestionManager;

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub started_at: String,
    pub version: &'static str,
    pub git_hash: &'static str,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn status(State(state): State<ServerState>) -> impl IntoResponse {
    Json(ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        started_at: state.started_at.to_rfc3339(),
        version: env!("CARGO_PKG_VERSION"),
        git_hash: env!("GIT_HASH"),
    })
}

/// `/play` only serves files sitting directly in the uploads directory. Whatever is
/// nested below it, like the classroom photos, is not reachable there.
async fn top_level_only(request: Request, next: Next) -> Response {
    let name = request.uri().path().trim_start_matches('/');
    if name.contains('/') || name.to_ascii_lowercase().contains("%2f") {
        return StatusCode::NOT_FOUND.into_response();
    }
    next.run(request).await
}

pub fn make_app(config: ServerConfig, ingestion_manager: IngestionManager) -> Result<Router> {
    let media = ingestion_manager.media().clone();
    let state = ServerState::new(config.clone(), ingestion_manager);

    let play_routes: Router = Router::new()
        .fallback_service(
            ServeDir::new(media.uploads_dir()).append_index_html_on_directories(false),
        )
        .layer(middleware::from_fn(top_level_only));

    let file_routes: Router = Router::new()
        .nest("/play", play_routes)
        .nest_service("/spectrogram", ServeDir::new(media.spectrograms_dir()))
        .nest_service(
            "/uploads/aulas_img",
            ServeDir::new(media.classroom_images_dir()),
        );

    let status_routes: Router = Router::new()
        .route("/status", get(status))
        .with_state(state.clone());

    let app: Router = make_classroom_routes(state.clone())
        .merge(make_recording_routes(state.clone()))
        .merge(status_routes)
        .merge(file_routes)
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(middleware::from_fn_with_state(state.clone(), log_requests));

    Ok(app)
}

pub async fn run_server(config: ServerConfig, ingestion_manager: IngestionManager) -> Result<()> {
    let port = config.port;
    let app = make_app(config, ingestion_manager)?;

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    info!("Listening on {}", listener.local_addr()?);

    Ok(axum::serve(listener, app).await?)
}
