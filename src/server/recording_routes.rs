//! Recording upload, lookup and deletion routes.

use super::classroom_routes::{ingestion_error_response, read_form};
use super::multipart_form::MultipartForm;
use super::state::{GuardedClassroomStore, GuardedIngestionManager, ServerState};
use crate::classroom_store::{RecordingMetadata, RecordingScope};
use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::error;

fn recording_metadata(form: &MultipartForm) -> RecordingMetadata {
    RecordingMetadata {
        researcher: form.text("investigador").map(str::to_string),
        description: form.text("descripcion").map(str::to_string),
        location: form.text("ubicacion").map(str::to_string),
        tags: form.text("etiquetas").map(str::to_string),
    }
}

async fn ingest(
    manager: GuardedIngestionManager,
    multipart: Result<Multipart, MultipartRejection>,
    classroom_id: Option<i64>,
) -> Response {
    let back = match classroom_id {
        Some(id) => format!("/aula/{}", id),
        None => "/".to_string(),
    };
    let mut form = match read_form(multipart).await {
        Ok(form) => form,
        Err(response) => return response,
    };
    let metadata = recording_metadata(&form);
    let file = form.take_file("file");

    match manager
        .ingest_recording_detached(file, metadata, classroom_id)
        .await
    {
        Ok(_) => Redirect::to(&back).into_response(),
        Err(e) => ingestion_error_response(e, &back),
    }
}

/// POST /aula/{id}/upload_audio - Upload a recording for a classroom
async fn upload_classroom_audio(
    State(manager): State<GuardedIngestionManager>,
    Path(id): Path<i64>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    ingest(manager, multipart, Some(id)).await
}

/// POST /upload - Upload a recording not tied to any classroom
async fn upload_audio(
    State(manager): State<GuardedIngestionManager>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    ingest(manager, multipart, None).await
}

/// GET /recordings - Recordings not tied to any classroom
async fn list_recordings(State(store): State<GuardedClassroomStore>) -> Response {
    match store.list_recordings(RecordingScope::TopLevel) {
        Ok(recordings) => Json(recordings).into_response(),
        Err(e) => {
            error!("Failed to list recordings: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// GET /grabacion/{id}
async fn get_recording(
    State(store): State<GuardedClassroomStore>,
    Path(id): Path<i64>,
) -> Response {
    match store.get_recording(id) {
        Ok(Some(recording)) => Json(recording).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            error!("Failed to load recording {}: {}", id, e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// POST /grabacion/{id}/delete - Remove a recording and its files
async fn delete_recording(
    State(manager): State<GuardedIngestionManager>,
    Path(id): Path<i64>,
) -> Response {
    match manager.delete_recording(id).await {
        Ok(recording) => {
            let target = match recording.classroom_id {
                Some(classroom_id) => format!("/aula/{}", classroom_id),
                None => "/".to_string(),
            };
            Redirect::to(&target).into_response()
        }
        Err(e) => ingestion_error_response(e, "/"),
    }
}

pub fn make_recording_routes(state: ServerState) -> Router {
    Router::new()
        .route("/upload", post(upload_audio))
        .route("/aula/{id}/upload_audio", post(upload_classroom_audio))
        .route("/recordings", get(list_recordings))
        .route("/grabacion/{id}", get(get_recording))
        .route("/grabacion/{id}/delete", post(delete_recording))
        .with_state(state)
}
