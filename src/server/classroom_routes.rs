//! Classroom CRUD routes.
//!
//! Reads return JSON; form posts answer with a 303 redirect to the page that shows
//! the result.

use super::multipart_form::{parse_decimal, MultipartForm};
use super::state::{GuardedClassroomStore, GuardedIngestionManager, ServerState};
use super::ErrorResponse;
use crate::classroom_store::{NewClassroom, NewSurface};
use crate::ingestion::{ClassroomEdit, IngestionError};
use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::{debug, error, warn};

#[derive(Deserialize, Debug, Default)]
pub struct ListQuery {
    pub q: Option<String>,
}

fn classroom_path(id: i64) -> String {
    format!("/aula/{}", id)
}

/// Maps pipeline errors to responses. Input errors send the client back to `back`.
pub(super) fn ingestion_error_response(err: IngestionError, back: &str) -> Response {
    match err {
        IngestionError::MissingFile => {
            debug!("Upload without file, redirecting to {}", back);
            Redirect::to(back).into_response()
        }
        IngestionError::ClassroomNotFound(_) | IngestionError::RecordingNotFound(_) => {
            StatusCode::NOT_FOUND.into_response()
        }
        IngestionError::Media(_) | IngestionError::Store(_) | IngestionError::Task(_) => {
            error!("Request failed: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: err.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// Reads a posted form. Bodies over the upload limit are answered with 413; any other
/// unreadable body counts as an empty form so the handler redirects as it would for a
/// missing file or field.
pub(super) async fn read_form(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<MultipartForm, Response> {
    let multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            debug!("Not a multipart body: {}", rejection);
            return Ok(MultipartForm::default());
        }
    };
    match MultipartForm::read(multipart).await {
        Ok(form) => Ok(form),
        Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            warn!("Rejected multipart body: {}", e);
            Err((e.status(), e.body_text()).into_response())
        }
        Err(e) => {
            debug!("Unreadable multipart body, treating it as empty: {}", e);
            Ok(MultipartForm::default())
        }
    }
}

/// Building and name are required; the window count is optional.
fn classroom_fields(form: &MultipartForm) -> Option<NewClassroom> {
    let building = form.non_empty("edificio")?;
    let name = form.non_empty("nombre_aula")?;
    let window_count = form
        .text("num_ventanas")
        .and_then(|v| v.trim().parse::<i64>().ok());
    Some(NewClassroom {
        building,
        name,
        window_count,
    })
}

/// Zips the parallel surface lists. Rows with any empty field are dropped, as are rows
/// whose area is not a number.
fn surface_rows(form: &MultipartForm) -> Vec<NewSurface> {
    let names = form.texts("nombre_espacio");
    let materials = form.texts("material");
    let areas = form.texts("area");

    names
        .iter()
        .zip(materials)
        .zip(areas)
        .filter(|((n, m), a)| !n.is_empty() && !m.is_empty() && !a.is_empty())
        .filter_map(|((n, m), a)| match parse_decimal(a) {
            Some(area) => Some(NewSurface {
                space_name: n.clone(),
                material: m.clone(),
                area,
            }),
            None => {
                warn!("Skipping surface {:?} with invalid area {:?}", n, a);
                None
            }
        })
        .collect()
}

// =============================================================================
// Handlers
// =============================================================================

/// GET / - List classrooms, optionally filtered by `q`
async fn list_classrooms(
    State(store): State<GuardedClassroomStore>,
    Query(query): Query<ListQuery>,
) -> Response {
    let q = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty());
    match store.list_classrooms(q) {
        Ok(classrooms) => Json(classrooms).into_response(),
        Err(e) => {
            error!("Failed to list classrooms: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// GET /aula/{id} - Classroom with surfaces, images and recordings
async fn get_classroom(
    State(store): State<GuardedClassroomStore>,
    Path(id): Path<i64>,
) -> Response {
    match store.get_classroom_detail(id) {
        Ok(Some(detail)) => Json(detail).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            error!("Failed to load classroom {}: {}", id, e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// POST /aulas/add - Create a classroom from a multipart form
async fn add_classroom(
    State(manager): State<GuardedIngestionManager>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let mut form = match read_form(multipart).await {
        Ok(form) => form,
        Err(response) => return response,
    };
    let Some(classroom) = classroom_fields(&form) else {
        debug!("Classroom form without building or name");
        return Redirect::to("/").into_response();
    };
    let surfaces = surface_rows(&form);
    let images = form.take_files("imagenes");

    match manager.create_classroom(classroom, surfaces, images).await {
        Ok(_) => Redirect::to("/").into_response(),
        Err(e) => ingestion_error_response(e, "/"),
    }
}

/// POST /aula/{id}/edit - Update fields, surfaces and images
async fn edit_classroom(
    State(manager): State<GuardedIngestionManager>,
    Path(id): Path<i64>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let mut form = match read_form(multipart).await {
        Ok(form) => form,
        Err(response) => return response,
    };
    let back = classroom_path(id);
    let Some(classroom) = classroom_fields(&form) else {
        return match manager.store().get_classroom(id) {
            Ok(Some(_)) => Redirect::to(&back).into_response(),
            Ok(None) => StatusCode::NOT_FOUND.into_response(),
            Err(e) => ingestion_error_response(e.into(), &back),
        };
    };

    let edit = ClassroomEdit {
        classroom,
        delete_surface_ids: form.ids("delete_superficie"),
        new_surfaces: surface_rows(&form),
        delete_image_ids: form.ids("delete_image"),
        new_images: form.take_files("imagenes"),
    };
    match manager.update_classroom(id, edit).await {
        Ok(()) => Redirect::to(&back).into_response(),
        Err(e) => ingestion_error_response(e, &back),
    }
}

/// POST /aula/{id}/delete - Delete a classroom and everything it owns
async fn delete_classroom(
    State(manager): State<GuardedIngestionManager>,
    Path(id): Path<i64>,
) -> Response {
    match manager.delete_classroom(id).await {
        Ok(()) => Redirect::to("/").into_response(),
        Err(e) => ingestion_error_response(e, "/"),
    }
}

pub fn make_classroom_routes(state: ServerState) -> Router {
    Router::new()
        .route("/", get(list_classrooms))
        .route("/aulas/add", post(add_classroom))
        .route("/aula/{id}", get(get_classroom))
        .route("/aula/{id}/edit", post(edit_classroom))
        .route("/aula/{id}/delete", post(delete_classroom))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form_with(fields: &[(&str, &[&str])]) -> MultipartForm {
        let mut form = MultipartForm::default();
        for (name, values) in fields {
            form.push_text(name, values);
        }
        form
    }

    #[test]
    fn surface_rows_require_all_fields() {
        let form = form_with(&[
            ("nombre_espacio", &["Pared", "Techo", "", "Suelo"]),
            ("material", &["Yeso", "", "Madera", "Terrazo"]),
            ("area", &["12,5", "30", "4", "no"]),
        ]);
        assert_eq!(
            surface_rows(&form),
            vec![NewSurface {
                space_name: "Pared".to_string(),
                material: "Yeso".to_string(),
                area: 12.5,
            }]
        );
    }

    #[test]
    fn classroom_fields_require_building_and_name() {
        let form = form_with(&[("edificio", &["A"]), ("nombre_aula", &[""])]);
        assert!(classroom_fields(&form).is_none());

        let form = form_with(&[
            ("edificio", &["A"]),
            ("nombre_aula", &["1.01"]),
            ("num_ventanas", &[""]),
        ]);
        assert_eq!(
            classroom_fields(&form),
            Some(NewClassroom {
                building: "A".to_string(),
                name: "1.01".to_string(),
                window_count: None,
            })
        );

        let form = form_with(&[
            ("edificio", &["A"]),
            ("nombre_aula", &["1.01"]),
            ("num_ventanas", &["3"]),
        ]);
        assert_eq!(classroom_fields(&form).unwrap().window_count, Some(3));
    }
}
