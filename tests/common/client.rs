//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for all server endpoints.
//!
//! When API routes or form field names change, update only this file.

use super::constants::*;
use reqwest::multipart::{Form, Part};
use reqwest::Response;
use std::time::Duration;

/// Fields of the classroom create/edit form.
#[derive(Default, Clone)]
pub struct ClassroomForm {
    pub building: String,
    pub name: String,
    pub window_count: String,
    /// (space name, material, area) rows, sent as parallel lists
    pub surfaces: Vec<(String, String, String)>,
    /// (client file name, bytes)
    pub images: Vec<(String, Vec<u8>)>,
    pub delete_surface_ids: Vec<i64>,
    pub delete_image_ids: Vec<i64>,
}

impl ClassroomForm {
    pub fn new(building: &str, name: &str) -> Self {
        Self {
            building: building.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn surface(mut self, space: &str, material: &str, area: &str) -> Self {
        self.surfaces
            .push((space.to_string(), material.to_string(), area.to_string()));
        self
    }

    pub fn image(mut self, filename: &str, data: Vec<u8>) -> Self {
        self.images.push((filename.to_string(), data));
        self
    }

    fn into_multipart(self) -> Form {
        let mut form = Form::new()
            .text("edificio", self.building)
            .text("nombre_aula", self.name)
            .text("num_ventanas", self.window_count);
        for (space, material, area) in self.surfaces {
            form = form
                .text("nombre_espacio[]", space)
                .text("material[]", material)
                .text("area[]", area);
        }
        for (filename, data) in self.images {
            form = form.part("imagenes", Part::bytes(data).file_name(filename));
        }
        for id in self.delete_surface_ids {
            form = form.text("delete_superficie", id.to_string());
        }
        for id in self.delete_image_ids {
            form = form.text("delete_image", id.to_string());
        }
        form
    }
}

/// HTTP test client. Redirects are not followed so tests can assert on them.
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    async fn get(&self, path: &str) -> Response {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .expect("GET request failed")
    }

    async fn post(&self, path: &str) -> Response {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .send()
            .await
            .expect("POST request failed")
    }

    async fn post_form(&self, path: &str, form: Form) -> Response {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .multipart(form)
            .send()
            .await
            .expect("Multipart request failed")
    }

    /// POST with no body at all, as a client that skips the form would send.
    pub async fn post_empty(&self, path: &str) -> Response {
        self.post(path).await
    }

    // ========================================================================
    // Status
    // ========================================================================

    pub async fn get_status(&self) -> Response {
        self.get("/status").await
    }

    // ========================================================================
    // Classrooms
    // ========================================================================

    pub async fn list_classrooms(&self, query: Option<&str>) -> Response {
        match query {
            Some(q) => {
                self.client
                    .get(format!("{}/", self.base_url))
                    .query(&[("q", q)])
                    .send()
                    .await
                    .expect("GET request failed")
            }
            None => self.get("/").await,
        }
    }

    pub async fn get_classroom(&self, id: i64) -> Response {
        self.get(&format!("/aula/{}", id)).await
    }

    pub async fn add_classroom(&self, form: ClassroomForm) -> Response {
        self.post_form("/aulas/add", form.into_multipart()).await
    }

    pub async fn edit_classroom(&self, id: i64, form: ClassroomForm) -> Response {
        self.post_form(&format!("/aula/{}/edit", id), form.into_multipart())
            .await
    }

    pub async fn delete_classroom(&self, id: i64) -> Response {
        self.post(&format!("/aula/{}/delete", id)).await
    }

    pub async fn get_classroom_image(&self, filename: &str) -> Response {
        self.get(&format!("/uploads/aulas_img/{}", filename)).await
    }

    /// Creates a classroom and returns its id, looked up by its unique name.
    pub async fn create_classroom(&self, form: ClassroomForm) -> i64 {
        let name = form.name.clone();
        let response = self.add_classroom(form).await;
        assert_eq!(response.status(), reqwest::StatusCode::SEE_OTHER);

        let classrooms: Vec<serde_json::Value> =
            self.list_classrooms(None).await.json().await.unwrap();
        classrooms
            .iter()
            .find(|c| c["name"] == name.as_str())
            .and_then(|c| c["id"].as_i64())
            .expect("created classroom not listed")
    }

    // ========================================================================
    // Recordings
    // ========================================================================

    /// Uploads a recording. `metadata` pairs use the form field names
    /// (`investigador`, `descripcion`, `ubicacion`, `etiquetas`).
    pub async fn upload_audio(
        &self,
        classroom_id: Option<i64>,
        file: Option<(&str, Vec<u8>)>,
        metadata: &[(&str, &str)],
    ) -> Response {
        let mut form = Form::new();
        if let Some((filename, data)) = file {
            form = form.part("file", Part::bytes(data).file_name(filename.to_string()));
        }
        for (name, value) in metadata {
            form = form.text(name.to_string(), value.to_string());
        }
        let path = match classroom_id {
            Some(id) => format!("/aula/{}/upload_audio", id),
            None => "/upload".to_string(),
        };
        self.post_form(&path, form).await
    }

    pub async fn list_recordings(&self) -> Response {
        self.get("/recordings").await
    }

    pub async fn get_recording(&self, id: i64) -> Response {
        self.get(&format!("/grabacion/{}", id)).await
    }

    pub async fn delete_recording(&self, id: i64) -> Response {
        self.post(&format!("/grabacion/{}/delete", id)).await
    }

    pub async fn play(&self, filename: &str) -> Response {
        self.get(&format!("/play/{}", filename)).await
    }

    pub async fn get_spectrogram(&self, filename: &str) -> Response {
        self.get(&format!("/spectrogram/{}", filename)).await
    }
}
