//! End-to-end tests for recording upload, spectrogram rendering and deletion

mod common;

use common::*;
use reqwest::StatusCode;
use serde_json::Value;

fn location(response: &reqwest::Response) -> String {
    response.headers()["location"].to_str().unwrap().to_string()
}

async fn only_top_level_recording(client: &TestClient) -> Value {
    let recordings: Vec<Value> = client.list_recordings().await.json().await.unwrap();
    assert_eq!(recordings.len(), 1);
    recordings.into_iter().next().unwrap()
}

#[tokio::test]
async fn test_upload_renders_spectrogram() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .upload_audio(
            None,
            Some(("test tone.wav", wav_tone(2.0))),
            &[("investigador", "A"), ("descripcion", "calibration")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let recording = only_top_level_recording(&client).await;
    assert_eq!(recording["original_filename"], "test_tone.wav");
    assert_eq!(recording["researcher"], "A");
    assert_eq!(recording["description"], "calibration");
    assert!(recording["classroom_id"].is_null());

    let spectrogram = recording["spectrogram_filename"].as_str().unwrap();
    assert_ne!(spectrogram, PLACEHOLDER);
    assert!(spectrogram.starts_with("test_tone_"));
    assert!(spectrogram.ends_with(".png"));
    assert!(server.spectrograms_dir.join(spectrogram).is_file());

    let response = client.get_spectrogram(spectrogram).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/png");
    let png = response.bytes().await.unwrap();
    assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");

    // The listing links the stored file directly; server paths stay private.
    assert!(recording.get("audio_path").is_none());
    let audio = recording["audio_filename"].as_str().unwrap();
    assert!(audio.ends_with("_test_tone.wav"));
    assert!(server.uploads_dir.join(audio).is_file());
    let response = client.play(audio).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.bytes().await.unwrap().to_vec(), wav_tone(2.0));
}

#[tokio::test]
async fn test_undecodable_upload_gets_placeholder() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());
    let pngs_before = count_files(&server.spectrograms_dir);

    let response = client
        .upload_audio(None, Some(("empty.wav", Vec::new())), &[])
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let recording = only_top_level_recording(&client).await;
    assert_eq!(recording["spectrogram_filename"], PLACEHOLDER);
    assert_eq!(count_files(&server.spectrograms_dir), pngs_before);
    assert_eq!(count_files(&server.uploads_dir), 1);

    let response = client.get_spectrogram(PLACEHOLDER).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_same_name_uploads_are_kept_apart() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    for _ in 0..2 {
        let response = client
            .upload_audio(None, Some(("tone.wav", wav_tone(0.5))), &[])
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    let recordings: Vec<Value> = client.list_recordings().await.json().await.unwrap();
    assert_eq!(recordings.len(), 2);
    assert_ne!(recordings[0]["audio_filename"], recordings[1]["audio_filename"]);
    for recording in &recordings {
        let response = client
            .play(recording["audio_filename"].as_str().unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_ne!(
        recordings[0]["spectrogram_filename"],
        recordings[1]["spectrogram_filename"]
    );
    assert_eq!(count_files(&server.uploads_dir), 2);
    // two renders plus the placeholder
    assert_eq!(count_files(&server.spectrograms_dir), 3);
}

#[tokio::test]
async fn test_upload_without_file_redirects() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .upload_audio(None, None, &[("investigador", "A")])
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    // A file part with no file name is what a browser sends for an empty input.
    let response = client.upload_audio(None, Some(("", Vec::new())), &[]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let recordings: Vec<Value> = client.list_recordings().await.json().await.unwrap();
    assert!(recordings.is_empty());
    assert_eq!(count_files(&server.uploads_dir), 0);
}

#[tokio::test]
async fn test_posts_without_a_readable_form_redirect() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());
    let classroom_id = client
        .create_classroom(ClassroomForm::new("Edificio A", "1.01"))
        .await;
    let classroom_page = format!("/aula/{}", classroom_id);

    // A multipart body with no parts at all
    let response = client.upload_audio(None, None, &[]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let response = client.post_empty("/upload").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let response = client
        .post_empty(&format!("{}/upload_audio", classroom_page))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), classroom_page);

    let response = client.post_empty("/aulas/add").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let response = client
        .post_empty(&format!("{}/edit", classroom_page))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), classroom_page);

    let classrooms: Vec<Value> = client.list_classrooms(None).await.json().await.unwrap();
    assert_eq!(classrooms.len(), 1);
    assert_eq!(classrooms[0]["name"], "1.01");
    let recordings: Vec<Value> = client.list_recordings().await.json().await.unwrap();
    assert!(recordings.is_empty());
    assert_eq!(count_files(&server.uploads_dir), 0);
}

#[tokio::test]
async fn test_metadata_round_trip() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    client
        .upload_audio(
            None,
            Some(("sala.wav", wav_tone(0.5))),
            &[
                ("investigador", "Ana"),
                ("descripcion", ""),
                ("ubicacion", "fila 3"),
                ("etiquetas", "eco, reverberación"),
            ],
        )
        .await;

    let listed = only_top_level_recording(&client).await;
    let id = listed["id"].as_i64().unwrap();

    let response = client.get_recording(id).await;
    assert_eq!(response.status(), StatusCode::OK);
    let recording: Value = response.json().await.unwrap();
    assert_eq!(recording["researcher"], "Ana");
    assert!(recording["description"].is_null());
    assert_eq!(recording["location"], "fila 3");
    assert_eq!(recording["tags"], "eco, reverberación");

    let stored = server.store.get_recording(id).unwrap().unwrap();
    assert_eq!(stored.metadata.researcher.as_deref(), Some("Ana"));
    assert_eq!(stored.metadata.description, None);
}

#[tokio::test]
async fn test_classroom_upload_and_delete() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());
    let classroom_id = client
        .create_classroom(ClassroomForm::new("Edificio A", "1.01"))
        .await;

    let response = client
        .upload_audio(Some(classroom_id), Some(("aula.wav", wav_tone(1.0))), &[])
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/aula/{}", classroom_id));

    let detail: Value = client
        .get_classroom(classroom_id)
        .await
        .json()
        .await
        .unwrap();
    let recordings = detail["recordings"].as_array().unwrap();
    assert_eq!(recordings.len(), 1);
    let recording = &recordings[0];
    assert_eq!(recording["classroom_id"], classroom_id);
    let id = recording["id"].as_i64().unwrap();
    let audio_path = server
        .uploads_dir
        .join(recording["audio_filename"].as_str().unwrap());
    let spectrogram = recording["spectrogram_filename"].as_str().unwrap().to_string();
    assert!(audio_path.is_file());
    assert!(server.spectrograms_dir.join(&spectrogram).is_file());

    // Not a top-level recording
    let top_level: Vec<Value> = client.list_recordings().await.json().await.unwrap();
    assert!(top_level.is_empty());

    let response = client.delete_recording(id).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/aula/{}", classroom_id));

    assert!(!audio_path.exists());
    assert!(!server.spectrograms_dir.join(&spectrogram).exists());
    assert!(server.spectrograms_dir.join(PLACEHOLDER).is_file());
    assert_eq!(client.get_recording(id).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        client.delete_recording(id).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_deleting_placeholder_recording_keeps_placeholder() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    client
        .upload_audio(None, Some(("broken.mp3", b"not audio".to_vec())), &[])
        .await;
    let recording = only_top_level_recording(&client).await;
    assert_eq!(recording["spectrogram_filename"], PLACEHOLDER);

    let response = client
        .delete_recording(recording["id"].as_i64().unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    assert!(server.spectrograms_dir.join(PLACEHOLDER).is_file());
    assert_eq!(count_files(&server.uploads_dir), 0);
}

#[tokio::test]
async fn test_upload_to_missing_classroom_is_not_found() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .upload_audio(Some(404), Some(("tone.wav", wav_tone(0.5))), &[])
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // The classroom is checked before the file
    let response = client.upload_audio(Some(404), None, &[]).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = client.post_empty("/aula/404/upload_audio").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    assert_eq!(count_files(&server.uploads_dir), 0);
}

#[tokio::test]
async fn test_oversized_upload_is_rejected_before_any_write() {
    let server = TestServer::spawn_with_limit(SMALL_UPLOAD_LIMIT).await;
    let client = TestClient::new(server.base_url.clone());
    let pngs_before = count_files(&server.spectrograms_dir);

    let response = client
        .upload_audio(None, Some(("big.wav", vec![0u8; 16 * 1024])), &[])
        .await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    assert_eq!(count_files(&server.uploads_dir), 0);
    assert_eq!(count_files(&server.spectrograms_dir), pngs_before);
    let recordings: Vec<Value> = client.list_recordings().await.json().await.unwrap();
    assert!(recordings.is_empty());
}
