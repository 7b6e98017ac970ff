//! Shared harness for the end-to-end tests.
//!
//! Every test spawns its own `TestServer` (temp data dir, fresh database, placeholder
//! spectrogram already written) and drives it through `TestClient`, which never
//! follows redirects so the 303 targets can be asserted.
//!
//! ```no_run
//! mod common;
//! use common::{wav_tone, TestClient, TestServer};
//!
//! #[tokio::test]
//! async fn uploads_a_tone() {
//!     let server = TestServer::spawn().await;
//!     let client = TestClient::new(server.base_url.clone());
//!     client
//!         .upload_audio(None, Some(("tone.wav", wav_tone(1.0))), &[])
//!         .await;
//! }
//! ```

#![allow(dead_code)]

mod client;
mod constants;
mod fixtures;
mod server;

pub use client::{ClassroomForm, TestClient};
pub use constants::*;
pub use fixtures::{count_files, fake_jpeg, wav_tone};
pub use server::TestServer;
