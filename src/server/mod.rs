mod classroom_routes;
pub mod config;
mod http_layers;
mod multipart_form;
mod recording_routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use http_layers::*;
pub use server::run_server;

use serde::Serialize;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
