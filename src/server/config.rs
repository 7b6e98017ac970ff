use super::RequestsLoggingLevel;
use crate::config::DEFAULT_MAX_UPLOAD_BYTES;

#[derive(Clone)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub port: u16,
    /// Request bodies above this size are rejected with 413.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            port: 5000,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}
