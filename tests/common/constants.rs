//! Shared constants for end-to-end tests

// ============================================================================
// Timeouts
// ============================================================================

/// Maximum time to wait for the server to answer /status
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Interval between readiness polls
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 20;

/// Per-request timeout; spectrogram rendering happens inside the request
pub const REQUEST_TIMEOUT_SECS: u64 = 60;

// ============================================================================
// Test data
// ============================================================================

/// Sample rate of generated WAV fixtures
pub const FIXTURE_SAMPLE_RATE: u32 = 22050;

/// Name of the placeholder image recorded when no spectrogram could be produced
pub const PLACEHOLDER: &str = "error.png";

/// Upload limit used by the 413 tests
pub const SMALL_UPLOAD_LIMIT: usize = 4096;
