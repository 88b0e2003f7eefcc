//! Liveness endpoint.
//!
//! Answers as long as the process is up, independent of whether the
//! dispatcher is currently blocked on a read or publishing.

use axum::http::StatusCode;

/// Returns 200 OK with the text "OK".
pub async fn health_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}
