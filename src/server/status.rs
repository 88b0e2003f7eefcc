//! Dispatch progress endpoint.

use axum::Json;
use axum::extract::State;

use super::AppState;
use crate::dispatch::StatsSnapshot;

/// Status handler.
///
/// Returns a point-in-time snapshot of the dispatcher's counters.
///
/// # Example
///
/// ```ignore
/// GET /api/v1/status HTTP/1.1
///
/// HTTP/1.1 200 OK
/// Content-Type: application/json
///
/// {
///   "stream": "dashboards",
///   "group": "dashboards-consumer-group",
///   "consumer": "3f2a...",
///   "published": 12,
///   "last_acked": "1700000000000-0",
///   ...
/// }
/// ```
pub async fn status_handler(State(app_state): State<AppState>) -> Json<StatsSnapshot> {
    Json(app_state.stats().snapshot())
}
