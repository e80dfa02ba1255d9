//! Multi-item send handlers.
//!
//! Endpoints:
//! - POST /api/send/bulk   - Same message to many recipients, paced
//! - POST /api/send/album  - Several images/videos to one recipient, paced
//!
//! Both respond with a dispatch report once the last item was submitted.

use std::time::Instant;

use axum::Json;
use axum::extract::State;
use serde::Deserialize;

use chatgate_types::dispatch::DispatchReport;
use chatgate_types::intent::{AlbumItem, IntentBody};

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::extractors::json::ApiJson;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Request body for `POST /api/send/bulk`.
///
/// ```json
/// { "recipients": ["+1 555 0100", "+1 555 0101"],
///   "message": { "kind": "text", "text": "Store opens at 9" },
///   "intervalMs": 2000 }
/// ```
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkRequest {
    #[serde(default)]
    pub recipients: Vec<String>,
    pub message: IntentBody,
    #[serde(default)]
    pub interval_ms: Option<u64>,
}

/// Request body for `POST /api/send/album`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumRequest {
    pub to: String,
    #[serde(default)]
    pub items: Vec<AlbumItem>,
    #[serde(default)]
    pub interval_ms: Option<u64>,
}

/// POST /api/send/bulk
pub async fn bulk(
    State(state): State<AppState>,
    _auth: Authenticated,
    ApiJson(body): ApiJson<BulkRequest>,
) -> Result<Json<ApiResponse<DispatchReport>>, AppError> {
    let start = Instant::now();
    let report = state
        .messaging
        .send_bulk(&body.recipients, &body.message, body.interval_ms)
        .await?;
    tracing::info!(
        sent = report.sent_count,
        failed = report.failed_count,
        "bulk send finished"
    );
    Ok(Json(ApiResponse::success(report, start)))
}

/// POST /api/send/album
pub async fn album(
    State(state): State<AppState>,
    _auth: Authenticated,
    ApiJson(body): ApiJson<AlbumRequest>,
) -> Result<Json<ApiResponse<DispatchReport>>, AppError> {
    let start = Instant::now();
    let report = state
        .messaging
        .send_album(&body.to, &body.items, body.interval_ms)
        .await?;
    Ok(Json(ApiResponse::success(report, start)))
}
