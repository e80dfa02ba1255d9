//! Session lifecycle HTTP handlers.
//!
//! Endpoints:
//! - GET  /api/status        - Current session status
//! - GET  /api/qr            - Pending challenge (`?format=svg` renders the QR)
//! - POST /api/pair          - Request a pairing code for a phone number
//! - POST /api/logout        - Invalidate the session and discard credentials
//! - POST /api/reinitialize  - Open a new session from Uninitialized/LoggedOut

use std::time::Instant;

use axum::Json;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use qrcode::QrCode;
use qrcode::render::svg;
use serde::{Deserialize, Serialize};

use chatgate_types::error::GatewayError;
use chatgate_types::session::SessionStatus;

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::extractors::json::ApiJson;
use crate::http::extractors::query::{ApiQuery, QrFormat, QrQuery};
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Request body for `POST /api/pair`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairRequest {
    pub phone_number: String,
    #[serde(default)]
    pub custom_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PairResponse {
    pub phone_number: String,
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub logged_out: bool,
    /// Whether there was a session (or stored credentials) to end.
    pub had_session: bool,
}

/// GET /api/status
pub async fn get_status(
    State(state): State<AppState>,
    _auth: Authenticated,
) -> Json<ApiResponse<SessionStatus>> {
    let start = Instant::now();
    Json(ApiResponse::success(state.session.status(), start))
}

/// GET /api/qr
pub async fn get_qr(
    State(state): State<AppState>,
    _auth: Authenticated,
    ApiQuery(query): ApiQuery<QrQuery>,
) -> Result<Response, AppError> {
    let start = Instant::now();
    let challenge = state.session.challenge()?;

    match query.format {
        QrFormat::Json => Ok(Json(ApiResponse::success(challenge, start)).into_response()),
        QrFormat::Svg => {
            // A pending pairing code has nothing to render.
            let value = challenge.qr_value().ok_or(GatewayError::NoChallenge)?;
            let image = render_qr_svg(value)?;
            Ok(([(header::CONTENT_TYPE, "image/svg+xml")], image).into_response())
        }
    }
}

pub fn render_qr_svg(value: &str) -> Result<String, AppError> {
    let code = QrCode::new(value.as_bytes())
        .map_err(|e| AppError::Internal(format!("cannot encode QR value: {e}")))?;
    Ok(code
        .render::<svg::Color>()
        .min_dimensions(256, 256)
        .quiet_zone(true)
        .build())
}

/// POST /api/pair
pub async fn pair(
    State(state): State<AppState>,
    _auth: Authenticated,
    ApiJson(body): ApiJson<PairRequest>,
) -> Result<Json<ApiResponse<PairResponse>>, AppError> {
    let start = Instant::now();
    let issued = state
        .session
        .request_pairing_code(&body.phone_number, body.custom_code.as_deref())
        .await?;

    Ok(Json(ApiResponse::success(
        PairResponse {
            phone_number: issued.phone_number,
            code: issued.code,
        },
        start,
    )))
}

/// POST /api/logout
pub async fn logout(
    State(state): State<AppState>,
    _auth: Authenticated,
) -> Json<ApiResponse<LogoutResponse>> {
    let start = Instant::now();
    let had_session = state.session.logout().await;
    Json(ApiResponse::success(
        LogoutResponse {
            logged_out: true,
            had_session,
        },
        start,
    ))
}

/// POST /api/reinitialize
pub async fn reinitialize(
    State(state): State<AppState>,
    _auth: Authenticated,
) -> Json<ApiResponse<SessionStatus>> {
    let start = Instant::now();
    let status = state.session.initialize().await;
    Json(ApiResponse::success(status, start))
}
