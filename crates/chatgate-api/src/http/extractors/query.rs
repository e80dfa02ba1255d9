//! Query parameter extractors.

use axum::extract::FromRequestParts;
use serde::Deserialize;

use crate::http::error::AppError;

/// Like [`axum::extract::Query`], with envelope-formatted rejections.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Rendering of the pending QR challenge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QrFormat {
    /// The challenge as JSON inside the envelope.
    #[default]
    Json,
    /// An SVG image of the QR code.
    Svg,
}

/// Query parameters for `GET /api/qr`.
#[derive(Debug, Default, Deserialize)]
pub struct QrQuery {
    #[serde(default)]
    pub format: QrFormat,
}
