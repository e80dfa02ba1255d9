//! JSON body extractor whose rejection uses the API error envelope.

use axum::extract::FromRequest;

use crate::http::error::AppError;

/// Like [`axum::Json`], but a malformed body yields `400 INVALID_INTENT`
/// instead of axum's plain-text rejection.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);
