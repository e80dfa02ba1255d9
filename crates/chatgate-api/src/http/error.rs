//! Application error type mapping to HTTP status codes and envelope format.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use chatgate_types::error::GatewayError;

use crate::http::response::ApiResponse;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Session, composition or dispatch failure.
    Gateway(GatewayError),
    /// Authentication failure.
    Unauthorized(String),
    /// Generic internal error.
    Internal(String),
}

impl From<GatewayError> for AppError {
    fn from(e: GatewayError) -> Self {
        AppError::Gateway(e)
    }
}

// Malformed bodies are caller input errors, reported like any other invalid intent.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Gateway(GatewayError::invalid(rejection.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Gateway(GatewayError::invalid(rejection.body_text()))
    }
}

/// HTTP status for a gateway error.
pub fn gateway_status(e: &GatewayError) -> StatusCode {
    match e {
        GatewayError::NotInitialized | GatewayError::NotConnected => StatusCode::SERVICE_UNAVAILABLE,
        GatewayError::LoggedOut => StatusCode::CONFLICT,
        GatewayError::NoChallenge => StatusCode::NOT_FOUND,
        GatewayError::InvalidIntent(_) | GatewayError::InvalidTarget(_) => StatusCode::BAD_REQUEST,
        GatewayError::BatchTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        GatewayError::TransientTransportFailure(_) => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Gateway(e) => (gateway_status(e), e.reason_tag(), e.to_string()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg.clone())
            }
        };

        (status, Json(ApiResponse::error(code, &message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_status_mapping() {
        let cases = [
            (GatewayError::NotInitialized, 503),
            (GatewayError::NotConnected, 503),
            (GatewayError::LoggedOut, 409),
            (GatewayError::NoChallenge, 404),
            (GatewayError::invalid("x"), 400),
            (GatewayError::InvalidTarget("x".to_string()), 400),
            (GatewayError::BatchTooLarge { len: 11, max: 10 }, 413),
            (GatewayError::TransientTransportFailure("x".to_string()), 502),
        ];
        for (error, status) in cases {
            assert_eq!(gateway_status(&error).as_u16(), status, "{error:?}");
        }
    }

    #[test]
    fn test_error_response_carries_reason_tag() {
        let response = AppError::from(GatewayError::NotConnected).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
